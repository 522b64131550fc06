#![allow(missing_docs)]

//! Parsed domain objects handed to the builders.
//!
//! Field names follow the JSON-lines feeds; every nested collection and
//! optional scalar defaults to empty so sparse records deserialize.

use serde::{Deserialize, Serialize};

use crate::model::EntityType;

/// Cross-reference to an external database record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Xref {
    /// Database name, e.g. `HGNC`.
    pub db: String,
    /// Identifier within that database.
    pub id: String,
    /// Optional free-text description.
    pub description: Option<String>,
}

/// Annotated gene with its nested transcripts and annotations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gene {
    /// Ensembl gene id.
    pub id: String,
    /// HGNC symbol.
    pub name: Option<String>,
    pub biotype: Option<String>,
    pub chromosome: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub strand: Option<i64>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub transcripts: Vec<Transcript>,
    pub drugs: Vec<DrugInteraction>,
    pub diseases: Vec<DiseaseAssociation>,
    pub xrefs: Vec<Xref>,
    pub mirna_targets: Vec<MirnaTarget>,
}

/// Transcript nested under a gene.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transcript {
    /// Ensembl transcript id.
    pub id: String,
    pub name: Option<String>,
    pub biotype: Option<String>,
    pub chromosome: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub strand: Option<i64>,
    pub annotation_flags: Vec<String>,
    /// UniProt accession of the translated product, if any.
    pub protein_id: Option<String>,
    pub exons: Vec<Exon>,
    pub xrefs: Vec<Xref>,
}

/// Exon; the same exon may appear under several transcripts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exon {
    /// Ensembl exon id.
    pub id: String,
    pub chromosome: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub strand: Option<i64>,
    pub phase: Option<i64>,
    pub exon_number: Option<i64>,
}

/// Drug-gene interaction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrugInteraction {
    /// Drug name; used as the key when no ChEMBL id is known.
    pub name: String,
    pub chembl_id: Option<String>,
    pub interaction_type: Option<String>,
    pub source: Option<String>,
}

impl DrugInteraction {
    /// Identity key of the drug.
    pub fn key(&self) -> &str {
        self.chembl_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.name)
    }
}

/// Gene-disease association.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiseaseAssociation {
    /// Disease term id.
    pub id: String,
    pub name: Option<String>,
    pub score: Option<f64>,
    pub source: Option<String>,
}

/// miRNA targeting a gene, recorded on the gene side.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirnaTarget {
    /// miRNA accession or name.
    pub mirna: String,
    pub experiment: Option<String>,
    pub evidence: Option<String>,
    pub pubmed: Option<String>,
}

/// UniProt protein entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Protein {
    /// Primary accession.
    pub accession: String,
    /// Entry name, e.g. `BRCA1_HUMAN`.
    pub name: Option<String>,
    pub full_name: Option<String>,
    /// Symbols of the encoding genes.
    pub gene_names: Vec<String>,
    pub keywords: Vec<String>,
    pub organism: Option<String>,
    pub xrefs: Vec<Xref>,
}

/// Precursor miRNA.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mirna {
    /// miRBase accession (`MI...`).
    pub accession: String,
    /// Name, e.g. `hsa-mir-21`.
    pub name: Option<String>,
    pub sequence: Option<String>,
    pub status: Option<String>,
    pub matures: Vec<MatureMirna>,
}

/// Mature product of a precursor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatureMirna {
    /// miRBase accession (`MIMAT...`).
    pub accession: String,
    pub name: Option<String>,
    pub sequence: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

/// Curated gene panel.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Panel {
    pub id: String,
    pub name: Option<String>,
    pub source: Option<String>,
    pub version: Option<String>,
    pub disease_group: Option<String>,
    pub phenotypes: Vec<String>,
    pub genes: Vec<PanelGene>,
}

/// Gene entry of a panel.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelGene {
    /// Gene symbol or Ensembl id.
    pub gene: String,
    pub confidence: Option<String>,
    pub mode_of_inheritance: Option<String>,
}

/// Kind of a pathway-ontology element.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    #[default]
    Pathway,
    Reaction,
    Complex,
    SmallMolecule,
    Protein,
    Dna,
    Rna,
}

impl ElementKind {
    /// Node type an element of this kind becomes.
    pub fn entity_type(self) -> EntityType {
        match self {
            ElementKind::Pathway => EntityType::Pathway,
            ElementKind::Reaction => EntityType::Reaction,
            ElementKind::Complex => EntityType::Complex,
            ElementKind::SmallMolecule => EntityType::SmallMolecule,
            ElementKind::Protein => EntityType::Protein,
            ElementKind::Dna => EntityType::Dna,
            ElementKind::Rna => EntityType::Rna,
        }
    }
}

/// Typed reference from one ontology element to another.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementRef {
    pub id: String,
    pub kind: ElementKind,
}

/// Pathway-ontology element, already parsed from the ontology format.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OntologyElement {
    /// Element id, unique within its kind.
    pub id: String,
    pub kind: ElementKind,
    pub name: Option<String>,
    pub alt_names: Vec<String>,
    pub xrefs: Vec<Xref>,
    pub cellular_location: Option<String>,
    /// Catalogue record the element stands for: a UniProt accession for
    /// proteins, a gene key for DNA, a miRNA key for RNA.
    pub entity_reference: Option<String>,
    /// Members of a pathway or complex.
    pub components: Vec<ElementRef>,
    pub inputs: Vec<ElementRef>,
    pub outputs: Vec<ElementRef>,
    /// Elements controlling this reaction.
    pub controllers: Vec<ElementRef>,
    pub direction: Option<String>,
    pub formula: Option<String>,
    pub source: Option<String>,
}

/// Annotated genomic variant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Variant {
    pub chromosome: String,
    pub start: i64,
    pub reference: String,
    pub alternate: String,
    pub variant_type: Option<String>,
    pub consequences: Vec<Consequence>,
}

impl Variant {
    /// `chrom:start:ref:alt` identity key.
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.chromosome, self.start, self.reference, self.alternate
        )
    }
}

/// Predicted effect of a variant on one gene or transcript.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Consequence {
    pub gene_id: Option<String>,
    pub gene_name: Option<String>,
    pub transcript_id: Option<String>,
    /// Sequence Ontology terms.
    pub so_terms: Vec<String>,
}
