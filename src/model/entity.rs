//! Closed catalogue of node types and relation kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Node type. The upper-case name doubles as the bulk-loader identity space.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// Gene, keyed by Ensembl id.
    Gene,
    /// Transcript, keyed by Ensembl id.
    Transcript,
    /// Exon, keyed by Ensembl id.
    Exon,
    /// Protein, keyed by UniProt accession.
    Protein,
    /// Precursor miRNA, keyed by miRBase accession.
    Mirna,
    /// Mature miRNA product.
    MirnaMature,
    /// Drug named by a drug-gene interaction.
    Drug,
    /// Disease or phenotype term.
    Disease,
    /// Cross-reference to an external database.
    Xref,
    /// Curated gene panel.
    Panel,
    /// Genomic variant.
    Variant,
    /// Pathway ontology element.
    Pathway,
    /// Biochemical reaction.
    Reaction,
    /// Molecular complex.
    Complex,
    /// Small molecule.
    SmallMolecule,
    /// DNA physical entity.
    Dna,
    /// RNA physical entity.
    Rna,
    /// Cellular compartment.
    CellularLocation,
}

impl EntityType {
    /// Every type in header-emission order.
    pub const ALL: [EntityType; 18] = [
        EntityType::Gene,
        EntityType::Transcript,
        EntityType::Exon,
        EntityType::Protein,
        EntityType::Mirna,
        EntityType::MirnaMature,
        EntityType::Drug,
        EntityType::Disease,
        EntityType::Xref,
        EntityType::Panel,
        EntityType::Variant,
        EntityType::Pathway,
        EntityType::Reaction,
        EntityType::Complex,
        EntityType::SmallMolecule,
        EntityType::Dna,
        EntityType::Rna,
        EntityType::CellularLocation,
    ];

    /// Identity space / primary label.
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityType::Gene => "GENE",
            EntityType::Transcript => "TRANSCRIPT",
            EntityType::Exon => "EXON",
            EntityType::Protein => "PROTEIN",
            EntityType::Mirna => "MIRNA",
            EntityType::MirnaMature => "MIRNA_MATURE",
            EntityType::Drug => "DRUG",
            EntityType::Disease => "DISEASE",
            EntityType::Xref => "XREF",
            EntityType::Panel => "PANEL",
            EntityType::Variant => "VARIANT",
            EntityType::Pathway => "PATHWAY",
            EntityType::Reaction => "REACTION",
            EntityType::Complex => "COMPLEX",
            EntityType::SmallMolecule => "SMALL_MOLECULE",
            EntityType::Dna => "DNA",
            EntityType::Rna => "RNA",
            EntityType::CellularLocation => "CELLULAR_LOCATION",
        }
    }

    /// Attribute columns, in emission order.
    pub const fn attribute_columns(self) -> &'static [&'static str] {
        match self {
            EntityType::Gene => &[
                "biotype",
                "chromosome",
                "start",
                "end",
                "strand",
                "description",
                "source",
            ],
            EntityType::Transcript => &[
                "biotype",
                "chromosome",
                "start",
                "end",
                "strand",
                "annotation_flags",
            ],
            EntityType::Exon => &["chromosome", "start", "end", "strand", "phase", "exon_number"],
            EntityType::Protein => &["full_name", "gene_names", "keywords", "organism"],
            EntityType::Mirna => &["sequence", "status"],
            EntityType::MirnaMature => &["sequence", "start", "end"],
            EntityType::Drug => &["source", "chembl_id"],
            EntityType::Disease => &["source"],
            EntityType::Xref => &["db_name", "description"],
            EntityType::Panel => &["source", "version", "disease_group", "phenotypes"],
            EntityType::Variant => &[
                "chromosome",
                "start",
                "reference",
                "alternate",
                "variant_type",
            ],
            EntityType::Pathway => &["alt_names", "source"],
            EntityType::Reaction => &["alt_names", "direction"],
            EntityType::Complex => &["alt_names"],
            EntityType::SmallMolecule => &["alt_names", "formula"],
            EntityType::Dna => &["alt_names"],
            EntityType::Rna => &["alt_names"],
            EntityType::CellularLocation => &[],
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| format!("unknown entity type '{s}'"))
    }
}

/// Relation verb.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verb {
    /// Structural containment (gene has transcript, panel has gene).
    Has,
    /// Identity between a physical entity and its catalogue record.
    Is,
    /// Gene encodes protein.
    Encodes,
    /// Curated annotation (drug, disease).
    Annotation,
    /// Cross-reference.
    Xref,
    /// miRNA targets gene.
    Target,
    /// Member of a pathway or complex.
    Component,
    /// Reaction input.
    Input,
    /// Reaction output.
    Output,
    /// Controller of a reaction.
    Controls,
    /// Cellular location.
    Location,
    /// Variant consequence.
    Consequence,
}

impl Verb {
    const ALL: [Verb; 12] = [
        Verb::Has,
        Verb::Is,
        Verb::Encodes,
        Verb::Annotation,
        Verb::Xref,
        Verb::Target,
        Verb::Component,
        Verb::Input,
        Verb::Output,
        Verb::Controls,
        Verb::Location,
        Verb::Consequence,
    ];

    /// Upper-case rendering used in relation labels.
    pub const fn as_str(self) -> &'static str {
        match self {
            Verb::Has => "HAS",
            Verb::Is => "IS",
            Verb::Encodes => "ENCODES",
            Verb::Annotation => "ANNOTATION",
            Verb::Xref => "XREF",
            Verb::Target => "TARGET",
            Verb::Component => "COMPONENT",
            Verb::Input => "INPUT",
            Verb::Output => "OUTPUT",
            Verb::Controls => "CONTROLS",
            Verb::Location => "LOCATION",
            Verb::Consequence => "CONSEQUENCE",
        }
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str() == s)
            .ok_or_else(|| format!("unknown relation verb '{s}'"))
    }
}

/// Separator between the three parts of a rendered relation label.
pub const LABEL_SEPARATOR: &str = "___";

/// Structured relation type: the textual label is derived only when written.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct RelationKind {
    /// What the relation means.
    pub verb: Verb,
    /// Identity space of the start node.
    pub origin: EntityType,
    /// Identity space of the end node.
    pub dest: EntityType,
}

impl RelationKind {
    /// Kinds whose streams carry attribute columns; every other kind has
    /// only the two endpoint columns.
    pub const ATTRIBUTED: [RelationKind; 6] = [
        RelationKind::new(Verb::Annotation, EntityType::Gene, EntityType::Drug),
        RelationKind::new(Verb::Annotation, EntityType::Gene, EntityType::Disease),
        RelationKind::new(Verb::Target, EntityType::Mirna, EntityType::Gene),
        RelationKind::new(Verb::Has, EntityType::Panel, EntityType::Gene),
        RelationKind::new(Verb::Consequence, EntityType::Variant, EntityType::Gene),
        RelationKind::new(Verb::Consequence, EntityType::Variant, EntityType::Transcript),
    ];

    /// Creates a relation kind.
    pub const fn new(verb: Verb, origin: EntityType, dest: EntityType) -> Self {
        Self { verb, origin, dest }
    }

    /// Parses a `VERB___ORIGIN___DEST` label.
    pub fn parse(label: &str) -> Option<Self> {
        let mut parts = label.split(LABEL_SEPARATOR);
        let verb = parts.next()?.parse().ok()?;
        let origin = parts.next()?.parse().ok()?;
        let dest = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(verb, origin, dest))
    }

    /// Attribute columns carried by this relation kind.
    pub fn attribute_columns(&self) -> &'static [&'static str] {
        use EntityType::*;
        match (self.verb, self.origin, self.dest) {
            (Verb::Annotation, Gene, Drug) => &["interaction_type", "source"],
            (Verb::Annotation, Gene, Disease) => &["score", "source"],
            (Verb::Target, Mirna, Gene) => &["experiment", "evidence", "pubmed"],
            (Verb::Has, Panel, Gene) => &["confidence", "mode_of_inheritance"],
            (Verb::Consequence, Variant, Gene) | (Verb::Consequence, Variant, Transcript) => {
                &["so_terms"]
            }
            _ => &[],
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.verb.as_str(),
            self.origin.as_str(),
            self.dest.as_str(),
            sep = LABEL_SEPARATOR
        )
    }
}
