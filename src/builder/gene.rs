use crate::model::{AttrValue, Attrs, EntityType, Node, RelationKind, Verb};
use crate::source::{DiseaseAssociation, DrugInteraction, Gene, Transcript};
use crate::types::{Result, Uid};

use super::{link_xref, list, BuildContext, EntityBuilder, PendingReference};

const HAS_TRANSCRIPT: RelationKind =
    RelationKind::new(Verb::Has, EntityType::Gene, EntityType::Transcript);
const HAS_EXON: RelationKind =
    RelationKind::new(Verb::Has, EntityType::Transcript, EntityType::Exon);
const TRANSCRIPT_PROTEIN: RelationKind =
    RelationKind::new(Verb::Is, EntityType::Transcript, EntityType::Protein);
const GENE_DRUG: RelationKind =
    RelationKind::new(Verb::Annotation, EntityType::Gene, EntityType::Drug);
const GENE_DISEASE: RelationKind =
    RelationKind::new(Verb::Annotation, EntityType::Gene, EntityType::Disease);
const MIRNA_TARGET: RelationKind =
    RelationKind::new(Verb::Target, EntityType::Mirna, EntityType::Gene);

/// Gene with transcripts, exons, annotations and miRNA targets.
///
/// The gene is keyed by its Ensembl id; the symbol and every xref id are
/// bound as aliases so other feeds can name the gene either way.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeneBuilder;

impl EntityBuilder for GeneBuilder {
    type Source = Gene;
    const ENTITY: EntityType = EntityType::Gene;

    fn build(&self, ctx: &mut BuildContext, gene: &Gene) -> Result<Uid> {
        let name = gene.name.as_deref().unwrap_or_default();
        let uid = ctx
            .resolve_or_create(&gene.id, EntityType::Gene, |uid| {
                Node::new(uid, EntityType::Gene, &gene.id, name).with_attributes(
                    Attrs::new()
                        .with("biotype", gene.biotype.as_deref())
                        .with("chromosome", gene.chromosome.as_deref())
                        .with("start", gene.start)
                        .with("end", gene.end)
                        .with("strand", gene.strand)
                        .with("description", gene.description.as_deref())
                        .with("source", gene.source.as_deref())
                        .build(),
                )
            })?
            .uid;
        ctx.bind_alias(name, EntityType::Gene, uid)?;

        for xref in &gene.xrefs {
            ctx.bind_alias(&xref.id, EntityType::Gene, uid)?;
            let res = link_xref(ctx, uid, EntityType::Gene, xref);
            ctx.tolerate(res)?;
        }
        for transcript in &gene.transcripts {
            let res = build_transcript(ctx, uid, transcript);
            ctx.tolerate(res)?;
        }
        for drug in &gene.drugs {
            let res = link_drug(ctx, uid, drug);
            ctx.tolerate(res)?;
        }
        for disease in &gene.diseases {
            let res = link_disease(ctx, uid, disease);
            ctx.tolerate(res)?;
        }
        for target in &gene.mirna_targets {
            let pending = PendingReference::origin(MIRNA_TARGET, target.mirna.as_str(), uid)
                .with_attributes(
                    Attrs::new()
                        .with("experiment", target.experiment.as_deref())
                        .with("evidence", target.evidence.as_deref())
                        .with("pubmed", target.pubmed.as_deref())
                        .build(),
                );
            ctx.link_or_defer(pending)?;
        }
        Ok(uid)
    }
}

fn build_transcript(ctx: &mut BuildContext, gene: Uid, transcript: &Transcript) -> Result<()> {
    let name = transcript.name.as_deref().unwrap_or_default();
    let uid = ctx
        .resolve_or_create(&transcript.id, EntityType::Transcript, |uid| {
            Node::new(uid, EntityType::Transcript, &transcript.id, name).with_attributes(
                Attrs::new()
                    .with("biotype", transcript.biotype.as_deref())
                    .with("chromosome", transcript.chromosome.as_deref())
                    .with("start", transcript.start)
                    .with("end", transcript.end)
                    .with("strand", transcript.strand)
                    .with("annotation_flags", list(&transcript.annotation_flags))
                    .build(),
            )
        })?
        .uid;
    ctx.relate(HAS_TRANSCRIPT, gene, uid, Default::default())?;

    for exon in &transcript.exons {
        // Exons are shared between transcripts; the node is written once.
        let res = ctx.resolve_or_create(&exon.id, EntityType::Exon, |uid| {
            Node::new(uid, EntityType::Exon, &exon.id, &exon.id).with_attributes(
                Attrs::new()
                    .with("chromosome", exon.chromosome.as_deref())
                    .with("start", exon.start)
                    .with("end", exon.end)
                    .with("strand", exon.strand)
                    .with("phase", exon.phase)
                    .with("exon_number", exon.exon_number)
                    .build(),
            )
        });
        if let Some(exon) = ctx.tolerate(res)? {
            ctx.relate(HAS_EXON, uid, exon.uid, Default::default())?;
        }
    }
    for xref in &transcript.xrefs {
        let res = link_xref(ctx, uid, EntityType::Transcript, xref);
        ctx.tolerate(res)?;
    }
    if let Some(protein) = transcript.protein_id.as_deref() {
        ctx.link_or_defer(PendingReference::dest(TRANSCRIPT_PROTEIN, uid, protein))?;
    }
    Ok(())
}

fn link_drug(ctx: &mut BuildContext, gene: Uid, drug: &DrugInteraction) -> Result<()> {
    let drug_uid = ctx
        .resolve_or_create(drug.key(), EntityType::Drug, |uid| {
            Node::new(uid, EntityType::Drug, drug.key(), &drug.name).with_attributes(
                Attrs::new()
                    .with("source", drug.source.as_deref())
                    .with("chembl_id", drug.chembl_id.as_deref())
                    .build(),
            )
        })?
        .uid;
    ctx.relate(
        GENE_DRUG,
        gene,
        drug_uid,
        Attrs::new()
            .with("interaction_type", drug.interaction_type.as_deref())
            .with("source", drug.source.as_deref())
            .build(),
    )?;
    Ok(())
}

fn link_disease(ctx: &mut BuildContext, gene: Uid, disease: &DiseaseAssociation) -> Result<()> {
    let name = disease.name.as_deref().unwrap_or_default();
    let disease_uid = ctx
        .resolve_or_create(&disease.id, EntityType::Disease, |uid| {
            Node::new(uid, EntityType::Disease, &disease.id, name).with_attributes(
                Attrs::new()
                    .with("source", disease.source.as_deref())
                    .build(),
            )
        })?
        .uid;
    ctx.relate(
        GENE_DISEASE,
        gene,
        disease_uid,
        Attrs::new()
            .with("score", disease.score.map(AttrValue::Float))
            .with("source", disease.source.as_deref())
            .build(),
    )?;
    Ok(())
}
