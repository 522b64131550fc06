use crate::model::{Attrs, EntityType, Node, RelationKind, Verb};
use crate::source::Variant;
use crate::types::{BuildError, Result, Uid};

use super::{list, BuildContext, EntityBuilder, PendingReference};

const ON_GENE: RelationKind =
    RelationKind::new(Verb::Consequence, EntityType::Variant, EntityType::Gene);
const ON_TRANSCRIPT: RelationKind =
    RelationKind::new(Verb::Consequence, EntityType::Variant, EntityType::Transcript);

/// Annotated variant keyed by `chrom:start:ref:alt`.
#[derive(Debug, Default, Clone, Copy)]
pub struct VariantBuilder;

impl EntityBuilder for VariantBuilder {
    type Source = Variant;
    const ENTITY: EntityType = EntityType::Variant;

    fn build(&self, ctx: &mut BuildContext, variant: &Variant) -> Result<Uid> {
        if variant.chromosome.is_empty() || variant.reference.is_empty() {
            return Err(BuildError::source_record(
                variant.key(),
                "variant without chromosome or reference allele",
            ));
        }
        let key = variant.key();
        let uid = ctx
            .resolve_or_create(&key, EntityType::Variant, |uid| {
                Node::new(uid, EntityType::Variant, &key, &key).with_attributes(
                    Attrs::new()
                        .with("chromosome", Some(variant.chromosome.as_str()))
                        .with("start", Some(variant.start))
                        .with("reference", Some(variant.reference.as_str()))
                        .with("alternate", Some(variant.alternate.as_str()))
                        .with("variant_type", variant.variant_type.as_deref())
                        .build(),
                )
            })?
            .uid;

        for consequence in &variant.consequences {
            let attrs = Attrs::new()
                .with("so_terms", list(&consequence.so_terms))
                .build();
            let gene = consequence
                .gene_id
                .as_deref()
                .or(consequence.gene_name.as_deref());
            if let Some(gene) = gene {
                ctx.link_or_defer(
                    PendingReference::dest(ON_GENE, uid, gene).with_attributes(attrs.clone()),
                )?;
            }
            if let Some(transcript) = consequence.transcript_id.as_deref() {
                ctx.link_or_defer(
                    PendingReference::dest(ON_TRANSCRIPT, uid, transcript).with_attributes(attrs),
                )?;
            }
        }
        Ok(uid)
    }
}
