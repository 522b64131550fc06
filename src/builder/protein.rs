use crate::model::{Attrs, EntityType, Node, RelationKind, Verb};
use crate::source::Protein;
use crate::types::{Result, Uid};

use super::{link_xref, list, BuildContext, EntityBuilder, PendingReference};

const ENCODES: RelationKind =
    RelationKind::new(Verb::Encodes, EntityType::Gene, EntityType::Protein);

/// UniProt entry keyed by accession; entry name and xref ids become aliases.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProteinBuilder;

impl EntityBuilder for ProteinBuilder {
    type Source = Protein;
    const ENTITY: EntityType = EntityType::Protein;

    fn build(&self, ctx: &mut BuildContext, protein: &Protein) -> Result<Uid> {
        let name = protein.name.as_deref().unwrap_or_default();
        let uid = ctx
            .resolve_or_create(&protein.accession, EntityType::Protein, |uid| {
                Node::new(uid, EntityType::Protein, &protein.accession, name).with_attributes(
                    Attrs::new()
                        .with("full_name", protein.full_name.as_deref())
                        .with("gene_names", list(&protein.gene_names))
                        .with("keywords", list(&protein.keywords))
                        .with("organism", protein.organism.as_deref())
                        .build(),
                )
            })?
            .uid;
        ctx.bind_alias(name, EntityType::Protein, uid)?;

        for xref in &protein.xrefs {
            ctx.bind_alias(&xref.id, EntityType::Protein, uid)?;
            let res = link_xref(ctx, uid, EntityType::Protein, xref);
            ctx.tolerate(res)?;
        }
        for gene in &protein.gene_names {
            ctx.link_or_defer(PendingReference::origin(ENCODES, gene.as_str(), uid))?;
        }
        Ok(uid)
    }
}
