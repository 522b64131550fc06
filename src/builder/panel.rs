use crate::model::{Attrs, EntityType, Node, RelationKind, Verb};
use crate::source::Panel;
use crate::types::{Result, Uid};

use super::{list, BuildContext, EntityBuilder, PendingReference};

const HAS_GENE: RelationKind = RelationKind::new(Verb::Has, EntityType::Panel, EntityType::Gene);

/// Gene panel; listed genes are linked by symbol or Ensembl id.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanelBuilder;

impl EntityBuilder for PanelBuilder {
    type Source = Panel;
    const ENTITY: EntityType = EntityType::Panel;

    fn build(&self, ctx: &mut BuildContext, panel: &Panel) -> Result<Uid> {
        let name = panel.name.as_deref().unwrap_or_default();
        let uid = ctx
            .resolve_or_create(&panel.id, EntityType::Panel, |uid| {
                Node::new(uid, EntityType::Panel, &panel.id, name).with_attributes(
                    Attrs::new()
                        .with("source", panel.source.as_deref())
                        .with("version", panel.version.as_deref())
                        .with("disease_group", panel.disease_group.as_deref())
                        .with("phenotypes", list(&panel.phenotypes))
                        .build(),
                )
            })?
            .uid;
        for entry in &panel.genes {
            let pending = PendingReference::dest(HAS_GENE, uid, entry.gene.as_str()).with_attributes(
                Attrs::new()
                    .with("confidence", entry.confidence.as_deref())
                    .with("mode_of_inheritance", entry.mode_of_inheritance.as_deref())
                    .build(),
            );
            ctx.link_or_defer(pending)?;
        }
        Ok(uid)
    }
}
