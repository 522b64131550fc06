use crate::model::{Attrs, EntityType, Node, RelationKind, Verb};
use crate::source::{MatureMirna, Mirna};
use crate::types::{Result, Uid};

use super::{BuildContext, EntityBuilder};

const HAS_MATURE: RelationKind =
    RelationKind::new(Verb::Has, EntityType::Mirna, EntityType::MirnaMature);

/// Precursor miRNA and its mature products.
///
/// Target annotations usually name the mature product, so mature names and
/// accessions are also bound as aliases of the precursor in the MIRNA space.
#[derive(Debug, Default, Clone, Copy)]
pub struct MirnaBuilder;

impl EntityBuilder for MirnaBuilder {
    type Source = Mirna;
    const ENTITY: EntityType = EntityType::Mirna;

    fn build(&self, ctx: &mut BuildContext, mirna: &Mirna) -> Result<Uid> {
        let name = mirna.name.as_deref().unwrap_or_default();
        let uid = ctx
            .resolve_or_create(&mirna.accession, EntityType::Mirna, |uid| {
                Node::new(uid, EntityType::Mirna, &mirna.accession, name).with_attributes(
                    Attrs::new()
                        .with("sequence", mirna.sequence.as_deref())
                        .with("status", mirna.status.as_deref())
                        .build(),
                )
            })?
            .uid;
        ctx.bind_alias(name, EntityType::Mirna, uid)?;

        for mature in &mirna.matures {
            let res = build_mature(ctx, uid, mature);
            ctx.tolerate(res)?;
        }
        Ok(uid)
    }
}

fn build_mature(ctx: &mut BuildContext, precursor: Uid, mature: &MatureMirna) -> Result<()> {
    let name = mature.name.as_deref().unwrap_or_default();
    let mature_uid = ctx
        .resolve_or_create(&mature.accession, EntityType::MirnaMature, |uid| {
            Node::new(uid, EntityType::MirnaMature, &mature.accession, name).with_attributes(
                Attrs::new()
                    .with("sequence", mature.sequence.as_deref())
                    .with("start", mature.start)
                    .with("end", mature.end)
                    .build(),
            )
        })?
        .uid;
    ctx.relate(HAS_MATURE, precursor, mature_uid, Default::default())?;
    ctx.bind_alias(&mature.accession, EntityType::Mirna, precursor)?;
    ctx.bind_alias(name, EntityType::Mirna, precursor)?;
    Ok(())
}
