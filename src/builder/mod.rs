#![forbid(unsafe_code)]

//! Entity builders.
//!
//! Every builder follows one pattern: derive the canonical key, call
//! [`BuildContext::resolve_or_create`], then walk nested objects, writing
//! relations from the already-known parent identity to each child. A
//! reference to an entity owned by another feed goes through
//! [`BuildContext::link_or_defer`].

use crate::model::{Attrs, EntityType, Node, RelationKind, Verb};
use crate::source::Xref;
use crate::types::{Result, Uid};

/// Build state.
pub mod context;
/// Deferred reference queue.
pub mod deferred;
mod gene;
mod mirna;
mod panel;
mod pathway;
mod protein;
mod variant;

pub use context::{BuildContext, Counters, FinishedBuild};
pub use deferred::{DeferredQueue, DeferredReport, PendingReference, PendingSide};
pub use gene::GeneBuilder;
pub use mirna::MirnaBuilder;
pub use panel::PanelBuilder;
pub use pathway::PathwayBuilder;
pub use protein::ProteinBuilder;
pub use variant::VariantBuilder;

/// Turns one parsed domain object into node and relation lines.
pub trait EntityBuilder {
    /// Domain object consumed.
    type Source;

    /// Node type of the object itself.
    const ENTITY: EntityType;

    /// Builds the object and its nested children; returns the object's identity.
    fn build(&self, ctx: &mut BuildContext, source: &Self::Source) -> Result<Uid>;
}

/// Creates (or reuses) the XREF node for `xref` and links `owner` to it.
pub(crate) fn link_xref(
    ctx: &mut BuildContext,
    owner: Uid,
    owner_type: EntityType,
    xref: &Xref,
) -> Result<Uid> {
    let key = format!("{}:{}", xref.db, xref.id);
    let resolved = ctx.resolve_or_create(&key, EntityType::Xref, |uid| {
        Node::new(uid, EntityType::Xref, &xref.id, &xref.id).with_attributes(
            Attrs::new()
                .with("db_name", Some(xref.db.as_str()))
                .with("description", xref.description.as_deref())
                .build(),
        )
    })?;
    ctx.relate(
        RelationKind::new(Verb::Xref, owner_type, EntityType::Xref),
        owner,
        resolved.uid,
        Default::default(),
    )?;
    Ok(resolved.uid)
}

pub(crate) fn list(items: &[String]) -> Option<Vec<String>> {
    (!items.is_empty()).then(|| items.to_vec())
}
