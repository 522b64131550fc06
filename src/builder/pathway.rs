use crate::model::{AttributeMap, Attrs, EntityType, Node, RelationKind, Verb};
use crate::source::{ElementKind, ElementRef, OntologyElement};
use crate::types::{BuildError, Result, Uid};

use super::{link_xref, list, BuildContext, EntityBuilder, PendingReference};

const DNA_GENE: RelationKind = RelationKind::new(Verb::Is, EntityType::Dna, EntityType::Gene);
const RNA_MIRNA: RelationKind = RelationKind::new(Verb::Is, EntityType::Rna, EntityType::Mirna);

/// Pathway-ontology elements, built in two passes.
///
/// [`EntityBuilder::build`] is the index pass: one node per element keyed by
/// `(element id, type)`. Protein elements reuse the PROTEIN node of the
/// accession they reference and bind the element id as an alias, so the
/// UniProt records must be built before this pass.
/// [`PathwayBuilder::link`] is the second pass, run once every element of
/// the feed has an identity, and writes the structural relations.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathwayBuilder;

impl EntityBuilder for PathwayBuilder {
    type Source = OntologyElement;
    const ENTITY: EntityType = EntityType::Pathway;

    fn build(&self, ctx: &mut BuildContext, el: &OntologyElement) -> Result<Uid> {
        let ty = el.kind.entity_type();
        let name = el.name.as_deref().unwrap_or_default();
        if el.kind == ElementKind::Protein {
            if let Some(accession) = el.entity_reference.as_deref().filter(|a| !a.is_empty()) {
                let uid = ctx
                    .resolve_or_create(accession, EntityType::Protein, |uid| {
                        Node::new(uid, EntityType::Protein, accession, name)
                    })?
                    .uid;
                if el.id.is_empty() {
                    return Err(BuildError::source_record(accession, "protein element without id"));
                }
                ctx.bind_alias(&el.id, EntityType::Protein, uid)?;
                return Ok(uid);
            }
        }
        let resolved = ctx.resolve_or_create(&el.id, ty, |uid| {
            Node::new(uid, ty, &el.id, name).with_attributes(element_attributes(el))
        })?;
        Ok(resolved.uid)
    }
}

fn element_attributes(el: &OntologyElement) -> AttributeMap {
    let attrs = Attrs::new().with("alt_names", list(&el.alt_names));
    match el.kind {
        ElementKind::Pathway => attrs.with("source", el.source.as_deref()),
        ElementKind::Reaction => attrs.with("direction", el.direction.as_deref()),
        ElementKind::SmallMolecule => attrs.with("formula", el.formula.as_deref()),
        _ => attrs,
    }
    .build()
}

impl PathwayBuilder {
    /// Second pass: relations between indexed elements.
    ///
    /// A reference to an element missing from the feed is reported as a
    /// recoverable error for that reference alone; the remaining references
    /// of the element are still written.
    pub fn link(&self, ctx: &mut BuildContext, el: &OntologyElement) -> Result<()> {
        let ty = el.kind.entity_type();
        let uid = match ctx.resolve(&el.id, ty)? {
            Some(uid) => uid,
            None => {
                return Err(BuildError::source_record(
                    el.id.as_str(),
                    "element was not indexed in the first pass",
                ))
            }
        };

        for member in &el.components {
            let res = link_ref(ctx, uid, el, member, |member_ty| {
                (RelationKind::new(Verb::Component, ty, member_ty), false)
            });
            ctx.tolerate(res)?;
        }
        for input in &el.inputs {
            let res = link_ref(ctx, uid, el, input, |input_ty| {
                (RelationKind::new(Verb::Input, ty, input_ty), false)
            });
            ctx.tolerate(res)?;
        }
        for output in &el.outputs {
            let res = link_ref(ctx, uid, el, output, |output_ty| {
                (RelationKind::new(Verb::Output, ty, output_ty), false)
            });
            ctx.tolerate(res)?;
        }
        for controller in &el.controllers {
            let res = link_ref(ctx, uid, el, controller, |ctrl_ty| {
                (RelationKind::new(Verb::Controls, ctrl_ty, ty), true)
            });
            ctx.tolerate(res)?;
        }
        for xref in &el.xrefs {
            let res = link_xref(ctx, uid, ty, xref);
            ctx.tolerate(res)?;
        }
        if let Some(location) = el.cellular_location.as_deref().filter(|l| !l.is_empty()) {
            let loc = ctx
                .resolve_or_create(location, EntityType::CellularLocation, |uid| {
                    Node::new(uid, EntityType::CellularLocation, location, location)
                })?
                .uid;
            ctx.relate(
                RelationKind::new(Verb::Location, ty, EntityType::CellularLocation),
                uid,
                loc,
                AttributeMap::new(),
            )?;
        }
        match (el.kind, el.entity_reference.as_deref()) {
            (ElementKind::Dna, Some(gene)) => {
                ctx.link_or_defer(PendingReference::dest(DNA_GENE, uid, gene))?;
            }
            (ElementKind::Rna, Some(mirna)) => {
                ctx.link_or_defer(PendingReference::dest(RNA_MIRNA, uid, mirna))?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Links `el` (identity `el_uid`) to the element named by `target`.
/// `kind_for` receives the target's type and returns the relation kind plus
/// whether the target is the relation's start node.
fn link_ref<F>(
    ctx: &mut BuildContext,
    el_uid: Uid,
    el: &OntologyElement,
    target: &ElementRef,
    kind_for: F,
) -> Result<()>
where
    F: FnOnce(EntityType) -> (RelationKind, bool),
{
    let target_ty = target.kind.entity_type();
    let Some(target_uid) = ctx.resolve(&target.id, target_ty)? else {
        return Err(BuildError::source_record(
            target.id.as_str(),
            format!("{target_ty} referenced by {} '{}' never appears", el.kind.entity_type(), el.id),
        ));
    };
    let (kind, target_is_origin) = kind_for(target_ty);
    let (origin, dest) = if target_is_origin {
        (target_uid, el_uid)
    } else {
        (el_uid, target_uid)
    };
    ctx.relate(kind, origin, dest, AttributeMap::new())?;
    Ok(())
}
