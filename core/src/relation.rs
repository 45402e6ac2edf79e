//! Eager loading of related records.
//!
//! Preload paths are merged into a tree, validated against the registry
//! before the base fetch, then resolved node by node. Each node costs one
//! batched fetch (two for many-to-many) whatever the number of owners.

use compact_str::CompactString;
use hashbrown::{HashMap, HashSet};

use crate::backend::Backend;
use crate::error::{QuarryError, Result};
use crate::executor::Quarry;
use crate::quarry_trace_preload;
use crate::query::compile;
use crate::record::{Record, Related};
use crate::schema::{RecordType, RelationDef, RelationKind, Registry};
use crate::value::{Key, Value};

/// One relation to load, and what to load beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PreloadNode {
    relation: CompactString,
    children: Vec<PreloadNode>,
}

/// Builds the preload tree for `root`, failing on the first segment that
/// names no relation or whose target is not registered.
pub(crate) fn plan(
    registry: &Registry,
    root: &RecordType,
    paths: &[CompactString],
) -> Result<Vec<PreloadNode>> {
    let mut nodes: Vec<PreloadNode> = Vec::new();
    for path in paths {
        let mut level = &mut nodes;
        let mut owner = root;
        for segment in path.split('.') {
            let relation = owner
                .relation_def(segment)
                .ok_or_else(|| QuarryError::unknown_relation(owner.name(), segment))?;
            let target = registry.describe(&relation.target)?;
            check_keys(owner, relation, target)?;

            let index = match level.iter().position(|node| node.relation == segment) {
                Some(index) => index,
                None => {
                    level.push(PreloadNode {
                        relation: segment.into(),
                        children: Vec::new(),
                    });
                    level.len() - 1
                }
            };
            level = &mut level[index].children;
            owner = target;
        }
    }
    Ok(nodes)
}

fn check_keys(owner: &RecordType, relation: &RelationDef, target: &RecordType) -> Result<()> {
    match &relation.kind {
        RelationKind::HasOne | RelationKind::HasMany => {
            target.require_field(&relation.foreign_key)?;
        }
        RelationKind::BelongsTo => {
            owner.require_field(&relation.foreign_key)?;
        }
        RelationKind::ManyToMany(_) => {}
    }
    Ok(())
}

/// Loads and attaches every node of `plan` onto `owners`.
pub(crate) fn resolve<B: Backend>(
    db: &Quarry<B>,
    owner_ty: &RecordType,
    plan: &[PreloadNode],
    owners: &mut [Record],
) -> Result<()> {
    for node in plan {
        // `plan` already validated every segment.
        let relation = owner_ty.relation_def(&node.relation).ok_or_else(|| {
            QuarryError::unknown_relation(owner_ty.name(), node.relation.as_str())
        })?;
        let target = db.registry().describe(&relation.target)?;

        let fetched = match &relation.kind {
            RelationKind::HasOne | RelationKind::HasMany => {
                load_has(db, owner_ty, relation, target, node, owners)?
            }
            RelationKind::BelongsTo => {
                load_belongs_to(db, owner_ty, relation, target, node, owners)?
            }
            RelationKind::ManyToMany(_) => {
                load_many_to_many(db, owner_ty, relation, target, node, owners)?
            }
        };
        quarry_trace_preload!(owner_ty.name(), relation.name, owners.len(), fetched);
        #[cfg(not(feature = "tracing"))]
        let _ = fetched;
    }
    Ok(())
}

/// Distinct non-null keys read from `field` of each owner, in first-seen order.
fn distinct_keys(owners: &[Record], field: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    owners
        .iter()
        .filter_map(|owner| owner.value(field)?.key())
        .filter(|key| seen.insert(key.clone()))
        .map(Value::from)
        .collect()
}

/// Fetches `target` rows whose `column` is one of `keys`, with nested
/// preloads already resolved on them.
fn fetch_children<B: Backend>(
    db: &Quarry<B>,
    target: &RecordType,
    column: &str,
    keys: Vec<Value>,
    node: &PreloadNode,
) -> Result<Vec<Record>> {
    let statement = compile::select_in(target, column, keys, db.dialect());
    let mut children = db.materialize(target, db.fetch(&statement)?)?;
    resolve(db, target, &node.children, &mut children)?;
    Ok(children)
}

fn group_by(children: Vec<Record>, field: &str) -> HashMap<Key, Vec<Record>> {
    let mut groups: HashMap<Key, Vec<Record>> = HashMap::new();
    for child in children {
        if let Some(key) = child.value(field).and_then(Value::key) {
            groups.entry(key).or_default().push(child);
        }
    }
    groups
}

/// has-one / has-many: the foreign key lives on the target.
fn load_has<B: Backend>(
    db: &Quarry<B>,
    owner_ty: &RecordType,
    relation: &RelationDef,
    target: &RecordType,
    node: &PreloadNode,
    owners: &mut [Record],
) -> Result<usize> {
    let pk = owner_ty.primary_key_field();
    let keys = distinct_keys(owners, pk);
    if keys.is_empty() {
        return Ok(0);
    }
    let foreign_key = target.require_field(&relation.foreign_key)?;
    let children = fetch_children(db, target, &foreign_key.column, keys, node)?;
    let fetched = children.len();
    let groups = group_by(children, &foreign_key.name);

    for owner in owners.iter_mut() {
        let Some(key) = owner.value(pk).and_then(Value::key) else {
            continue;
        };
        let group = groups.get(&key);
        let related = match relation.kind {
            RelationKind::HasOne => {
                Related::One(group.and_then(|g| g.first()).cloned().map(Box::new))
            }
            _ => Related::Many(group.cloned().unwrap_or_default()),
        };
        owner.attach(&relation.name, related);
    }
    Ok(fetched)
}

/// belongs-to: the foreign key lives on the owner.
fn load_belongs_to<B: Backend>(
    db: &Quarry<B>,
    owner_ty: &RecordType,
    relation: &RelationDef,
    target: &RecordType,
    node: &PreloadNode,
    owners: &mut [Record],
) -> Result<usize> {
    let foreign_key = owner_ty.require_field(&relation.foreign_key)?.name.clone();
    let keys = distinct_keys(owners, &foreign_key);
    let children = if keys.is_empty() {
        Vec::new()
    } else {
        fetch_children(db, target, target.primary_key_column(), keys, node)?
    };
    let fetched = children.len();
    let by_key = group_by(children, target.primary_key_field());

    for owner in owners.iter_mut() {
        if !owner.is_set(&foreign_key) {
            continue;
        }
        let parent = owner
            .value(&foreign_key)
            .and_then(Value::key)
            .and_then(|key| by_key.get(&key))
            .and_then(|group| group.first())
            .cloned()
            .map(Box::new);
        owner.attach(&relation.name, Related::One(parent));
    }
    Ok(fetched)
}

/// many-to-many: one fetch over the link table, one over the targets.
fn load_many_to_many<B: Backend>(
    db: &Quarry<B>,
    owner_ty: &RecordType,
    relation: &RelationDef,
    target: &RecordType,
    node: &PreloadNode,
    owners: &mut [Record],
) -> Result<usize> {
    let RelationKind::ManyToMany(join) = &relation.kind else {
        return Ok(0);
    };
    let pk = owner_ty.primary_key_field();
    let keys = distinct_keys(owners, pk);
    if keys.is_empty() {
        return Ok(0);
    }

    let statement = compile::link_rows(
        &join.table,
        &join.owner_column,
        &join.target_column,
        keys,
        db.dialect(),
    );
    let mut links: HashMap<Key, Vec<Key>> = HashMap::new();
    let mut target_keys = Vec::new();
    let mut seen = HashSet::new();
    for row in db.fetch(&statement)?.rows {
        let mut values = row.into_iter();
        let (Some(owner_key), Some(target_key)) = (
            values.next().as_ref().and_then(Value::key),
            values.next().as_ref().and_then(Value::key),
        ) else {
            continue;
        };
        if seen.insert(target_key.clone()) {
            target_keys.push(Value::from(target_key.clone()));
        }
        links.entry(owner_key).or_default().push(target_key);
    }

    let children = if target_keys.is_empty() {
        Vec::new()
    } else {
        fetch_children(db, target, target.primary_key_column(), target_keys, node)?
    };
    let fetched = children.len();
    let by_key = group_by(children, target.primary_key_field());

    for owner in owners.iter_mut() {
        let Some(key) = owner.value(pk).and_then(Value::key) else {
            continue;
        };
        let related: Vec<Record> = links
            .get(&key)
            .into_iter()
            .flatten()
            .filter_map(|target_key| by_key.get(target_key)?.first().cloned())
            .collect();
        owner.attach(&relation.name, Related::Many(related));
    }
    Ok(fetched)
}
