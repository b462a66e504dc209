/// Hierarchical sort plan generation
///
/// Given an ordered criteria list, partitions the collection into a
/// tree of groups, one level per criterion. The tree holds card
/// handles only and is rebuilt from scratch on every regeneration;
/// nothing here mutates a card.

use crate::state::collection::Collection;
use crate::state::data::{CardId, SortGroup};

use super::criteria::Criterion;
use super::PlanError;

/// Generate the grouping hierarchy for `ids` under `criteria`.
///
/// Top-level groups come back ordered by unsorted count descending
/// (biggest remaining job first); deeper levels keep the order the
/// projection first produced each key. Empty inputs yield an empty
/// plan rather than an error.
pub fn generate(
    collection: &Collection,
    ids: &[CardId],
    criteria: &[Criterion],
) -> Result<Vec<SortGroup>, PlanError> {
    validate(criteria)?;
    if ids.is_empty() || criteria.is_empty() {
        return Ok(Vec::new());
    }

    let mut groups = build_level(collection, ids, criteria);
    // The Name-only breakdown is already alphabetical; re-ordering it
    // by unsorted count would shuffle an index the user reads top to
    // bottom.
    if criteria != [Criterion::Name] {
        groups.sort_by(|a, b| b.unsorted_count.cmp(&a.unsorted_count));
    }
    Ok(groups)
}

/// `generate`, but from persisted criterion names.
/// Unknown names fail with a validation error naming the offender.
pub fn generate_by_names(
    collection: &Collection,
    ids: &[CardId],
    names: &[String],
) -> Result<Vec<SortGroup>, PlanError> {
    let criteria = names
        .iter()
        .map(|n| Criterion::from_name(n))
        .collect::<Result<Vec<_>, _>>()?;
    generate(collection, ids, &criteria)
}

/// Reject duplicate criteria before any partitioning happens.
pub fn validate(criteria: &[Criterion]) -> Result<(), PlanError> {
    for (i, criterion) in criteria.iter().enumerate() {
        if criteria[..i].contains(criterion) {
            return Err(PlanError::DuplicateCriterion(*criterion));
        }
    }
    Ok(())
}

/// Build one level of the hierarchy and recurse into the remainder.
fn build_level(collection: &Collection, ids: &[CardId], criteria: &[Criterion]) -> Vec<SortGroup> {
    debug_assert!(!criteria.is_empty());

    // One leaf per card when only Name remains: at that depth the
    // sorter wants an alphabetical checklist, not buckets.
    if criteria == [Criterion::Name] {
        return name_breakdown(collection, ids);
    }

    let criterion = criteria[0];
    let mut order: Vec<String> = Vec::new();
    let mut buckets: std::collections::HashMap<String, Vec<CardId>> =
        std::collections::HashMap::new();

    for &id in ids {
        let key = criterion.group_key(collection.card(id));
        buckets
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(id);
    }

    order
        .into_iter()
        .map(|name| {
            let members = buckets.remove(&name).unwrap_or_default();
            let mut group = SortGroup::from_members(name, members, collection.cards());
            if criteria.len() > 1 {
                group.children = build_level(collection, &group.cards, &criteria[1..]);
            }
            group
        })
        .collect()
}

/// One alphabetically-sorted leaf group per card.
fn name_breakdown(collection: &Collection, ids: &[CardId]) -> Vec<SortGroup> {
    let mut leaves: Vec<SortGroup> = ids
        .iter()
        .map(|&id| {
            let name = Criterion::Name.group_key(collection.card(id));
            let mut leaf = SortGroup::from_members(name, vec![id], collection.cards());
            leaf.is_card_leaf = true;
            leaf
        })
        .collect();
    leaves.sort_by(|a, b| a.group_name.cmp(&b.group_name));
    leaves
}

/// Walk the tree by successive group-name matches and return the cards
/// at that position. An empty path yields every top-level card; a path
/// that no longer matches (the tree may have been regenerated since it
/// was captured) yields an empty list, not an error.
pub fn get_cards_at_path(groups: &[SortGroup], path: &[String]) -> Vec<CardId> {
    if path.is_empty() {
        return groups.iter().flat_map(|g| g.cards.iter().copied()).collect();
    }

    let mut current = groups;
    for (depth, segment) in path.iter().enumerate() {
        let Some(found) = current.iter().find(|g| &g.group_name == segment) else {
            return Vec::new();
        };
        if depth == path.len() - 1 {
            return found.cards.clone();
        }
        current = &found.children;
    }
    Vec::new()
}

/// The sub-groups at a path, for level-by-level navigation.
/// Empty path returns the top level; stale paths return nothing.
pub fn groups_at_path<'a>(groups: &'a [SortGroup], path: &[String]) -> &'a [SortGroup] {
    let mut current = groups;
    for segment in path {
        let Some(found) = current.iter().find(|g| &g.group_name == segment) else {
            return &[];
        };
        current = &found.children;
    }
    current
}
