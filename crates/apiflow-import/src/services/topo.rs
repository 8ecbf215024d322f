//! Parent-before-child ordering for id graphs

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use apiflow_core::Id;
use apiflow_import_types::{ImportError, ImportResult};
use tracing::warn;

/// Order `items` so every item comes after its parent
///
/// `link` yields `(id, parent_id)`. Parents that are not in the batch are
/// treated as already stored, so their children are roots. Among items
/// that become ready together the original order is kept.
pub fn toposort<T, F>(items: Vec<T>, label: &str, link: F) -> ImportResult<Vec<T>>
where
    F: Fn(&T) -> (Id, Option<Id>),
{
    let links: Vec<(Id, Option<Id>)> = items.iter().map(&link).collect();
    let order = kahn(&links, label)?;
    Ok(reorder(items, order))
}

/// Like [`toposort`], but a cycle keeps the input order instead of failing
pub fn toposort_or_original<T, F>(items: Vec<T>, label: &str, link: F) -> Vec<T>
where
    F: Fn(&T) -> (Id, Option<Id>),
{
    let links: Vec<(Id, Option<Id>)> = items.iter().map(&link).collect();
    match kahn(&links, label) {
        Ok(order) => reorder(items, order),
        Err(e) => {
            warn!(label, error = %e, "Keeping original order");
            items
        }
    }
}

fn kahn(links: &[(Id, Option<Id>)], label: &str) -> ImportResult<Vec<usize>> {
    let mut index_of: HashMap<Id, usize> = HashMap::with_capacity(links.len());
    for (index, (id, _)) in links.iter().enumerate() {
        index_of.entry(*id).or_insert(index);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); links.len()];
    let mut in_degree = vec![0usize; links.len()];
    for (index, (_, parent)) in links.iter().enumerate() {
        if let Some(parent_index) = parent.and_then(|p| index_of.get(&p).copied()) {
            children[parent_index].push(index);
            in_degree[index] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| Reverse(index))
        .collect();

    let mut order = Vec::with_capacity(links.len());
    while let Some(Reverse(index)) = ready.pop() {
        order.push(index);
        for &child in &children[index] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.push(Reverse(child));
            }
        }
    }

    if order.len() < links.len() {
        let stuck: Vec<String> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree > 0)
            .map(|(index, _)| links[index].0.to_string())
            .collect();
        return Err(ImportError::CycleDetected(format!(
            "{} ({})",
            label,
            stuck.join(", ")
        )));
    }
    Ok(order)
}

fn reorder<T>(items: Vec<T>, order: Vec<usize>) -> Vec<T> {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}
