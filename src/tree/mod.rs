//! Dynamic call-tree reconstructor (§4.5): turns each timer's `parent[]`/`parent_count[]`
//! records into `children[]` arrays, guaranteeing the result is acyclic regardless of
//! policy (§8 P4).


use std::collections::VecDeque;

use crate::config::PrintMethod;
use crate::error::Error;
use crate::store::ROOT_ID;
use crate::timer::{Timer, TimerId};

/// Chooses, among a timer's recorded parents, the one (or all) edges to link under the
/// given policy (§4.5).
fn chosen_parents(timer: &Timer, policy: PrintMethod) -> Vec<TimerId> {
    if timer.parent.is_empty() {
        return Vec::new();
    }
    match policy {
        PrintMethod::FirstParent => vec![timer.parent[0]],
        PrintMethod::LastParent => vec![*timer.parent.last().unwrap()],
        PrintMethod::MostFrequent => {
            let mut best = 0usize;
            for i in 1..timer.parent.len() {
                if timer.parent_count[i] > timer.parent_count[best] {
                    best = i;
                }
            }
            vec![timer.parent[best]]
        }
        PrintMethod::FullTree => timer.parent.clone(),
    }
}

/// Breadth-first search through the partially built `children` arrays: is `needle`
/// reachable from `start`? Used to reject an edge `parent -> child` when `parent` is
/// already a descendant of `child` (which would close a loop).
fn is_reachable(arena: &[Timer], start: TimerId, needle: TimerId) -> bool {
    let mut seen = vec![false; arena.len()];
    let mut queue = VecDeque::new();
    queue.push_back(start);
    seen[start] = true;
    while let Some(cur) = queue.pop_front() {
        if cur == needle {
            return true;
        }
        for &child in &arena[cur].children {
            if !seen[child] {
                seen[child] = true;
                queue.push_back(child);
            }
        }
    }
    false
}

/// Builds `children[]` for every timer in `arena`, in place, for one thread, under
/// `policy`. Dropped (loop-forming) edges are returned for the caller to log.
pub fn build_tree(arena: &mut [Timer], policy: PrintMethod) -> Vec<Error> {
    for t in arena.iter_mut() {
        t.children.clear();
    }

    let mut dropped = Vec::new();
    for child_id in 0..arena.len() {
        if child_id == ROOT_ID {
            continue;
        }
        let parents = chosen_parents(&arena[child_id], policy);
        for parent_id in parents {
            // parent -> child would loop iff parent is already reachable from child.
            if is_reachable(arena, child_id, parent_id) {
                dropped.push(Error::LoopDetected {
                    parent: arena[parent_id].name.to_string(),
                    child: arena[child_id].name.to_string(),
                });
                continue;
            }
            if !arena[parent_id].children.contains(&child_id) {
                arena[parent_id].children.push(child_id);
            }
        }
    }
    dropped
}

/// Maximum indentation depth for printing, computed after linking by a recursive max
/// over children (§4.5). Memoized per timer (its height is path-independent since the
/// tree builder guarantees acyclicity), so a timer shared under many parents in
/// `full_tree` mode is still only ever walked once.
pub fn max_depth(arena: &[Timer], root: TimerId) -> usize {
    fn height(arena: &[Timer], id: TimerId, memo: &mut Vec<Option<usize>>) -> usize {
        if let Some(h) = memo[id] {
            return h;
        }
        let h = arena[id]
            .children
            .iter()
            .map(|&c| 1 + height(arena, c, memo))
            .max()
            .unwrap_or(0);
        memo[id] = Some(h);
        h
    }
    let mut memo = vec![None; arena.len()];
    height(arena, root, &mut memo)
}
