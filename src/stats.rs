//! Per-thread → per-region statistics aggregator (§4.6): folds every thread's view of a
//! named region into one cross-thread summary.

#[cfg(test)]
mod test;

use std::collections::HashMap;

use crate::store::PerThreadStore;

/// Cross-thread summary for one named region, the aggregator's output and the
/// reporter's flat-section input (§4.8).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegionSummary {
    pub name: String,
    pub totcalls: u64,
    pub wall_accumulated: f64,
    pub wallmax: f64,
    pub wallmax_thread: usize,
    pub wallmin: f64,
    pub wallmin_thread: usize,
}

impl RegionSummary {
    fn fold_thread(&mut self, thread: usize, accum: f64, count: u64) {
        self.totcalls += count;
        self.wall_accumulated += accum;
        // "zero is treated as unset so the first thread's value always wins" (§4.6).
        if self.wallmax == 0.0 || accum > self.wallmax {
            self.wallmax = accum;
            self.wallmax_thread = thread;
        }
        if self.wallmin == 0.0 || accum < self.wallmin {
            self.wallmin = accum;
            self.wallmin_thread = thread;
        }
    }
}

/// Folds every thread's store into one [`RegionSummary`] per distinct region name,
/// ordered by first appearance across threads.
pub fn aggregate(stores: &[PerThreadStore]) -> Vec<RegionSummary> {
    let mut order: Vec<String> = Vec::new();
    let mut by_name: HashMap<String, RegionSummary> = HashMap::new();

    for (thread, store) in stores.iter().enumerate() {
        for timer in store.arena.iter().skip(1) {
            // skip the per-thread ROOT sentinel
            let name = timer.name.as_str();
            if !by_name.contains_key(name) {
                order.push(name.to_string());
                by_name.insert(
                    name.to_string(),
                    RegionSummary {
                        name: name.to_string(),
                        ..Default::default()
                    },
                );
            }
            by_name
                .get_mut(name)
                .unwrap()
                .fold_thread(thread, timer.wall.accumulated, timer.count);
        }
    }

    order
        .into_iter()
        .map(|name| by_name.remove(&name).unwrap())
        .collect()
}
