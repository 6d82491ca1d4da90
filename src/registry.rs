//! Thread registry (§4.2): maps a calling OS thread to a dense logical index in
//! `[0, maxthreads)`.

#[cfg(test)]
mod test;

use std::cell::RefCell;
use std::sync::Mutex;

use crate::config::ThreadingModel;
use crate::error::{Error, Result};

thread_local! {
    /// Caches this thread's already-resolved index into one or more `SelfManaged`
    /// registries, keyed by the registry's address (an embedder can run more than one
    /// `Context` per process). Populated once per (thread, registry) pair so only the
    /// first `start`/`stop` from a given thread ever takes `SelfManaged::known`'s mutex
    /// (§4.2/§5: "critical region is entered only on the first call from each thread").
    static SELF_MANAGED_CACHE: RefCell<Vec<(usize, usize)>> = const { RefCell::new(Vec::new()) };
}

fn native_thread_id() -> u64 {
    // `ThreadId` doesn't expose its bits directly; hash it so two calls from the same
    // OS thread always compare equal without caring about the platform representation.
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    hasher.finish()
}

/// Maps OS threads to dense `[0, maxthreads)` indices under one of the two regimes
/// described in §4.2.
pub enum ThreadRegistry {
    /// The runtime hands us an index directly; we only validate and lazily note the
    /// high-water mark of distinct indices seen.
    ForkJoin {
        maxthreads: usize,
        nthreads: Mutex<usize>,
    },
    /// Threads are discovered by native id on first call, under a mutex entered only
    /// once per thread's lifetime (§5: "one mutex acquired only on a thread's first call").
    SelfManaged {
        maxthreads: usize,
        known: Mutex<Vec<u64>>,
    },
}

impl ThreadRegistry {
    /// `maxthreads` is the [`crate::config::Config::maxthreads`] override; the fork-join
    /// regime ignores it in favor of the count its own runtime already committed to via
    /// `ThreadingModel::ForkJoin`'s `hint_maxthreads`.
    pub fn new(model: ThreadingModel, maxthreads: usize) -> ThreadRegistry {
        match model {
            ThreadingModel::ForkJoin { hint_maxthreads } => ThreadRegistry::ForkJoin {
                maxthreads: hint_maxthreads,
                nthreads: Mutex::new(0),
            },
            ThreadingModel::SelfManaged => ThreadRegistry::SelfManaged {
                maxthreads,
                known: Mutex::new(Vec::new()),
            },
        }
    }

    pub fn maxthreads(&self) -> usize {
        match self {
            ThreadRegistry::ForkJoin { maxthreads, .. } => *maxthreads,
            ThreadRegistry::SelfManaged { maxthreads, .. } => *maxthreads,
        }
    }

    /// Observed high-water mark of distinct thread indices (monotonically grows).
    pub fn nthreads(&self) -> usize {
        match self {
            ThreadRegistry::ForkJoin { nthreads, .. } => *nthreads.lock().unwrap(),
            ThreadRegistry::SelfManaged { known, .. } => known.lock().unwrap().len(),
        }
    }

    /// Resolves (and, in the self-managed regime, registers) the calling thread's index.
    pub fn thread_index(&self, fork_join_hint: Option<usize>) -> Result<usize> {
        match self {
            ThreadRegistry::ForkJoin { maxthreads, nthreads } => {
                let idx = fork_join_hint.ok_or(Error::OutOfRange {
                    what: "thread index",
                    value: -1,
                    expected: "a fork-join runtime index (none supplied)",
                })?;
                if idx >= *maxthreads {
                    return Err(Error::OutOfRange {
                        what: "thread index",
                        value: idx as i64,
                        expected: "< maxthreads",
                    });
                }
                let mut n = nthreads.lock().unwrap();
                if idx + 1 > *n {
                    *n = idx + 1;
                }
                Ok(idx)
            }
            ThreadRegistry::SelfManaged { maxthreads, known } => {
                let registry_key = self as *const ThreadRegistry as usize;
                if let Some(idx) = SELF_MANAGED_CACHE
                    .with(|cache| cache.borrow().iter().find(|&&(k, _)| k == registry_key).map(|&(_, idx)| idx))
                {
                    return Ok(idx);
                }

                let id = native_thread_id();
                let mut known = known.lock().unwrap();
                // Re-check: another thread may have raced us before we took the lock (it
                // cannot be *this* thread, since only this thread ever appends its own id,
                // and the thread-local cache above already short-circuits repeat calls).
                let idx = if let Some(pos) = known.iter().position(|&k| k == id) {
                    pos
                } else {
                    if known.len() >= *maxthreads {
                        return Err(Error::OutOfRange {
                            what: "thread count",
                            value: known.len() as i64,
                            expected: "< maxthreads",
                        });
                    }
                    known.push(id);
                    known.len() - 1
                };
                drop(known);
                SELF_MANAGED_CACHE.with(|cache| cache.borrow_mut().push((registry_key, idx)));
                Ok(idx)
            }
        }
    }
}
