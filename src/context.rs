//! The embeddable library state (§9's "Singletons → explicit context" design note):
//! everything `initialize()` used to set up as process globals lives in one `Context`
//! value instead, so an application can run more than one independently-configured
//! instrumentation session.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::aux::{AuxPlugin, NullAuxPlugin};
use crate::clock::{self, Clock};
use crate::config::{ClockKind, Config, ThreadingModel};
use crate::error::{Error, Result};
use crate::registry::ThreadRegistry;
use crate::reduce::Communicator;
use crate::store::{PerThreadStore, StartDecision};
use crate::timer::TimerId;
use crate::tree;

thread_local! {
    /// Set once per worker thread via [`Context::bind_thread_index`] in the fork-join
    /// regime, where the runtime (not this crate) owns thread numbering.
    static FORK_JOIN_INDEX: Cell<Option<usize>> = const { Cell::new(None) };
}

/// A by-name timer's resolved id, cached after the first lookup on a given thread
/// (§4.3's handle variant). Threads never share a cached id: a handle read from the
/// "wrong" thread is treated as a cold miss and re-resolved, which is what keeps this
/// safe to pass around without per-thread storage of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimerHandle {
    cached: Option<(usize, TimerId)>,
}

impl TimerHandle {
    pub fn new() -> TimerHandle {
        TimerHandle::default()
    }
}

enum TimerKey<'a> {
    Name(&'a str),
    Address(u64),
}

/// Ties together the clock, thread registry, per-thread stores, and hardware-counter
/// plug-in into the operations §6 exposes (`start`/`stop` and their handle/instrument
/// variants, `enable`/`disable`/`reset`/`stamp`).
pub struct Context {
    config: Config,
    clock: Clock,
    registry: ThreadRegistry,
    stores: Vec<Mutex<PerThreadStore>>,
    enabled: AtomicBool,
    aux: Mutex<Box<dyn AuxPlugin>>,
}

impl Context {
    pub fn new(config: Config) -> Result<Context> {
        Context::with_aux(config, Box::new(NullAuxPlugin))
    }

    /// Same as [`Context::new`], plugging in a hardware-counter collaborator instead of
    /// the no-op default (§9's "Hardware-counter plug-in" design note).
    pub fn with_aux(config: Config, mut aux: Box<dyn AuxPlugin>) -> Result<Context> {
        // Design note (§4.1): an unsupported clock selection falls back to the portable
        // high-resolution POSIX source rather than failing `initialize` outright.
        let clock = Clock::init(config.clock).or_else(|err| {
            log::warn!("requested clock unavailable ({err}); falling back to posix_high_res");
            Clock::init(ClockKind::PosixHighRes)
        })?;

        let registry = ThreadRegistry::new(config.threading, config.maxthreads);
        let maxthreads = registry.maxthreads();
        let stores = (0..maxthreads)
            .map(|_| Mutex::new(PerThreadStore::new(config.tablesize)))
            .collect();

        aux.init(maxthreads);

        Ok(Context {
            config,
            clock,
            registry,
            stores,
            enabled: AtomicBool::new(true),
            aux: Mutex::new(aux),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn nthreads(&self) -> usize {
        self.registry.nthreads()
    }

    /// Number of per-thread slots this context can ever index into (fixed at construction).
    pub fn maxthreads(&self) -> usize {
        self.stores.len()
    }

    /// Registers the calling thread's fork-join index. Must be called once per worker
    /// thread before its first `start`/`stop` when `config.threading` is
    /// [`ThreadingModel::ForkJoin`]; a no-op (but harmless) call under `SelfManaged`.
    pub fn bind_thread_index(&self, idx: usize) {
        FORK_JOIN_INDEX.with(|cell| cell.set(Some(idx)));
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Discards every timer recorded so far on every thread, leaving each store back at
    /// its just-constructed state (sentinel root only).
    pub fn reset(&self) {
        for slot in &self.stores {
            let mut store = slot.lock().unwrap();
            *store = PerThreadStore::new(self.config.tablesize);
        }
    }

    /// A single wall/usr/sys reading, independent of any timer (§6's `stamp`).
    pub fn stamp(&self) -> (f64, f64, f64) {
        let wall = if self.config.wall { self.clock.read() } else { 0.0 };
        let (usr, sys) = if self.config.cpu {
            clock::cpu_stamp()
        } else {
            (0.0, 0.0)
        };
        (wall, usr, sys)
    }

    pub fn start(&self, name: &str) -> Result<()> {
        self.escalate(self.start_key(TimerKey::Name(name)))
    }

    pub fn stop(&self, name: &str) -> Result<()> {
        self.escalate(self.stop_key(TimerKey::Name(name)))
    }

    pub fn start_instr(&self, address: u64) -> Result<()> {
        self.escalate(self.start_key(TimerKey::Address(address)))
    }

    pub fn stop_instr(&self, address: u64) -> Result<()> {
        self.escalate(self.stop_key(TimerKey::Address(address)))
    }

    pub fn start_handle(&self, name: &str, handle: &mut TimerHandle) -> Result<()> {
        self.escalate(self.start_handle_inner(name, handle))
    }

    pub fn stop_handle(&self, name: &str, handle: &mut TimerHandle) -> Result<()> {
        self.escalate(self.stop_handle_inner(name, handle))
    }

    fn start_handle_inner(&self, name: &str, handle: &mut TimerHandle) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let thread = self.current_thread()?;
        let mut store = self.stores[thread].lock().unwrap();
        // Resolution (and populating the handle cache) happens only if `do_start`'s
        // depth-limit gate doesn't suppress the call (§4.3 step order).
        let cached = handle.cached.filter(|&(t, _)| t == thread).map(|(_, id)| id);
        let id = self.do_start(&mut store, |store| cached.unwrap_or_else(|| store.find_or_create_by_name(name)))?;
        if let Some(id) = id {
            handle.cached = Some((thread, id));
        }
        Ok(())
    }

    fn stop_handle_inner(&self, name: &str, handle: &mut TimerHandle) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        // Same ordering as `stop_key`: stamp before thread resolution or lookup.
        let (wall, usr, sys) = self.stamp();
        let thread = self.current_thread()?;
        let mut store = self.stores[thread].lock().unwrap();
        let id = match handle.cached {
            Some((t, id)) if t == thread => id,
            _ => {
                let id = store
                    .find_by_name(name)
                    .ok_or_else(|| Error::TimerNotFound {
                        name: name.to_string(),
                        thread,
                    })?;
                handle.cached = Some((thread, id));
                id
            }
        };
        self.do_stop(&mut store, id, thread, wall, usr, sys)
    }

    /// Converts any `Err` into a logged `process::abort()` when `config.abort_on_error`
    /// is set (§7/§10.2's escalation switch); otherwise passes the result through.
    fn escalate<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(ref err) = result {
            log::error!("{err}");
            if self.config.abort_on_error {
                std::process::abort();
            }
        }
        result
    }

    /// Reconstructs every thread's call tree in place (§4.5) under the configured
    /// policy. Called by the reporter before printing; exposed directly so callers can
    /// inspect `children[]` without going through a report.
    pub fn rebuild_trees(&self) -> Vec<Error> {
        let mut dropped = Vec::new();
        for slot in &self.stores {
            let mut store = slot.lock().unwrap();
            dropped.extend(tree::build_tree(&mut store.arena, self.config.print_method));
        }
        dropped
    }

    /// Runs `f` with a read-only view of every thread's store (for the reporter and the
    /// query API). Held one at a time, not all at once, since callers only ever need one
    /// thread's data per call.
    pub(crate) fn with_store<R>(&self, thread: usize, f: impl FnOnce(&PerThreadStore) -> R) -> Result<R> {
        let store = self
            .stores
            .get(thread)
            .ok_or(Error::OutOfRange {
                what: "thread index",
                value: thread as i64,
                expected: "< maxthreads",
            })?
            .lock()
            .unwrap();
        Ok(f(&store))
    }

    pub(crate) fn snapshot_stores(&self) -> Vec<PerThreadStore> {
        self.stores
            .iter()
            .take(self.nthreads().max(1))
            .map(|slot| slot.lock().unwrap().clone())
            .collect()
    }

    pub(crate) fn aux(&self) -> &Mutex<Box<dyn AuxPlugin>> {
        &self.aux
    }

    /// Runs the distributed reduction over this context's aggregated per-region
    /// summaries (§4.6, §4.7), returning the locally-resident result of the log-N tree
    /// reduction (only rank 0's is the fully-merged one).
    pub fn reduce_summary(
        &self,
        comm: &mut dyn Communicator,
    ) -> Result<Vec<crate::reduce::GlobalRegion>> {
        let stores = self.snapshot_stores();
        let summaries = crate::stats::aggregate(&stores);
        let rank = comm.rank();
        let regions = summaries
            .iter()
            .map(|s| crate::reduce::GlobalRegion::from_rank_summary(rank, s))
            .collect();
        crate::reduce::reduce_summary(comm, regions)
    }

    /// Resolves the calling thread's dense index (§4.2): the fork-join hint bound via
    /// [`Context::bind_thread_index`], or a self-managed lookup/registration by native id.
    pub fn current_thread(&self) -> Result<usize> {
        let hint = match self.config.threading {
            ThreadingModel::ForkJoin { .. } => FORK_JOIN_INDEX.with(|cell| cell.get()),
            ThreadingModel::SelfManaged => None,
        };
        self.registry.thread_index(hint)
    }

    fn start_key(&self, key: TimerKey<'_>) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let thread = self.current_thread()?;
        let mut store = self.stores[thread].lock().unwrap();
        // Resolution happens inside `do_start`, after the depth-limit gate: a start
        // beyond `depthlimit` must not allocate a timer (§4.3 step order).
        self.do_start(&mut store, |store| match key {
            TimerKey::Name(name) => store.find_or_create_by_name(name),
            TimerKey::Address(addr) => store.find_or_create_by_address(addr),
        })?;
        Ok(())
    }

    fn stop_key(&self, key: TimerKey<'_>) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        // §4.3 stop step (2): stamp before any other work, so the store lookup's own
        // cost isn't charged to the timer.
        let (wall, usr, sys) = self.stamp();
        let thread = self.current_thread()?;
        let mut store = self.stores[thread].lock().unwrap();
        let id = match key {
            TimerKey::Name(name) => store.find_by_name(name).ok_or_else(|| Error::TimerNotFound {
                name: name.to_string(),
                thread,
            })?,
            TimerKey::Address(addr) => {
                store
                    .find_by_address(addr)
                    .ok_or_else(|| Error::TimerNotFound {
                        name: format!("{addr:x}"),
                        thread,
                    })?
            }
        };
        self.do_stop(&mut store, id, thread, wall, usr, sys)
    }

    /// Common body of every `start` variant (§4.3/§4.4): the depth-limit gate runs
    /// first, and `resolve` (the hash lookup/creation) is only invoked once the gate
    /// decides the call will actually be recorded — a start beyond `depthlimit` must
    /// never allocate or register a timer. Returns the resolved id on success (even
    /// when recursing into an already-running timer) so callers can populate a handle
    /// cache; `None` means the gate suppressed the call entirely.
    fn do_start(
        &self,
        store: &mut PerThreadStore,
        resolve: impl FnOnce(&mut PerThreadStore) -> TimerId,
    ) -> Result<Option<TimerId>> {
        let parent = match store.callstack.begin_start(self.config.depthlimit) {
            StartDecision::Suppressed => return Ok(None),
            StartDecision::Record { parent } => parent,
        };

        let id = resolve(store);

        if store.timer(id).onflg {
            store.timer_mut(id).recurselvl += 1;
            return Ok(Some(id));
        }

        store.callstack.commit_start(id)?;
        store.timer_mut(id).record_parent(parent);

        let wall = if self.config.wall { self.clock.read() } else { 0.0 };
        let (usr, sys) = if self.config.cpu {
            clock::cpu_stamp()
        } else {
            (0.0, 0.0)
        };
        store.timer_mut(id).on_start(wall, usr, sys);
        Ok(Some(id))
    }

    /// Common body of every `stop` variant once `id` is resolved. `wall`/`usr`/`sys` are
    /// the stamp taken at the top of the calling `stop` variant, before thread
    /// resolution or the store lookup (§4.3 step 2).
    fn do_stop(&self, store: &mut PerThreadStore, id: TimerId, thread: usize, wall: f64, usr: f64, sys: f64) -> Result<()> {
        if store.callstack.begin_stop(self.config.depthlimit) {
            return Ok(());
        }

        if !store.timer(id).onflg {
            return Err(Error::TimerAlreadyOff {
                name: store.timer(id).name.to_string(),
                thread,
            });
        }

        if let Some(delta) = store.timer_mut(id).on_stop(wall, usr, sys) {
            if delta < 0.0 {
                log::warn!(
                    "{}",
                    Error::NegativeDelta {
                        name: store.timer(id).name.to_string(),
                        delta,
                    }
                );
            }
            store.callstack.commit_stop();
        }
        Ok(())
    }
}
