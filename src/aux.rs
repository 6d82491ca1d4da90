//! Hardware-counter plug-in (§9 design note): modeled as an opaque capability set. The
//! core allocates an [`crate::timer::AuxSlot`] inline in each `Timer` and forwards it
//! here, but never interprets its contents — this is an external collaborator
//! interface, not a hardware-counter implementation (out of scope per §1).

use crate::timer::AuxSlot;

/// Implemented by whatever hardware-counter backend an embedding application wants to
/// plug in (e.g. a `perf_event_open` wrapper). The no-op [`NullAuxPlugin`] is the
/// default and is what every `Context` uses unless one is supplied.
pub trait AuxPlugin: Send + Sync {
    fn init(&mut self, nthreads: usize);
    fn start(&mut self, thread: usize, slot: AuxSlot);
    fn stop(&mut self, thread: usize, slot: AuxSlot);
    fn add(&mut self, dst: AuxSlot, src: AuxSlot);
    /// Writes up to `out.len()` event values for `slot`; returns how many were written.
    fn query(&self, slot: AuxSlot, out: &mut [u64]) -> usize;
    fn print(&self, out: &mut dyn std::fmt::Write);
    fn finalize(&mut self);

    /// Resolves an event's configured name (e.g. `"PAPI_TOT_CYC"`) to the index
    /// `query` writes it at, for the query API's `get_eventvalue`. `None` means this
    /// plug-in has no event by that name.
    fn event_index(&self, _name: &str) -> Option<usize> {
        None
    }
}

/// Default plug-in: no hardware counters configured.
#[derive(Default)]
pub struct NullAuxPlugin;

impl AuxPlugin for NullAuxPlugin {
    fn init(&mut self, _nthreads: usize) {}
    fn start(&mut self, _thread: usize, _slot: AuxSlot) {}
    fn stop(&mut self, _thread: usize, _slot: AuxSlot) {}
    fn add(&mut self, _dst: AuxSlot, _src: AuxSlot) {}
    fn query(&self, _slot: AuxSlot, _out: &mut [u64]) -> usize {
        0
    }
    fn print(&self, _out: &mut dyn std::fmt::Write) {}
    fn finalize(&mut self) {}
}
