//! The `Timer` record (§3) and its parent/child bookkeeping.

use arrayvec::ArrayString;

use crate::config::MAX_CHARS;

/// Dense index of a [`Timer`] within its owning thread's arena
/// ([`crate::store::PerThreadStore`]). Stable for the life of the context; handed back
/// to callers as the "handle" of the handle-variant API (§4.3).
pub type TimerId = usize;

/// Opaque slot for a hardware-counter plug-in (§9's "Hardware-counter plug-in" design
/// note). The core never interprets the contents; it only allocates the slot inline in
/// each `Timer` and forwards it to whichever [`crate::aux::AuxPlugin`] is configured.
pub type AuxSlot = u64;

/// Accumulated wallclock statistics for one timer.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WallStats {
    pub accumulated: f64,
    pub max: f64,
    pub min: f64,
    last_start: f64,
}

/// Accumulated CPU-tick statistics (user and system) for one timer.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuStats {
    pub accumulated_usr: f64,
    pub accumulated_sys: f64,
    last_start_usr: f64,
    last_start_sys: f64,
}

/// One named region of code, scoped to a single thread (§3's Timer).
#[derive(Debug, Clone)]
pub struct Timer {
    pub name: ArrayString<MAX_CHARS>,
    /// Alternative key used by the instrument-address variant (§4.3); `None` for
    /// name-keyed timers.
    pub address: Option<u64>,

    pub wall: WallStats,
    pub cpu: CpuStats,

    pub count: u64,
    pub recurselvl: u32,
    pub nrecurse: u64,
    pub norphan: u64,

    /// Distinct parents observed so far, parallel to `parent_count` (§4.4's ParentRecord).
    pub parent: Vec<TimerId>,
    pub parent_count: Vec<u64>,

    /// Populated only by the tree builder at report time (§4.5).
    pub children: Vec<TimerId>,

    pub onflg: bool,
    pub aux: AuxSlot,
}

impl Timer {
    pub fn new(name: &str, address: Option<u64>) -> Timer {
        let mut truncated = ArrayString::<MAX_CHARS>::new();
        for ch in name.chars() {
            if truncated.try_push(ch).is_err() {
                break;
            }
        }
        Timer {
            name: truncated,
            address,
            wall: WallStats::default(),
            cpu: CpuStats::default(),
            count: 0,
            recurselvl: 0,
            nrecurse: 0,
            norphan: 0,
            parent: Vec::new(),
            parent_count: Vec::new(),
            children: Vec::new(),
            onflg: false,
            aux: 0,
        }
    }

    /// `true` when more than one distinct parent has been observed (the reporter's `*`
    /// column-one flag, §4.8).
    pub fn has_multiple_parents(&self) -> bool {
        self.parent.len() > 1
    }

    /// Records (or bumps the count of) `parent_id` as a parent of this timer, per §4.4:
    /// linear scan, grow-by-one on miss. Returns `true` if a new parent was added.
    pub fn record_parent(&mut self, parent_id: TimerId) -> bool {
        if let Some(pos) = self.parent.iter().position(|&p| p == parent_id) {
            self.parent_count[pos] += 1;
            false
        } else {
            self.parent.push(parent_id);
            self.parent_count.push(1);
            true
        }
    }

    pub fn on_start(&mut self, now_wall: f64, now_usr: f64, now_sys: f64) {
        if self.onflg {
            self.recurselvl += 1;
            return;
        }
        self.wall.last_start = now_wall;
        self.cpu.last_start_usr = now_usr;
        self.cpu.last_start_sys = now_sys;
        self.onflg = true;
    }

    /// Applies a `stop` to an already-on timer. Returns the wall delta charged (or a
    /// negative delta, which the caller logs per §4.3 but still accumulates as-is) when
    /// recursion unwound to level zero; `None` when this stop only decremented
    /// `recurselvl`.
    pub fn on_stop(&mut self, now_wall: f64, now_usr: f64, now_sys: f64) -> Option<f64> {
        if self.recurselvl > 0 {
            self.recurselvl -= 1;
            self.nrecurse += 1;
            return None;
        }
        self.count += 1;

        let delta = now_wall - self.wall.last_start;
        self.wall.accumulated += delta;
        if self.count == 1 {
            self.wall.max = delta;
            self.wall.min = delta;
        } else {
            self.wall.max = self.wall.max.max(delta);
            self.wall.min = self.wall.min.min(delta);
        }

        self.cpu.accumulated_usr += now_usr - self.cpu.last_start_usr;
        self.cpu.accumulated_sys += now_sys - self.cpu.last_start_sys;
        self.onflg = false;
        Some(delta)
    }
}
