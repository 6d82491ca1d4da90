//! Pluggable monotonic time source (§4.1).
//!
//! The concrete back end is chosen once, before [`crate::Context::initialize`], from
//! [`crate::config::ClockKind`]. Each back end resolves to a `fn() -> f64` reading seconds
//! since an arbitrary, per-process reference instant, established at [`Clock::init`] so
//! readings stay small enough to round-trip cleanly through an `f32` if a caller downcasts.

#[cfg(test)]
mod test;

use std::time::Instant;

use crate::config::ClockKind;
use crate::error::{Error, Result};

type ReadFn = fn(&Clock) -> f64;

/// A selected, initialized clock back end plus its measured overhead.
pub struct Clock {
    kind: ClockKind,
    read_fn: ReadFn,
    reference: Instant,
    cycle_ghz: f64,
    overhead_secs: f64,
}

impl Clock {
    /// Selects and initializes a back end. Fails with [`Error::ClockUnavailable`] when the
    /// platform does not support the requested source; the core falls back to
    /// [`ClockKind::PosixHighRes`] in that case (per the spec's design notes), so this only
    /// returns `Err` for `kind`s that are unconditionally platform-gated (e.g. AIX-only) and
    /// whose fallback callers explicitly opted out of.
    pub fn init(kind: ClockKind) -> Result<Clock> {
        let read_fn: ReadFn = match kind {
            ClockKind::WallTime => read_wall_time,
            ClockKind::PosixHighRes => read_posix_high_res,
            ClockKind::CycleCounter => read_cycle_counter,
            ClockKind::CommWallTime => read_wall_time,
            ClockKind::AixHighRes => {
                return Err(Error::ClockUnavailable {
                    clock: "aix_high_res",
                })
            }
            ClockKind::Placebo => read_placebo,
        };

        let cycle_ghz = if matches!(kind, ClockKind::CycleCounter) {
            measure_cycle_ghz()
        } else {
            1.0
        };

        let mut clock = Clock {
            kind,
            read_fn,
            reference: Instant::now(),
            cycle_ghz,
            overhead_secs: 0.0,
        };
        clock.overhead_secs = clock.measure_overhead();
        Ok(clock)
    }

    pub fn kind(&self) -> ClockKind {
        self.kind
    }

    /// Strictly monotonic seconds-since-reference reading.
    pub fn read(&self) -> f64 {
        (self.read_fn)(self)
    }

    /// The overhead measured at `init` time: mean of 100 back-to-back `read() - read()`.
    pub fn overhead(&self) -> f64 {
        self.overhead_secs
    }

    fn measure_overhead(&self) -> f64 {
        const SAMPLES: u32 = 100;
        let mut total = 0.0;
        for _ in 0..SAMPLES {
            let a = self.read();
            let b = self.read();
            total += b - a;
        }
        (total / f64::from(SAMPLES)).max(0.0)
    }
}

/// Per-thread user/system CPU seconds consumed so far, for CPU-tick accounting (§4.1).
/// Falls back to process-wide accounting (`RUSAGE_SELF`) on platforms without
/// `RUSAGE_THREAD`.
pub fn cpu_stamp() -> (f64, f64) {
    #[cfg(target_os = "linux")]
    const WHO: libc::c_int = libc::RUSAGE_THREAD;
    #[cfg(not(target_os = "linux"))]
    const WHO: libc::c_int = libc::RUSAGE_SELF;

    // SAFETY: `usage` is a valid, fully-initialized out-parameter for `getrusage`.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(WHO, &mut usage) };
    if rc != 0 {
        return (0.0, 0.0);
    }
    let usr = usage.ru_utime.tv_sec as f64 + usage.ru_utime.tv_usec as f64 * 1e-6;
    let sys = usage.ru_stime.tv_sec as f64 + usage.ru_stime.tv_usec as f64 * 1e-6;
    (usr, sys)
}

fn read_wall_time(clock: &Clock) -> f64 {
    clock.reference.elapsed().as_secs_f64()
}

fn read_posix_high_res(clock: &Clock) -> f64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, fully-initialized out-parameter for `clock_gettime`.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    if rc != 0 {
        return read_wall_time(clock);
    }
    ts.tv_sec as f64 + ts.tv_nsec as f64 * 1e-9
}

fn read_cycle_counter(clock: &Clock) -> f64 {
    let cycles = read_tsc();
    cycles as f64 / (clock.cycle_ghz * 1e9)
}

fn read_placebo(_clock: &Clock) -> f64 {
    0.0
}

#[cfg(target_arch = "x86_64")]
fn read_tsc() -> u64 {
    // SAFETY: RDTSC is unprivileged and available on every x86_64 target this crate builds for.
    unsafe { core::arch::x86_64::_rdtsc() }
}

#[cfg(not(target_arch = "x86_64"))]
fn read_tsc() -> u64 {
    // No portable cycle counter; fall back to a monotonically increasing nanosecond count
    // so callers still see strictly increasing values, just not true cycles.
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Calibrates a cycle-to-second scale factor by timing a fixed number of TSC ticks
/// against the wall clock. Only meaningful on `x86_64`; elsewhere this degenerates to 1GHz
/// since [`read_tsc`] already returns wall-clock-derived nanoseconds there.
fn measure_cycle_ghz() -> f64 {
    #[cfg(target_arch = "x86_64")]
    {
        let start_wall = Instant::now();
        let start_tsc = read_tsc();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let end_tsc = read_tsc();
        let elapsed = start_wall.elapsed().as_secs_f64();
        if elapsed <= 0.0 || end_tsc <= start_tsc {
            return 1.0;
        }
        (end_tsc - start_tsc) as f64 / elapsed / 1e9
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        1.0
    }
}
