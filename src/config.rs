//! Configuration options, set once before [`crate::Context::initialize`] and immutable
//! for the life of the context (mirrors `setoption`/`setutr` in the distilled spec).

use crate::error::{Error, Result};

/// Maximum timer name length; excess bytes are silently truncated (§3 of the spec).
pub const MAX_CHARS: usize = 63;

/// Maximum call-stack depth per thread; overflow is a permanent error for that call.
pub const MAX_STACK: usize = 128;

/// Default per-thread hash table slot count.
pub const DEFAULT_TABLE_SIZE: usize = 1023;

/// Default `maxthreads` in the self-managed threading regime.
pub const DEFAULT_MAXTHREADS_SELF_MANAGED: usize = 64;

/// Name of the sentinel root timer every user timer is a descendant of.
pub const ROOT_NAME: &str = "ROOT";

/// Selectable clock back end (§4.1). Concrete reads live in [`crate::clock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClockKind {
    /// `gettimeofday`-equivalent wall time.
    WallTime,
    /// High-resolution POSIX clock (`clock_gettime(CLOCK_MONOTONIC, ..)`).
    #[default]
    PosixHighRes,
    /// CPU cycle counter read, scaled by a measured or configured frequency.
    CycleCounter,
    /// A communicator-provided wall clock (the distributed-reduction transport's own clock).
    CommWallTime,
    /// High-resolution AIX primitive (`read_real_time`); unavailable off AIX.
    AixHighRes,
    /// Always returns zero; used to measure the library's own overhead.
    Placebo,
}

/// Tree-building policy (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrintMethod {
    FirstParent,
    LastParent,
    MostFrequent,
    #[default]
    FullTree,
}

/// The threading regime the thread registry operates under (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadingModel {
    /// The runtime supplies a thread index directly (e.g. an OpenMP-style fork-join pool).
    ForkJoin { hint_maxthreads: usize },
    /// Threads are discovered by their native identifier on first call.
    SelfManaged,
}

/// One crate-wide, immutable-after-`initialize` configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub clock: ClockKind,
    pub threading: ThreadingModel,
    pub tablesize: usize,
    pub maxthreads: usize,
    pub depthlimit: usize,
    pub print_method: PrintMethod,

    pub wall: bool,
    pub cpu: bool,
    pub overhead: bool,
    pub percent: bool,
    pub preamble: bool,
    pub threadsort: bool,
    pub multparent: bool,
    pub collision: bool,
    pub memusage: bool,
    pub verbose: bool,
    pub sync_mpi: bool,
    pub abort_on_error: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            clock: ClockKind::default(),
            threading: ThreadingModel::SelfManaged,
            tablesize: DEFAULT_TABLE_SIZE,
            maxthreads: DEFAULT_MAXTHREADS_SELF_MANAGED,
            depthlimit: MAX_STACK,
            print_method: PrintMethod::default(),
            wall: true,
            cpu: true,
            overhead: true,
            percent: false,
            preamble: true,
            threadsort: false,
            multparent: true,
            collision: true,
            memusage: true,
            verbose: false,
            sync_mpi: false,
            abort_on_error: false,
        }
    }
}

impl Config {
    /// `setoption`'s string-keyed entry point, for callers (CLI front-ends, config files)
    /// that only have the option name as text. Typed setters (`set_tablesize`, etc.) are
    /// preferred from Rust call sites.
    pub fn set_option_by_name(&mut self, option: &str, value: bool) -> Result<()> {
        match option {
            "cpu" => self.cpu = value,
            "wall" => self.wall = value,
            "overhead" => self.overhead = value,
            "verbose" => self.verbose = value,
            "percent" => self.percent = value,
            "preamble" => self.preamble = value,
            "threadsort" => self.threadsort = value,
            "multparent" => self.multparent = value,
            "collision" => self.collision = value,
            "memusage" => self.memusage = value,
            "sync_mpi" => self.sync_mpi = value,
            "abort_on_error" => self.abort_on_error = value,
            other => {
                log::debug!("unrecognized option name: {other}");
                return Err(Error::OutOfRange {
                    what: "option name",
                    value: 0,
                    expected: "one of cpu/wall/overhead/verbose/percent/preamble/threadsort/multparent/collision/memusage/sync_mpi/abort_on_error",
                });
            }
        }
        Ok(())
    }

    pub fn set_tablesize(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::OutOfRange {
                what: "tablesize",
                value: 0,
                expected: "a positive integer",
            });
        }
        self.tablesize = size;
        Ok(())
    }

    pub fn set_maxthreads(&mut self, n: usize) -> Result<()> {
        if n == 0 {
            return Err(Error::OutOfRange {
                what: "maxthreads",
                value: 0,
                expected: "a positive integer",
            });
        }
        self.maxthreads = n;
        Ok(())
    }

    pub fn set_depthlimit(&mut self, n: usize) {
        self.depthlimit = n;
    }

    pub fn set_print_method(&mut self, m: PrintMethod) {
        self.print_method = m;
    }

    pub fn set_clock(&mut self, c: ClockKind) {
        self.clock = c;
    }
}
