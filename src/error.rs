use thiserror::Error;

/// Every way a call into this crate can fail.
///
/// Hot-path entry points ([`crate::Context::start`], [`crate::Context::stop`], and their
/// handle/instrument variants) return `Result<(), Error>` but never panic; a handful of
/// conditions described in the timer state machine (recursion, depth-limit overflow, a
/// dropped loop-forming parent edge, a negative clock delta) are logged instead of
/// propagated here, because they are designed-in behaviors, not failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("initialize() must be called before start/stop/query operations")]
    NotInitialized,

    #[error("initialize() was called twice without an intervening finalize()")]
    AlreadyInitialized,

    #[error("{what} out of range: {value} (expected {expected})")]
    OutOfRange {
        what: &'static str,
        value: i64,
        expected: &'static str,
    },

    #[error("call stack overflow: depth exceeded MAX_STACK ({max_stack})")]
    StackOverflow { max_stack: usize },

    #[error("timer {name:?} not found on thread {thread}")]
    TimerNotFound { name: String, thread: usize },

    #[error("timer {name:?} on thread {thread} is already off")]
    TimerAlreadyOff { name: String, thread: usize },

    #[error("allocation failed: {0}")]
    AllocationFailure(&'static str),

    #[error("clock {clock} is unavailable on this platform")]
    ClockUnavailable { clock: &'static str },

    #[error("{what} is not supported on this platform")]
    PlatformUnsupported { what: &'static str },

    #[error("communication failure during distributed reduction: {0}")]
    CommunicationFailure(String),

    #[error("loop detected while linking {parent:?} -> {child:?}; edge dropped")]
    LoopDetected { parent: String, child: String },

    #[error("negative delta ({delta}s) observed for timer {name:?}; clock may not be monotonic")]
    NegativeDelta { name: String, delta: f64 },

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
