//! Per-thread call-tree timing instrumentation with distributed summary reduction.
//!
//! The core is an embeddable [`Context`](context::Context): construct one, instrument
//! code with `start`/`stop` (or the handle/instrument-address variants), then print a
//! report with [`report::pr_file`] or reduce summaries across ranks with
//! [`report::pr_summary`]. A process-wide convenience wrapper mirroring the free-function
//! style of the distilled API lives in [`global`] for callers who only ever need one
//! context.
//!
//! ## Example
//!
//! ```rust
//! use calltime::config::Config;
//! use calltime::context::Context;
//!
//! let ctx = Context::new(Config::default()).unwrap();
//! ctx.start("outer").unwrap();
//! ctx.start("inner").unwrap();
//! ctx.stop("inner").unwrap();
//! ctx.stop("outer").unwrap();
//! assert_eq!(calltime::query::query(&ctx, "inner", None).unwrap().count, 1);
//! ```

pub mod aux;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod global;
pub mod query;
pub mod reduce;
pub mod registry;
pub mod report;
pub mod stats;
pub mod store;
pub mod timer;
pub mod tree;

pub use context::{Context, TimerHandle};
pub use error::{Error, Result};
