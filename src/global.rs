//! Process-wide convenience wrapper (§9's "Singletons → explicit context" design note):
//! mirrors the free-function calling style of the distilled API for embedders who only
//! ever need one [`Context`]. Prefer constructing a [`Context`] directly when more than
//! one independently-configured instrumentation session is needed.


use std::path::Path;
use std::sync::{Mutex, OnceLock};

use crate::config::Config;
use crate::context::{Context, TimerHandle};
use crate::error::{Error, Result};
use crate::reduce::Communicator;

static GLOBAL: OnceLock<Mutex<Option<Context>>> = OnceLock::new();

fn slot() -> &'static Mutex<Option<Context>> {
    GLOBAL.get_or_init(|| Mutex::new(None))
}

fn with_context<R>(f: impl FnOnce(&Context) -> Result<R>) -> Result<R> {
    let guard = slot().lock().unwrap();
    let ctx = guard.as_ref().ok_or(Error::NotInitialized)?;
    f(ctx)
}

/// Builds the global context. Fails with [`Error::AlreadyInitialized`] if one is already
/// live; call [`finalize`] first to replace it.
pub fn initialize(config: Config) -> Result<()> {
    let mut guard = slot().lock().unwrap();
    if guard.is_some() {
        return Err(Error::AlreadyInitialized);
    }
    *guard = Some(Context::new(config)?);
    Ok(())
}

/// Tears down the global context. After this, [`initialize`] may be called again.
pub fn finalize() -> Result<()> {
    let mut guard = slot().lock().unwrap();
    if guard.take().is_none() {
        return Err(Error::NotInitialized);
    }
    Ok(())
}

pub fn is_initialized() -> bool {
    slot().lock().unwrap().is_some()
}

pub fn start(name: &str) -> Result<()> {
    with_context(|ctx| ctx.start(name))
}

pub fn stop(name: &str) -> Result<()> {
    with_context(|ctx| ctx.stop(name))
}

pub fn start_instr(address: u64) -> Result<()> {
    with_context(|ctx| ctx.start_instr(address))
}

pub fn stop_instr(address: u64) -> Result<()> {
    with_context(|ctx| ctx.stop_instr(address))
}

pub fn start_handle(name: &str, handle: &mut TimerHandle) -> Result<()> {
    with_context(|ctx| ctx.start_handle(name, handle))
}

pub fn stop_handle(name: &str, handle: &mut TimerHandle) -> Result<()> {
    with_context(|ctx| ctx.stop_handle(name, handle))
}

pub fn enable() -> Result<()> {
    with_context(|ctx| {
        ctx.enable();
        Ok(())
    })
}

pub fn disable() -> Result<()> {
    with_context(|ctx| {
        ctx.disable();
        Ok(())
    })
}

pub fn reset() -> Result<()> {
    with_context(|ctx| {
        ctx.reset();
        Ok(())
    })
}

pub fn stamp() -> Result<(f64, f64, f64)> {
    with_context(|ctx| Ok(ctx.stamp()))
}

pub fn pr(thread: usize) -> Result<()> {
    with_context(|ctx| crate::report::pr(ctx, thread))
}

pub fn pr_file(path: impl AsRef<Path>) -> Result<()> {
    with_context(|ctx| crate::report::pr_file(ctx, path))
}

pub fn pr_summary(comm: &mut dyn Communicator) -> Result<()> {
    with_context(|ctx| crate::report::pr_summary(ctx, comm))
}

pub fn barrier(comm: &mut dyn Communicator, name: &str) -> Result<()> {
    with_context(|ctx| crate::report::barrier(ctx, comm, name))
}
