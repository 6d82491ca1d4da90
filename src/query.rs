//! Read-only introspection into a [`Context`]'s recorded timers (§6's Query operations).

#[cfg(test)]
mod test;

use crate::context::Context;
use crate::error::{Error, Result};

/// Point-in-time snapshot of one timer on one thread, returned by [`query`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimerSnapshot {
    pub count: u64,
    pub onflg: bool,
    pub wallclock: f64,
    pub dusr: f64,
    pub dsys: f64,
}

fn resolve(ctx: &Context, thread: Option<usize>) -> Result<usize> {
    match thread {
        Some(t) if t < ctx.maxthreads() => Ok(t),
        Some(t) => Err(Error::OutOfRange {
            what: "thread index",
            value: t as i64,
            expected: "< maxthreads",
        }),
        None => ctx.current_thread(),
    }
}

/// Full snapshot of a named timer. `thread = None` means "the calling thread" (§6).
pub fn query(ctx: &Context, name: &str, thread: Option<usize>) -> Result<TimerSnapshot> {
    let thread = resolve(ctx, thread)?;
    ctx.with_store(thread, |store| {
        store.find_by_name(name).map(|id| {
            let timer = store.timer(id);
            TimerSnapshot {
                count: timer.count,
                onflg: timer.onflg,
                wallclock: timer.wall.accumulated,
                dusr: timer.cpu.accumulated_usr,
                dsys: timer.cpu.accumulated_sys,
            }
        })
    })?
    .ok_or_else(|| Error::TimerNotFound {
        name: name.to_string(),
        thread,
    })
}

/// Accumulated wallclock for `timername`, resolving it either as a region name or (on
/// miss) as a hex-encoded instrument address, mirroring the original's "don't know which
/// variant registered this timer, so try both" fallback.
pub fn get_wallclock(ctx: &Context, timername: &str, thread: Option<usize>) -> Result<f64> {
    let thread = resolve(ctx, thread)?;
    ctx.with_store(thread, |store| {
        store
            .find_by_name(timername)
            .or_else(|| {
                u64::from_str_radix(timername, 16)
                    .ok()
                    .and_then(|addr| store.find_by_address(addr))
            })
            .map(|id| store.timer(id).wall.accumulated)
    })?
    .ok_or_else(|| Error::TimerNotFound {
        name: timername.to_string(),
        thread,
    })
}

/// Current value of a named hardware-counter event for `timername`, via the configured
/// [`crate::aux::AuxPlugin`].
pub fn get_eventvalue(
    ctx: &Context,
    timername: &str,
    eventname: &str,
    thread: Option<usize>,
) -> Result<f64> {
    let thread = resolve(ctx, thread)?;
    let slot = ctx
        .with_store(thread, |store| {
            store
                .find_by_name(timername)
                .or_else(|| {
                    u64::from_str_radix(timername, 16)
                        .ok()
                        .and_then(|addr| store.find_by_address(addr))
                })
                .map(|id| store.timer(id).aux)
        })?
        .ok_or_else(|| Error::TimerNotFound {
            name: timername.to_string(),
            thread,
        })?;

    let aux = ctx.aux().lock().unwrap();
    let index = aux.event_index(eventname).ok_or(Error::OutOfRange {
        what: "event name",
        value: 0,
        expected: "a name known to the configured hardware-counter plug-in",
    })?;
    let mut values = vec![0u64; index + 1];
    aux.query(slot, &mut values);
    Ok(values[index] as f64)
}

/// Number of distinct regions recorded on `thread` (excludes the sentinel root).
pub fn get_nregions(ctx: &Context, thread: Option<usize>) -> Result<usize> {
    let thread = resolve(ctx, thread)?;
    ctx.with_store(thread, |store| store.arena.len() - 1)
}

/// The `region`-th (0-based, creation-order) region name recorded on `thread`.
pub fn get_regionname(ctx: &Context, thread: Option<usize>, region: usize) -> Result<String> {
    let thread = resolve(ctx, thread)?;
    ctx.with_store(thread, |store| {
        store.arena.get(region + 1).map(|t| t.name.to_string())
    })?
    .ok_or(Error::OutOfRange {
        what: "region index",
        value: region as i64,
        expected: "< get_nregions(thread)",
    })
}
