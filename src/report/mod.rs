//! Human-readable reports (§4.8): per-thread indented call trees, a cross-thread flat
//! summary, and the distributed-reduction summary.


use std::fmt::Write as _;
use std::path::Path;

use itertools::Itertools;

use crate::context::Context;
use crate::error::Result;
use crate::reduce::Communicator;
use crate::stats;
use crate::store::{PerThreadStore, ROOT_ID};
use crate::timer::TimerId;

const SCIENTIFIC_THRESHOLD: u64 = 1_000_000;

fn format_count(count: u64) -> String {
    if count > SCIENTIFIC_THRESHOLD {
        format!("{:.3e}", count as f64)
    } else {
        count.to_string()
    }
}

fn preamble(ctx: &Context) -> String {
    let mut out = String::new();
    if !ctx.config().preamble {
        return out;
    }
    writeln!(out, "clock: {:?} (overhead {:.9}s/call)", ctx.clock().kind(), ctx.clock().overhead()).unwrap();
    writeln!(out, "threading: {:?}", ctx.config().threading).unwrap();
    let mut counters = String::new();
    ctx.aux().lock().unwrap().print(&mut counters);
    if !counters.is_empty() {
        writeln!(out, "hardware counters:\n{counters}").unwrap();
    }
    out
}

/// Depth-first indented print of `parent`'s descendants (§4.5/§4.8): two spaces per
/// depth level, `*` in column one for timers with more than one observed parent.
/// `full_tree` policy can revisit a shared descendant under each of its parents; that is
/// the feature, not a bug, so no visited-set is kept here. `root_total` is the
/// denominator for the optional percent-of-root column; `overhead_per_call` is the
/// clock's measured per-call overhead (§4.1), for the optional overhead-estimate column.
fn print_children(
    out: &mut String,
    store: &PerThreadStore,
    parent: TimerId,
    depth: usize,
    root_total: f64,
    percent: bool,
    overhead_per_call: Option<f64>,
) {
    for &child in &store.timer(parent).children {
        let timer = store.timer(child);
        let flag = if timer.has_multiple_parents() { '*' } else { ' ' };
        let indent = "  ".repeat(depth);
        write!(
            out,
            "{flag}{indent}{name:<30} {count:>12} {wall:>14.6}",
            name = timer.name.as_str(),
            count = format_count(timer.count),
            wall = timer.wall.accumulated,
        )
        .unwrap();
        if percent && root_total > 0.0 {
            write!(out, " {:>8.2}%", 100.0 * timer.wall.accumulated / root_total).unwrap();
        }
        if let Some(per_call) = overhead_per_call {
            write!(out, " {:>14.6}", per_call * timer.count as f64).unwrap();
        }
        writeln!(out).unwrap();
        print_children(out, store, child, depth + 1, root_total, percent, overhead_per_call);
    }
}

/// §6's "multiple-parent section": for each timer with more than one observed parent,
/// every distinct parent with its call count, then the child's own row.
fn render_multi_parent_section(store: &PerThreadStore) -> String {
    let mut out = String::new();
    let multi = store
        .arena
        .iter()
        .filter(|t| t.has_multiple_parents())
        .sorted_by_key(|t| t.name.as_str());
    let mut any = false;
    for timer in multi {
        if !any {
            writeln!(out, "\nmultiple parent timers:").unwrap();
            any = true;
        }
        writeln!(out, "{}:", timer.name.as_str()).unwrap();
        for (&parent_id, &count) in timer.parent.iter().zip(timer.parent_count.iter()) {
            writeln!(out, "  parent {:<28} {:>12}", store.timer(parent_id).name.as_str(), count).unwrap();
        }
        writeln!(
            out,
            "  {:<30} {:>12} {:>14.6}",
            timer.name.as_str(),
            format_count(timer.count),
            timer.wall.accumulated
        )
        .unwrap();
    }
    out
}

fn render_thread(ctx: &Context, thread: usize) -> Result<String> {
    let overhead_per_call = ctx.config().overhead.then(|| ctx.clock().overhead());
    let percent = ctx.config().percent;
    ctx.with_store(thread, |store| {
        let mut out = String::new();
        writeln!(out, "thread {thread}:").unwrap();
        write!(out, "{:<31} {:>12} {:>14}", "name", "count", "wallclock").unwrap();
        if percent {
            write!(out, " {:>9}", "%root").unwrap();
        }
        if overhead_per_call.is_some() {
            write!(out, " {:>14}", "overhead").unwrap();
        }
        writeln!(out).unwrap();

        let root_total: f64 = store.timer(ROOT_ID).children.iter().map(|&c| store.timer(c).wall.accumulated).sum();
        print_children(&mut out, store, ROOT_ID, 0, root_total, percent, overhead_per_call);

        if ctx.config().multparent {
            out.push_str(&render_multi_parent_section(store));
        }
        if ctx.config().collision {
            writeln!(out, "\nhash collision histogram: {:?}", store.collision_histogram()).unwrap();
        }
        if ctx.config().memusage {
            writeln!(out, "memory usage: {} bytes", store.memory_usage_bytes()).unwrap();
        }
        out
    })
}

/// Cross-thread flat summary (§4.8): one row per distinct region name, sorted by name
/// unless `threadsort` asks for a wallclock-descending ranking instead.
fn render_summary_table(ctx: &Context) -> String {
    let stores = ctx.snapshot_stores();
    let summaries = stats::aggregate(&stores);
    let summaries = if ctx.config().threadsort {
        summaries.into_iter().sorted_by(|a, b| b.wall_accumulated.total_cmp(&a.wall_accumulated)).collect_vec()
    } else {
        summaries.into_iter().sorted_by(|a, b| a.name.cmp(&b.name)).collect_vec()
    };

    let mut out = String::new();
    writeln!(out, "\ncross-thread summary:").unwrap();
    writeln!(
        out,
        "{:<30} {:>12} {:>14} {:>14} {:>14}",
        "name", "calls", "wallsum", "wallmax", "wallmin"
    )
    .unwrap();
    for s in summaries {
        writeln!(
            out,
            "{:<30} {:>12} {:>14.6} {:>14.6} {:>14.6}",
            s.name,
            format_count(s.totcalls),
            s.wall_accumulated,
            s.wallmax,
            s.wallmin
        )
        .unwrap();
    }
    out
}

/// Writes thread `id`'s report to `timing.<id>` (§6's `pr`).
pub fn pr(ctx: &Context, thread: usize) -> Result<()> {
    ctx.rebuild_trees();
    let body = format!("{}{}", preamble(ctx), render_thread(ctx, thread)?);
    std::fs::write(format!("timing.{thread}"), body)?;
    Ok(())
}

/// Writes every thread's report, plus the cross-thread summary table when more than one
/// thread ran, to `path` (§6's `pr_file`). On failure to open `path`, falls back to
/// stderr — the same racy fallback the original takes (§9 open question (a)).
pub fn pr_file(ctx: &Context, path: impl AsRef<Path>) -> Result<()> {
    ctx.rebuild_trees();
    let mut out = preamble(ctx);
    let nthreads = ctx.nthreads().max(1);
    for t in 0..nthreads {
        out.push_str(&render_thread(ctx, t)?);
        out.push('\n');
    }
    if nthreads > 1 {
        out.push_str(&render_summary_table(ctx));
    }

    if let Err(err) = std::fs::write(path.as_ref(), &out) {
        log::error!("failed to open {:?} for writing ({err}); falling back to stderr", path.as_ref());
        eprint!("{out}");
    }
    Ok(())
}

/// Runs the distributed reduction and, on rank 0 only, writes `timing.summary` (§6's
/// `pr_summary`).
pub fn pr_summary(ctx: &Context, comm: &mut dyn Communicator) -> Result<()> {
    let regions = ctx.reduce_summary(comm)?;
    if comm.rank() != 0 {
        return Ok(());
    }

    let mut out = String::new();
    writeln!(out, "distributed summary across {} ranks:", comm.size()).unwrap();
    writeln!(
        out,
        "{:<30} {:>8} {:>12} {:>14} {:>14} {:>24} {:>24}",
        "name", "tasks", "calls", "mean", "stdev", "wallmax (rank)", "wallmin (rank)"
    )
    .unwrap();
    for r in &regions {
        writeln!(
            out,
            "{:<30} {:>8} {:>12} {:>14.6} {:>14.6} {:>14.6} ({:>6}) {:>14.6} ({:>6})",
            r.name,
            r.tottsk,
            format_count(r.totcalls),
            r.mean,
            r.stdev(),
            r.wallmax,
            r.wallmax_provenance.rank,
            r.wallmin,
            r.wallmin_provenance.rank,
        )
        .unwrap();
    }

    if let Err(err) = std::fs::write("timing.summary", &out) {
        log::error!("failed to open timing.summary for writing ({err}); falling back to stderr");
        eprint!("{out}");
    }
    Ok(())
}

/// Times a named barrier region around the communicator's collective synchronization
/// point (§6's `barrier`): `start(name)`, block every rank on the barrier, `stop(name)`.
pub fn barrier(ctx: &Context, comm: &mut dyn Communicator, name: &str) -> Result<()> {
    ctx.start(name)?;
    comm.barrier()?;
    ctx.stop(name)?;
    Ok(())
}
