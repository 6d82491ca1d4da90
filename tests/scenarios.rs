//! Black-box end-to-end scenarios (§8 of the spec), exercised only through the public
//! API: construct a `Context`, drive it through `start`/`stop`, and inspect the
//! resulting state via `query` and the text report — no reaching into crate internals.

use calltime::config::{ClockKind, Config, PrintMethod};
use calltime::context::{Context, TimerHandle};
use calltime::query;

fn placebo_context() -> Context {
    // Surfaces the library's `log::warn!`/`log::error!` diagnostics (negative deltas,
    // escalated errors) under `RUST_LOG=calltime=debug cargo test -- --nocapture`.
    let _ = env_logger::builder().is_test(true).try_init();

    let mut config = Config::default();
    config.clock = ClockKind::Placebo;
    config.overhead = false;
    Context::new(config).unwrap()
}

fn report_body(ctx: &Context, tag: &str) -> String {
    let path = std::env::temp_dir().join(format!("calltime-scenario-{tag}-{:?}.txt", std::thread::current().id()));
    calltime::report::pr_file(ctx, &path).unwrap();
    let body = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    body
}

/// Strips the leading `*`/space flag and two-space indentation, returning (depth, name).
fn parse_tree_line(line: &str) -> Option<(usize, &str)> {
    let rest = line.strip_prefix('*').or_else(|| line.strip_prefix(' '))?;
    let indent_chars = rest.len() - rest.trim_start_matches(' ').len();
    let depth = indent_chars / 2;
    let name = rest.split_whitespace().next()?;
    Some((depth, name))
}

#[test]
fn scenario_1_depth_and_recursion() {
    let ctx = placebo_context();
    ctx.start("A").unwrap();
    ctx.start("A").unwrap();
    ctx.stop("A").unwrap();
    ctx.stop("A").unwrap();

    let snap = query::query(&ctx, "A", None).unwrap();
    assert_eq!(snap.count, 1);
    assert!(!snap.onflg);

    let body = report_body(&ctx, "1");
    let tree_lines: Vec<_> = body.lines().filter_map(parse_tree_line).collect();
    assert_eq!(tree_lines, vec![(0, "A")]);
}

#[test]
fn scenario_2_nested_nonrecursive() {
    let ctx = placebo_context();
    ctx.start("A").unwrap();
    ctx.start("B").unwrap();
    ctx.stop("B").unwrap();
    ctx.start("C").unwrap();
    ctx.stop("C").unwrap();
    ctx.stop("A").unwrap();

    for name in ["A", "B", "C"] {
        assert_eq!(query::query(&ctx, name, None).unwrap().count, 1);
    }

    let body = report_body(&ctx, "2");
    let tree_lines: Vec<_> = body.lines().filter_map(parse_tree_line).collect();
    assert_eq!(tree_lines, vec![(0, "A"), (1, "B"), (1, "C")]);
}

#[test]
fn scenario_3_multiple_parents() {
    let ctx = placebo_context();
    ctx.start("A").unwrap();
    ctx.start("X").unwrap();
    ctx.stop("X").unwrap();
    ctx.stop("A").unwrap();
    ctx.start("B").unwrap();
    ctx.start("X").unwrap();
    ctx.stop("X").unwrap();
    ctx.stop("B").unwrap();

    let body = report_body(&ctx, "3");
    let tree_section = body.split("multiple parent timers:").next().unwrap();
    // full_tree (default) policy: X is printed once under each of its two parents.
    let x_lines: Vec<_> = tree_section.lines().filter(|l| parse_tree_line(l).is_some_and(|(_, n)| n == "X")).collect();
    assert_eq!(x_lines.len(), 2, "X should appear once under each parent: {body}");
    assert!(x_lines.iter().all(|l| l.starts_with('*')), "multi-parent timers are flagged with '*': {body}");
    assert!(body.contains("multiple parent timers:"));
    assert!(body.contains("parent A"));
    assert!(body.contains("parent B"));
}

#[test]
fn scenario_4_loop_avoidance_under_most_frequent() {
    let mut config = Config::default();
    config.clock = ClockKind::Placebo;
    config.print_method = PrintMethod::MostFrequent;
    let ctx = Context::new(config).unwrap();

    // A calls B (twice), and B calls A (once): an observed-parent cycle between A and B.
    ctx.start("A").unwrap();
    ctx.start("B").unwrap();
    ctx.stop("B").unwrap();
    ctx.stop("A").unwrap();
    ctx.start("A").unwrap();
    ctx.start("B").unwrap();
    ctx.stop("B").unwrap();
    ctx.stop("A").unwrap();
    ctx.start("B").unwrap();
    ctx.start("A").unwrap();
    ctx.stop("A").unwrap();
    ctx.stop("B").unwrap();

    // A true cycle in the children arrays would make the reporter's depth-first walk
    // recurse forever; completing at all is the acyclicity proof for this scenario.
    let body = report_body(&ctx, "4");
    let tree_lines: Vec<_> = body.lines().filter_map(parse_tree_line).collect();
    assert!(!tree_lines.is_empty());
}

#[test]
fn scenario_5_distributed_reduction_three_ranks() {
    use calltime::reduce::{self, Communicator, GlobalRegion, InProcessCommunicator};

    let wall_times = [1.0, 2.0, 4.0];
    let mut comms = InProcessCommunicator::fleet(3);

    let make_region = move |rank: usize| GlobalRegion {
        name: "R".to_string(),
        totcalls: 1,
        tottsk: 1,
        wallmax: wall_times[rank],
        wallmax_provenance: reduce::Provenance { rank, thread: Some(0) },
        wallmin: wall_times[rank],
        wallmin_provenance: reduce::Provenance { rank, thread: Some(0) },
        mean: wall_times[rank],
        m2: 0.0,
        n: 1,
    };

    let mut comm2 = comms.remove(2);
    let mut comm1 = comms.remove(1);
    let mut comm0 = comms.remove(0);

    let h2 = std::thread::spawn(move || reduce::reduce_summary(&mut comm2, vec![make_region(2)]).unwrap());
    let h1 = std::thread::spawn(move || reduce::reduce_summary(&mut comm1, vec![make_region(1)]).unwrap());
    let result: Vec<GlobalRegion> = reduce::reduce_summary(&mut comm0, vec![make_region(0)]).unwrap();
    h1.join().unwrap();
    h2.join().unwrap();

    let r = result.iter().find(|r| r.name == "R").unwrap();
    assert_eq!(r.totcalls, 3);
    assert_eq!(r.tottsk, 3);
    assert!((r.wallmax - 4.0).abs() < 1e-9);
    assert_eq!(r.wallmax_provenance.rank, 2);
    assert!((r.wallmin - 1.0).abs() < 1e-9);
    assert_eq!(r.wallmin_provenance.rank, 0);
    assert!((r.mean - 2.3333333333).abs() < 1e-6);
    assert!((r.stdev() - 1.528).abs() < 1e-3);

    // Not required by the fn signature, but exercises the trait object's dynamic-dispatch seam.
    fn _assert_dyn_communicator(_: &mut dyn Communicator) {}
}

#[test]
fn scenario_6_handle_fast_path_skips_hash_lookup_after_first_call() {
    let ctx = placebo_context();
    let mut handle = TimerHandle::new();

    ctx.start_handle("H", &mut handle).unwrap();
    ctx.stop_handle("H", &mut handle).unwrap();
    for _ in 0..1000 {
        ctx.start_handle("H", &mut handle).unwrap();
        ctx.stop_handle("H", &mut handle).unwrap();
    }

    assert_eq!(query::query(&ctx, "H", None).unwrap().count, 1001);
}
