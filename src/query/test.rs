use super::*;
use crate::config::{ClockKind, Config};

fn test_context() -> Context {
    let mut config = Config::default();
    config.clock = ClockKind::Placebo;
    config.overhead = false;
    Context::new(config).unwrap()
}

#[test]
fn query_returns_recorded_counts() {
    let ctx = test_context();
    ctx.start("region").unwrap();
    ctx.stop("region").unwrap();
    let snap = query(&ctx, "region", None).unwrap();
    assert_eq!(snap.count, 1);
    assert!(!snap.onflg);
}

#[test]
fn query_missing_timer_errors() {
    let ctx = test_context();
    assert!(query(&ctx, "nope", None).is_err());
}

#[test]
fn get_wallclock_matches_query() {
    let ctx = test_context();
    ctx.start("region").unwrap();
    ctx.stop("region").unwrap();
    let wall = get_wallclock(&ctx, "region", None).unwrap();
    assert_eq!(wall, query(&ctx, "region", None).unwrap().wallclock);
}

#[test]
fn nregions_and_regionname_roundtrip() {
    let ctx = test_context();
    ctx.start("a").unwrap();
    ctx.stop("a").unwrap();
    ctx.start("b").unwrap();
    ctx.stop("b").unwrap();
    assert_eq!(get_nregions(&ctx, None).unwrap(), 2);
    assert_eq!(get_regionname(&ctx, None, 0).unwrap(), "a");
    assert_eq!(get_regionname(&ctx, None, 1).unwrap(), "b");
    assert!(get_regionname(&ctx, None, 2).is_err());
}

#[test]
fn out_of_range_thread_errors() {
    let ctx = test_context();
    assert!(query(&ctx, "region", Some(9999)).is_err());
}
