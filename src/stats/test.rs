use super::*;

fn store_with(name: &str, count: u64, accum: f64) -> PerThreadStore {
    let mut store = PerThreadStore::new(16);
    let id = store.find_or_create_by_name(name);
    let timer = store.timer_mut(id);
    timer.count = count;
    timer.wall.accumulated = accum;
    store
}

#[test]
fn aggregates_totcalls_across_threads() {
    let stores = vec![store_with("R", 3, 1.0), store_with("R", 5, 2.0)];
    let summary = aggregate(&stores);
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].totcalls, 8);
}

#[test]
fn wallmax_and_wallmin_carry_thread_provenance() {
    let stores = vec![
        store_with("R", 1, 1.0),
        store_with("R", 1, 4.0),
        store_with("R", 1, 2.0),
    ];
    let summary = &aggregate(&stores)[0];
    assert_eq!(summary.wallmax, 4.0);
    assert_eq!(summary.wallmax_thread, 1);
    assert_eq!(summary.wallmin, 1.0);
    assert_eq!(summary.wallmin_thread, 0);
}

#[test]
fn first_thread_wins_initial_unset_comparison() {
    let stores = vec![store_with("R", 1, 0.0)];
    let summary = &aggregate(&stores)[0];
    assert_eq!(summary.wallmax_thread, 0);
    assert_eq!(summary.wallmin_thread, 0);
}

#[test]
fn distinct_names_produce_distinct_summaries() {
    let stores = vec![store_with("A", 1, 1.0), store_with("B", 2, 2.0)];
    let names: Vec<String> = aggregate(&stores).iter().map(|s| s.name.clone()).collect();
    assert!(names.iter().any(|n| n == "A"));
    assert!(names.iter().any(|n| n == "B"));
}
