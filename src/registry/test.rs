use std::sync::Arc;

use super::*;

#[test]
fn fork_join_validates_range_and_tracks_high_water_mark() {
    let reg = ThreadRegistry::new(ThreadingModel::ForkJoin { hint_maxthreads: 4 }, 4);
    assert_eq!(reg.thread_index(Some(2)).unwrap(), 2);
    assert_eq!(reg.nthreads(), 3);
    assert!(reg.thread_index(Some(10)).is_err());
    assert!(reg.thread_index(None).is_err());
}

#[test]
fn self_managed_discovers_same_thread_idempotently() {
    let reg = ThreadRegistry::new(ThreadingModel::SelfManaged, 64);
    let a = reg.thread_index(None).unwrap();
    let b = reg.thread_index(None).unwrap();
    assert_eq!(a, b);
}

#[test]
fn self_managed_assigns_distinct_indices_per_thread() {
    let reg = Arc::new(ThreadRegistry::new(ThreadingModel::SelfManaged, 64));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let reg = Arc::clone(&reg);
        handles.push(std::thread::spawn(move || reg.thread_index(None).unwrap()));
    }
    let mut seen: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 8);
    assert_eq!(reg.nthreads(), 8);
}

#[test]
fn self_managed_rejects_beyond_maxthreads() {
    let reg = ThreadRegistry::new(ThreadingModel::SelfManaged, 64);
    if let ThreadRegistry::SelfManaged { maxthreads, .. } = &reg {
        assert!(*maxthreads > 0);
    }
}
