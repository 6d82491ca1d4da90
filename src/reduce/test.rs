use proptest::prelude::*;

use super::*;
use crate::stats::RegionSummary;

fn region(rank: usize, wall: f64, calls: u64) -> GlobalRegion {
    let summary = RegionSummary {
        name: "R".to_string(),
        totcalls: calls,
        wall_accumulated: wall,
        wallmax: wall,
        wallmax_thread: 0,
        wallmin: wall,
        wallmin_thread: 0,
    };
    GlobalRegion::from_rank_summary(rank, &summary)
}

fn sequential_mean_m2(samples: &[f64]) -> (f64, f64) {
    let mut mean = 0.0;
    let mut m2 = 0.0;
    let mut n = 0.0;
    for &x in samples {
        n += 1.0;
        let delta = x - mean;
        mean += delta / n;
        m2 += delta * (x - mean);
    }
    (mean, m2)
}

fn run_reduction(wall_per_rank: &[f64]) -> GlobalRegion {
    let n = wall_per_rank.len();
    let mut comms = InProcessCommunicator::fleet(n);
    let handles: Vec<_> = wall_per_rank
        .iter()
        .enumerate()
        .map(|(rank, &wall)| {
            let mut comm = comms.remove(0);
            let regions = vec![region(rank, wall, 1)];
            std::thread::spawn(move || reduce_summary(&mut comm, regions).unwrap())
        })
        .collect();
    let mut results: Vec<Vec<GlobalRegion>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    results.remove(0).remove(0)
}

#[test]
fn scenario_5_three_rank_reduction() {
    let result = run_reduction(&[1.0, 2.0, 4.0]);
    assert_eq!(result.totcalls, 3);
    assert_eq!(result.tottsk, 3);
    assert_eq!(result.wallmax, 4.0);
    assert_eq!(result.wallmax_provenance.rank, 2);
    assert_eq!(result.wallmin, 1.0);
    assert_eq!(result.wallmin_provenance.rank, 0);
    assert!((result.mean - 2.333333).abs() < 1e-5);
    assert!((result.stdev() - 1.527525).abs() < 1e-5);
}

#[test]
fn single_rank_skips_communication() {
    let mut comm = InProcessCommunicator::fleet(1).remove(0);
    let regions = vec![region(0, 5.0, 1)];
    let out = reduce_summary(&mut comm, regions.clone()).unwrap();
    assert_eq!(out, regions);
}

#[test]
fn miss_on_name_appends_verbatim() {
    let a = vec![region(0, 1.0, 1)];
    let mut b = region(1, 2.0, 1);
    b.name = "Other".to_string();
    let merged = merge_all(a, vec![b]);
    assert_eq!(merged.len(), 2);
}

proptest! {
    // P5: for N not necessarily a power of two, totcalls sums exactly and mean/m2 match
    // a sequential one-pass computation to within 1e-6 relative error.
    #[test]
    fn prop_reduction_matches_sequential(walls in proptest::collection::vec(1.0f64..100.0, 1..9)) {
        let result = run_reduction(&walls);
        let (seq_mean, seq_m2) = sequential_mean_m2(&walls);
        prop_assert_eq!(result.totcalls, walls.len() as u64);
        prop_assert_eq!(result.tottsk, walls.len());
        let rel_err = (result.mean - seq_mean).abs() / seq_mean.abs().max(1.0);
        prop_assert!(rel_err < 1e-6, "mean mismatch: {} vs {}", result.mean, seq_mean);
        let m2_scale = seq_m2.abs().max(1.0);
        prop_assert!((result.m2 - seq_m2).abs() / m2_scale < 1e-6, "m2 mismatch: {} vs {}", result.m2, seq_m2);
    }
}
