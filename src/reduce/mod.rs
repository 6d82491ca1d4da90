//! Distributed summary reducer (§4.7): a logarithmic tree reduction over an opaque
//! communicator of *N* ranks, combining per-rank region statistics with Chan's
//! single-pass parallel mean/variance algorithm. Tolerates non-power-of-two *N*.

#[cfg(test)]
mod test;

mod in_process;

pub use in_process::InProcessCommunicator;

use crate::error::Result;
use crate::stats::RegionSummary;

/// Where an extremum came from: the contributing rank, and (if known) the thread within
/// that rank's process.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Provenance {
    pub rank: usize,
    pub thread: Option<usize>,
}

/// One region's fully-reducible summary (§3's GlobalRegion). `mean`/`m2`/`n` are Chan's
/// running statistics over the per-rank max-over-threads wall samples.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalRegion {
    pub name: String,
    pub totcalls: u64,
    pub tottsk: usize,
    pub wallmax: f64,
    pub wallmax_provenance: Provenance,
    pub wallmin: f64,
    pub wallmin_provenance: Provenance,
    pub mean: f64,
    pub m2: f64,
    pub n: u64,
}

impl GlobalRegion {
    /// Seeds a single rank's contribution: one sample (this rank's max-over-threads wall
    /// accumulation for the region), `n = 1`, `m2 = 0`.
    pub fn from_rank_summary(rank: usize, summary: &RegionSummary) -> GlobalRegion {
        GlobalRegion {
            name: summary.name.clone(),
            totcalls: summary.totcalls,
            tottsk: 1,
            wallmax: summary.wallmax,
            wallmax_provenance: Provenance {
                rank,
                thread: Some(summary.wallmax_thread),
            },
            wallmin: summary.wallmin,
            wallmin_provenance: Provenance {
                rank,
                thread: Some(summary.wallmin_thread),
            },
            mean: summary.wallmax,
            m2: 0.0,
            n: 1,
        }
    }

    /// Sample standard deviation derived from `m2`/`n` (used by the summary report).
    pub fn stdev(&self) -> f64 {
        if self.n <= 1 {
            0.0
        } else {
            (self.m2 / (self.n - 1) as f64).sqrt()
        }
    }
}

/// Combines two same-named regions by Chan's parallel formula (§4.7):
///
/// δ = mean_b − mean_a; N = n_a + n_b
/// mean' = mean_a + δ·n_b/N; m2' = m2_a + m2_b + δ²·(n_a·n_b)/N
fn merge(a: &GlobalRegion, b: &GlobalRegion) -> GlobalRegion {
    let delta = b.mean - a.mean;
    let n = a.n + b.n;
    let mean = a.mean + delta * b.n as f64 / n as f64;
    let m2 = a.m2 + b.m2 + delta * delta * (a.n as f64 * b.n as f64) / n as f64;

    // "Zero is unset" (§4.6) carries over to the reducer: an empty side always loses.
    let (wallmax, wallmax_provenance) = if a.wallmax == 0.0 {
        (b.wallmax, b.wallmax_provenance)
    } else if b.wallmax == 0.0 || b.wallmax <= a.wallmax {
        (a.wallmax, a.wallmax_provenance)
    } else {
        (b.wallmax, b.wallmax_provenance)
    };
    let (wallmin, wallmin_provenance) = if a.wallmin == 0.0 {
        (b.wallmin, b.wallmin_provenance)
    } else if b.wallmin == 0.0 || b.wallmin >= a.wallmin {
        (a.wallmin, a.wallmin_provenance)
    } else {
        (b.wallmin, b.wallmin_provenance)
    };

    GlobalRegion {
        name: a.name.clone(),
        totcalls: a.totcalls + b.totcalls,
        tottsk: a.tottsk + b.tottsk,
        wallmax,
        wallmax_provenance,
        wallmin,
        wallmin_provenance,
        mean,
        m2,
        n,
    }
}

/// Merges an incoming rank's region array into the receiving side's, per §4.7: linear
/// search by name, merge on hit, append verbatim on miss.
fn merge_all(mut current: Vec<GlobalRegion>, incoming: Vec<GlobalRegion>) -> Vec<GlobalRegion> {
    for region in incoming {
        match current.iter().position(|r| r.name == region.name) {
            Some(pos) => current[pos] = merge(&current[pos], &region),
            None => current.push(region),
        }
    }
    current
}

/// Transport for the reduction. Blocks on send/receive; does not time itself (§5).
/// `&mut self` because the obvious implementations (channels, sockets) need mutable
/// access to poll/drain; an implementation backed by a truly stateless transport can
/// ignore that.
pub trait Communicator {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn send(&mut self, to: usize, regions: Vec<GlobalRegion>) -> Result<()>;
    fn recv(&mut self, from: usize) -> Result<Vec<GlobalRegion>>;

    /// Synchronization point every rank reaches before continuing (§6's `barrier`). The
    /// default assumes a single rank and returns immediately; multi-rank transports
    /// should override it with a real collective.
    fn barrier(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Runs the log-N tree reduction (§4.7) starting from this rank's local `regions`.
/// Returns this rank's resulting array; only rank 0's result is the fully reduced one.
pub fn reduce_summary(
    comm: &mut dyn Communicator,
    mut regions: Vec<GlobalRegion>,
) -> Result<Vec<GlobalRegion>> {
    let n = comm.size();
    let iam = comm.rank();

    // The original special-cases N=1: no communication, rank 0's array is already
    // the (trivially) reduced one.
    if n <= 1 {
        return Ok(regions);
    }

    let mut incr: usize = 1;
    while incr < n {
        let two = incr * 2;
        let sendto = iam as isize - incr as isize;
        let recvfm = iam + incr;
        let dosend = (iam + incr) % two == 0 && sendto >= 0;
        let dorecv = (iam + two) % two == 0 && recvfm < n;

        if dosend && dorecv {
            log::warn!("rank {iam}: both send and receive scheduled in iteration incr={incr}");
        }
        if dosend {
            comm.send(sendto as usize, regions.clone())?;
        }
        if dorecv {
            let incoming = comm.recv(recvfm)?;
            regions = merge_all(regions, incoming);
        }
        incr = two;
    }
    Ok(regions)
}
