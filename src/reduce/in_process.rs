//! A single-process [`Communicator`] backed by `futures::channel::mpsc` rendezvous
//! channels. Used for testing the reducer and for simulating a distributed run without
//! an actual cluster transport.

use futures::channel::mpsc::{channel, Receiver, Sender};
use futures::executor::block_on;
use futures::{SinkExt, StreamExt};

use super::{Communicator, GlobalRegion};
use crate::error::{Error, Result};

pub struct InProcessCommunicator {
    rank: usize,
    size: usize,
    out: Vec<Option<Sender<Vec<GlobalRegion>>>>,
    in_: Vec<Option<Receiver<Vec<GlobalRegion>>>>,
}

impl InProcessCommunicator {
    /// Builds `n` communicators, one per simulated rank, fully meshed (every ordered
    /// pair gets its own rendezvous channel).
    pub fn fleet(n: usize) -> Vec<InProcessCommunicator> {
        let mut out: Vec<Vec<Option<Sender<Vec<GlobalRegion>>>>> =
            (0..n).map(|_| (0..n).map(|_| None).collect()).collect();
        let mut in_: Vec<Vec<Option<Receiver<Vec<GlobalRegion>>>>> =
            (0..n).map(|_| (0..n).map(|_| None).collect()).collect();

        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let (tx, rx) = channel(0);
                    out[i][j] = Some(tx);
                    in_[j][i] = Some(rx);
                }
            }
        }

        (0..n)
            .map(|i| InProcessCommunicator {
                rank: i,
                size: n,
                out: std::mem::take(&mut out[i]),
                in_: std::mem::take(&mut in_[i]),
            })
            .collect()
    }
}

impl Communicator for InProcessCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&mut self, to: usize, regions: Vec<GlobalRegion>) -> Result<()> {
        let tx = self.out.get_mut(to).and_then(Option::as_mut).ok_or_else(|| {
            Error::CommunicationFailure(format!("rank {} has no channel to {to}", self.rank))
        })?;
        block_on(tx.send(regions)).map_err(|e| Error::CommunicationFailure(e.to_string()))
    }

    fn recv(&mut self, from: usize) -> Result<Vec<GlobalRegion>> {
        let rx = self.in_.get_mut(from).and_then(Option::as_mut).ok_or_else(|| {
            Error::CommunicationFailure(format!("rank {} has no channel from {from}", self.rank))
        })?;
        block_on(rx.next())
            .ok_or_else(|| Error::CommunicationFailure(format!("channel from rank {from} closed")))
    }

    fn barrier(&mut self) -> Result<()> {
        for to in 0..self.size {
            if to != self.rank {
                self.send(to, Vec::new())?;
            }
        }
        for from in 0..self.size {
            if from != self.rank {
                self.recv(from)?;
            }
        }
        Ok(())
    }
}
