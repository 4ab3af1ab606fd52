//! Metastable consensus over a DAG of containers.
//!
//! Containers are polled by repeatedly sampling `k` validators. A round in which at least
//! `alpha` of them vote for a container confirms it, and `beta` consecutive confirmations
//! of an unchanged preference make it final.
pub mod bootstrap;
pub mod conflict_set;
pub mod engine;
pub mod poll;
pub mod tally;

pub use bootstrap::{Bootstrapper, Step};
pub use conflict_set::ConflictSet;
pub use engine::Engine;
pub use poll::Poll;
pub use tally::{Decisions, VoteTally};

use crate::{Error, Result};

/// Consensus safety parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameters {
    /// Sample size of a polling round.
    pub k: usize,
    /// Votes needed within a sample for a conclusive round.
    pub alpha: usize,
    /// Confidence needed to accept a container without conflicts.
    pub beta1: u32,
    /// Confidence needed to accept a contested container.
    pub beta2: u32,
}

impl Parameters {
    pub fn new(k: usize, alpha: usize, beta1: u32, beta2: u32) -> Result<Parameters> {
        let params = Parameters { k, alpha, beta1, beta2 };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.alpha == 0 || self.alpha > self.k {
            return Err(Error::InvalidParameters(format!(
                "alpha = {} must be in [1, k = {}]",
                self.alpha, self.k
            )));
        }
        // Two disjoint majorities cannot exist within one sample.
        if 2 * self.alpha <= self.k {
            return Err(Error::InvalidParameters(format!(
                "alpha = {} must be a majority of k = {}",
                self.alpha, self.k
            )));
        }
        if self.beta1 == 0 || self.beta1 > self.beta2 {
            return Err(Error::InvalidParameters(format!(
                "beta1 = {} must be in [1, beta2 = {}]",
                self.beta1, self.beta2
            )));
        }
        Ok(())
    }
}

/// The lifecycle of a container. `Accepted` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Unknown,
    Processing,
    Accepted,
    Rejected,
}

impl Status {
    pub fn is_decided(&self) -> bool {
        match self {
            Status::Accepted | Status::Rejected => true,
            Status::Unknown | Status::Processing => false,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
