//! The validator view used for sampling query targets.
//!
//! A [ValidatorSet] is a read-only snapshot of validator weights, replaced wholesale on
//! membership changes. The [Sampler] draws query targets from it.
mod sampler;
mod validator_set;

pub use sampler::{Sampler, SamplingMode};
pub use validator_set::{ValidatorSet, Weight};
