//! kellysizer: Kelly criterion position sizing for stock and call option
//! portfolios.
//!
//! Hexagonal architecture: estimation, sizing and scoring in [`domain`],
//! port traits in [`ports`], file-backed implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
