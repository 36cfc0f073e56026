//! Core domain types and logic.

pub mod price;
pub mod estimator;
pub mod kelly;
pub mod unified;
pub mod greeks;
pub mod option;
pub mod scoring;
pub mod option_kelly;
pub mod allocation;
pub mod risk;
pub mod pipeline;
pub mod config_validation;
pub mod error;
