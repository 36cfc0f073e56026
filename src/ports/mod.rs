//! Port traits for the collaborators around the sizing core.

pub mod config_port;
pub mod market_data_port;
pub mod report_port;
