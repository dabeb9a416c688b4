pub mod access;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod ledger;
pub mod listing;
pub mod models;
pub mod tasks;
pub mod voting;

pub use error::{PollError, Result};
pub use voting::{normalize, PercentageResult, VoteTally};
