pub mod percentages;
pub mod summary;
pub mod tally;

pub use percentages::{normalize, PercentageResult};
pub use tally::VoteTally;

use serde::Serialize;

// Generic structure for poll results
#[derive(Debug, Clone, Serialize)]
pub struct PollResults {
    pub winner: String,                // Leading option, "Tie" or "No votes were cast"
    pub summary: String,               // Detailed results as formatted text
    pub leader: Option<usize>,         // Position of the leading option, if any
    pub total_votes: u64,
    pub raw_results: Vec<OptionResult>, // Per-option counts in display order
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionResult {
    pub position: usize,
    pub text: String,
    pub votes: u64,
    pub percentage: f64,
}
