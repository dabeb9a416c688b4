use crate::error::{PollError, Result};
use crate::models::Vote;
use crate::voting::percentages::{normalize, PercentageResult};
use log::warn;
use std::collections::HashMap;

/// Raw per-option vote counts in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTally {
    counts: Vec<u64>,
}

impl VoteTally {
    pub fn new(counts: Vec<u64>) -> Result<Self> {
        if counts.len() < 2 {
            return Err(PollError::InvalidPoll(format!(
                "a tally needs at least two options, got {}",
                counts.len()
            )));
        }
        Ok(Self { counts })
    }

    /// Counts one ballot per voter; a later ballot from the same voter replaces
    /// the earlier one.
    pub fn from_votes(option_count: usize, votes: &[Vote]) -> Result<Self> {
        let mut latest: HashMap<&str, &Vote> = HashMap::new();
        for vote in votes {
            let superseded = latest
                .get(vote.voter.as_str())
                .is_some_and(|existing| existing.cast_at > vote.cast_at);
            if !superseded {
                latest.insert(vote.voter.as_str(), vote);
            }
        }

        let mut counts = vec![0u64; option_count];
        for vote in latest.values() {
            match counts.get_mut(vote.option) {
                Some(count) => *count += 1,
                None => warn!(
                    "Ignoring vote from {} for missing option {} in poll {}",
                    vote.voter, vote.option, vote.poll_id
                ),
            }
        }

        Self::new(counts)
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn percentages(&self) -> PercentageResult {
        normalize(&self.counts)
    }
}
