use crate::error::Result;
use crate::ledger::PollLedger;
use crate::voting::summary::calculate_results;
use crate::voting::{PollResults, VoteTally};
use chrono::{DateTime, Utc};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Closes every active poll whose end time is before `now` and returns the
/// final results of each.
pub async fn close_expired_polls(
    ledger: &dyn PollLedger,
    now: DateTime<Utc>,
    bar_width: usize,
) -> Result<Vec<(String, PollResults)>> {
    let expired = ledger.expired_polls(now).await?;
    if !expired.is_empty() {
        info!("Found {} expired poll(s).", expired.len());
    }

    let mut closed = Vec::with_capacity(expired.len());
    for poll_id in expired {
        // One bad poll shouldn't keep the rest open
        match finish_poll(ledger, &poll_id, bar_width).await {
            Ok(results) => {
                info!(
                    "Poll {} ended. Winner: {} ({} votes)",
                    poll_id, results.winner, results.total_votes
                );
                closed.push((poll_id, results));
            }
            Err(e) => error!("Error processing expired poll {}: {}", poll_id, e),
        }
    }
    Ok(closed)
}

async fn finish_poll(ledger: &dyn PollLedger, poll_id: &str, bar_width: usize) -> Result<PollResults> {
    ledger.close_poll(poll_id).await?;
    let poll = ledger.get_poll(poll_id).await?;
    let tally = VoteTally::new(ledger.vote_counts(poll_id).await?)?;
    Ok(calculate_results(&poll, &tally, bar_width))
}

pub async fn check_expired_polls_task(ledger: Arc<dyn PollLedger>, every: Duration, bar_width: usize) {
    info!("Starting background task to check for expired polls every {:?}", every);
    let mut interval = interval(every);

    loop {
        interval.tick().await;
        let now = Utc::now();
        match close_expired_polls(ledger.as_ref(), now, bar_width).await {
            Ok(closed) => {
                for (poll_id, results) in closed {
                    info!("Final results for poll {}:\n{}", poll_id, results.summary);
                }
            }
            Err(e) => error!("Failed to query for expired polls: {}", e),
        }
    }
}
