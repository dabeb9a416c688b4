use crate::error::Result;
use crate::ledger::PollLedger;
use crate::models::Poll;
use crate::voting::summary::render_bar;
use crate::voting::{normalize, PercentageResult};

/// One row of the public poll board.
#[derive(Debug, Clone)]
pub struct PollListing {
    pub poll: Poll,
    pub counts: Vec<u64>,
    pub percentages: PercentageResult,
    pub total_votes: u64,
    pub most_popular: bool,
    /// `None` when no voter was given.
    pub has_voted: Option<bool>,
}

/// Active public polls, most votes first. Polls with equal totals keep the
/// ledger's newest-first order. The top poll is flagged as most popular when
/// there is more than one.
pub async fn public_poll_board(ledger: &dyn PollLedger, voter: Option<&str>) -> Result<Vec<PollListing>> {
    let polls = ledger.public_polls().await?;

    let mut board = Vec::with_capacity(polls.len());
    for poll in polls {
        let counts = ledger.vote_counts(&poll.id).await?;
        let has_voted = match voter {
            Some(voter) => Some(ledger.has_voted(&poll.id, voter).await?),
            None => None,
        };
        board.push(PollListing {
            percentages: normalize(&counts),
            total_votes: counts.iter().sum(),
            counts,
            poll,
            most_popular: false,
            has_voted,
        });
    }

    board.sort_by(|a, b| b.total_votes.cmp(&a.total_votes));
    if board.len() > 1 {
        board[0].most_popular = true;
    }
    Ok(board)
}

pub fn render_listing(listing: &PollListing, bar_width: usize) -> String {
    let poll = &listing.poll;
    let noun = if listing.total_votes == 1 { "vote" } else { "votes" };

    let mut header = format!("{}  {}", poll.id, poll.question);
    if listing.most_popular {
        header.push_str("  [Popular]");
    }
    if let Some(geo) = &poll.geo_restriction {
        header.push_str(&format!("  [{} +{}km]", geo.label, geo.radius_km));
    }
    match listing.has_voted {
        Some(true) => header.push_str("  (Already Voted)"),
        Some(false) => header.push_str("  (Vote Now)"),
        None => {}
    }

    let mut out = format!("{}\n    {} {}\n", header, listing.total_votes, noun);
    for (option, (votes, tenths)) in poll
        .options
        .iter()
        .zip(listing.counts.iter().zip(listing.percentages.tenths()))
    {
        let noun = if *votes == 1 { "vote" } else { "votes" };
        out.push_str(&format!(
            "    {}. {}: {} {} ({:.1}%)",
            option.position + 1,
            option.text,
            votes,
            noun,
            *tenths as f64 / 10.0
        ));
        if bar_width > 0 {
            out.push(' ');
            out.push_str(&render_bar(*tenths, bar_width));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::PollDraft;

    fn poll(question: &str, access_code: Option<&str>) -> Poll {
        Poll::new(PollDraft {
            creator: "0xabc".to_string(),
            question: question.to_string(),
            options: vec!["Yes".to_string(), "No".to_string(), "Maybe".to_string()],
            access_code: access_code.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    async fn vote(db: &Database, poll: &Poll, voter: &str, option: usize) {
        db.cast_vote(&poll.id, voter, option, None, None).await.unwrap();
    }

    #[tokio::test]
    async fn orders_by_total_votes_and_flags_most_popular() {
        let db = Database::in_memory().await.unwrap();
        let quiet = poll("Quiet?", None);
        let busy = poll("Busy?", None);
        let middling = poll("Middling?", None);
        let hidden = poll("Hidden?", Some("secret"));
        for p in [&quiet, &busy, &middling, &hidden] {
            db.create_poll(p).await.unwrap();
        }

        for voter in ["a", "b", "c"] {
            vote(&db, &busy, voter, 0).await;
        }
        vote(&db, &middling, "a", 1).await;
        vote(&db, &middling, "b", 2).await;

        let board = public_poll_board(&db, Some("a")).await.unwrap();
        let order: Vec<&str> = board.iter().map(|l| l.poll.question.as_str()).collect();
        assert_eq!(order, vec!["Busy?", "Middling?", "Quiet?"]);
        assert_eq!(board.iter().map(|l| l.total_votes).collect::<Vec<_>>(), vec![3, 2, 0]);

        assert!(board[0].most_popular);
        assert!(board[1..].iter().all(|l| !l.most_popular));

        assert_eq!(board[0].has_voted, Some(true));
        assert_eq!(board[2].has_voted, Some(false));
        assert_eq!(board[1].percentages.percentages(), vec![0.0, 50.0, 50.0]);
    }

    #[tokio::test]
    async fn single_poll_is_not_flagged_popular() {
        let db = Database::in_memory().await.unwrap();
        let only = poll("Only?", None);
        db.create_poll(&only).await.unwrap();

        let board = public_poll_board(&db, None).await.unwrap();
        assert_eq!(board.len(), 1);
        assert!(!board[0].most_popular);
        assert_eq!(board[0].has_voted, None);
    }

    #[tokio::test]
    async fn renders_percentages_and_voted_state() {
        let db = Database::in_memory().await.unwrap();
        let p = poll("Ship?", None);
        db.create_poll(&p).await.unwrap();
        for voter in ["a", "b", "c"] {
            vote(&db, &p, voter, 0).await;
        }
        vote(&db, &p, "d", 1).await;
        vote(&db, &p, "e", 2).await;
        vote(&db, &p, "f", 2).await;

        let board = public_poll_board(&db, Some("a")).await.unwrap();
        let text = render_listing(&board[0], 0);
        assert!(text.contains("(Already Voted)"));
        assert!(text.contains("6 votes"));
        assert!(text.contains("1. Yes: 3 votes (50.0%)"));
        assert!(text.contains("2. No: 1 vote (16.7%)"));
        assert!(text.contains("3. Maybe: 2 votes (33.3%)"));
    }
}
