use crate::config::MAX_BAR_WIDTH;
use crate::models::Poll;
use crate::voting::percentages::FULL_SCALE;
use crate::voting::{OptionResult, PollResults, VoteTally};

const BAR_FILLED: char = '█';
const BAR_EMPTY: char = '░';

pub fn calculate_results(poll: &Poll, tally: &VoteTally, bar_width: usize) -> PollResults {
    let percentages = tally.percentages();
    let total_votes = tally.total();

    let raw_results: Vec<OptionResult> = tally
        .counts()
        .iter()
        .enumerate()
        .map(|(position, votes)| OptionResult {
            position,
            text: poll.option_text(position).to_string(),
            votes: *votes,
            percentage: percentages.get(position).unwrap_or(0.0),
        })
        .collect();

    // If no votes were cast
    if total_votes == 0 {
        return PollResults {
            winner: "No votes were cast".to_string(),
            summary: "No votes were cast in this poll.".to_string(),
            leader: None,
            total_votes,
            raw_results,
        };
    }

    let top = tally.counts().iter().copied().max().unwrap_or(0);
    let leaders: Vec<&OptionResult> = raw_results.iter().filter(|r| r.votes == top).collect();
    let leader = match leaders.as_slice() {
        [only] => Some(only.position),
        _ => None,
    };
    let winner = match leader {
        Some(position) => poll.option_text(position).to_string(),
        None => format!(
            "Tie between {}",
            leaders.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join(", ")
        ),
    };

    let mut summary = format!("**{}**\n", poll.question);
    for (result, tenths) in raw_results.iter().zip(percentages.tenths()) {
        let name = if Some(result.position) == leader {
            format!("**{}**", result.text)
        } else {
            result.text.clone()
        };
        let noun = if result.votes == 1 { "vote" } else { "votes" };
        summary.push_str(&format!(
            "{}: {} {} ({:.1}%)",
            name, result.votes, noun, result.percentage
        ));
        if bar_width > 0 {
            summary.push(' ');
            summary.push_str(&render_bar(*tenths, bar_width));
        }
        summary.push('\n');
    }

    summary.push_str(&format!("\n{} votes cast.", total_votes));

    PollResults {
        winner,
        summary,
        leader,
        total_votes,
        raw_results,
    }
}

/// A fixed-width text progress bar for a share given in tenths of a percent.
/// Widths beyond `MAX_BAR_WIDTH` are clamped.
pub fn render_bar(tenths: u64, width: usize) -> String {
    let width = width.min(MAX_BAR_WIDTH);
    let tenths = tenths.min(FULL_SCALE);
    let filled = (tenths.saturating_mul(width as u64).saturating_add(FULL_SCALE / 2) / FULL_SCALE)
        .min(width as u64) as usize;
    let mut bar = String::with_capacity(width.saturating_mul(BAR_FILLED.len_utf8()));
    bar.extend(std::iter::repeat(BAR_FILLED).take(filled));
    bar.extend(std::iter::repeat(BAR_EMPTY).take(width - filled));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PollDraft;

    fn poll(options: &[&str]) -> Poll {
        Poll::new(PollDraft {
            creator: "0xabc".to_string(),
            question: "Lunch?".to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn renders_leader_and_percentages_in_display_order() {
        let poll = poll(&["Pizza", "Sushi", "Tacos"]);
        let tally = VoteTally::new(vec![1, 1, 2]).unwrap();
        let results = calculate_results(&poll, &tally, 4);

        assert_eq!(results.winner, "Tacos");
        assert_eq!(results.leader, Some(2));
        assert_eq!(results.total_votes, 4);
        assert_eq!(results.raw_results[0].percentage, 25.0);
        assert_eq!(
            results.summary,
            "**Lunch?**\nPizza: 1 vote (25.0%) █░░░\nSushi: 1 vote (25.0%) █░░░\n**Tacos**: 2 votes (50.0%) ██░░\n\n4 votes cast."
        );
    }

    #[test]
    fn reports_ties() {
        let poll = poll(&["Yes", "No"]);
        let tally = VoteTally::new(vec![3, 3]).unwrap();
        let results = calculate_results(&poll, &tally, 0);
        assert_eq!(results.winner, "Tie between Yes, No");
        assert_eq!(results.leader, None);
        assert!(!results.summary.contains('█'));
    }

    #[test]
    fn no_votes() {
        let poll = poll(&["Yes", "No"]);
        let tally = VoteTally::new(vec![0, 0]).unwrap();
        let results = calculate_results(&poll, &tally, 10);
        assert_eq!(results.winner, "No votes were cast");
        assert_eq!(results.raw_results.len(), 2);
        assert!(results.raw_results.iter().all(|r| r.percentage == 0.0));
    }

    #[test]
    fn bar_widths() {
        assert_eq!(render_bar(0, 5), "░░░░░");
        assert_eq!(render_bar(1000, 5), "█████");
        assert_eq!(render_bar(334, 3), "█░░");
        assert_eq!(render_bar(500, 0), "");
    }

    #[test]
    fn oversized_bar_width_is_clamped() {
        let bar = render_bar(1000, usize::MAX / 100);
        assert_eq!(bar.chars().count(), MAX_BAR_WIDTH);
        assert!(bar.chars().all(|c| c == BAR_FILLED));
    }
}
