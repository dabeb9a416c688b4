use crate::config::Config;
use crate::error::{PollError, Result};
use crate::geo::Coordinates;
use crate::ledger::PollLedger;
use crate::listing::{public_poll_board, render_listing};
use crate::models::{GeoRestriction, Poll, PollDraft};
use crate::tasks::poll_ender::{check_expired_polls_task, close_expired_polls};
use crate::voting::summary::calculate_results;
use crate::voting::VoteTally;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "trusty-tally", version, about = "Create polls, vote and read results")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new poll
    Create(CreateArgs),

    /// Vote in a poll
    Vote(VoteArgs),

    /// Show a poll's results
    Results {
        poll_id: String,

        /// Print machine-readable JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List active public polls, most votes first
    List {
        /// Show whether this address has already voted in each poll
        #[arg(long)]
        voter: Option<String>,
    },

    /// List polls created by an address
    History {
        #[arg(long)]
        creator: String,
    },

    /// End a poll early (creator only)
    End {
        poll_id: String,

        #[arg(long)]
        caller: String,
    },

    /// Close every poll past its end time, once
    CloseExpired,

    /// Keep closing expired polls in the background until interrupted
    Watch,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub creator: String,

    #[arg(long)]
    pub question: String,

    #[arg(long)]
    pub description: Option<String>,

    /// Repeat once per option, in display order
    #[arg(long = "option", required = true)]
    pub options: Vec<String>,

    /// Makes the poll private
    #[arg(long)]
    pub access_code: Option<String>,

    /// Restrict voting to an area, e.g. "Berlin"
    #[arg(long, requires = "center", requires = "radius_km")]
    pub location: Option<String>,

    /// Centre of the voting area as "lat,lon"
    #[arg(long, requires = "location", allow_hyphen_values = true)]
    pub center: Option<Coordinates>,

    #[arg(long, requires = "location")]
    pub radius_km: Option<f64>,

    #[arg(long)]
    pub duration_minutes: Option<i64>,
}

#[derive(Args, Debug)]
pub struct VoteArgs {
    pub poll_id: String,

    #[arg(long)]
    pub voter: String,

    /// Option number as shown in the results, starting at 1
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub option: u64,

    #[arg(long)]
    pub access_code: Option<String>,

    /// Voter location as "lat,lon", needed for geo-restricted polls
    #[arg(long, allow_hyphen_values = true)]
    pub at: Option<Coordinates>,
}

impl CreateArgs {
    fn into_draft(self) -> PollDraft {
        let geo_restriction = match (self.location, self.center, self.radius_km) {
            (Some(label), Some(center), Some(radius_km)) => Some(GeoRestriction {
                label,
                center,
                radius_km,
            }),
            _ => None,
        };

        PollDraft {
            creator: self.creator,
            question: self.question,
            description: self.description,
            options: self.options,
            access_code: self.access_code,
            geo_restriction,
            duration_minutes: self.duration_minutes,
        }
    }
}

pub async fn run(cli: Cli, ledger: Arc<dyn PollLedger>, config: &Config) -> Result<()> {
    match cli.command {
        Command::Create(args) => {
            let poll = Poll::new(args.into_draft())?;
            ledger.create_poll(&poll).await?;
            println!("Created poll {}", poll.id);
        }
        Command::Vote(args) => {
            let option = (args.option - 1) as usize;
            ledger
                .cast_vote(
                    &args.poll_id,
                    &args.voter,
                    option,
                    args.access_code.as_deref(),
                    args.at,
                )
                .await?;
            println!("Vote recorded.");
        }
        Command::Results { poll_id, json } => {
            let poll = ledger.get_poll(&poll_id).await?;
            let tally = VoteTally::new(ledger.vote_counts(&poll_id).await?)?;
            let results = calculate_results(&poll, &tally, config.bar_width);
            if json {
                let out = serde_json::to_string_pretty(&results)
                    .map_err(|e| PollError::InvalidPoll(format!("cannot encode results: {}", e)))?;
                println!("{}", out);
            } else {
                println!("{}", results.summary);
            }
        }
        Command::List { voter } => {
            let board = public_poll_board(ledger.as_ref(), voter.as_deref()).await?;
            if board.is_empty() {
                println!("No polls found.");
            }
            for listing in &board {
                println!("{}", render_listing(listing, config.bar_width));
            }
        }
        Command::History { creator } => print_polls(&ledger.polls_by_creator(&creator).await?),
        Command::End { poll_id, caller } => {
            ledger.end_poll(&poll_id, &caller).await?;
            println!("Poll {} ended.", poll_id);
        }
        Command::CloseExpired => {
            let closed = close_expired_polls(ledger.as_ref(), Utc::now(), config.bar_width).await?;
            for (_, results) in &closed {
                println!("{}\n", results.summary);
            }
            println!("Closed {} poll(s).", closed.len());
        }
        Command::Watch => {
            check_expired_polls_task(ledger, config.check_interval, config.bar_width).await;
        }
    }
    Ok(())
}

fn print_polls(polls: &[Poll]) {
    if polls.is_empty() {
        println!("No polls found.");
        return;
    }
    for poll in polls {
        let status = if poll.is_active { "open" } else { "closed" };
        let mut tags = Vec::new();
        if !poll.is_public() {
            tags.push("private".to_string());
        }
        if let Some(geo) = &poll.geo_restriction {
            tags.push(format!("{} +{}km", geo.label, geo.radius_km));
        }
        let tags = if tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", tags.join(", "))
        };
        println!("{}  {}  ({}){}", poll.id, poll.question, status, tags);
        for option in &poll.options {
            println!("    {}. {}", option.position + 1, option.text);
        }
    }
}
