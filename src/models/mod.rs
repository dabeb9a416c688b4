use crate::access::validate_access_code;
use crate::error::{PollError, Result};
use crate::geo::Coordinates;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub creator: String,
    pub question: String,
    pub description: Option<String>,
    pub options: Vec<PollOption>,
    pub visibility: Visibility,
    pub geo_restriction: Option<GeoRestriction>,
    pub created_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub position: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private { access_code: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRestriction {
    pub label: String,
    pub center: Coordinates,
    pub radius_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub voter: String,
    pub poll_id: String,
    pub option: usize,
    pub cast_at: DateTime<Utc>,
}

/// Everything a creator fills in before a poll exists.
#[derive(Debug, Clone, Default)]
pub struct PollDraft {
    pub creator: String,
    pub question: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    pub access_code: Option<String>,
    pub geo_restriction: Option<GeoRestriction>,
    pub duration_minutes: Option<i64>,
}

impl Poll {
    pub fn new(draft: PollDraft) -> Result<Self> {
        let creator = draft.creator.trim().to_string();
        if creator.is_empty() {
            return Err(PollError::InvalidPoll("a poll needs a creator".to_string()));
        }

        let question = draft.question.trim().to_string();
        if question.is_empty() {
            return Err(PollError::InvalidPoll(
                "please enter a question for your poll".to_string(),
            ));
        }

        if draft.options.len() < 2 {
            return Err(PollError::InvalidPoll(
                "a poll needs at least two options".to_string(),
            ));
        }
        if draft.options.iter().any(|text| text.trim().is_empty()) {
            return Err(PollError::InvalidPoll("please fill in all options".to_string()));
        }

        let visibility = match draft.access_code {
            Some(code) => Visibility::Private {
                access_code: validate_access_code(&code).map_err(PollError::InvalidPoll)?,
            },
            None => Visibility::Public,
        };

        if let Some(geo) = &draft.geo_restriction {
            if geo.label.trim().is_empty() {
                return Err(PollError::InvalidPoll(
                    "geo-restricted polls need a location".to_string(),
                ));
            }
            if !(geo.radius_km.is_finite() && geo.radius_km > 0.0) {
                return Err(PollError::InvalidPoll(
                    "geo restriction radius must be a positive number of kilometres".to_string(),
                ));
            }
        }

        if let Some(mins) = draft.duration_minutes {
            if mins <= 0 {
                return Err(PollError::InvalidPoll(
                    "poll duration must be positive".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let ends_at = match draft.duration_minutes {
            Some(mins) => Some(
                Duration::try_minutes(mins)
                    .and_then(|length| now.checked_add_signed(length))
                    .ok_or_else(|| PollError::InvalidPoll("poll duration is too long".to_string()))?,
            ),
            None => None,
        };

        let options = draft
            .options
            .into_iter()
            .enumerate()
            .map(|(position, text)| PollOption {
                position,
                text: text.trim().to_string(),
            })
            .collect();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            creator,
            question,
            description: draft
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            options,
            visibility,
            geo_restriction: draft.geo_restriction,
            created_at: now,
            ends_at,
            is_active: true,
        })
    }

    pub fn is_public(&self) -> bool {
        matches!(self.visibility, Visibility::Public)
    }

    /// Open for voting: not closed and not past its end time.
    pub fn accepts_votes(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.ends_at.map_or(true, |end| now < end)
    }

    pub fn option_text(&self, position: usize) -> &str {
        self.options
            .iter()
            .find(|option| option.position == position)
            .map(|option| option.text.as_str())
            .unwrap_or("Unknown Option")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> PollDraft {
        PollDraft {
            creator: "0xabc".to_string(),
            question: "Best language?".to_string(),
            options: vec!["Rust".to_string(), "Go".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn creates_public_poll_with_ordered_options() {
        let poll = Poll::new(draft()).unwrap();
        assert!(poll.is_public());
        assert!(poll.is_active);
        assert!(poll.ends_at.is_none());
        assert_eq!(poll.options[0], PollOption { position: 0, text: "Rust".to_string() });
        assert_eq!(poll.option_text(1), "Go");
        assert_eq!(poll.option_text(7), "Unknown Option");
    }

    #[test]
    fn rejects_single_option() {
        let mut d = draft();
        d.options.pop();
        assert!(matches!(Poll::new(d), Err(PollError::InvalidPoll(_))));
    }

    #[test]
    fn rejects_blank_question_and_options() {
        let mut d = draft();
        d.question = "  ".to_string();
        assert!(Poll::new(d).is_err());

        let mut d = draft();
        d.options.push(" ".to_string());
        assert!(Poll::new(d).is_err());
    }

    #[test]
    fn private_poll_requires_valid_code() {
        let mut d = draft();
        d.access_code = Some("no".to_string());
        assert!(Poll::new(d).is_err());

        let mut d = draft();
        d.access_code = Some("secret-1".to_string());
        let poll = Poll::new(d).unwrap();
        assert_eq!(
            poll.visibility,
            Visibility::Private { access_code: "secret-1".to_string() }
        );
    }

    #[test]
    fn geo_restriction_needs_label_and_radius() {
        let center = Coordinates::new(40.7128, -74.0060).unwrap();

        let mut d = draft();
        d.geo_restriction = Some(GeoRestriction { label: "".to_string(), center, radius_km: 10.0 });
        assert!(Poll::new(d).is_err());

        let mut d = draft();
        d.geo_restriction = Some(GeoRestriction { label: "New York".to_string(), center, radius_km: 0.0 });
        assert!(Poll::new(d).is_err());
    }

    #[test]
    fn duration_sets_end_time() {
        let mut d = draft();
        d.duration_minutes = Some(30);
        let poll = Poll::new(d).unwrap();
        let end = poll.ends_at.unwrap();
        assert_eq!(end - poll.created_at, Duration::minutes(30));
        assert!(poll.accepts_votes(poll.created_at));
        assert!(!poll.accepts_votes(end));

        let mut d = draft();
        d.duration_minutes = Some(0);
        assert!(Poll::new(d).is_err());
    }

    #[test]
    fn absurd_durations_are_rejected() {
        for mins in [i64::MAX, 1_000_000_000_000] {
            let mut d = draft();
            d.duration_minutes = Some(mins);
            assert!(matches!(Poll::new(d), Err(PollError::InvalidPoll(_))), "{}", mins);
        }
    }
}
