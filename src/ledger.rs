use crate::access::access_code_matches;
use crate::error::{PollError, Result};
use crate::geo::{haversine_km, is_within_radius, Coordinates};
use crate::models::{Poll, Visibility};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Where polls and votes live. Stands in for the on-chain poll contract.
#[async_trait]
pub trait PollLedger: Send + Sync {
    async fn create_poll(&self, poll: &Poll) -> Result<()>;

    async fn get_poll(&self, poll_id: &str) -> Result<Poll>;

    /// Active public polls, newest first.
    async fn public_polls(&self) -> Result<Vec<Poll>>;

    async fn polls_by_creator(&self, creator: &str) -> Result<Vec<Poll>>;

    async fn cast_vote(
        &self,
        poll_id: &str,
        voter: &str,
        option: usize,
        access_code: Option<&str>,
        location: Option<Coordinates>,
    ) -> Result<()>;

    async fn has_voted(&self, poll_id: &str, voter: &str) -> Result<bool>;

    /// Per-option counts in display order.
    async fn vote_counts(&self, poll_id: &str) -> Result<Vec<u64>>;

    async fn end_poll(&self, poll_id: &str, caller: &str) -> Result<()>;

    /// Ids of active polls whose end time is before `now`.
    async fn expired_polls(&self, now: DateTime<Utc>) -> Result<Vec<String>>;

    /// Closes a poll regardless of caller; used once its end time has passed.
    async fn close_poll(&self, poll_id: &str) -> Result<()>;
}

/// The acceptance rules every ledger applies before recording a vote, minus the
/// one-vote-per-voter check which needs the store.
pub fn check_ballot(
    poll: &Poll,
    option: usize,
    access_code: Option<&str>,
    location: Option<Coordinates>,
    now: DateTime<Utc>,
) -> Result<()> {
    if !poll.accepts_votes(now) {
        return Err(PollError::PollClosed(poll.id.clone()));
    }

    if option >= poll.options.len() {
        return Err(PollError::InvalidOption {
            option,
            available: poll.options.len(),
        });
    }

    if let Visibility::Private { access_code: expected } = &poll.visibility {
        if !access_code_matches(expected, access_code) {
            return Err(PollError::AccessDenied(poll.id.clone()));
        }
    }

    if let Some(geo) = &poll.geo_restriction {
        let user = location.ok_or_else(|| PollError::LocationUnavailable(poll.id.clone()))?;
        if !is_within_radius(user, geo.center, geo.radius_km) {
            return Err(PollError::OutsideRegion {
                label: geo.label.clone(),
                distance_km: haversine_km(user, geo.center),
                radius_km: geo.radius_km,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoRestriction, PollDraft};

    fn draft() -> PollDraft {
        PollDraft {
            creator: "0xabc".to_string(),
            question: "Where next?".to_string(),
            options: vec!["Here".to_string(), "There".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn public_poll_accepts_any_valid_option() {
        let poll = Poll::new(draft()).unwrap();
        assert!(check_ballot(&poll, 1, None, None, Utc::now()).is_ok());
        assert!(matches!(
            check_ballot(&poll, 2, None, None, Utc::now()),
            Err(PollError::InvalidOption { option: 2, available: 2 })
        ));
    }

    #[test]
    fn closed_poll_rejects() {
        let mut poll = Poll::new(draft()).unwrap();
        poll.is_active = false;
        assert!(matches!(
            check_ballot(&poll, 0, None, None, Utc::now()),
            Err(PollError::PollClosed(_))
        ));
    }

    #[test]
    fn private_poll_checks_code() {
        let mut d = draft();
        d.access_code = Some("letmein".to_string());
        let poll = Poll::new(d).unwrap();
        assert!(matches!(
            check_ballot(&poll, 0, None, None, Utc::now()),
            Err(PollError::AccessDenied(_))
        ));
        assert!(matches!(
            check_ballot(&poll, 0, Some("wrong"), None, Utc::now()),
            Err(PollError::AccessDenied(_))
        ));
        assert!(check_ballot(&poll, 0, Some("letmein"), None, Utc::now()).is_ok());
    }

    #[test]
    fn geo_restricted_poll_checks_distance() {
        let mut d = draft();
        d.geo_restriction = Some(GeoRestriction {
            label: "Berlin".to_string(),
            center: Coordinates::new(52.52, 13.405).unwrap(),
            radius_km: 50.0,
        });
        let poll = Poll::new(d).unwrap();

        assert!(matches!(
            check_ballot(&poll, 0, None, None, Utc::now()),
            Err(PollError::LocationUnavailable(_))
        ));

        let potsdam = Coordinates::new(52.3906, 13.0645).unwrap();
        assert!(check_ballot(&poll, 0, None, Some(potsdam), Utc::now()).is_ok());

        // On the boundary counts as inside
        let edge = Poll {
            geo_restriction: Some(GeoRestriction {
                label: "Berlin".to_string(),
                center: Coordinates::new(52.52, 13.405).unwrap(),
                radius_km: haversine_km(potsdam, Coordinates::new(52.52, 13.405).unwrap()),
            }),
            ..poll.clone()
        };
        assert!(check_ballot(&edge, 0, None, Some(potsdam), Utc::now()).is_ok());

        let munich = Coordinates::new(48.1351, 11.582).unwrap();
        assert!(matches!(
            check_ballot(&poll, 0, None, Some(munich), Utc::now()),
            Err(PollError::OutsideRegion { .. })
        ));
    }
}
