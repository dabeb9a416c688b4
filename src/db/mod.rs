use crate::config::Config;
use crate::error::{PollError, Result};
use crate::geo::Coordinates;
use crate::ledger::{check_ballot, PollLedger};
use crate::models::{GeoRestriction, Poll, PollOption, Visibility};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow},
    Row, Sqlite,
};

const POLL_COLUMNS: &str = "id, creator, question, description, access_code, geo_label, geo_latitude, geo_longitude, geo_radius_km, created_at, ends_at, is_active";

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(config: &Config) -> Result<Self> {
        let db_url = &config.database_url;

        // Create database if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database at {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(db_url)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    /// A private, throwaway database. One connection that never expires, since
    /// every new in-memory connection would start empty.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS polls (
                id TEXT PRIMARY KEY,
                creator TEXT NOT NULL,
                question TEXT NOT NULL,
                description TEXT,
                access_code TEXT,
                geo_label TEXT,
                geo_latitude REAL,
                geo_longitude REAL,
                geo_radius_km REAL,
                created_at TEXT NOT NULL,
                ends_at TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS poll_options (
                poll_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                text TEXT NOT NULL,
                PRIMARY KEY (poll_id, position),
                FOREIGN KEY (poll_id) REFERENCES polls(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                voter TEXT NOT NULL,
                poll_id TEXT NOT NULL,
                option_position INTEGER NOT NULL,
                cast_at TEXT NOT NULL,
                PRIMARY KEY (voter, poll_id),
                FOREIGN KEY (poll_id) REFERENCES polls(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn load_options(&self, poll_id: &str) -> Result<Vec<PollOption>> {
        let options = sqlx::query(
            r#"
            SELECT position, text
            FROM poll_options
            WHERE poll_id = ?
            ORDER BY position
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| PollOption {
            position: row.get::<i64, _>("position") as usize,
            text: row.get::<String, _>("text"),
        })
        .collect();
        Ok(options)
    }

    async fn load_polls(&self, rows: Vec<SqliteRow>) -> Result<Vec<Poll>> {
        let mut polls = Vec::with_capacity(rows.len());
        for row in rows {
            let mut poll = poll_from_row(&row)?;
            poll.options = self.load_options(&poll.id).await?;
            polls.push(poll);
        }
        Ok(polls)
    }

    /// Inserts the ballot only if the poll is still open at the moment of the
    /// write, so a close that lands after the checks in `cast_vote` still wins.
    async fn record_vote(
        &self,
        poll_id: &str,
        voter: &str,
        option: usize,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let cast_at = format_timestamp(now);
        let inserted = sqlx::query(
            r#"
            INSERT INTO votes (voter, poll_id, option_position, cast_at)
            SELECT ?, ?, ?, ?
            WHERE EXISTS (
                SELECT 1 FROM polls
                WHERE id = ? AND is_active = TRUE AND (ends_at IS NULL OR ends_at > ?)
            )
            "#,
        )
        .bind(voter)
        .bind(poll_id)
        .bind(option as i64)
        .bind(&cast_at)
        .bind(poll_id)
        .bind(&cast_at)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(done) if done.rows_affected() == 0 => {
                warn!("Poll {} closed before the vote from {} was stored", poll_id, voter);
                Err(PollError::PollClosed(poll_id.to_string()))
            }
            Ok(_) => {
                info!("Recorded vote from {} in poll {}", voter, poll_id);
                Ok(())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                warn!("{} tried to vote twice in poll {}", voter, poll_id);
                Err(PollError::AlreadyVoted {
                    voter: voter.to_string(),
                    poll_id: poll_id.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PollLedger for Database {
    async fn create_poll(&self, poll: &Poll) -> Result<()> {
        let access_code = match &poll.visibility {
            Visibility::Public => None,
            Visibility::Private { access_code } => Some(access_code.as_str()),
        };
        let geo = poll.geo_restriction.as_ref();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO polls (id, creator, question, description, access_code, geo_label, geo_latitude, geo_longitude, geo_radius_km, created_at, ends_at, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&poll.id)
        .bind(&poll.creator)
        .bind(&poll.question)
        .bind(&poll.description)
        .bind(access_code)
        .bind(geo.map(|g| g.label.as_str()))
        .bind(geo.map(|g| g.center.latitude))
        .bind(geo.map(|g| g.center.longitude))
        .bind(geo.map(|g| g.radius_km))
        .bind(format_timestamp(poll.created_at))
        .bind(poll.ends_at.map(format_timestamp))
        .bind(poll.is_active)
        .execute(&mut *tx)
        .await?;

        for option in &poll.options {
            sqlx::query(
                r#"
                INSERT INTO poll_options (poll_id, position, text)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(&poll.id)
            .bind(option.position as i64)
            .bind(&option.text)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(
            "Created poll {} by {} with {} options",
            poll.id,
            poll.creator,
            poll.options.len()
        );
        Ok(())
    }

    async fn get_poll(&self, poll_id: &str) -> Result<Poll> {
        let row = sqlx::query(&format!("SELECT {} FROM polls WHERE id = ?", POLL_COLUMNS))
            .bind(poll_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PollError::PollNotFound(poll_id.to_string()))?;

        let mut poll = poll_from_row(&row)?;
        poll.options = self.load_options(poll_id).await?;
        Ok(poll)
    }

    async fn public_polls(&self) -> Result<Vec<Poll>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM polls WHERE access_code IS NULL AND is_active = TRUE ORDER BY created_at DESC",
            POLL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        self.load_polls(rows).await
    }

    async fn polls_by_creator(&self, creator: &str) -> Result<Vec<Poll>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM polls WHERE creator = ? ORDER BY created_at DESC",
            POLL_COLUMNS
        ))
        .bind(creator)
        .fetch_all(&self.pool)
        .await?;
        self.load_polls(rows).await
    }

    async fn cast_vote(
        &self,
        poll_id: &str,
        voter: &str,
        option: usize,
        access_code: Option<&str>,
        location: Option<Coordinates>,
    ) -> Result<()> {
        let poll = self.get_poll(poll_id).await?;
        let now = Utc::now();

        if let Err(e) = check_ballot(&poll, option, access_code, location, now) {
            warn!("Rejected vote from {} in poll {}: {}", voter, poll_id, e);
            return Err(e);
        }

        self.record_vote(poll_id, voter, option, now).await
    }

    async fn has_voted(&self, poll_id: &str, voter: &str) -> Result<bool> {
        let voted = sqlx::query("SELECT 1 FROM votes WHERE poll_id = ? AND voter = ?")
            .bind(poll_id)
            .bind(voter)
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        Ok(voted)
    }

    async fn vote_counts(&self, poll_id: &str) -> Result<Vec<u64>> {
        let poll = self.get_poll(poll_id).await?;
        let mut counts = vec![0u64; poll.options.len()];

        let rows = sqlx::query(
            r#"
            SELECT option_position, COUNT(*) AS votes
            FROM votes
            WHERE poll_id = ?
            GROUP BY option_position
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            let position = row.get::<i64, _>("option_position") as usize;
            let votes = row.get::<i64, _>("votes") as u64;
            match counts.get_mut(position) {
                Some(count) => *count = votes,
                None => warn!("Poll {} has votes for missing option {}", poll_id, position),
            }
        }

        debug!("Vote counts for poll {}: {:?}", poll_id, counts);
        Ok(counts)
    }

    async fn end_poll(&self, poll_id: &str, caller: &str) -> Result<()> {
        let poll = self.get_poll(poll_id).await?;
        if poll.creator != caller {
            return Err(PollError::NotCreator(poll_id.to_string()));
        }
        if !poll.is_active {
            return Err(PollError::PollClosed(poll_id.to_string()));
        }
        self.close_poll(poll_id).await
    }

    async fn expired_polls(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let ids = sqlx::query(
            r#"
            SELECT id
            FROM polls
            WHERE ends_at IS NOT NULL AND ends_at < ? AND is_active = TRUE
            "#,
        )
        .bind(format_timestamp(now))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| row.get::<String, _>("id"))
        .collect();
        Ok(ids)
    }

    async fn close_poll(&self, poll_id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE polls
            SET is_active = FALSE
            WHERE id = ? AND is_active = TRUE
            "#,
        )
        .bind(poll_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            info!("Closed poll {}", poll_id);
        }
        Ok(())
    }
}

// Fixed-width UTC so that timestamps compare correctly as text in SQL.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn poll_from_row(row: &SqliteRow) -> Result<Poll> {
    let visibility = match row.get::<Option<String>, _>("access_code") {
        Some(access_code) => Visibility::Private { access_code },
        None => Visibility::Public,
    };

    let geo_restriction = match (
        row.get::<Option<String>, _>("geo_label"),
        row.get::<Option<f64>, _>("geo_latitude"),
        row.get::<Option<f64>, _>("geo_longitude"),
        row.get::<Option<f64>, _>("geo_radius_km"),
    ) {
        (Some(label), Some(latitude), Some(longitude), Some(radius_km)) => Some(GeoRestriction {
            label,
            center: Coordinates { latitude, longitude },
            radius_km,
        }),
        _ => None,
    };

    let ends_at = match row.get::<Option<String>, _>("ends_at") {
        Some(raw) => Some(parse_timestamp(&raw)?),
        None => None,
    };

    Ok(Poll {
        id: row.get("id"),
        creator: row.get("creator"),
        question: row.get("question"),
        description: row.get("description"),
        options: Vec::new(),
        visibility,
        geo_restriction,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        ends_at,
        is_active: row.get("is_active"),
    })
}
