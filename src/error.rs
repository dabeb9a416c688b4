use thiserror::Error;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid poll: {0}")]
    InvalidPoll(String),

    #[error("poll {0} not found")]
    PollNotFound(String),

    #[error("poll {0} is closed")]
    PollClosed(String),

    #[error("access code rejected for poll {0}")]
    AccessDenied(String),

    #[error("{voter} has already voted in poll {poll_id}")]
    AlreadyVoted { voter: String, poll_id: String },

    #[error("voter is {distance_km:.1} km from {label}, outside the {radius_km:.1} km voting area")]
    OutsideRegion {
        label: String,
        distance_km: f64,
        radius_km: f64,
    },

    #[error("poll {0} is geo-restricted and no voter location was supplied")]
    LocationUnavailable(String),

    #[error("option {option} does not exist (poll has {available} options)")]
    InvalidOption { option: usize, available: usize },

    #[error("only the poll creator can end poll {0}")]
    NotCreator(String),

    #[error("failed to parse timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PollError>;
