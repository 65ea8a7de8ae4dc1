use crate::flight::FlightId;
use crate::runway::RunwayId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid flight {id}: {reason}")]
    InvalidFlight { id: String, reason: String },

    #[error("invalid runway {id}: {reason}")]
    InvalidRunway { id: String, reason: String },

    #[error("invalid weather: {0}")]
    InvalidWeather(String),

    #[error("unknown flight {0}")]
    UnknownFlight(FlightId),

    #[error("unknown runway {0}")]
    UnknownRunway(RunwayId),

    #[error("flight {0} is already known")]
    DuplicateFlight(FlightId),

    #[error("runway {0} is already registered")]
    DuplicateRunway(RunwayId),

    #[error("unknown {kind} '{value}'")]
    Parse { kind: &'static str, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
