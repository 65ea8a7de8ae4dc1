//! JSON scenario import.
//!
//! Times in a scenario file are seconds relative to the import instant, so the same file
//! replays against any clock.

use crate::config::EngineSettings;
use crate::error::{Error, Result};
use crate::flight::{Emergency, Flight, FlightKind};
use crate::runway::Runway;
use crate::separation::WakeCategory;
use crate::time::Time;
use crate::weather::{Condition, Weather};
use serde::Deserialize;
use std::path::Path;

/// Validated entities ready to be pushed through a `Tower`.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    pub settings: Option<EngineSettings>,
    pub weather: Option<Weather>,
    pub runways: Vec<Runway>,
    pub flights: Vec<Flight>,
}

#[derive(Deserialize)]
struct RawWeather {
    wind_speed: f64,
    wind_direction: f64,
    visibility: f64,
    condition: Condition,
}

#[derive(Deserialize)]
struct RawRunway {
    id: String,
    heading: f64,
    length: u32,
    #[serde(default = "open")]
    active: bool,
}

fn open() -> bool {
    true
}

fn full_tank() -> u8 {
    100
}

#[derive(Deserialize)]
struct RawFlight {
    id: Option<String>,
    number: String,
    #[serde(default)]
    airline: String,
    #[serde(default)]
    aircraft: String,
    category: WakeCategory,
    #[serde(rename = "type")]
    kind: FlightKind,
    #[serde(default)]
    emergency: Emergency,
    #[serde(default = "full_tank")]
    fuel: u8,
    /// Seconds after the import instant.
    scheduled_in: u64,
}

#[derive(Deserialize)]
struct RawScenario {
    settings: Option<EngineSettings>,
    weather: Option<RawWeather>,
    #[serde(default)]
    runways: Vec<RawRunway>,
    #[serde(default)]
    flights: Vec<RawFlight>,
}

impl Scenario {
    pub fn load_from_file(path: impl AsRef<Path>, now: Time) -> Result<Scenario> {
        let data = std::fs::read_to_string(path)?;
        Scenario::from_json(&data, now)
    }

    pub fn from_json(data: &str, now: Time) -> Result<Scenario> {
        let raw: RawScenario = serde_json::from_str(data)?;

        let weather = raw
            .weather
            .map(|w| Weather::new(w.wind_speed, w.wind_direction, w.visibility, w.condition))
            .transpose()?;

        let runways = raw
            .runways
            .into_iter()
            .map(|r| {
                let mut runway = Runway::new(r.id, r.heading, r.length, now)?;
                runway.set_active(r.active);
                Ok(runway)
            })
            .collect::<Result<Vec<_>>>()?;

        let flights = raw
            .flights
            .into_iter()
            .map(|f| {
                let at = now.checked_add(f.scheduled_in).ok_or_else(|| Error::InvalidFlight {
                    id: f.id.clone().unwrap_or_else(|| f.number.clone()),
                    reason: "scheduled_in out of range".to_string(),
                })?;
                let mut flight = Flight::new(f.number, f.category, f.kind, at)
                    .with_operator(f.airline, f.aircraft)
                    .with_emergency(f.emergency);
                if let Some(id) = f.id {
                    flight = flight.with_id(id);
                }
                // out-of-range fuel is rejected, not clamped
                flight.fuel = f.fuel;
                flight.validate()?;
                Ok(flight)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Scenario {
            settings: raw.settings,
            weather,
            runways,
            flights,
        })
    }
}
