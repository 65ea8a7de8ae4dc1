//! Current airfield weather and the separation inflation derived from it.
//!
//! Wind follows the reporting convention: `wind_direction` is the bearing
//! the wind blows *from*. A runway heading straight into the wind therefore
//! sees a full headwind.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Visibility tiers in kilometres, checked from the top: `(at_least, factor)`.
const VISIBILITY_TIERS: [(f64, f64); 3] = [(5.0, 1.0), (3.0, 1.2), (1.0, 1.5)];
const VISIBILITY_FLOOR_FACTOR: f64 = 2.0;

/// Wind speed tiers in knots: `(below, factor)`.
const WIND_TIERS: [(f64, f64); 3] = [(15.0, 1.0), (25.0, 1.1), (35.0, 1.25)];
const WIND_CEILING_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    Sunny,
    Cloudy,
    Rainy,
    Foggy,
    Snowy,
    Thunderstorm,
}

impl Condition {
    pub const ALL: [Condition; 6] = [
        Condition::Sunny,
        Condition::Cloudy,
        Condition::Rainy,
        Condition::Foggy,
        Condition::Snowy,
        Condition::Thunderstorm,
    ];

    /// Separation multiplier, never below 1.0 and ordered with the variants.
    pub fn multiplier(self) -> f64 {
        match self {
            Condition::Sunny => 1.0,
            Condition::Cloudy => 1.05,
            Condition::Rainy => 1.2,
            Condition::Foggy => 1.4,
            Condition::Snowy => 1.5,
            Condition::Thunderstorm => 1.8,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Condition::Sunny => "SUNNY",
            Condition::Cloudy => "CLOUDY",
            Condition::Rainy => "RAINY",
            Condition::Foggy => "FOGGY",
            Condition::Snowy => "SNOWY",
            Condition::Thunderstorm => "THUNDERSTORM",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Condition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Condition::ALL
            .into_iter()
            .find(|c| c.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Parse {
                kind: "weather condition",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    /// Knots.
    pub wind_speed: f64,
    /// Degrees, "from" convention, normalised to [0, 360).
    pub wind_direction: f64,
    /// Kilometres.
    pub visibility: f64,
    pub condition: Condition,
}

impl Default for Weather {
    fn default() -> Self {
        Weather {
            wind_speed: 5.0,
            wind_direction: 0.0,
            visibility: 10.0,
            condition: Condition::Sunny,
        }
    }
}

impl Weather {
    pub fn new(
        wind_speed: f64,
        wind_direction: f64,
        visibility: f64,
        condition: Condition,
    ) -> Result<Weather> {
        let weather = Weather {
            wind_speed,
            wind_direction: wind_direction.rem_euclid(360.0),
            visibility,
            condition,
        };
        weather.validate()?;
        Ok(weather)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.wind_speed.is_finite() || self.wind_speed < 0.0 {
            return Err(Error::InvalidWeather(format!(
                "wind speed must be a non-negative number, got {}",
                self.wind_speed
            )));
        }
        if !self.visibility.is_finite() || self.visibility < 0.0 {
            return Err(Error::InvalidWeather(format!(
                "visibility must be a non-negative number, got {}",
                self.visibility
            )));
        }
        if !self.wind_direction.is_finite() {
            return Err(Error::InvalidWeather("wind direction must be finite".into()));
        }
        Ok(())
    }

    /// Signed angle in radians between where the wind comes from and the runway heading.
    ///
    /// Equivalent to projecting the downwind reciprocal (`direction + 180`)
    /// onto the runway axis with the sign flipped.
    fn relative_angle(&self, runway_heading: f64) -> f64 {
        (self.wind_direction - runway_heading).to_radians()
    }

    /// Component along the runway; positive when the wind opposes the direction of travel.
    pub fn headwind(&self, runway_heading: f64) -> f64 {
        self.wind_speed * self.relative_angle(runway_heading).cos()
    }

    /// Component across the runway; positive when the wind comes from the right.
    pub fn crosswind(&self, runway_heading: f64) -> f64 {
        self.wind_speed * self.relative_angle(runway_heading).sin()
    }

    pub fn visibility_factor(&self) -> f64 {
        VISIBILITY_TIERS
            .iter()
            .find(|(at_least, _)| self.visibility >= *at_least)
            .map(|(_, factor)| *factor)
            .unwrap_or(VISIBILITY_FLOOR_FACTOR)
    }

    pub fn wind_factor(&self) -> f64 {
        WIND_TIERS
            .iter()
            .find(|(below, _)| self.wind_speed < *below)
            .map(|(_, factor)| *factor)
            .unwrap_or(WIND_CEILING_FACTOR)
    }

    /// Multiplier applied to every base separation. Always >= 1.0.
    pub fn weather_factor(&self) -> f64 {
        self.visibility_factor() * self.wind_factor() * self.condition.multiplier()
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} wind {:03.0}@{:.0}kt vis {:.1}km (factor {:.2})",
            self.condition,
            self.wind_direction,
            self.wind_speed,
            self.visibility,
            self.weather_factor()
        )
    }
}
