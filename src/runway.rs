use crate::config::EngineSettings;
use crate::error::{Error, Result};
use crate::flight::Flight;
use crate::separation::{SeparationMatrix, WakeCategory};
use crate::time::Time;
use crate::weather::Weather;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tabled::Tabled;

pub type RunwayId = Arc<str>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct Runway {
    pub id: RunwayId,
    /// Magnetic heading, degrees in [0, 360).
    pub heading: f64,
    /// Usable length in metres.
    pub length: u32,
    pub active: bool,
    #[tabled(rename = "next available")]
    pub next_available: Time,
}

impl Runway {
    pub fn new(id: impl AsRef<str>, heading: f64, length: u32, now: Time) -> Result<Runway> {
        let runway = Runway {
            id: Arc::from(id.as_ref()),
            heading,
            length,
            active: true,
            next_available: now,
        };
        runway.validate()?;
        Ok(runway)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidRunway {
            id: self.id.to_string(),
            reason,
        };
        if self.id.trim().is_empty() {
            return Err(invalid("empty id".into()));
        }
        if !self.heading.is_finite() || !(0.0..360.0).contains(&self.heading) {
            return Err(invalid(format!("heading {} outside [0, 360)", self.heading)));
        }
        if self.length == 0 {
            return Err(invalid("zero usable length".into()));
        }
        Ok(())
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Suitability of this runway for `flight`. Higher is better.
    pub fn score(&self, weather: &Weather, flight: &Flight, now: Time, settings: &EngineSettings) -> f64 {
        if !self.active {
            return settings.inactive_score;
        }
        self.score_if_active(weather, flight, now, settings)
    }

    /// The score this runway would have were it open; used when an emergency forces one open.
    pub fn score_if_active(
        &self,
        weather: &Weather,
        flight: &Flight,
        now: Time,
        settings: &EngineSettings,
    ) -> f64 {
        let mut score = settings.base_score;
        score += weather.headwind(self.heading) * settings.headwind_weight;
        score -= weather.crosswind(self.heading).abs() * settings.crosswind_weight;

        let needs_long_runway = matches!(flight.category, WakeCategory::Heavy | WakeCategory::Super);
        if needs_long_runway && self.length < settings.heavy_min_length {
            score -= settings.short_runway_penalty;
        }

        let wait = now.minutes_until(self.next_available);
        score - wait as f64 * settings.wait_penalty_per_minute
    }

    /// Moves the availability cursor past an operation at `operation_time`.
    ///
    /// The cursor never moves backwards, even when an emergency slots in ahead of later traffic.
    pub fn advance_availability(
        &mut self,
        operation_time: Time,
        category: WakeCategory,
        matrix: &SeparationMatrix,
        weather: &Weather,
    ) {
        let gap = matrix.inflated(category, category, weather.weather_factor());
        self.next_available = self.next_available.max(operation_time + gap);
    }

    pub fn reset_availability(&mut self, now: Time) {
        self.next_available = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::FlightKind;
    use crate::weather::Condition;

    fn flight(category: WakeCategory) -> Flight {
        Flight::new("BA1", category, FlightKind::Departure, Time(0)).with_id("F1")
    }

    fn north_wind(speed: f64) -> Weather {
        Weather::new(speed, 0.0, 10.0, Condition::Sunny).unwrap()
    }

    #[test]
    fn test_rejects_bad_geometry() {
        assert!(Runway::new("09", 360.0, 3000, Time(0)).is_err());
        assert!(Runway::new("09", -1.0, 3000, Time(0)).is_err());
        assert!(Runway::new("09", 90.0, 0, Time(0)).is_err());
        assert!(Runway::new("", 90.0, 3000, Time(0)).is_err());
        assert!(Runway::new("09", 90.0, 3000, Time(0)).is_ok());
    }

    #[test]
    fn test_into_wind_scores_best() {
        let settings = EngineSettings::default();
        let weather = north_wind(10.0);
        let north = Runway::new("36", 0.0, 3500, Time(0)).unwrap();
        let east = Runway::new("09", 90.0, 3500, Time(0)).unwrap();
        let south = Runway::new("18", 180.0, 3500, Time(0)).unwrap();
        let f = flight(WakeCategory::Medium);

        let n = north.score(&weather, &f, Time(0), &settings);
        let e = east.score(&weather, &f, Time(0), &settings);
        let s = south.score(&weather, &f, Time(0), &settings);
        assert!((n - 120.0).abs() < 1e-9);
        assert!((e - 70.0).abs() < 1e-9);
        assert!(n > e && n > s);
    }

    #[test]
    fn test_short_runway_penalises_heavies_only() {
        let settings = EngineSettings::default();
        let weather = north_wind(0.0);
        let short = Runway::new("36", 0.0, 2500, Time(0)).unwrap();
        let medium = short.score(&weather, &flight(WakeCategory::Medium), Time(0), &settings);
        let heavy = short.score(&weather, &flight(WakeCategory::Heavy), Time(0), &settings);
        let sup = short.score(&weather, &flight(WakeCategory::Super), Time(0), &settings);
        assert_eq!(100.0, medium);
        assert_eq!(50.0, heavy);
        assert_eq!(50.0, sup);
    }

    #[test]
    fn test_wait_penalty() {
        let settings = EngineSettings::default();
        let weather = north_wind(0.0);
        let mut runway = Runway::new("36", 0.0, 3500, Time(0)).unwrap();
        runway.next_available = Time::minutes(4) + 30;
        let score = runway.score(&weather, &flight(WakeCategory::Light), Time(0), &settings);
        assert_eq!(80.0, score);
    }

    #[test]
    fn test_inactive_sentinel() {
        let settings = EngineSettings::default();
        let weather = north_wind(10.0);
        let mut runway = Runway::new("36", 0.0, 3500, Time(0)).unwrap();
        runway.set_active(false);
        let f = flight(WakeCategory::Light);
        assert_eq!(settings.inactive_score, runway.score(&weather, &f, Time(0), &settings));
        assert!(runway.score_if_active(&weather, &f, Time(0), &settings) > 0.0);
    }

    #[test]
    fn test_advance_uses_weather_factor() {
        let matrix = SeparationMatrix::default();
        let mut runway = Runway::new("36", 0.0, 3500, Time(0)).unwrap();
        runway.advance_availability(Time(1000), WakeCategory::Heavy, &matrix, &north_wind(0.0));
        assert_eq!(Time(1120), runway.next_available);

        let fog = Weather::new(0.0, 0.0, 10.0, Condition::Foggy).unwrap();
        runway.advance_availability(Time(2000), WakeCategory::Medium, &matrix, &fog);
        assert_eq!(Time(2000 + 168), runway.next_available);
    }

    #[test]
    fn test_advance_never_rewinds() {
        let matrix = SeparationMatrix::default();
        let mut runway = Runway::new("36", 0.0, 3500, Time(0)).unwrap();
        runway.advance_availability(Time(5000), WakeCategory::Light, &matrix, &north_wind(0.0));
        runway.advance_availability(Time(100), WakeCategory::Light, &matrix, &north_wind(0.0));
        assert_eq!(Time(5120), runway.next_available);
        runway.reset_availability(Time(50));
        assert_eq!(Time(50), runway.next_available);
    }
}
