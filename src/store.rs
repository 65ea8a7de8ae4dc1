//! Record store behind the scheduler.
//!
//! The engine never depends on a store. `Tower` collects what each of its mutations
//! changed into a `Batch` and hands batches to the store after releasing the engine;
//! it reads from the store once at start-up.

use crate::error::Result;
use crate::flight::{Flight, FlightId};
use crate::runway::{Runway, RunwayId};
use crate::weather::Weather;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub trait Store: Send {
    fn save_flight(&mut self, flight: &Flight) -> Result<()>;
    fn update_flight(&mut self, flight: &Flight) -> Result<()>;
    fn delete_flight(&mut self, flight_id: &FlightId) -> Result<()>;
    fn load_flights(&self) -> Result<Vec<Flight>>;

    fn save_runway(&mut self, runway: &Runway) -> Result<()>;
    fn update_runway(&mut self, runway: &Runway) -> Result<()>;
    fn load_runways(&self) -> Result<Vec<Runway>>;

    fn save_weather(&mut self, weather: &Weather) -> Result<()>;
    fn load_weather(&self) -> Result<Option<Weather>>;

    /// Writes every record in `batch`. Stores that persist on each call should override
    /// this to persist once.
    fn apply(&mut self, batch: &Batch) -> Result<()> {
        for (flight_id, flight) in &batch.flights {
            match flight {
                Some(flight) => self.update_flight(flight)?,
                None => self.delete_flight(flight_id)?,
            }
        }
        for runway in batch.runways.values() {
            self.update_runway(runway)?;
        }
        if let Some(weather) = &batch.weather {
            self.save_weather(weather)?;
        }
        Ok(())
    }
}

/// Latest state of the records touched by one or more operations.
///
/// A flight mapped to `None` was deleted.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Batch {
    pub flights: BTreeMap<FlightId, Option<Flight>>,
    pub runways: BTreeMap<RunwayId, Runway>,
    pub weather: Option<Weather>,
}

impl Batch {
    pub fn flight(&mut self, flight: &Flight) {
        self.flights.insert(flight.id.clone(), Some(flight.clone()));
    }

    pub fn deleted(&mut self, flight_id: &FlightId) {
        self.flights.insert(flight_id.clone(), None);
    }

    pub fn runway(&mut self, runway: &Runway) {
        self.runways.insert(runway.id.clone(), runway.clone());
    }

    pub fn weather(&mut self, weather: &Weather) {
        self.weather = Some(weather.clone());
    }

    /// Folds a later batch into this one; its records win.
    pub fn merge(&mut self, later: Batch) {
        self.flights.extend(later.flights);
        self.runways.extend(later.runways);
        if later.weather.is_some() {
            self.weather = later.weather;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty() && self.runways.is_empty() && self.weather.is_none()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Records {
    flights: BTreeMap<FlightId, Flight>,
    runways: BTreeMap<RunwayId, Runway>,
    weather: Option<Weather>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Records,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn save_flight(&mut self, flight: &Flight) -> Result<()> {
        self.records.flights.insert(flight.id.clone(), flight.clone());
        Ok(())
    }

    fn update_flight(&mut self, flight: &Flight) -> Result<()> {
        self.save_flight(flight)
    }

    fn delete_flight(&mut self, flight_id: &FlightId) -> Result<()> {
        self.records.flights.remove(flight_id);
        Ok(())
    }

    fn load_flights(&self) -> Result<Vec<Flight>> {
        Ok(self.records.flights.values().cloned().collect())
    }

    fn save_runway(&mut self, runway: &Runway) -> Result<()> {
        self.records.runways.insert(runway.id.clone(), runway.clone());
        Ok(())
    }

    fn update_runway(&mut self, runway: &Runway) -> Result<()> {
        self.save_runway(runway)
    }

    fn load_runways(&self) -> Result<Vec<Runway>> {
        Ok(self.records.runways.values().cloned().collect())
    }

    fn save_weather(&mut self, weather: &Weather) -> Result<()> {
        self.records.weather = Some(weather.clone());
        Ok(())
    }

    fn load_weather(&self) -> Result<Option<Weather>> {
        Ok(self.records.weather.clone())
    }
}

/// Single JSON document on disk, rewritten after every change or batch.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    memory: MemoryStore,
}

impl JsonStore {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            serde_json::from_str(&data)?
        } else {
            Records::default()
        };
        Ok(JsonStore {
            path,
            memory: MemoryStore { records },
        })
    }

    fn flush(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.memory.records)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Store for JsonStore {
    fn save_flight(&mut self, flight: &Flight) -> Result<()> {
        self.memory.save_flight(flight)?;
        self.flush()
    }

    fn update_flight(&mut self, flight: &Flight) -> Result<()> {
        self.memory.update_flight(flight)?;
        self.flush()
    }

    fn delete_flight(&mut self, flight_id: &FlightId) -> Result<()> {
        self.memory.delete_flight(flight_id)?;
        self.flush()
    }

    fn load_flights(&self) -> Result<Vec<Flight>> {
        self.memory.load_flights()
    }

    fn save_runway(&mut self, runway: &Runway) -> Result<()> {
        self.memory.save_runway(runway)?;
        self.flush()
    }

    fn update_runway(&mut self, runway: &Runway) -> Result<()> {
        self.memory.update_runway(runway)?;
        self.flush()
    }

    fn load_runways(&self) -> Result<Vec<Runway>> {
        self.memory.load_runways()
    }

    fn save_weather(&mut self, weather: &Weather) -> Result<()> {
        self.memory.save_weather(weather)?;
        self.flush()
    }

    fn load_weather(&self) -> Result<Option<Weather>> {
        self.memory.load_weather()
    }

    fn apply(&mut self, batch: &Batch) -> Result<()> {
        self.memory.apply(batch)?;
        self.flush()
    }
}
