//! Thread-safe front of the scheduler.
//!
//! Every operation takes the engine lock for its whole duration, so a scheduling pass
//! never observes a half-applied edit. What an operation changed is copied into a
//! `Batch` before the lock is released; batches are written to the record store after,
//! in the order their operations ran. Store failures are logged, never propagated into
//! scheduling state.

use crate::config::EngineSettings;
use crate::error::{Error, Result};
use crate::flight::{Emergency, Flight, FlightId, FlightStatus, PendingReason};
use crate::runway::{Runway, RunwayId};
use crate::scenario::Scenario;
use crate::schedule::{Engine, PassReport};
use crate::separation::WakeCategory;
use crate::store::{Batch, Store};
use crate::time::{Clock, Time};
use crate::weather::Weather;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct Tower {
    engine: Mutex<Engine>,
    outbox: Mutex<Vec<Batch>>,
    store: Mutex<Box<dyn Store>>,
    clock: Arc<dyn Clock>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Tower {
    pub fn new(settings: EngineSettings, store: Box<dyn Store>, clock: Arc<dyn Clock>) -> Tower {
        Tower::with_engine(Engine::new(settings), store, clock)
    }

    fn with_engine(engine: Engine, store: Box<dyn Store>, clock: Arc<dyn Clock>) -> Tower {
        Tower {
            engine: Mutex::new(engine),
            outbox: Mutex::new(Vec::new()),
            store: Mutex::new(store),
            clock,
        }
    }

    /// Rebuilds a tower from what `store` holds.
    ///
    /// Stored slots are not trusted: every flight comes back pending and every runway is
    /// free from now, so the first pass places everything against current conditions.
    pub fn restore(
        settings: EngineSettings,
        store: Box<dyn Store>,
        clock: Arc<dyn Clock>,
    ) -> Result<Tower> {
        let now = clock.now();
        let mut engine = Engine::new(settings);
        if let Some(weather) = store.load_weather()? {
            engine.set_weather(weather)?;
        }
        for mut runway in store.load_runways()? {
            runway.reset_availability(now);
            engine.register_runway(runway)?;
        }
        let flights = store.load_flights()?;
        let restored = flights.len();
        for flight in flights {
            engine.enqueue(flight)?;
        }
        tracing::info!(flights = restored, %now, "tower restored from store");

        Ok(Tower::with_engine(engine, store, clock))
    }

    pub fn now(&self) -> Time {
        self.clock.now()
    }

    fn engine(&self) -> MutexGuard<'_, Engine> {
        lock(&self.engine)
    }

    /// Runs `f` under the engine lock, queues the records it put in the batch, then
    /// writes them once the lock is gone.
    fn mutate<R>(&self, f: impl FnOnce(&mut Engine, &mut Batch) -> R) -> R {
        let result = {
            let mut engine = self.engine();
            let mut batch = Batch::default();
            let result = f(&mut engine, &mut batch);
            if !batch.is_empty() {
                lock(&self.outbox).push(batch);
            }
            result
        };
        self.flush();
        result
    }

    /// Writes everything queued so far as one batch.
    fn flush(&self) {
        let mut store = lock(&self.store);
        let queued = std::mem::take(&mut *lock(&self.outbox));
        let mut batch = Batch::default();
        for later in queued {
            batch.merge(later);
        }
        if batch.is_empty() {
            return;
        }
        if let Err(e) = store.apply(&batch) {
            tracing::error!(
                error = %e,
                flights = batch.flights.len(),
                runways = batch.runways.len(),
                "failed to persist changes"
            );
        }
    }

    /// Read-only access to the engine under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&Engine) -> R) -> R {
        f(&*self.engine())
    }

    pub fn flights(&self) -> Vec<Flight> {
        self.read(|e| e.flights().into_iter().cloned().collect())
    }

    pub fn pending(&self) -> Vec<Flight> {
        self.read(|e| e.pending().into_iter().cloned().collect())
    }

    pub fn scheduled(&self) -> Vec<Flight> {
        self.read(|e| e.scheduled().into_iter().cloned().collect())
    }

    pub fn runways(&self) -> Vec<Runway> {
        self.read(|e| e.runways().cloned().collect())
    }

    pub fn weather(&self) -> Weather {
        self.read(|e| e.weather().clone())
    }

    pub fn last_report(&self) -> Option<PassReport> {
        self.read(|e| e.last_report().cloned())
    }

    pub fn enqueue(&self, flight: Flight) -> Result<FlightId> {
        self.mutate(|engine, batch| -> Result<FlightId> {
            let flight_id = flight.id.clone();
            engine.enqueue(flight)?;
            if let Some(flight) = engine.flight(&flight_id) {
                batch.flight(flight);
            }
            Ok(flight_id)
        })
    }

    pub fn register_runway(&self, runway: Runway) -> Result<()> {
        self.mutate(|engine, batch| -> Result<()> {
            let runway_id = runway.id.clone();
            engine.register_runway(runway)?;
            if let Some(runway) = engine.runway(&runway_id) {
                batch.runway(runway);
            }
            Ok(())
        })
    }

    pub fn set_weather(&self, weather: Weather) -> Result<()> {
        self.mutate(|engine, batch| -> Result<()> {
            engine.set_weather(weather)?;
            batch.weather(engine.weather());
            Ok(())
        })
    }

    pub fn set_settings(&self, settings: EngineSettings) {
        self.engine().set_settings(settings);
    }

    pub fn update_separation(&self, leading: WakeCategory, following: WakeCategory, secs: u64) {
        self.engine().update_separation(leading, following, secs);
    }

    /// Flips a runway open or closed and returns the new state.
    pub fn toggle_runway(&self, runway_id: &RunwayId) -> Result<bool> {
        self.mutate(|engine, batch| -> Result<bool> {
            let active = !engine
                .runway(runway_id)
                .ok_or_else(|| Error::UnknownRunway(runway_id.clone()))?
                .active;
            engine.set_runway_active(runway_id, active)?;
            if let Some(runway) = engine.runway(runway_id) {
                batch.runway(runway);
            }
            Ok(active)
        })
    }

    pub fn remove_flight(&self, flight_id: &FlightId) -> Result<Flight> {
        self.mutate(|engine, batch| -> Result<Flight> {
            let flight = engine.remove_flight(flight_id)?;
            batch.deleted(flight_id);
            Ok(flight)
        })
    }

    /// Applies an edit to one flight and queues the flight's new state.
    fn edit_flight(
        &self,
        flight_id: &FlightId,
        edit: impl FnOnce(&mut Engine) -> Result<()>,
    ) -> Result<()> {
        self.mutate(|engine, batch| -> Result<()> {
            edit(engine)?;
            if let Some(flight) = engine.flight(flight_id) {
                batch.flight(flight);
            }
            Ok(())
        })
    }

    pub fn set_emergency(&self, flight_id: &FlightId, emergency: Emergency) -> Result<()> {
        self.edit_flight(flight_id, |e| e.set_emergency(flight_id, emergency))
    }

    pub fn set_fuel(&self, flight_id: &FlightId, fuel: u8) -> Result<()> {
        self.edit_flight(flight_id, |e| e.set_fuel(flight_id, fuel))
    }

    pub fn set_scheduled_time(&self, flight_id: &FlightId, at: Time) -> Result<()> {
        self.edit_flight(flight_id, |e| e.set_scheduled_time(flight_id, at))
    }

    /// Runs one scheduling pass at the clock's current time.
    pub fn run_pass(&self) -> PassReport {
        let now = self.now();
        self.mutate(|engine, batch| {
            let report = engine.run_scheduling_pass(now);
            let touched = report
                .scheduled
                .iter()
                .chain(&report.displaced)
                .chain(report.requeued.iter().map(|(id, _)| id));
            for flight_id in touched {
                if let Some(flight) = engine.flight(flight_id) {
                    batch.flight(flight);
                }
            }
            // cursors only move when something was placed or moved
            if !batch.is_empty() {
                engine.runways().for_each(|r| batch.runway(r));
            }
            report
        })
    }

    /// Clears every flight and frees every runway; returns how many flights were dropped.
    pub fn reset(&self) -> usize {
        let now = self.now();
        self.mutate(|engine, batch| {
            let removed = engine.reset(now);
            removed.iter().for_each(|f| batch.deleted(&f.id));
            engine.runways().for_each(|r| batch.runway(r));
            removed.len()
        })
    }

    /// Adds everything a scenario carries, at the clock's current time.
    ///
    /// The scenario is checked against the engine first, so it is applied whole or not at all.
    pub fn import(&self, scenario: Scenario) -> Result<()> {
        let (runways, flights) = (scenario.runways.len(), scenario.flights.len());
        self.mutate(|engine, batch| -> Result<()> {
            check_import(engine, &scenario)?;
            if let Some(settings) = scenario.settings {
                engine.set_settings(settings);
            }
            if let Some(weather) = scenario.weather {
                engine.set_weather(weather)?;
                batch.weather(engine.weather());
            }
            for runway in scenario.runways {
                let runway_id = runway.id.clone();
                engine.register_runway(runway)?;
                if let Some(runway) = engine.runway(&runway_id) {
                    batch.runway(runway);
                }
            }
            for flight in scenario.flights {
                let flight_id = flight.id.clone();
                engine.enqueue(flight)?;
                if let Some(flight) = engine.flight(&flight_id) {
                    batch.flight(flight);
                }
            }
            Ok(())
        })?;
        tracing::info!(runways, flights, "scenario imported");
        Ok(())
    }

    /// Pending flights grouped with why they wait.
    pub fn pending_reasons(&self) -> Vec<(FlightId, PendingReason)> {
        self.read(|e| {
            e.pending()
                .into_iter()
                .filter_map(|f| match f.status {
                    FlightStatus::Pending(reason) => Some((f.id.clone(), reason)),
                    _ => None,
                })
                .collect()
        })
    }
}

/// Everything `import` would reject, found before the engine is touched.
fn check_import(engine: &Engine, scenario: &Scenario) -> Result<()> {
    if let Some(weather) = &scenario.weather {
        weather.validate()?;
    }
    let mut runway_ids = HashSet::new();
    for runway in &scenario.runways {
        runway.validate()?;
        if engine.runway(&runway.id).is_some() || !runway_ids.insert(&runway.id) {
            return Err(Error::DuplicateRunway(runway.id.clone()));
        }
    }
    let mut flight_ids = HashSet::new();
    for flight in &scenario.flights {
        flight.validate()?;
        if engine.flight(&flight.id).is_some() || !flight_ids.insert(&flight.id) {
            return Err(Error::DuplicateFlight(flight.id.clone()));
        }
    }
    Ok(())
}
