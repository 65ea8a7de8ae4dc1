use crate::config::EngineSettings;
use crate::error::{Error, Result};
use crate::flight::PendingReason::{
    Displaced, NoActiveRunway, RunwayClosed, SeparationLost, SlotSearchExhausted, Waiting,
};
use crate::flight::{Emergency, Flight, FlightId, LATEST_SCHEDULE, PendingReason};
use crate::runway::{Runway, RunwayId};
use crate::separation::{SeparationMatrix, WakeCategory};
use crate::time::Time;
use crate::weather::Weather;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

/// Outcome of one scheduling pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    /// Flights that left pending and now hold a slot.
    pub scheduled: Vec<FlightId>,
    /// Flights moved to another runway to make room for an emergency.
    pub displaced: Vec<FlightId>,
    /// Flights sent back to pending, with the reason.
    pub requeued: Vec<(FlightId, PendingReason)>,
    /// Flights still waiting once the pass finished.
    pub pending: usize,
}

#[derive(Debug, PartialEq, Eq)]
struct QueueEntry {
    priority: i64,
    scheduled_time: Time,
    id: FlightId,
}

impl Ord for QueueEntry {
    // max-heap: highest priority first, then earliest scheduled time, then id
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.scheduled_time.cmp(&self.scheduled_time))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct Engine {
    runways: BTreeMap<RunwayId, Runway>,
    flights: HashMap<FlightId, Flight>,
    weather: Weather,
    matrix: SeparationMatrix,
    settings: EngineSettings,
    last_report: Option<PassReport>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineSettings::default())
    }
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Engine {
        Engine {
            runways: BTreeMap::new(),
            flights: HashMap::new(),
            weather: Weather::default(),
            matrix: SeparationMatrix::default(),
            settings,
            last_report: None,
        }
    }

    pub fn enqueue(&mut self, mut flight: Flight) -> Result<()> {
        flight.validate()?;
        if self.flights.contains_key(&flight.id) {
            return Err(Error::DuplicateFlight(flight.id));
        }
        if !flight.is_pending() {
            flight.release(Waiting);
        }
        tracing::debug!(flight = %flight.number, id = %flight.id, "enqueued");
        self.flights.insert(flight.id.clone(), flight);
        Ok(())
    }

    pub fn register_runway(&mut self, runway: Runway) -> Result<()> {
        runway.validate()?;
        if self.runways.contains_key(&runway.id) {
            return Err(Error::DuplicateRunway(runway.id));
        }
        tracing::debug!(runway = %runway.id, heading = runway.heading, "runway registered");
        self.runways.insert(runway.id.clone(), runway);
        Ok(())
    }

    /// Replaces the weather. Held slots are re-checked by the next pass.
    pub fn set_weather(&mut self, weather: Weather) -> Result<()> {
        weather.validate()?;
        tracing::info!(%weather, "weather updated");
        self.weather = weather;
        Ok(())
    }

    pub fn set_settings(&mut self, settings: EngineSettings) {
        self.settings = settings;
    }

    pub fn update_separation(&mut self, leading: WakeCategory, following: WakeCategory, secs: u64) {
        tracing::info!(%leading, %following, secs, "separation updated");
        self.matrix.set(leading, following, secs);
    }

    pub fn set_runway_active(&mut self, runway_id: &RunwayId, active: bool) -> Result<()> {
        let runway = self
            .runways
            .get_mut(runway_id)
            .ok_or_else(|| Error::UnknownRunway(runway_id.clone()))?;
        runway.set_active(active);
        tracing::info!(runway = %runway_id, active, "runway toggled");
        Ok(())
    }

    pub fn remove_flight(&mut self, flight_id: &FlightId) -> Result<Flight> {
        self.flights
            .remove(flight_id)
            .ok_or_else(|| Error::UnknownFlight(flight_id.clone()))
    }

    fn flight_mut(&mut self, flight_id: &FlightId) -> Result<&mut Flight> {
        self.flights
            .get_mut(flight_id)
            .ok_or_else(|| Error::UnknownFlight(flight_id.clone()))
    }

    /// Changing the emergency level of a held flight frees its slot for re-placement.
    pub fn set_emergency(&mut self, flight_id: &FlightId, emergency: Emergency) -> Result<()> {
        let flight = self.flight_mut(flight_id)?;
        if flight.emergency != emergency {
            flight.emergency = emergency;
            if !flight.is_pending() {
                flight.release(Waiting);
            }
        }
        Ok(())
    }

    /// A held flight is only re-placed when the new fuel level makes it more urgent.
    pub fn set_fuel(&mut self, flight_id: &FlightId, fuel: u8) -> Result<()> {
        let flight = self.flight_mut(flight_id)?;
        let before = flight.fuel_bonus();
        flight.set_fuel(fuel);
        if flight.fuel_bonus() > before && !flight.is_pending() {
            flight.release(Waiting);
        }
        Ok(())
    }

    pub fn set_scheduled_time(&mut self, flight_id: &FlightId, at: Time) -> Result<()> {
        let flight = self.flight_mut(flight_id)?;
        if at > LATEST_SCHEDULE {
            return Err(Error::InvalidFlight {
                id: flight_id.to_string(),
                reason: "scheduled time out of range".to_string(),
            });
        }
        if flight.scheduled_time != at {
            flight.scheduled_time = at;
            if !flight.is_pending() {
                flight.release(Waiting);
            }
        }
        Ok(())
    }

    /// Drops every flight and frees every runway from `now`.
    pub fn reset(&mut self, now: Time) -> Vec<Flight> {
        self.runways
            .values_mut()
            .for_each(|r| r.reset_availability(now));
        self.last_report = None;
        let removed: Vec<Flight> = self.flights.drain().map(|(_, f)| f).collect();
        tracing::info!(removed = removed.len(), %now, "engine reset");
        removed
    }

    pub fn weather(&self) -> &Weather {
        &self.weather
    }

    pub fn matrix(&self) -> &SeparationMatrix {
        &self.matrix
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn last_report(&self) -> Option<&PassReport> {
        self.last_report.as_ref()
    }

    pub fn flight(&self, flight_id: &FlightId) -> Option<&Flight> {
        self.flights.get(flight_id)
    }

    pub fn runway(&self, runway_id: &RunwayId) -> Option<&Runway> {
        self.runways.get(runway_id)
    }

    /// Runways in id order.
    pub fn runways(&self) -> impl Iterator<Item = &Runway> {
        self.runways.values()
    }

    /// All flights, held ones by slot time, then pending ones by scheduled time.
    pub fn flights(&self) -> Vec<&Flight> {
        let mut flights: Vec<&Flight> = self.flights.values().collect();
        flights.sort_by(|a, b| {
            a.is_pending()
                .cmp(&b.is_pending())
                .then_with(|| {
                    let at = |f: &Flight| f.actual_time().unwrap_or(f.scheduled_time);
                    at(a).cmp(&at(b))
                })
                .then_with(|| a.id.cmp(&b.id))
        });
        flights
    }

    pub fn pending(&self) -> Vec<&Flight> {
        self.flights().into_iter().filter(|f| f.is_pending()).collect()
    }

    pub fn scheduled(&self) -> Vec<&Flight> {
        self.flights().into_iter().filter(|f| !f.is_pending()).collect()
    }

    /// Weather-inflated separation between two successive operations on one runway.
    pub fn required_gap(&self, leading: WakeCategory, following: WakeCategory) -> u64 {
        self.matrix
            .inflated(leading, following, self.weather.weather_factor())
    }

    /// Held flights on `runway_id`, ordered by slot time then id.
    fn slots_on(&self, runway_id: &RunwayId) -> Vec<&Flight> {
        let mut slots: Vec<&Flight> = self
            .flights
            .values()
            .filter(|f| f.is_on(runway_id))
            .collect();
        slots.sort_by(|a, b| a.actual_time().cmp(&b.actual_time()).then_with(|| a.id.cmp(&b.id)));
        slots
    }

    /// Pairs `(leading, following)` of held flights closer than their required gap.
    pub fn separation_violations(&self) -> Vec<(FlightId, FlightId)> {
        let mut violations = vec![];
        for runway_id in self.runways.keys() {
            let slots = self.slots_on(runway_id);
            for (i, lead) in slots.iter().enumerate() {
                for follow in slots.iter().skip(i + 1) {
                    let (Some(lead_at), Some(follow_at)) = (lead.actual_time(), follow.actual_time())
                    else {
                        continue;
                    };
                    if (follow_at - lead_at).0 < self.required_gap(lead.category, follow.category) {
                        violations.push((lead.id.clone(), follow.id.clone()));
                    }
                }
            }
        }
        violations
    }

    fn has_conflict(&self, other: &Flight, category: WakeCategory, at: Time) -> bool {
        match other.actual_time() {
            Some(other_at) if other_at <= at => {
                (at - other_at).0 < self.required_gap(other.category, category)
            }
            Some(other_at) => (other_at - at).0 < self.required_gap(category, other.category),
            None => false,
        }
    }

    /// Earliest time at or after `from` that keeps separation from every held flight on
    /// `runway_id` accepted by `considered`.
    ///
    /// Each round jumps past the safe time of the latest conflicting neighbour, so the
    /// search passes at least one neighbour per round after the first.
    fn earliest_slot(
        &self,
        runway_id: &RunwayId,
        flight_id: &FlightId,
        category: WakeCategory,
        from: Time,
        considered: impl Fn(&Flight) -> bool,
    ) -> Option<Time> {
        let neighbours: Vec<&Flight> = self
            .slots_on(runway_id)
            .into_iter()
            .filter(|f| f.id != *flight_id && considered(f))
            .collect();

        let mut at = from;
        for _ in 0..neighbours.len() + 2 {
            let push = neighbours
                .iter()
                .filter(|n| self.has_conflict(n, category, at))
                .filter_map(|n| {
                    n.actual_time()
                        .map(|n_at| n_at + self.required_gap(n.category, category))
                })
                .max();
            match push {
                None => return Some(at),
                Some(next) => at = next,
            }
        }
        None
    }

    /// Best-scoring active runway, keeping the previously held runway while it stays open.
    fn select_runway(&self, flight: &Flight, now: Time) -> Option<RunwayId> {
        if let Some(previous) = &flight.previous_runway {
            if self.runways.get(previous).is_some_and(|r| r.active) {
                return Some(previous.clone());
            }
        }
        self.best_runway(flight, now, |r| r.active)
    }

    fn best_runway(
        &self,
        flight: &Flight,
        now: Time,
        eligible: impl Fn(&Runway) -> bool,
    ) -> Option<RunwayId> {
        let mut best: Option<(&RunwayId, f64)> = None;
        for runway in self.runways.values().filter(|r| eligible(r)) {
            let score = runway.score_if_active(&self.weather, flight, now, &self.settings);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((&runway.id, score));
            }
        }
        best.map(|(id, _)| id.clone())
    }

    fn commit(&mut self, flight_id: &FlightId, runway_id: &RunwayId, at: Time) {
        let weather = &self.weather;
        let matrix = &self.matrix;
        if let (Some(flight), Some(runway)) =
            (self.flights.get_mut(flight_id), self.runways.get_mut(runway_id))
        {
            flight.assign(runway_id.clone(), at);
            runway.advance_availability(at, flight.category, matrix, weather);
            tracing::debug!(flight = %flight.number, runway = %runway_id, %at, "slot assigned");
        }
    }

    fn requeue(&mut self, flight_id: &FlightId, reason: PendingReason, report: &mut PassReport) {
        if let Some(flight) = self.flights.get_mut(flight_id) {
            flight.requeue(reason);
            tracing::debug!(flight = %flight.number, %reason, escalation = flight.escalation, "requeued");
            report.requeued.push((flight_id.clone(), reason));
        }
    }

    /// Re-checks held slots against the current weather, matrix and runway state.
    ///
    /// Walking each runway chronologically, a flight that no longer keeps separation from
    /// the flights kept before it goes back to pending. Routine traffic on a closed runway
    /// is released as well; emergencies keep a forced-open runway.
    fn revalidate(&mut self, report: &mut PassReport) {
        let mut dropped: Vec<(FlightId, PendingReason)> = vec![];
        for runway in self.runways.values() {
            let mut kept: Vec<&Flight> = vec![];
            for flight in self.slots_on(&runway.id) {
                if !runway.active && !flight.is_emergency() {
                    dropped.push((flight.id.clone(), RunwayClosed));
                    continue;
                }
                let at = flight.actual_time().unwrap_or_default();
                if kept.iter().any(|k| self.has_conflict(k, flight.category, at)) {
                    dropped.push((flight.id.clone(), SeparationLost));
                } else {
                    kept.push(flight);
                }
            }
        }
        dropped.extend(
            self.flights
                .values()
                .filter(|f| f.runway().is_some_and(|r| !self.runways.contains_key(r)))
                .map(|f| (f.id.clone(), RunwayClosed)),
        );

        for (flight_id, reason) in dropped {
            tracing::warn!(flight = %flight_id, %reason, "held slot released");
            self.requeue(&flight_id, reason, report);
        }
    }

    fn place_routine(&mut self, flight_id: &FlightId, now: Time, report: &mut PassReport) {
        let Some(flight) = self.flights.get(flight_id) else {
            return;
        };
        let Some(runway_id) = self.select_runway(flight, now) else {
            tracing::warn!(flight = %flight.number, "no active runway, holding");
            self.requeue(flight_id, NoActiveRunway, report);
            return;
        };
        let next_available = self.runways[&runway_id].next_available;
        let from = flight.scheduled_time.max(next_available).max(now);

        match self.earliest_slot(&runway_id, flight_id, flight.category, from, |_| true) {
            Some(at) => {
                self.commit(flight_id, &runway_id, at);
                report.scheduled.push(flight_id.clone());
            }
            None => self.requeue(flight_id, SlotSearchExhausted, report),
        }
    }

    fn place_emergency(&mut self, flight_id: &FlightId, now: Time, report: &mut PassReport) {
        let Some(flight) = self.flights.get(flight_id) else {
            return;
        };
        let target = self
            .best_runway(flight, now, |r| r.active)
            .or_else(|| self.best_runway(flight, now, |_| true));
        let Some(target) = target else {
            tracing::warn!(flight = %flight.number, emergency = %flight.emergency, "no runway at all");
            self.requeue(flight_id, NoActiveRunway, report);
            return;
        };
        if !self.runways[&target].active {
            tracing::warn!(flight = %flight.number, runway = %target, "forcing closed runway open for emergency");
        }

        let category = flight.category;
        let base = flight.scheduled_time.max(now);
        // only other emergencies can hold the emergency back
        let Some(at) = self.earliest_slot(&target, flight_id, category, base, Flight::is_emergency)
        else {
            self.requeue(flight_id, SlotSearchExhausted, report);
            return;
        };

        let conflicting: Vec<FlightId> = self
            .slots_on(&target)
            .into_iter()
            .filter(|f| !f.is_emergency() && f.id != *flight_id)
            .filter(|f| self.has_conflict(f, category, at))
            .map(|f| f.id.clone())
            .collect();
        for conflict_id in conflicting {
            self.displace(&conflict_id, &target, now, report);
        }

        match self.earliest_slot(&target, flight_id, category, at, |_| true) {
            Some(at) => {
                self.commit(flight_id, &target, at);
                report.scheduled.push(flight_id.clone());
            }
            None => self.requeue(flight_id, SlotSearchExhausted, report),
        }
    }

    /// Moves a routine flight off `from_runway`, onto the best other active runway when
    /// one exists, back to pending otherwise.
    fn displace(&mut self, flight_id: &FlightId, from_runway: &RunwayId, now: Time, report: &mut PassReport) {
        let Some(flight) = self.flights.get(flight_id) else {
            return;
        };
        let alternative = self.best_runway(flight, now, |r| r.active && r.id != *from_runway);

        let slot = alternative.and_then(|runway_id| {
            let next_available = self.runways[&runway_id].next_available;
            let from = if next_available > flight.scheduled_time {
                next_available + self.settings.bump_buffer_secs
            } else {
                flight.scheduled_time
            };
            self.earliest_slot(&runway_id, flight_id, flight.category, from.max(now), |_| true)
                .map(|at| (runway_id, at))
        });

        match slot {
            Some((runway_id, at)) => {
                tracing::warn!(flight = %flight.number, from = %from_runway, to = %runway_id, %at, "displaced by emergency");
                self.commit(flight_id, &runway_id, at);
                report.displaced.push(flight_id.clone());
            }
            None => {
                tracing::warn!(flight = %flight.number, runway = %from_runway, "displaced by emergency, back to pending");
                self.requeue(flight_id, Displaced, report);
            }
        }
    }

    /// One scheduling pass at instant `now`.
    ///
    /// Held slots are re-checked first, then every pending flight is taken once in priority
    /// order. Flights that cannot be placed go back to pending with a raised priority and
    /// wait for the next pass.
    pub fn run_scheduling_pass(&mut self, now: Time) -> PassReport {
        let mut report = PassReport::default();
        self.revalidate(&mut report);

        let mut queue: BinaryHeap<QueueEntry> = self
            .flights
            .values()
            .filter(|f| f.is_pending())
            .map(|f| QueueEntry {
                priority: f.priority(now),
                scheduled_time: f.scheduled_time,
                id: f.id.clone(),
            })
            .collect();

        if queue.is_empty() {
            tracing::trace!(%now, "nothing pending");
        }

        while let Some(entry) = queue.pop() {
            let emergency = self
                .flights
                .get(&entry.id)
                .filter(|f| f.is_pending())
                .map(Flight::is_emergency);
            match emergency {
                Some(true) => self.place_emergency(&entry.id, now, &mut report),
                Some(false) => self.place_routine(&entry.id, now, &mut report),
                None => {}
            }
        }

        report.pending = self.flights.values().filter(|f| f.is_pending()).count();
        if !report.scheduled.is_empty() || !report.requeued.is_empty() {
            tracing::info!(
                scheduled = report.scheduled.len(),
                displaced = report.displaced.len(),
                requeued = report.requeued.len(),
                pending = report.pending,
                "scheduling pass complete"
            );
        }
        if report.pending > 0 {
            tracing::warn!(pending = report.pending, "flights could not be scheduled this pass");
        }

        self.assert_invariants();
        self.last_report = Some(report.clone());
        report
    }

    fn assert_invariants(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        debug_assert!(
            self.flights.values().all(|f| match f.actual_time() {
                Some(at) => at >= f.scheduled_time && f.runway().is_some(),
                None => f.is_pending(),
            }),
            "Slot time <-> scheduled time invariant violated"
        );
        let violations = self.separation_violations();
        debug_assert!(
            violations.is_empty(),
            "Runway separation invariant violated: {:?}",
            violations
        );
    }
}
