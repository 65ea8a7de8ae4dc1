use crate::flight::{Emergency, Flight, FlightId, FlightKind};
use crate::runway::{Runway, RunwayId};
use crate::schedule::Engine;
use crate::separation::WakeCategory;
use crate::time::Time;
use crate::weather::{Condition, Weather};
use proptest::prelude::*;
use std::sync::Arc;

pub fn id(s: &str) -> Arc<str> {
    Arc::from(s)
}

pub fn calm(condition: Condition) -> Weather {
    Weather::new(0.0, 0.0, 10.0, condition).unwrap()
}

pub fn wind_from(direction: f64, speed: f64) -> Weather {
    Weather::new(speed, direction, 10.0, Condition::Sunny).unwrap()
}

/// Engine with calm sunny weather and the given `(id, heading, length)` runways.
pub fn engine_with(runways: &[(&str, f64, u32)]) -> Engine {
    let mut engine = Engine::default();
    engine.set_weather(calm(Condition::Sunny)).unwrap();
    for (runway_id, heading, length) in runways {
        add_runway(&mut engine, runway_id, *heading, *length);
    }
    engine
}

pub fn add_runway(engine: &mut Engine, runway_id: &str, heading: f64, length: u32) {
    engine
        .register_runway(Runway::new(runway_id, heading, length, Time(0)).unwrap())
        .unwrap();
}

pub fn add_flight(engine: &mut Engine, flight_id: &str, category: WakeCategory, at: u64) {
    engine
        .enqueue(Flight::new(flight_id, category, FlightKind::Arrival, Time(at)).with_id(flight_id))
        .unwrap();
}

pub fn add_emergency(
    engine: &mut Engine,
    flight_id: &str,
    category: WakeCategory,
    at: u64,
    emergency: Emergency,
) {
    engine
        .enqueue(
            Flight::new(flight_id, category, FlightKind::Arrival, Time(at))
                .with_id(flight_id)
                .with_emergency(emergency),
        )
        .unwrap();
}

/// Runway and time held by `flight_id`, if any.
pub fn slot(engine: &Engine, flight_id: &str) -> Option<(RunwayId, Time)> {
    let flight = engine.flight(&id(flight_id))?;
    Some((flight.runway()?.clone(), flight.actual_time()?))
}

pub fn held(runway_id: &str, at: u64) -> Option<(RunwayId, Time)> {
    Some((id(runway_id), Time(at)))
}

pub fn ids(list: &[&str]) -> Vec<FlightId> {
    list.iter().map(|s| id(s)).collect()
}

pub fn arb_category() -> impl Strategy<Value = WakeCategory> {
    prop::sample::select(WakeCategory::ALL.to_vec())
}

pub fn arb_emergency() -> impl Strategy<Value = Emergency> {
    prop_oneof![
        6 => Just(Emergency::None),
        1 => prop::sample::select(Emergency::ALL[1..].to_vec()),
    ]
}

pub fn arb_condition() -> impl Strategy<Value = Condition> {
    prop::sample::select(Condition::ALL.to_vec())
}

pub fn arb_weather() -> impl Strategy<Value = Weather> {
    (0.0..50.0f64, 0.0..360.0f64, 0.2..15.0f64, arb_condition())
        .prop_map(|(speed, direction, visibility, condition)| {
            Weather::new(speed, direction, visibility, condition).unwrap()
        })
}

pub fn arb_runway(n: usize) -> impl Strategy<Value = Runway> {
    (0.0..360.0f64, 1500..4500u32, prop::bool::weighted(0.8)).prop_map(
        move |(heading, length, active)| {
            let mut runway = Runway::new(format!("RW{}", n), heading, length, Time(0)).unwrap();
            runway.set_active(active);
            runway
        },
    )
}

pub fn arb_runways() -> impl Strategy<Value = Vec<Runway>> {
    (1..4usize).prop_flat_map(|count| (0..count).map(arb_runway).collect::<Vec<_>>())
}

pub fn arb_flights() -> impl Strategy<Value = Vec<Flight>> {
    prop::collection::vec(
        (arb_category(), any::<bool>(), arb_emergency(), 0u8..=100, 0..3000u64),
        1..25,
    )
    .prop_map(|rows| {
        rows
            .into_iter()
            .enumerate()
            .map(|(i, (category, arrival, emergency, fuel, at))| {
                let kind = if arrival { FlightKind::Arrival } else { FlightKind::Departure };
                Flight::new(format!("FL{}", i), category, kind, Time(at))
                    .with_id(format!("FL_{}", i))
                    .with_emergency(emergency)
                    .with_fuel(fuel)
            })
            .collect()
    })
}
