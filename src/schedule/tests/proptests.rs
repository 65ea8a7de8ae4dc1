use crate::schedule::Engine;
use crate::schedule::tests::utils::{arb_flights, arb_runways, arb_weather};
use crate::time::Time;
use proptest::prelude::*;
use proptest::proptest;
use std::collections::HashSet;

proptest! {
    #[test]
    fn test_separation_invariant(
        runways in arb_runways(),
        flights in arb_flights(),
        weather in arb_weather(),
        worse in arb_weather(),
        now in 0..2000u64,
    ) {
        let mut engine = Engine::default();
        engine.set_weather(weather).unwrap();
        for runway in runways {
            engine.register_runway(runway).unwrap();
        }
        for flight in flights {
            engine.enqueue(flight).unwrap();
        }

        engine.run_scheduling_pass(Time(now));
        engine.set_weather(worse).unwrap();
        engine.run_scheduling_pass(Time(now + 60));

        let scheduled = engine.scheduled();
        for (i, a) in scheduled.iter().enumerate() {
            for b in scheduled.iter().skip(i + 1) {
                if a.runway() != b.runway() {
                    continue;
                }
                let (lead, follow) = if a.actual_time() <= b.actual_time() { (a, b) } else { (b, a) };
                let gap = follow.actual_time().unwrap().abs_diff(lead.actual_time().unwrap());
                let required = engine.required_gap(lead.category, follow.category);
                prop_assert!(
                    gap >= required,
                    "\nSeparation lost on {:?}:\nFlight {} ({}, {}) -> Flight {} ({}, {}): {}s < {}s",
                    lead.runway(), lead.id, lead.category, lead.status,
                    follow.id, follow.category, follow.status, gap, required
                );
            }
        }
        for flight in &scheduled {
            prop_assert!(flight.actual_time() >= Some(flight.scheduled_time));
            prop_assert!(engine.runway(flight.runway().unwrap()).is_some());
        }
    }

    #[test]
    fn test_every_emergency_placed(
        runways in arb_runways(),
        flights in arb_flights(),
        weather in arb_weather(),
    ) {
        let mut engine = Engine::default();
        engine.set_weather(weather).unwrap();
        for runway in runways {
            engine.register_runway(runway).unwrap();
        }
        for flight in flights {
            engine.enqueue(flight).unwrap();
        }

        engine.run_scheduling_pass(Time(0));

        for flight in engine.pending() {
            prop_assert!(
                !flight.is_emergency(),
                "\nEmergency {} ({}) left pending: {}",
                flight.id, flight.emergency, flight.status
            );
        }
    }

    #[test]
    fn test_no_double_assignment(
        runways in arb_runways(),
        flights in arb_flights(),
        toggles in prop::collection::vec(any::<bool>(), 3),
    ) {
        let total = flights.len();
        let mut engine = Engine::default();
        let runway_ids: Vec<_> = runways.iter().map(|r| r.id.clone()).collect();
        for runway in runways {
            engine.register_runway(runway).unwrap();
        }
        for flight in flights {
            engine.enqueue(flight).unwrap();
        }

        for (pass, close) in toggles.into_iter().enumerate() {
            let report = engine.run_scheduling_pass(Time(pass as u64 * 300));

            let placed: HashSet<_> = report.scheduled.iter().collect();
            prop_assert_eq!(report.scheduled.len(), placed.len());
            for flight_id in placed {
                prop_assert!(!engine.flight(flight_id).unwrap().is_pending());
            }

            let pending: HashSet<_> = engine.pending().iter().map(|f| f.id.clone()).collect();
            let scheduled: HashSet<_> = engine.scheduled().iter().map(|f| f.id.clone()).collect();
            prop_assert!(pending.is_disjoint(&scheduled));
            prop_assert_eq!(total, pending.len() + scheduled.len());
            prop_assert_eq!(report.pending, pending.len());

            if let Some(runway_id) = runway_ids.get(pass % runway_ids.len()) {
                engine.set_runway_active(runway_id, !close).unwrap();
            }
        }
    }
}
