use crate::flight::FlightStatus::Pending;
use crate::flight::PendingReason::{NoActiveRunway, SeparationLost};
use crate::schedule::tests::utils::{
    add_flight, calm, engine_with, held, id, ids, slot, wind_from,
};
use crate::separation::WakeCategory::{Heavy, Medium};
use crate::time::Time;
use crate::weather::Condition;

#[test]
fn test_two_mediums_pushed_apart() {
    let mut engine = engine_with(&[("09", 90.0, 3000)]);
    add_flight(&mut engine, "FLIGHT_1", Medium, 1000);
    add_flight(&mut engine, "FLIGHT_2", Medium, 1010);

    let report = engine.run_scheduling_pass(Time(0));

    assert_eq!(ids(&["FLIGHT_1", "FLIGHT_2"]), report.scheduled);
    assert_eq!(0, report.pending);
    assert_eq!(held("09", 1000), slot(&engine, "FLIGHT_1"));
    assert_eq!(held("09", 1120), slot(&engine, "FLIGHT_2"));
}

#[test]
fn test_slot_never_before_now() {
    let mut engine = engine_with(&[("09", 90.0, 3000)]);
    add_flight(&mut engine, "FLIGHT_1", Medium, 100);

    engine.run_scheduling_pass(Time(5000));

    assert_eq!(held("09", 5000), slot(&engine, "FLIGHT_1"));
}

#[test]
fn test_runway_into_wind() {
    let mut engine = engine_with(&[("09", 90.0, 3500), ("27", 270.0, 3500)]);
    engine.set_weather(wind_from(270.0, 20.0)).unwrap();
    add_flight(&mut engine, "FLIGHT_1", Medium, 1000);

    engine.run_scheduling_pass(Time(0));

    assert_eq!(held("27", 1000), slot(&engine, "FLIGHT_1"));
}

#[test]
fn test_heavy_avoids_short_runway() {
    let mut engine = engine_with(&[("09", 90.0, 2500), ("10", 100.0, 3500)]);
    add_flight(&mut engine, "HEAVY", Heavy, 1000);
    add_flight(&mut engine, "MEDIUM", Medium, 5000);

    engine.run_scheduling_pass(Time(0));

    assert_eq!(held("10", 1000), slot(&engine, "HEAVY"));
    assert_eq!(held("09", 5000), slot(&engine, "MEDIUM"));
}

#[test]
fn test_weather_inflates_separation() {
    let mut engine = engine_with(&[("09", 90.0, 3000)]);
    engine.set_weather(calm(Condition::Foggy)).unwrap();
    add_flight(&mut engine, "FLIGHT_1", Medium, 1000);
    add_flight(&mut engine, "FLIGHT_2", Medium, 1000);

    engine.run_scheduling_pass(Time(0));

    assert_eq!(168, engine.required_gap(Medium, Medium));
    assert_eq!(held("09", 1000), slot(&engine, "FLIGHT_1"));
    assert_eq!(held("09", 1168), slot(&engine, "FLIGHT_2"));
}

#[test]
fn test_worse_weather_releases_tight_slots() {
    let mut engine = engine_with(&[("09", 90.0, 3000)]);
    add_flight(&mut engine, "FLIGHT_1", Medium, 1000);
    add_flight(&mut engine, "FLIGHT_2", Medium, 1000);
    engine.run_scheduling_pass(Time(0));
    assert_eq!(held("09", 1120), slot(&engine, "FLIGHT_2"));

    engine.set_weather(calm(Condition::Thunderstorm)).unwrap();
    let report = engine.run_scheduling_pass(Time(0));

    assert_eq!(vec![(id("FLIGHT_2"), SeparationLost)], report.requeued);
    assert_eq!(ids(&["FLIGHT_2"]), report.scheduled);
    assert_eq!(held("09", 1000), slot(&engine, "FLIGHT_1"));
    assert_eq!(held("09", 1240), slot(&engine, "FLIGHT_2"));
    assert_eq!(1, engine.flight(&id("FLIGHT_2")).unwrap().escalation);
    assert!(engine.separation_violations().is_empty());
}

#[test]
fn test_previous_runway_kept_while_open() {
    let mut engine = engine_with(&[("09", 90.0, 3500), ("27", 270.0, 3500)]);
    engine.set_weather(wind_from(270.0, 20.0)).unwrap();
    add_flight(&mut engine, "FLIGHT_1", Medium, 1000);
    engine.run_scheduling_pass(Time(0));
    assert_eq!(held("27", 1000), slot(&engine, "FLIGHT_1"));

    // wind swings round; 09 now scores better
    engine.set_weather(wind_from(90.0, 20.0)).unwrap();
    engine.set_scheduled_time(&id("FLIGHT_1"), Time(1300)).unwrap();
    engine.run_scheduling_pass(Time(0));

    assert_eq!(held("27", 1300), slot(&engine, "FLIGHT_1"));
}

#[test]
fn test_closed_runway_moves_traffic() {
    let mut engine = engine_with(&[("09", 90.0, 3500), ("27", 270.0, 3500)]);
    engine.set_weather(wind_from(270.0, 20.0)).unwrap();
    add_flight(&mut engine, "FLIGHT_1", Medium, 1000);
    engine.run_scheduling_pass(Time(0));

    engine.set_runway_active(&id("27"), false).unwrap();
    let report = engine.run_scheduling_pass(Time(0));

    assert_eq!(1, report.requeued.len());
    assert_eq!(held("09", 1000), slot(&engine, "FLIGHT_1"));
}

#[test]
fn test_no_active_runway_escalates() {
    let mut engine = engine_with(&[("09", 90.0, 3000)]);
    engine.set_runway_active(&id("09"), false).unwrap();
    add_flight(&mut engine, "FLIGHT_1", Medium, 1000);

    let first = engine.run_scheduling_pass(Time(0));
    let before = engine.flight(&id("FLIGHT_1")).unwrap().priority(Time(0));
    let second = engine.run_scheduling_pass(Time(0));
    let after = engine.flight(&id("FLIGHT_1")).unwrap().priority(Time(0));

    assert_eq!(vec![(id("FLIGHT_1"), NoActiveRunway)], first.requeued);
    assert_eq!(1, second.pending);
    assert!(after > before);
    let flight = engine.flight(&id("FLIGHT_1")).unwrap();
    assert_eq!(Pending(NoActiveRunway), flight.status);
    assert_eq!(2, flight.escalation);

    engine.set_runway_active(&id("09"), true).unwrap();
    engine.run_scheduling_pass(Time(0));
    assert_eq!(held("09", 1000), slot(&engine, "FLIGHT_1"));
}

#[test]
fn test_low_fuel_goes_first() {
    let mut engine = engine_with(&[("09", 90.0, 3000)]);
    add_flight(&mut engine, "FLIGHT_1", Medium, 1000);
    add_flight(&mut engine, "FLIGHT_2", Medium, 1000);
    engine.set_fuel(&id("FLIGHT_2"), 8).unwrap();

    let report = engine.run_scheduling_pass(Time(0));

    assert_eq!(ids(&["FLIGHT_2", "FLIGHT_1"]), report.scheduled);
    assert_eq!(held("09", 1000), slot(&engine, "FLIGHT_2"));
    assert_eq!(held("09", 1120), slot(&engine, "FLIGHT_1"));
}

#[test]
fn test_repeated_passes_converge() {
    let mut engine = engine_with(&[("09", 90.0, 3000), ("27", 270.0, 2800)]);
    for i in 0..6 {
        add_flight(&mut engine, &format!("FLIGHT_{}", i), Medium, 1000 + i * 20);
    }
    engine.run_scheduling_pass(Time(0));
    let settled: Vec<_> = (0..6).map(|i| slot(&engine, &format!("FLIGHT_{}", i))).collect();

    let again = engine.run_scheduling_pass(Time(0));

    assert!(again.scheduled.is_empty() && again.requeued.is_empty());
    let after: Vec<_> = (0..6).map(|i| slot(&engine, &format!("FLIGHT_{}", i))).collect();
    assert_eq!(settled, after);
}
