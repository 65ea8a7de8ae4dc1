use crate::error::{Error, Result};
use crate::runway::RunwayId;
use crate::separation::WakeCategory;
use crate::time::Time;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub type FlightId = Arc<str>;

/// Every emergency outranks every routine flight: the routine bonuses below
/// plus any realistic escalation stay far under this scale.
const EMERGENCY_SCALE: i64 = 1_000_000_000;

/// Fuel bonus for routine arrivals: `(below_percent, bonus)`.
const FUEL_TIERS: [(u8, i64); 3] = [(10, 3000), (20, 2000), (30, 1000)];

const OVERDUE_BASE: i64 = 1000;
const OVERDUE_PER_MINUTE: i64 = 10;
const OVERDUE_CAP: i64 = 2000;
const IMMINENT_WINDOW_MINUTES: u64 = 30;
const IMMINENT_PER_MINUTE: i64 = 20;

/// Added per requeue so a deferred flight can never be starved.
pub const ESCALATION_STEP: i64 = 100;

/// Escalation stops growing here, so routine bonuses plus escalation stay under
/// `EMERGENCY_SCALE`.
const ESCALATION_CAP: i64 = EMERGENCY_SCALE / 2;

/// Latest accepted scheduled time. Leaves a day of headroom for separation gaps and
/// buffers added on top of it.
pub const LATEST_SCHEDULE: Time = Time(u64::MAX - 86_400);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightKind {
    Arrival,
    Departure,
}

impl fmt::Display for FlightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightKind::Arrival => write!(f, "ARR"),
            FlightKind::Departure => write!(f, "DEP"),
        }
    }
}

impl FromStr for FlightKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "arr" | "arrival" => Ok(FlightKind::Arrival),
            "dep" | "departure" => Ok(FlightKind::Departure),
            _ => Err(Error::Parse {
                kind: "flight type",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Emergency {
    #[default]
    None,
    Vip,
    MinorMechanical,
    Governmental,
    LowFuel,
    Medical,
    MajorMechanical,
    Critical,
}

impl Emergency {
    pub const ALL: [Emergency; 8] = [
        Emergency::None,
        Emergency::Vip,
        Emergency::MinorMechanical,
        Emergency::Governmental,
        Emergency::LowFuel,
        Emergency::Medical,
        Emergency::MajorMechanical,
        Emergency::Critical,
    ];

    pub fn severity(self) -> i64 {
        match self {
            Emergency::None => 0,
            Emergency::Vip => 2,
            Emergency::MinorMechanical => 3,
            Emergency::Governmental => 3,
            Emergency::LowFuel => 4,
            Emergency::Medical => 5,
            Emergency::MajorMechanical => 6,
            Emergency::Critical => 7,
        }
    }

    pub fn is_emergency(self) -> bool {
        self != Emergency::None
    }
}

impl fmt::Display for Emergency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Emergency::None => "NONE",
            Emergency::Vip => "VIP",
            Emergency::MinorMechanical => "MINOR_MECHANICAL",
            Emergency::Governmental => "GOVERNMENTAL",
            Emergency::LowFuel => "LOW_FUEL",
            Emergency::Medical => "MEDICAL",
            Emergency::MajorMechanical => "MAJOR_MECHANICAL",
            Emergency::Critical => "CRITICAL",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Emergency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Emergency::ALL
            .into_iter()
            .find(|e| e.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Parse {
                kind: "emergency level",
                value: s.to_string(),
            })
    }
}

/// Why a flight is waiting for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PendingReason {
    Waiting,
    NoActiveRunway,
    /// Bumped by an emergency with nowhere else to go.
    Displaced,
    /// Worse weather made the held slot too tight.
    SeparationLost,
    RunwayClosed,
    SlotSearchExhausted,
}

impl fmt::Display for PendingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PendingReason::Waiting => "waiting",
            PendingReason::NoActiveRunway => "no active runway",
            PendingReason::Displaced => "displaced",
            PendingReason::SeparationLost => "separation lost",
            PendingReason::RunwayClosed => "runway closed",
            PendingReason::SlotSearchExhausted => "no slot found",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightStatus {
    Pending(PendingReason),
    Scheduled { runway: RunwayId, at: Time },
}

impl FlightStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, FlightStatus::Pending(_))
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightStatus::Pending(reason) => write!(f, "PENDING ({})", reason),
            FlightStatus::Scheduled { runway, at } => write!(f, "RWY {} @ {}", runway, at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub id: FlightId,
    pub number: String,
    pub airline: String,
    pub aircraft: String,
    pub category: WakeCategory,
    pub kind: FlightKind,
    pub emergency: Emergency,
    pub fuel: u8,
    pub scheduled_time: Time,
    pub status: FlightStatus,
    /// Runway held before the flight last went back to pending; preferred on re-placement.
    #[serde(default)]
    pub previous_runway: Option<RunwayId>,
    #[serde(default)]
    pub escalation: u32,
}

impl Flight {
    pub fn new(
        number: impl Into<String>,
        category: WakeCategory,
        kind: FlightKind,
        scheduled_time: Time,
    ) -> Self {
        Flight {
            id: Arc::from(uuid::Uuid::new_v4().to_string()),
            number: number.into(),
            airline: String::new(),
            aircraft: String::new(),
            category,
            kind,
            emergency: Emergency::None,
            fuel: 100,
            scheduled_time,
            status: FlightStatus::Pending(PendingReason::Waiting),
            previous_runway: None,
            escalation: 0,
        }
    }

    pub fn with_id(mut self, id: impl AsRef<str>) -> Self {
        self.id = Arc::from(id.as_ref());
        self
    }

    pub fn with_operator(mut self, airline: impl Into<String>, aircraft: impl Into<String>) -> Self {
        self.airline = airline.into();
        self.aircraft = aircraft.into();
        self
    }

    pub fn with_emergency(mut self, emergency: Emergency) -> Self {
        self.emergency = emergency;
        self
    }

    pub fn with_fuel(mut self, fuel: u8) -> Self {
        self.set_fuel(fuel);
        self
    }

    /// Boundary check for flights arriving from outside the engine.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidFlight {
            id: self.id.to_string(),
            reason: reason.to_string(),
        };
        if self.id.trim().is_empty() {
            return Err(invalid("empty id"));
        }
        if self.number.trim().is_empty() {
            return Err(invalid("empty flight number"));
        }
        if self.fuel > 100 {
            return Err(invalid("fuel above 100%"));
        }
        if self.scheduled_time > LATEST_SCHEDULE {
            return Err(invalid("scheduled time out of range"));
        }
        Ok(())
    }

    pub fn set_fuel(&mut self, fuel: u8) {
        self.fuel = fuel.min(100);
    }

    pub fn is_emergency(&self) -> bool {
        self.emergency.is_emergency()
    }

    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    pub fn runway(&self) -> Option<&RunwayId> {
        match &self.status {
            FlightStatus::Scheduled { runway, .. } => Some(runway),
            FlightStatus::Pending(_) => None,
        }
    }

    pub fn actual_time(&self) -> Option<Time> {
        match &self.status {
            FlightStatus::Scheduled { at, .. } => Some(*at),
            FlightStatus::Pending(_) => None,
        }
    }

    pub fn is_on(&self, runway_id: &RunwayId) -> bool {
        self.runway().is_some_and(|r| r == runway_id)
    }

    pub(crate) fn assign(&mut self, runway: RunwayId, at: Time) {
        self.previous_runway = None;
        self.status = FlightStatus::Scheduled { runway, at };
    }

    /// Drops any assignment without touching escalation.
    pub(crate) fn release(&mut self, reason: PendingReason) {
        if let FlightStatus::Scheduled { runway, .. } = &self.status {
            self.previous_runway = Some(runway.clone());
        }
        self.status = FlightStatus::Pending(reason);
    }

    /// Returns the flight to pending after the engine failed to hold it, raising its priority.
    pub(crate) fn requeue(&mut self, reason: PendingReason) {
        self.release(reason);
        self.escalation = self.escalation.saturating_add(1);
    }

    pub fn fuel_bonus(&self) -> i64 {
        if self.is_emergency() || self.kind != FlightKind::Arrival {
            return 0;
        }
        FUEL_TIERS
            .iter()
            .find(|(below, _)| self.fuel < *below)
            .map(|(_, bonus)| *bonus)
            .unwrap_or(0)
    }

    pub fn urgency(&self, now: Time) -> i64 {
        if self.scheduled_time < now {
            let late = ((now - self.scheduled_time).0 / 60) as i64;
            (OVERDUE_BASE + late * OVERDUE_PER_MINUTE).min(OVERDUE_CAP)
        } else {
            let until = now.minutes_until(self.scheduled_time);
            if until <= IMMINENT_WINDOW_MINUTES {
                (IMMINENT_WINDOW_MINUTES - until) as i64 * IMMINENT_PER_MINUTE
            } else {
                0
            }
        }
    }

    /// Derived on demand so it can never go stale against emergency, fuel or schedule edits.
    pub fn priority(&self, now: Time) -> i64 {
        self.emergency.severity() * EMERGENCY_SCALE
            + self.fuel_bonus()
            + self.urgency(now)
            + self.escalation_bonus()
    }

    pub fn escalation_bonus(&self) -> i64 {
        (i64::from(self.escalation) * ESCALATION_STEP).min(ESCALATION_CAP)
    }
}
