use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wake turbulence class, ordered by the strength of the wake it leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WakeCategory {
    Light,
    Medium,
    Heavy,
    Super,
}

impl WakeCategory {
    pub const ALL: [WakeCategory; 4] = [
        WakeCategory::Light,
        WakeCategory::Medium,
        WakeCategory::Heavy,
        WakeCategory::Super,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for WakeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WakeCategory::Light => "LIGHT",
            WakeCategory::Medium => "MEDIUM",
            WakeCategory::Heavy => "HEAVY",
            WakeCategory::Super => "SUPER",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for WakeCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "L" | "LIGHT" => Ok(WakeCategory::Light),
            "M" | "MEDIUM" => Ok(WakeCategory::Medium),
            "H" | "HEAVY" => Ok(WakeCategory::Heavy),
            "S" | "SUPER" | "J" => Ok(WakeCategory::Super),
            _ => Err(Error::Parse {
                kind: "wake category",
                value: s.to_string(),
            }),
        }
    }
}

/// Base time separation in seconds, indexed `[leading][following]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeparationMatrix {
    table: [[u64; 4]; 4],
}

impl Default for SeparationMatrix {
    fn default() -> Self {
        SeparationMatrix {
            table: [
                // following: LIGHT, MEDIUM, HEAVY, SUPER
                [120, 100, 80, 60],
                [180, 120, 100, 80],
                [240, 180, 120, 100],
                [300, 240, 180, 120],
            ],
        }
    }
}

impl SeparationMatrix {
    pub fn required(&self, leading: WakeCategory, following: WakeCategory) -> u64 {
        self.table[leading.index()][following.index()]
    }

    /// Separation after weather inflation, rounded up to whole seconds.
    pub fn inflated(&self, leading: WakeCategory, following: WakeCategory, factor: f64) -> u64 {
        debug_assert!(factor >= 1.0, "weather factor below 1.0: {}", factor);
        let secs = self.required(leading, following) as f64 * factor.max(1.0);
        // absorb float noise so 120 * 1.05 stays 126
        (secs - 1e-9).ceil() as u64
    }

    pub fn set(&mut self, leading: WakeCategory, following: WakeCategory, secs: u64) {
        self.table[leading.index()][following.index()] = secs;
    }
}

impl fmt::Display for SeparationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "lead\\fol")?;
        for following in WakeCategory::ALL {
            write!(f, "{:>8}", following)?;
        }
        writeln!(f)?;
        for leading in WakeCategory::ALL {
            write!(f, "{:>8}", leading)?;
            for following in WakeCategory::ALL {
                write!(f, "{:>8}", self.required(leading, following))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
