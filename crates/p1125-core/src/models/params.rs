//! Instrument parameter domains
//!
//! Every enumerated parameter the P1125 accepts is a closed enum here. The serde
//! representation is the exact wire string, so a value that is not in the set can never
//! reach the instrument.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => ($wire:literal, $short:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant, )+
        }

        impl $name {
            /// All values, in instrument order
            pub const ALL: &'static [$name] = &[$( $name::$variant, )+];

            /// The string sent on the wire
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $wire, )+
                }
            }

            /// The short form accepted on the command line
            pub fn short_name(&self) -> &'static str {
                match self {
                    $( $name::$variant => $short, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            /// Accepts the exact wire string or the short form (case-insensitive).
            fn from_str(s: &str) -> Result<Self> {
                let value = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == value || v.short_name().eq_ignore_ascii_case(value))
                    .ok_or_else(|| Error::InvalidValue {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

wire_enum! {
    /// Acquisition mode for `V1.acquire_start`
    AcquireMode, "acquisition mode" {
        Run => ("ACQUIRE_MODE_RUN", "RUN"),
        Single => ("ACQUIRE_MODE_SINGLE", "SINGLE"),
    }
}

wire_enum! {
    /// Trigger source
    TriggerSource, "trigger source" {
        /// Free running, no trigger
        None => ("TRIG_SRC_NONE", "NONE"),
        /// Probe current
        Current => ("TRIG_SRC_CUR", "CUR"),
        D0 => ("TRIG_SRC_D0", "D0"),
        D1 => ("TRIG_SRC_D1", "D1"),
        A0A => ("TRIG_SRC_A0A", "A0A"),
    }
}

wire_enum! {
    /// Where the trigger point sits in the timebase window
    TriggerPosition, "trigger position" {
        Center => ("TRIG_POS_CENTER", "CENTER"),
        Left => ("TRIG_POS_LEFT", "LEFT"),
        Right => ("TRIG_POS_RIGHT", "RIGHT"),
    }
}

wire_enum! {
    TriggerSlope, "trigger slope" {
        Rise => ("TRIG_SLOPE_RISE", "RISE"),
        Fall => ("TRIG_SLOPE_FALL", "FALL"),
        Either => ("TRIG_SLOPE_EITHER", "EITHER"),
    }
}

wire_enum! {
    /// Acquisition window span for `V1.timebase`
    TimebaseSpan, "timebase span" {
        Ms10 => ("TBASE_SPAN_10MS", "10MS"),
        Ms20 => ("TBASE_SPAN_20MS", "20MS"),
        Ms50 => ("TBASE_SPAN_50MS", "50MS"),
        Ms100 => ("TBASE_SPAN_100MS", "100MS"),
        Ms200 => ("TBASE_SPAN_200MS", "200MS"),
        Ms500 => ("TBASE_SPAN_500MS", "500MS"),
        S1 => ("TBASE_SPAN_1S", "1S"),
        S2 => ("TBASE_SPAN_2S", "2S"),
        S5 => ("TBASE_SPAN_5S", "5S"),
    }
}

wire_enum! {
    /// Built-in demo/calibration load resistors. Several loads combine in parallel.
    ///
    /// The trailing underscore on the resistor values is part of the firmware's names.
    CalLoad, "calibration load" {
        None => ("DEMO_CAL_LOAD_NONE", "NONE"),
        R2M => ("DEMO_CAL_LOAD_2M_", "2M"),
        R200K => ("DEMO_CAL_LOAD_200K_", "200K"),
        R20K => ("DEMO_CAL_LOAD_20K_", "20K"),
        R2K => ("DEMO_CAL_LOAD_2K_", "2K"),
        R200 => ("DEMO_CAL_LOAD_200_", "200"),
        R40 => ("DEMO_CAL_LOAD_40_", "40"),
        R20 => ("DEMO_CAL_LOAD_20_", "20"),
        R8 => ("DEMO_CAL_LOAD_8_", "8"),
    }
}

impl Default for TriggerSource {
    fn default() -> Self {
        TriggerSource::None
    }
}

impl Default for TriggerPosition {
    fn default() -> Self {
        TriggerPosition::Left
    }
}

impl Default for TriggerSlope {
    fn default() -> Self {
        TriggerSlope::Rise
    }
}

impl Default for CalLoad {
    fn default() -> Self {
        CalLoad::None
    }
}

impl TimebaseSpan {
    /// Width of the acquisition window in milliseconds
    pub fn millis(&self) -> u64 {
        match self {
            TimebaseSpan::Ms10 => 10,
            TimebaseSpan::Ms20 => 20,
            TimebaseSpan::Ms50 => 50,
            TimebaseSpan::Ms100 => 100,
            TimebaseSpan::Ms200 => 200,
            TimebaseSpan::Ms500 => 500,
            TimebaseSpan::S1 => 1000,
            TimebaseSpan::S2 => 2000,
            TimebaseSpan::S5 => 5000,
        }
    }
}

impl CalLoad {
    /// Parse a comma separated list such as `2K,200K`. An empty string is the empty list.
    pub fn parse_list(s: &str) -> Result<Vec<CalLoad>> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(CalLoad::from_str)
            .collect()
    }
}

/// Output voltage in millivolts, restricted to what the P1125 can source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Millivolts(u32);

impl Millivolts {
    pub const MIN: u32 = 1800;
    pub const MAX: u32 = 8200;
    pub const STEP: u32 = 100;

    pub fn new(value: u32) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(Error::Validation(format!(
                "VOUT {} mV out of range ({}-{} mV)",
                value,
                Self::MIN,
                Self::MAX
            )));
        }

        if value % Self::STEP != 0 {
            return Err(Error::Validation(format!(
                "VOUT {} mV must be a multiple of {} mV",
                value,
                Self::STEP
            )));
        }

        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Millivolts {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u32> for Millivolts {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Millivolts> for u32 {
    fn from(value: Millivolts) -> u32 {
        value.0
    }
}

impl fmt::Display for Millivolts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mV", self.0)
    }
}
