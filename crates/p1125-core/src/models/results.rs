//! Typed views of instrument results
//!
//! The instrument answers every call with a JSON mapping. These structs pick out the fields
//! the client and CLI act on; anything else the firmware sends is ignored.

use crate::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Integrated current sample period, seconds
pub const MAHR_SAMPLE_TIME_S: f64 = 0.01;

/// Decode a result mapping into one of the typed views.
pub fn decode<T: DeserializeOwned>(result: &Map<String, Value>) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(result.clone()))?)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentStatus {
    #[serde(default)]
    pub aqc_in_progress: bool,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalStatus {
    pub cal_done: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerStatus {
    pub triggered: bool,
}

/// Acquisition trace: time in ms, current and max current in µA
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlotData {
    #[serde(default)]
    pub t: Vec<f64>,
    #[serde(default)]
    pub i: Vec<f64>,
    #[serde(default)]
    pub i_max: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlotSummary {
    pub samples: usize,
    pub t_first: f64,
    pub t_last: f64,
    pub i_avg: f64,
    pub i_peak: f64,
}

impl PlotData {
    pub fn len(&self) -> usize {
        self.i.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i.is_empty()
    }

    /// Sample count, time extent, mean current and peak of `i_max` (or `i` when absent).
    pub fn summary(&self) -> Option<PlotSummary> {
        if self.i.is_empty() {
            return None;
        }

        let i_avg = self.i.iter().sum::<f64>() / self.i.len() as f64;
        let peaks = if self.i_max.is_empty() { &self.i } else { &self.i_max };
        let i_peak = peaks.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(PlotSummary {
            samples: self.i.len(),
            t_first: self.t.first().copied().unwrap_or(0.0),
            t_last: self.t.last().copied().unwrap_or(0.0),
            i_avg,
            i_peak,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IntCurrStatus {
    pub complete: bool,
    #[serde(default)]
    pub time_s: f64,
    #[serde(default)]
    pub time_stop_s: f64,
}

/// Event trace for D0, D1 or the trigger. The firmware names the value column after the
/// channel (`d0`, `d1`, `trig`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventTrace {
    #[serde(default)]
    pub t: Vec<f64>,
    #[serde(default, alias = "d0", alias = "d1", alias = "trig")]
    pub value: Vec<f64>,
}

/// Integrated current (mAhr) data. Plot time is in seconds here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IntCurrData {
    #[serde(default)]
    pub time_s: f64,
    #[serde(default)]
    pub time_stop_s: f64,
    #[serde(default)]
    pub ucoulombs: f64,
    #[serde(default)]
    pub samples: u64,
    #[serde(default)]
    pub mahr: f64,
    #[serde(default)]
    pub plot: PlotData,
    #[serde(default)]
    pub plot_d0: EventTrace,
    #[serde(default)]
    pub plot_d1: EventTrace,
    #[serde(default)]
    pub plot_trig: EventTrace,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IntCurrSummary {
    pub time_s: f64,
    pub ucoulombs: f64,
    pub mahr: f64,
    pub average_ua: Option<f64>,
    pub samples: u64,
}

impl IntCurrData {
    /// Collection is complete once the elapsed time reaches the stop time.
    pub fn is_complete(&self) -> bool {
        self.time_s >= self.time_stop_s
    }

    pub fn summary(&self) -> IntCurrSummary {
        IntCurrSummary {
            time_s: self.time_s,
            ucoulombs: self.ucoulombs,
            mahr: self.mahr,
            average_ua: self.average_ua(),
            samples: self.samples,
        }
    }

    /// Mean current over the run in µA, from the accumulated charge
    pub fn average_ua(&self) -> Option<f64> {
        if self.time_s > 0.0 {
            Some(self.ucoulombs / self.time_s)
        } else {
            None
        }
    }

    /// Time covered by the returned plot samples, seconds
    pub fn plot_duration_s(&self) -> f64 {
        self.plot.len() as f64 * MAHR_SAMPLE_TIME_S
    }
}
