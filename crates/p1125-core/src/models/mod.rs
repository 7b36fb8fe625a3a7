pub mod config;
pub mod params;
pub mod results;

pub use config::{AcquisitionPolicy, CalibrationPolicy, ClientConfig, Endpoint, API_PATH};
pub use params::{
    AcquireMode, CalLoad, Millivolts, TimebaseSpan, TriggerPosition, TriggerSlope, TriggerSource,
};
pub use results::{
    decode, CalStatus, EventTrace, InstrumentStatus, IntCurrData, IntCurrStatus, IntCurrSummary,
    PlotData, PlotSummary, TriggerStatus, MAHR_SAMPLE_TIME_S,
};
