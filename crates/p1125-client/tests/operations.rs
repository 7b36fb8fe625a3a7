mod common;

use common::harness;
use p1125_client::TriggerSettings;
use p1125_core::models::{
    AcquireMode, CalLoad, IntCurrData, Millivolts, PlotData, TimebaseSpan, TriggerPosition,
    TriggerSlope, TriggerSource,
};
use serde_json::json;

#[test]
fn test_trigger_request_body() {
    let h = harness();

    h.client.set_trigger(TriggerSettings {
        source: TriggerSource::None,
        position: TriggerPosition::Left,
        slope: TriggerSlope::Rise,
        level: 1.0,
    });

    let sent = h.instrument.sent();
    assert_eq!(
        serde_json::to_string(&sent[0]).unwrap(),
        concat!(
            r#"{"jsonrpc":"2.0","id":0,"method":"V1.trigger","#,
            r#""params":{"source":"TRIG_SRC_NONE","position":"TRIG_POS_LEFT","slope":"TRIG_SLOPE_RISE","level":1.0}}"#
        )
    );
}

#[test]
fn test_invalid_values_never_dispatched() {
    let h = harness();

    assert!("BOGUS".parse::<TimebaseSpan>().is_err());
    assert!("TRIG_SRC_BOGUS".parse::<TriggerSource>().is_err());
    assert!(CalLoad::parse_list("2K,BOGUS").is_err());
    assert!(Millivolts::new(9000).is_err());

    assert!(h.instrument.sent().is_empty());
}

#[test]
fn test_parsed_values_dispatched_verbatim() {
    let h = harness();

    let span: TimebaseSpan = "TBASE_SPAN_2S".parse().unwrap();
    h.client.set_timebase(span);

    let loads = CalLoad::parse_list("DEMO_CAL_LOAD_20K_,8").unwrap();
    h.client.set_cal_load(&loads);

    let sent = h.instrument.sent();
    assert_eq!(sent[0].params, Some(json!({"span": "TBASE_SPAN_2S"})));
    assert_eq!(
        sent[1].params,
        Some(json!({"loads": ["DEMO_CAL_LOAD_20K_", "DEMO_CAL_LOAD_8_"]}))
    );
}

#[test]
fn test_single_acquisition_sequence() {
    let h = harness();
    h.instrument
        .respond("V1.cal_status", json!({"success": true, "cal_done": true}))
        .respond(
            "V1.acquire_is_triggered",
            json!({"success": true, "triggered": true}),
        )
        .respond(
            "V1.plot_data",
            json!({"success": true, "t": [0.0, 0.1, 0.2], "i": [5.0, 7.0, 9.0], "i_max": [6.0, 8.0, 12.0]}),
        );

    assert!(h.client.ping().success);
    assert!(h.client.probe(false, false).success);
    assert!(h.client.calibrate(false).success);
    assert!(h.client.set_vout(Millivolts::new(3000).unwrap()).success);
    assert!(h.client.set_timebase(TimebaseSpan::Ms100).success);
    assert!(h.client.set_trigger(TriggerSettings::default()).success);
    assert!(h.client.acquisition_start(AcquireMode::Single).success);
    assert!(h.client.acquisition_complete(10).success);

    let reply = h.client.acquisition_get_data();
    assert!(reply.success);
    let plot: PlotData = reply.decode().unwrap();
    let summary = plot.summary().unwrap();
    assert_eq!(summary.samples, 3);
    assert_eq!(summary.i_avg, 7.0);
    assert_eq!(summary.i_peak, 12.0);

    assert_eq!(
        h.instrument.sent_methods(),
        vec![
            "V1.ping",
            "V1.probe_connect",
            "V1.cal_status",
            "V1.vout",
            "V1.timebase",
            "V1.trigger",
            "V1.acquire_start",
            "V1.acquire_is_triggered",
            "V1.plot_data",
        ]
    );
}

#[test]
fn test_intcurr_data_decodes() {
    let h = harness();
    h.instrument.respond(
        "V1.intcurr_data",
        json!({
            "success": true,
            "time_s": 61.0,
            "time_stop_s": 60,
            "ucoulombs": 610.0,
            "samples": 6120,
            "mahr": 0.17,
            "plot": {"t": [0.0, 0.01], "i": [10.0, 10.0], "i_max": [11.0, 12.0]},
            "plot_d0": {"t": [], "d0": []},
            "plot_d1": {"t": [], "d1": []},
            "plot_trig": {"t": [], "trig": []}
        }),
    );

    let reply = h.client.intcurr_data();
    let data: IntCurrData = reply.decode().unwrap();

    assert!(data.is_complete());
    assert_eq!(data.average_ua(), Some(10.0));
}

#[test]
fn test_ping_logs_endpoint() {
    let h = harness();
    h.client.ping();

    let infos = h.logger.infos();
    assert_eq!(infos[0], "V1.ping http://localhost/api/V1");
}

#[test]
fn test_params_logged() {
    let h = harness();
    h.client.shutdown(false);

    assert_eq!(h.logger.infos()[0], r#"V1.shutdown params: {"restart":false}"#);
}
