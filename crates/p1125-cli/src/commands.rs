use anyhow::{bail, Result};
use p1125_client::{InstrumentClient, Reply, TracingLogger, TriggerSettings};
use p1125_core::models::{
    AcquireMode, AcquisitionPolicy, CalLoad, ClientConfig, InstrumentStatus, IntCurrData,
    Millivolts, PlotData, TimebaseSpan,
};

use crate::{
    AcquireCommand, CalCommand, Command, IntcurrCommand, MahrArgs, MeasureArgs, ProbeCommand,
};

pub fn run(config: &ClientConfig, command: Command) -> Result<()> {
    let client = InstrumentClient::from_config(config)?.with_logger(TracingLogger);
    dispatch(&client, &config.acquisition, command)
}

fn dispatch(client: &InstrumentClient, policy: &AcquisitionPolicy, command: Command) -> Result<()> {
    let reply = match command {
        Command::Ping => client.ping(),
        Command::Status => client.status(),
        Command::Cal(cal) => match cal {
            CalCommand::Start => client.cal_start(),
            CalCommand::Status => client.cal_status(),
            CalCommand::Values => client.cal_values(),
            CalCommand::Run { force } => client.calibrate(force),
        },
        Command::Vout { set } => client.set_vout(Millivolts::new(set)?),
        Command::Probe(probe) => match probe {
            ProbeCommand::Status => client.probe_status(),
            ProbeCommand::Connect { hard } => client.probe(true, hard),
            ProbeCommand::Disconnect => client.probe(false, false),
        },
        Command::Trig {
            source,
            position,
            slope,
            level,
        } => client.set_trigger(TriggerSettings {
            source,
            position,
            slope,
            level,
        }),
        Command::Acquire(acquire) => match acquire {
            AcquireCommand::Start { mode } => client.acquisition_start(mode),
            AcquireCommand::Stop => client.acquisition_stop(),
            AcquireCommand::Triggered => client.acquisition_is_triggered(),
            AcquireCommand::Wait { retries: Some(retries) } => client.acquisition_complete(retries),
            AcquireCommand::Wait { retries: None } => client.acquisition_wait(),
        },
        Command::PlotData => client.acquisition_get_data(),
        Command::Timebase { span } => client.set_timebase(span),
        Command::CalLoad { load } => client.set_cal_load(&CalLoad::parse_list(&load)?),
        Command::Intcurr(intcurr) => match intcurr {
            IntcurrCommand::Set { time_stop_s } => client.intcurr_set(time_stop_s),
            IntcurrCommand::Complete => client.intcurr_complete(),
            IntcurrCommand::Data => client.intcurr_data(),
            IntcurrCommand::Wait { retries } => client.intcurr_wait_complete(retries),
        },
        Command::Shutdown { restart } => client.shutdown(restart),
        Command::Measure(args) => return measure(client, policy, &args),
        Command::Mahr(args) => return mahr(client, &args),
    };

    print_reply(&reply)
}

fn print_reply(reply: &Reply) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&reply.to_value())?);

    if !reply.success {
        bail!(
            "{}",
            reply.error_message().unwrap_or("instrument reported failure")
        );
    }

    Ok(())
}

fn check(step: &str, reply: Reply) -> Result<Reply> {
    if !reply.success {
        bail!(
            "{} failed: {}",
            step,
            reply.error_message().unwrap_or("instrument reported failure")
        );
    }
    Ok(reply)
}

/// Retry budget for the trigger wait; never shorter than the acquisition window itself.
fn trigger_retries(span: TimebaseSpan, policy: &AcquisitionPolicy) -> u32 {
    let interval_ms = policy.poll_interval_ms.max(1);
    let window = span.millis().div_ceil(interval_ms) as u32;
    policy.retries.max(window + 2)
}

fn measure(client: &InstrumentClient, policy: &AcquisitionPolicy, args: &MeasureArgs) -> Result<()> {
    let vout = Millivolts::new(args.vout)?;
    let loads = match &args.load {
        Some(load) => CalLoad::parse_list(load)?,
        None => Vec::new(),
    };

    let result = acquire(client, policy, args, vout, &loads);

    if result.is_err() {
        tracing::warn!("Measurement aborted, disconnecting probe");
        client.acquisition_stop();
        client.probe(false, false);
    }
    client.set_cal_load(&[CalLoad::None]);

    let data = result?;
    if !args.raw {
        if let Some(summary) = data.summary() {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            return Ok(());
        }
        tracing::warn!("Acquisition returned no samples");
    }

    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

fn mahr(client: &InstrumentClient, args: &MahrArgs) -> Result<()> {
    let vout = Millivolts::new(args.vout)?;

    let result = integrate(client, args, vout);

    if result.is_err() {
        client.acquisition_stop();
    }
    client.set_cal_load(&[CalLoad::None]);
    client.probe(false, false);

    let data = result?;
    println!("{}", serde_json::to_string_pretty(&data.summary())?);
    Ok(())
}

fn integrate(client: &InstrumentClient, args: &MahrArgs, vout: Millivolts) -> Result<IntCurrData> {
    check("ping", client.ping())?;

    let status = check("status", client.status())?;
    if status.decode::<InstrumentStatus>()?.aqc_in_progress {
        check("acquisition stop", client.acquisition_stop())?;
    }

    check("intcurr set", client.intcurr_set(args.time_stop_s))?;
    check("probe disconnect", client.probe(false, false))?;
    check("calibration", client.calibrate(false))?;
    check("vout", client.set_vout(vout))?;

    if args.connect_probe {
        check("probe connect", client.probe(true, false))?;
    }

    check("acquisition start", client.acquisition_start(AcquireMode::Run))?;
    let data = check("intcurr data", client.intcurr_collect(args.time_stop_s))?;
    check("acquisition stop", client.acquisition_stop())?;

    Ok(data.decode::<IntCurrData>()?)
}

fn acquire(
    client: &InstrumentClient,
    policy: &AcquisitionPolicy,
    args: &MeasureArgs,
    vout: Millivolts,
    loads: &[CalLoad],
) -> Result<PlotData> {
    check("ping", client.ping())?;

    let status = check("status", client.status())?;
    if status.decode::<InstrumentStatus>()?.aqc_in_progress {
        check("acquisition stop", client.acquisition_stop())?;
    }

    check("probe disconnect", client.probe(false, false))?;
    check("calibration", client.calibrate(false))?;
    check("vout", client.set_vout(vout))?;
    check("timebase", client.set_timebase(args.span))?;
    check("trigger", client.set_trigger(TriggerSettings::default()))?;

    if !loads.is_empty() {
        check("cal load", client.set_cal_load(loads))?;
    }

    if args.connect_probe {
        check("probe connect", client.probe(true, false))?;
    }

    check("acquisition start", client.acquisition_start(AcquireMode::Single))?;
    check(
        "acquisition",
        client.acquisition_complete(trigger_retries(args.span, policy)),
    )?;
    check("probe disconnect", client.probe(false, false))?;

    let data = check("plot data", client.acquisition_get_data())?;
    Ok(data.decode::<PlotData>()?)
}
