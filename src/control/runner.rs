//! The sampling/control loop.
//!
//! Each tick samples absorbance every `sample_interval_s` for `tick_s`
//! seconds, runs the controller once and sends the two resulting commands.
//! A failed command is reported and the loop continues; a failed read aborts.

use std::io::Write;
use std::path::Path;

use crate::control::controller::{ControlState, ControlUpdate, RampController};
use crate::control::history::AbsorbanceHistory;
use crate::control::instrument::{Clock, RampInstrument};
use crate::error::AppError;
use crate::io::TraceSample;

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Done,
    MaxTicks,
    SourceExhausted,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_ticks: Option<usize>,
    /// Interval of the recorded trace (s); `None` disables trace recording.
    pub trace_every_s: Option<f64>,
    /// Print a log line per tick on stderr.
    pub verbose: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { max_ticks: None, trace_every_s: Some(10.0), verbose: true }
    }
}

#[derive(Debug, Clone)]
pub struct ControlRun {
    pub updates: Vec<ControlUpdate>,
    pub trace: Vec<TraceSample>,
    pub ticks: usize,
    pub commands_sent: usize,
    pub send_failures: usize,
    pub stop: StopReason,
}

/// `HH:MM:SS` of an elapsed time.
pub fn format_elapsed(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

/// One log line per tick.
pub fn format_tick_line(update: &ControlUpdate) -> String {
    format!(
        "[{}] {:<20} T={:6.2} °C  ramp={:6.2} °C/min  A={:.4}  dA/dt={:.5}  {}",
        format_elapsed(update.time_s),
        update.state.as_str(),
        update.temp_target_c,
        update.ramp_rate_c_per_min,
        update.absorbance,
        update.slope_au_per_min,
        update.notes
    )
    .trim_end()
    .to_string()
}

/// Drive `controller` against `instrument` until done, exhausted, or `max_ticks`.
///
/// Sent commands are echoed to `commands_out`, one per line.
pub fn run_controller<I, C, W>(
    controller: &mut RampController,
    instrument: &mut I,
    clock: &mut C,
    options: &RunOptions,
    commands_out: &mut W,
) -> Result<ControlRun, AppError>
where
    I: RampInstrument + ?Sized,
    C: Clock + ?Sized,
    W: Write + ?Sized,
{
    let cfg = controller.config().clone();
    cfg.validate().map_err(|msg| AppError::new(2, msg))?;

    let mut history = AbsorbanceHistory::with_capacity(cfg.history_capacity);
    let mut run = ControlRun {
        updates: Vec::new(),
        trace: Vec::new(),
        ticks: 0,
        commands_sent: 0,
        send_failures: 0,
        stop: StopReason::Done,
    };
    let mut next_trace_s = clock.now_s();

    // Put the controller at its initial setpoint before sampling.
    send_all(controller, instrument, commands_out, &mut run);

    loop {
        if let Some(max) = options.max_ticks {
            if run.ticks >= max {
                run.stop = StopReason::MaxTicks;
                break;
            }
        }
        if instrument.finished(clock.now_s()) {
            run.stop = StopReason::SourceExhausted;
            break;
        }

        let tick_start = clock.now_s();
        while clock.now_s() - tick_start < cfg.tick_s - 1e-9 {
            let now = clock.now_s();
            if let Some(a) = instrument.read_absorbance(now)? {
                if a.is_finite() {
                    history.push(now, a);
                    if let Some(every) = options.trace_every_s {
                        if now >= next_trace_s {
                            let temperature_c = instrument.read_temperature(now).unwrap_or(controller.target_c());
                            run.trace.push(TraceSample { time_s: now, temperature_c, absorbance: a });
                            next_trace_s = now + every;
                        }
                    }
                }
            }
            clock.sleep(cfg.sample_interval_s);
        }

        let update = controller.tick(clock.now_s(), &history);
        run.ticks += 1;
        send_all(controller, instrument, commands_out, &mut run);
        if options.verbose {
            eprintln!("{}", format_tick_line(&update));
        }
        let done = update.state == ControlState::Done;
        run.updates.push(update);
        if done {
            run.stop = StopReason::Done;
            break;
        }
    }

    Ok(run)
}

fn send_all<I, W>(controller: &RampController, instrument: &mut I, out: &mut W, run: &mut ControlRun)
where
    I: RampInstrument + ?Sized,
    W: Write + ?Sized,
{
    for cmd in controller.commands() {
        match instrument.send(&cmd) {
            Ok(()) => {
                run.commands_sent += 1;
                if let Err(e) = writeln!(out, "{cmd}") {
                    eprintln!("Warning: failed to record command {cmd}: {e}");
                }
            }
            Err(e) => {
                run.send_failures += 1;
                eprintln!("Warning: error sending {cmd}: {e}");
            }
        }
    }
}

/// Write the per-tick updates to a CSV file.
pub fn write_control_log(path: &Path, updates: &[ControlUpdate]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create control log '{}': {e}", path.display())))?;
    for u in updates {
        writer
            .serialize(u)
            .map_err(|e| AppError::new(2, format!("Failed to write control log row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush control log: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::controller::ControllerConfig;
    use crate::control::instrument::{InstrumentError, SimClock, TempCommand};

    /// Absorbance rises at a fixed rate; with `fail_targets` every `Target` command is rejected.
    struct Scripted {
        au_per_min: f64,
        sent: Vec<TempCommand>,
        fail_targets: bool,
    }

    impl RampInstrument for Scripted {
        fn read_absorbance(&mut self, now_s: f64) -> Result<Option<f64>, InstrumentError> {
            Ok(Some(0.1 + self.au_per_min * now_s / 60.0))
        }

        fn send(&mut self, command: &TempCommand) -> Result<(), InstrumentError> {
            if self.fail_targets && matches!(command, TempCommand::Target(_)) {
                return Err(InstrumentError::Rejected {
                    command: command.to_string(),
                    reason: "busy".into(),
                });
            }
            self.sent.push(*command);
            Ok(())
        }
    }

    struct Broken;

    impl RampInstrument for Broken {
        fn read_absorbance(&mut self, _now_s: f64) -> Result<Option<f64>, InstrumentError> {
            Err(InstrumentError::Disconnected("uv-vis".into()))
        }

        fn send(&mut self, _command: &TempCommand) -> Result<(), InstrumentError> {
            Ok(())
        }
    }

    fn quick_config() -> ControllerConfig {
        ControllerConfig { sample_interval_s: 1.0, ..ControllerConfig::default() }
    }

    #[test]
    fn max_ticks_bounds_the_run_and_commands_are_echoed() {
        let mut controller = RampController::new(quick_config());
        let mut inst = Scripted { au_per_min: 0.0, sent: Vec::new(), fail_targets: false };
        let mut clock = SimClock::new();
        let opts = RunOptions { max_ticks: Some(3), trace_every_s: Some(10.0), verbose: false };
        let mut out = Vec::new();

        let run = run_controller(&mut controller, &mut inst, &mut clock, &opts, &mut out).unwrap();
        assert_eq!(run.stop, StopReason::MaxTicks);
        assert_eq!(run.ticks, 3);
        assert_eq!(run.commands_sent, 8);
        assert_eq!(run.trace.len(), 9);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "[F1 RR S 2.00]");
        assert_eq!(lines[1], "[F1 TT S 45.00]");
        assert_eq!(lines[7], "[F1 TT S 48.00]");
    }

    #[test]
    fn send_failures_do_not_stop_the_loop() {
        let mut controller = RampController::new(quick_config());
        let mut inst = Scripted { au_per_min: 0.0, sent: Vec::new(), fail_targets: true };
        let mut clock = SimClock::new();
        let opts = RunOptions { max_ticks: Some(2), trace_every_s: None, verbose: false };
        let run = run_controller(&mut controller, &mut inst, &mut clock, &opts, &mut std::io::sink()).unwrap();
        assert_eq!(run.ticks, 2);
        assert_eq!(run.send_failures, 3);
        assert_eq!(inst.sent.len(), 3);
        assert!(run.trace.is_empty());
    }

    #[test]
    fn read_failures_abort_with_instrument_exit_code() {
        let mut controller = RampController::new(quick_config());
        let mut clock = SimClock::new();
        let err = run_controller(
            &mut controller,
            &mut Broken,
            &mut clock,
            &RunOptions::default(),
            &mut std::io::sink(),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn tick_line_has_elapsed_stamp_and_state() {
        let update = ControlUpdate {
            time_s: 3725.0,
            state: ControlState::Hold,
            absorbance: 0.5,
            slope_au_per_min: 0.001,
            temp_target_c: 100.0,
            ramp_rate_c_per_min: 0.0,
            notes: String::new(),
        };
        let line = format_tick_line(&update);
        assert!(line.starts_with("[01:02:05] HOLD "));
        assert!(line.contains("T=100.00 °C"));
        assert!(!line.ends_with(' '));
    }

    #[test]
    fn control_log_uses_state_names() {
        let path = std::env::temp_dir().join(format!("ramp-control-log-{}.csv", std::process::id()));
        let update = ControlUpdate {
            time_s: 30.0,
            state: ControlState::FastLinearRamp,
            absorbance: 0.1,
            slope_au_per_min: 0.0,
            temp_target_c: 46.0,
            ramp_rate_c_per_min: 2.0,
            notes: String::new(),
        };
        write_control_log(&path, &[update]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(text.starts_with("time_s,state,absorbance,slope_au_per_min,temp_target_c,ramp_rate_c_per_min,notes\n"));
        assert!(text.contains("FAST_LINEAR_RAMP"));
    }
}
