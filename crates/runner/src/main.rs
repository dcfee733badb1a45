//! Digital Twin Trace Pipeline - Main Entry Point

use std::path::PathBuf;
use std::process::ExitCode;

use membership::Automaton;
use runner::{init_logging, EmulatorMode, Runner, RunnerConfig};
use tracing::{error, info};

const USAGE: &str = "\
Usage: twin-trace <trace.csv> [automaton.json] [options]

Options:
  --strict          poison the run on the first violation
  --real-delta-t    replay at recorded speed (consumer-side pacing)
  --capacity <n>    ring buffer capacity
  --period-ms <n>   producer pacing in milliseconds (0 = full speed)
  --json            print the final report as JSON on stdout";

struct CliArgs {
    trace: PathBuf,
    automaton: Option<PathBuf>,
    capacity: Option<usize>,
    period_ms: Option<u64>,
    real_delta_t: bool,
    strict: bool,
    json: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut positional = Vec::new();
    let mut capacity = None;
    let mut period_ms = None;
    let mut real_delta_t = false;
    let mut strict = false;
    let mut json = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--strict" => strict = true,
            "--real-delta-t" => real_delta_t = true,
            "--json" => json = true,
            "--capacity" => {
                let value = iter.next().ok_or("--capacity needs a value")?;
                capacity = Some(value.parse().map_err(|_| "invalid --capacity value")?);
            }
            "--period-ms" => {
                let value = iter.next().ok_or("--period-ms needs a value")?;
                period_ms = Some(value.parse().map_err(|_| "invalid --period-ms value")?);
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown option: {}", other));
            }
            other => positional.push(PathBuf::from(other)),
        }
    }

    if positional.is_empty() || positional.len() > 2 {
        return Err("expected a trace file and an optional automaton file".to_string());
    }
    let mut positional = positional.into_iter();
    Ok(CliArgs {
        trace: positional.next().ok_or("expected a trace file")?,
        automaton: positional.next(),
        capacity,
        period_ms,
        real_delta_t,
        strict,
        json,
    })
}

fn main() -> ExitCode {
    init_logging();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}\n\n{}", message, USAGE);
            return ExitCode::from(2);
        }
    };

    let mut config = if args.automaton.is_some() {
        RunnerConfig::verification()
    } else {
        RunnerConfig::default()
    };
    if let Some(capacity) = args.capacity {
        config.capacity = capacity;
    }
    if let Some(period_ms) = args.period_ms {
        config.period_ms = period_ms;
    }
    if args.real_delta_t {
        config.mode = EmulatorMode::RealDeltaT;
    }
    config.strict = args.strict;

    info!(
        "twin-trace v{}: trace {}",
        env!("CARGO_PKG_VERSION"),
        args.trace.display()
    );

    let result = match &args.automaton {
        Some(automaton_path) => {
            let automaton = match Automaton::from_json_file(automaton_path) {
                Ok(automaton) => automaton,
                Err(err) => {
                    error!("failed to load automaton: {}", err);
                    return ExitCode::from(2);
                }
            };
            info!(
                "verifying against '{}' ({} states, {} transitions)",
                automaton.name,
                automaton.states.len(),
                automaton.transitions.len()
            );
            Runner::new(config)
                .on_step(|record| {
                    info!(
                        "step {}: {:?} {} [{}]",
                        record.step,
                        record.verdict,
                        record.measurement,
                        record.states.join(", ")
                    );
                })
                .run_verification(&args.trace, automaton)
        }
        None => Runner::new(config).run_trace(&args.trace),
    };

    let report = match result {
        Ok(report) => report,
        Err(err) => {
            error!("pipeline failed: {}", err);
            return ExitCode::from(2);
        }
    };

    report.log();
    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(rendered) => println!("{}", rendered),
            Err(err) => error!("failed to render report: {}", err),
        }
    }

    match report.conforms() {
        Some(false) => ExitCode::from(1),
        _ => ExitCode::SUCCESS,
    }
}
