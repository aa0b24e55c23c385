// src/main.rs

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use log::{error, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use gaitcycle::constants::{EMG_HIGHPASS_HZ, EMG_LOWPASS_HZ, EMG_MAX_INTERFERENCE_RATIO};
use gaitcycle::data_analysis::curve_stats::curve_range;
use gaitcycle::{
    AnalysisRequest, CycleAnalysis, DataSource, EnvelopeConfig, Side, SideAnalysis, ToeOffPolicy, TrialData,
    TrialProvider, ValidityConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SideArg {
    Left,
    Right,
    Both,
}

impl SideArg {
    fn sides(self) -> &'static [Side] {
        match self {
            SideArg::Left => &[Side::Left],
            SideArg::Right => &[Side::Right],
            SideArg::Both => &Side::BOTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    Strict,
    FirstAfterStrike,
}

impl From<PolicyArg> for ToeOffPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Strict => ToeOffPolicy::StrictInterior,
            PolicyArg::FirstAfterStrike => ToeOffPolicy::FirstAfterStrike,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "Time-normalizes gait cycles and extracts EMG envelopes from a trial directory.")]
struct Args {
    /// Directory holding kinematics.csv, events.csv and optionally analog.csv
    trial_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = SideArg::Both)]
    side: SideArg,

    /// Signal to normalize, with or without the L/R prefix (repeatable; default: all of the side)
    #[arg(long = "signal")]
    signals: Vec<String>,

    /// EMG channel to envelope (repeatable)
    #[arg(long = "emg")]
    emg: Vec<String>,

    #[arg(long, value_enum, default_value_t = PolicyArg::Strict)]
    toe_off_policy: PolicyArg,

    #[arg(long, default_value_t = EMG_HIGHPASS_HZ)]
    emg_highpass: f64,

    #[arg(long, default_value_t = EMG_LOWPASS_HZ)]
    emg_lowpass: f64,

    /// Interference ratio above which an EMG channel is reported as disconnected
    #[arg(long, default_value_t = EMG_MAX_INTERFERENCE_RATIO)]
    emg_threshold: f64,

    /// Analyze every consecutive strike pair instead of the first cycle only
    #[arg(long)]
    all_cycles: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

fn build_request(args: &Args, trial: &TrialData, side: Side) -> AnalysisRequest {
    let signals = if args.signals.is_empty() {
        trial
            .signal_names()
            .into_iter()
            .filter(|name| name.starts_with(side.prefix()))
            .map(str::to_string)
            .collect()
    } else {
        args.signals.clone()
    };
    AnalysisRequest {
        signals,
        emg_channels: args.emg.clone(),
        policy: args.toe_off_policy.into(),
        all_cycles: args.all_cycles,
        envelope: EnvelopeConfig {
            highpass_hz: args.emg_highpass,
            lowpass_hz: args.emg_lowpass,
            ..EnvelopeConfig::default()
        },
        validity: ValidityConfig {
            max_interference_ratio: args.emg_threshold,
            ..ValidityConfig::default()
        },
    }
}

fn print_side_report(analysis: &SideAnalysis) {
    println!("\n--- {} side ({} cycle(s)) ---", analysis.side, analysis.cycles.len());
    for (index, result) in analysis.cycles.iter().enumerate() {
        let cycle = &result.cycle;
        println!(
            "Cycle {}: frames {}..{} ({} frames, {:.3} s), toe-off at frame {} ({} %)",
            index + 1,
            cycle.start,
            cycle.end,
            cycle.length(),
            cycle.duration_s(analysis.frame_rate),
            cycle.toe_off,
            cycle.toe_off_percent()
        );
        for curve in &result.curves {
            let mean = curve.values().mean().unwrap_or(f64::NAN);
            match curve_range(curve) {
                Some((min, max)) => println!(
                    "  {:<24} min {:>10.3}  max {:>10.3}  mean {:>10.3}",
                    curve.name, min, max, mean
                ),
                None => println!("  {:<24} contains gaps (NaN)", curve.name),
            }
        }
        for emg in &result.emg {
            let status = if emg.validity.is_valid() { "valid" } else { "DISCONNECTED" };
            let peak = curve_range(&emg.normalized_envelope).map(|(_, max)| max).unwrap_or(f64::NAN);
            println!(
                "  EMG {:<20} {} (ratio {:.2}), {} samples, envelope peak {:.4}",
                emg.channel,
                status,
                emg.validity.ratio(),
                emg.envelope.len(),
                peak
            );
        }
    }

    if analysis.cycles.len() > 1 {
        println!("  Averages over {} cycles:", analysis.cycles.len());
        if let Some(first) = analysis.cycles.first() {
            for curve in &first.curves {
                if let Ok(stats) = analysis.curve_stats(&curve.name) {
                    let spread = stats.std.mean().unwrap_or(f64::NAN);
                    match (stats.mean_range(), stats.peak_percent()) {
                        (Some((min, max)), Some(peak)) => println!(
                            "  {:<24} mean curve {:.3}..{:.3}, peak at {} %, mean SD {:.3}",
                            curve.name, min, max, peak, spread
                        ),
                        _ => println!("  {:<24} mean curve contains gaps (NaN)", curve.name),
                    }
                }
            }
            for emg in &first.emg {
                if let Ok(stats) = analysis.envelope_stats(&emg.channel) {
                    if let Some(peak) = stats.peak_percent() {
                        println!("  EMG {:<20} mean envelope peaks at {} %", emg.channel, peak);
                    }
                }
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    TermLogger::init(
        log_level(args.verbose),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("failed to initialise logger")?;

    println!("gaitcycle {}", gaitcycle::crate_version());
    let source = DataSource::FileBacked(args.trial_dir.clone());
    let trial = source
        .load()
        .with_context(|| format!("failed to load trial from {}", args.trial_dir.display()))?;
    println!(
        "Trial '{}': {:.1} Hz, ROI offset {}, {} signals, {} events",
        trial.trial_name(),
        trial.frame_rate,
        trial.roi_offset,
        trial.signals.len(),
        trial.events.len()
    );
    if let Some(analog) = &trial.analog {
        println!(
            "Analog: {} channels at {:.1} Hz ({:.2} samples per frame)",
            analog.channels.len(),
            analog.sample_rate,
            analog.samples_per_frame
        );
    }

    let mut analyzed = 0;
    for &side in args.side.sides() {
        let request = build_request(&args, &trial, side);
        match CycleAnalysis::run(&trial, side, &request) {
            Ok(analysis) => {
                print_side_report(&analysis);
                analyzed += 1;
            }
            Err(e) => error!("{} side skipped: {}", side, e),
        }
    }

    if analyzed == 0 {
        bail!("no side of trial '{}' could be analyzed", trial.trial_name());
    }
    Ok(())
}

// src/main.rs
