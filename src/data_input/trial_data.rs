// src/data_input/trial_data.rs

use ndarray::{s, Array1};
use std::fmt;
use std::str::FromStr;

use crate::error::{GaitDataError, Result};

/// Body side an event or side-specific signal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// One-letter prefix used by model outputs, e.g. `LKneeAnglesX`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Side::Left => "Left",
            Side::Right => "Right",
        }
    }

    /// Side-specific channel name for a base name (`KneeAnglesX` -> `LKneeAnglesX`).
    pub fn channel_name(&self, base: &str) -> String {
        format!("{}{}", self.prefix(), base)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Side {
    type Err = GaitDataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "left" => Ok(Side::Left),
            "r" | "right" => Ok(Side::Right),
            other => Err(GaitDataError::Parse(format!("unknown side '{}'", other))),
        }
    }
}

/// Discrete gait event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    FootStrike,
    FootOff,
}

impl FromStr for EventKind {
    type Err = GaitDataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strike" | "foot strike" | "footstrike" | "heel strike" => Ok(EventKind::FootStrike),
            "off" | "foot off" | "footoff" | "toe off" | "toeoff" => Ok(EventKind::FootOff),
            other => Err(GaitDataError::Parse(format!("unknown event kind '{}'", other))),
        }
    }
}

/// A gait event on the whole-trial frame timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaitEvent {
    pub side: Side,
    pub kind: EventKind,
    pub frame: i64,
}

/// All events of one trial, kept in frame order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GaitEvents {
    events: Vec<GaitEvent>,
}

impl GaitEvents {
    pub fn new(mut events: Vec<GaitEvent>) -> Self {
        events.sort_by_key(|e| e.frame);
        Self { events }
    }

    pub fn push(&mut self, event: GaitEvent) {
        let pos = self.events.partition_point(|e| e.frame <= event.frame);
        self.events.insert(pos, event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &GaitEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Frames of the given side and kind, ascending.
    pub fn frames(&self, side: Side, kind: EventKind) -> Vec<i64> {
        self.events
            .iter()
            .filter(|e| e.side == side && e.kind == kind)
            .map(|e| e.frame)
            .collect()
    }

    pub fn strikes(&self, side: Side) -> Vec<i64> {
        self.frames(side, EventKind::FootStrike)
    }

    pub fn toe_offs(&self, side: Side) -> Vec<i64> {
        self.frames(side, EventKind::FootOff)
    }
}

/// A per-frame signal. `offset` is the trial frame of `values[0]`, so event
/// frames must have it subtracted before indexing `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub name: String,
    pub values: Array1<f64>,
    pub frame_rate: f64,
    pub offset: i64,
}

impl Signal {
    pub fn new(name: impl Into<String>, values: Array1<f64>, frame_rate: f64, offset: i64) -> Self {
        Self {
            name: name.into(),
            values,
            frame_rate,
            offset,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in the local frame range `[start, end)`, checked against the array bounds.
    pub fn window(&self, start: i64, end: i64) -> Result<Array1<f64>> {
        checked_window(&self.name, &self.values, start, end)
    }
}

/// Raw analog samples, typically at a multiple of the frame rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalogSignal {
    pub name: String,
    pub values: Array1<f64>,
    pub sample_rate: f64,
}

impl AnalogSignal {
    pub fn new(name: impl Into<String>, values: Array1<f64>, sample_rate: f64) -> Self {
        Self {
            name: name.into(),
            values,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Same channel name and rate, new samples.
    pub fn with_values(&self, values: Array1<f64>) -> Self {
        Self {
            name: self.name.clone(),
            values,
            sample_rate: self.sample_rate,
        }
    }

    pub fn duration_s(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.values.len() as f64 / self.sample_rate
        } else {
            0.0
        }
    }
}

/// The analog channel set of one trial.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalogData {
    pub sample_rate: f64,
    pub samples_per_frame: f64,
    pub channels: Vec<AnalogSignal>,
}

impl AnalogData {
    /// Both rates must be positive; their ratio becomes `samples_per_frame`.
    pub fn new(sample_rate: f64, frame_rate: f64, channels: Vec<AnalogSignal>) -> Result<Self> {
        for (label, rate) in [("analog sample rate", sample_rate), ("frame rate", frame_rate)] {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(GaitDataError::InvalidParameter(format!(
                    "{} must be positive, got {}",
                    label, rate
                )));
            }
        }
        Ok(Self {
            sample_rate,
            samples_per_frame: sample_rate / frame_rate,
            channels,
        })
    }

    /// Finds a channel by exact name, falling back to a unique channel whose
    /// name contains `name` (vendor prefixes such as `Voltage.LGas`).
    pub fn channel(&self, name: &str) -> Result<&AnalogSignal> {
        if let Some(exact) = self.channels.iter().find(|c| c.name == name) {
            return Ok(exact);
        }
        let matches: Vec<&AnalogSignal> = self
            .channels
            .iter()
            .filter(|c| c.name.contains(name))
            .collect();
        match matches.len() {
            0 => Err(GaitDataError::ChannelNotFound(name.to_string())),
            1 => Ok(matches[0]),
            _ => Err(GaitDataError::AmbiguousChannel {
                name: name.to_string(),
                matches: matches.iter().map(|c| c.name.clone()).collect(),
            }),
        }
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Everything read from one trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialData {
    pub name: String,
    pub frame_rate: f64,
    pub roi_offset: i64,
    pub signals: Vec<Signal>,
    pub events: GaitEvents,
    pub analog: Option<AnalogData>,
}

impl TrialData {
    pub fn signal(&self, name: &str) -> Result<&Signal> {
        self.signals
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| GaitDataError::SignalNotFound(name.to_string()))
    }

    /// Looks up `name` as given, then with the side prefix prepended.
    pub fn side_signal(&self, side: Side, name: &str) -> Result<&Signal> {
        match self.signal(name) {
            Ok(signal) => Ok(signal),
            Err(_) => self.signal(&side.channel_name(name)),
        }
    }

    pub fn signal_names(&self) -> Vec<&str> {
        self.signals.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Copies `values[start..end]`, reporting out-of-range windows instead of truncating.
pub(crate) fn checked_window(name: &str, values: &Array1<f64>, start: i64, end: i64) -> Result<Array1<f64>> {
    if start < 0 || end < start || end as usize > values.len() {
        return Err(GaitDataError::SignalOutOfRange {
            name: name.to_string(),
            start,
            end,
            len: values.len(),
        });
    }
    Ok(values.slice(s![start as usize..end as usize]).to_owned())
}


// src/data_input/trial_data.rs
