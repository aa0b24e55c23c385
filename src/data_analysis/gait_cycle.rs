// src/data_analysis/gait_cycle.rs

use log::{debug, warn};

use crate::constants::{CYCLE_PERCENT_MAX, MIN_STRIKES_PER_CYCLE};
use crate::data_input::trial_data::{GaitEvents, Side};
use crate::error::{GaitDataError, Result};

/// How the toe-off of a cycle is picked from the side's foot-off events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToeOffPolicy {
    /// Exactly one foot-off must lie strictly between the two strikes.
    #[default]
    StrictInterior,
    /// First foot-off after the opening strike, without checking that it
    /// precedes the closing strike. Can pick a toe-off from a later cycle
    /// when events are missing, so only use it on trials known to be clean.
    FirstAfterStrike,
}

/// One gait cycle in local frames, i.e. with the ROI offset already subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaitCycle {
    pub side: Side,
    pub start: i64,
    pub end: i64,
    pub toe_off: i64,
}

impl GaitCycle {
    /// Cycle length in frames.
    pub fn length(&self) -> i64 {
        self.end - self.start
    }

    /// Frames from the opening strike to toe-off.
    pub fn toe_off_frames(&self) -> i64 {
        self.toe_off - self.start
    }

    /// Toe-off position as a whole percentage of the cycle, clamped to [0, 100].
    pub fn toe_off_percent(&self) -> u32 {
        let length = self.length();
        if length <= 0 {
            return 0;
        }
        let pct = (CYCLE_PERCENT_MAX * self.toe_off_frames() as f64 / length as f64).round();
        pct.clamp(0.0, CYCLE_PERCENT_MAX) as u32
    }

    /// Cycle duration in seconds at the given frame rate.
    pub fn duration_s(&self, frame_rate: f64) -> f64 {
        self.length() as f64 / frame_rate
    }

    /// The same cycle labelled with `side`.
    pub fn with_side(self, side: Side) -> Self {
        Self { side, ..self }
    }
}

/// Pairs the first two strikes into a cycle and locates its toe-off.
///
/// `strike_frames` and `toeoff_frames` are on the whole-trial timeline; `offset`
/// is subtracted from all of them. An odd number of strikes drops the last
/// one, which is reported as a data-quality warning.
///
/// The frame lists carry no side, so the cycle is labelled [`Side::Left`].
/// Relabel it with [`GaitCycle::with_side`], or use [`build_cycle_with_policy`]
/// or [`build_cycle_for_side`] when the side is known up front.
pub fn build_cycle(strike_frames: &[i64], toeoff_frames: &[i64], offset: i64) -> Result<GaitCycle> {
    build_cycle_with_policy(Side::Left, strike_frames, toeoff_frames, offset, ToeOffPolicy::StrictInterior)
}

/// [`build_cycle`] with an explicit side and toe-off policy.
pub fn build_cycle_with_policy(
    side: Side,
    strike_frames: &[i64],
    toeoff_frames: &[i64],
    offset: i64,
    policy: ToeOffPolicy,
) -> Result<GaitCycle> {
    if strike_frames.len() < MIN_STRIKES_PER_CYCLE {
        return Err(GaitDataError::InsufficientEvents {
            found: strike_frames.len(),
        });
    }
    let mut strikes = strike_frames;
    if strikes.len() % 2 == 1 {
        warn!(
            "{} side: odd number of foot strikes ({}), discarding unpaired strike at frame {}",
            side,
            strikes.len(),
            strikes[strikes.len() - 1]
        );
        strikes = &strikes[..strikes.len() - 1];
    }

    let start = strikes[0].min(strikes[1]) - offset;
    let end = strikes[0].max(strikes[1]) - offset;
    pair_cycle(side, start, end, toeoff_frames, offset, policy)
}

fn pair_cycle(
    side: Side,
    start: i64,
    end: i64,
    toeoff_frames: &[i64],
    offset: i64,
    policy: ToeOffPolicy,
) -> Result<GaitCycle> {
    if end <= start {
        return Err(GaitDataError::DegenerateCycle { length: end - start });
    }

    let local_toe_offs = toeoff_frames.iter().map(|&f| f - offset);
    let toe_off = match policy {
        ToeOffPolicy::StrictInterior => {
            let inside: Vec<i64> = local_toe_offs.filter(|&f| start < f && f < end).collect();
            if inside.len() != 1 {
                return Err(GaitDataError::AmbiguousToeOff {
                    start,
                    end,
                    found: inside.len(),
                });
            }
            inside[0]
        }
        ToeOffPolicy::FirstAfterStrike => local_toe_offs
            .filter(|&f| f > start)
            .min()
            .ok_or(GaitDataError::AmbiguousToeOff { start, end, found: 0 })?,
    };

    let cycle = GaitCycle { side, start, end, toe_off };
    debug!(
        "{} cycle: frames {}..{} ({} frames), toe-off at {} ({}%)",
        side,
        start,
        end,
        cycle.length(),
        toe_off,
        cycle.toe_off_percent()
    );
    Ok(cycle)
}

/// First cycle of `side` from a trial's events.
pub fn build_cycle_for_side(events: &GaitEvents, side: Side, offset: i64, policy: ToeOffPolicy) -> Result<GaitCycle> {
    build_cycle_with_policy(side, &events.strikes(side), &events.toe_offs(side), offset, policy)
}

/// Every consecutive strike pair of `side`, in time order.
///
/// Each pair follows the same toe-off contract as [`build_cycle`]; the first
/// failing pair aborts the whole call rather than being skipped.
pub fn build_cycles(events: &GaitEvents, side: Side, offset: i64, policy: ToeOffPolicy) -> Result<Vec<GaitCycle>> {
    let strikes = events.strikes(side);
    if strikes.len() < MIN_STRIKES_PER_CYCLE {
        return Err(GaitDataError::InsufficientEvents { found: strikes.len() });
    }
    let toe_offs = events.toe_offs(side);
    strikes
        .windows(2)
        .map(|pair| pair_cycle(side, pair[0] - offset, pair[1] - offset, &toe_offs, offset, policy))
        .collect()
}


// src/data_analysis/gait_cycle.rs
