//! Entry rule evaluation.
//!
//! Rules are checked in a fixed order and the first signal wins:
//! large-level breakout first, then the stop-run re-entry.

use super::bar::Bar;
use super::engine::BacktestContext;
use super::level::{LevelBook, LevelKey, LevelKind, LevelStatus};
use super::pivot::TICK;
use super::position::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRule {
    /// Breakout through an available LPH (long) or LPL (short).
    LevelBreakout,
    /// Re-entry through a small pivot after a stop-out on a large level.
    StopRunReentry,
}

impl std::fmt::Display for EntryRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryRule::LevelBreakout => write!(f, "Level Breakout"),
            EntryRule::StopRunReentry => write!(f, "Stop-Run Reentry"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntrySignal {
    pub direction: Direction,
    pub price: f64,
    pub traded_level: f64,
    pub level_kind: LevelKind,
    pub rule: EntryRule,
    pub is_gap_fill: bool,
    pub label: &'static str,
}

/// Record of the most recent stop-out, kept by the driver to arm the
/// stop-run re-entry rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopOut {
    pub direction: Direction,
    pub level_price: f64,
    pub level_kind: LevelKind,
}

pub fn evaluate_entries(
    ctx: &BacktestContext<'_>,
    i: usize,
    levels: &LevelBook,
    last_stop_out: Option<&StopOut>,
) -> Option<EntrySignal> {
    if ctx.config.entry_lph_lpl {
        if let Some(signal) = level_breakout(ctx, i, levels) {
            return Some(signal);
        }
    }
    if ctx.config.entry_sph_above_lph {
        if let Some(signal) = stop_run_reentry(ctx, i, levels, last_stop_out) {
            return Some(signal);
        }
    }
    None
}

/// Most recent pivot strictly before bar `i` whose level is still available.
fn latest_available(
    bars: &[Bar],
    indices: &[usize],
    i: usize,
    kind: LevelKind,
    levels: &LevelBook,
) -> Option<f64> {
    let is_high = matches!(kind, LevelKind::Lph | LevelKind::Sph);
    indices
        .iter()
        .rev()
        .filter(|&&p| p < i)
        .map(|&p| if is_high { bars[p].high } else { bars[p].low })
        .find(|&price| {
            levels.status(&LevelKey::new(price, kind)) == Some(LevelStatus::Available)
        })
}

/// Long fill through a resistance level: at the open when the bar gaps over
/// it (and gap handling is on), else one tick above the level.
fn long_fill(bar: &Bar, level: f64, gap_handling: bool) -> Option<(f64, bool)> {
    if bar.high > level {
        if gap_handling && bar.open > level {
            Some((bar.open, true))
        } else {
            Some((level + TICK, false))
        }
    } else {
        None
    }
}

fn short_fill(bar: &Bar, level: f64, gap_handling: bool) -> Option<(f64, bool)> {
    if bar.low < level {
        if gap_handling && bar.open < level {
            Some((bar.open, true))
        } else {
            Some((level - TICK, false))
        }
    } else {
        None
    }
}

fn level_breakout(
    ctx: &BacktestContext<'_>,
    i: usize,
    levels: &LevelBook,
) -> Option<EntrySignal> {
    let bar = &ctx.bars[i];

    // Long side first.
    if let Some(level) = latest_available(ctx.bars, &ctx.pivots.lph, i, LevelKind::Lph, levels) {
        if let Some((price, is_gap_fill)) = long_fill(bar, level, ctx.config.gap_handling) {
            return Some(EntrySignal {
                direction: Direction::Long,
                price,
                traded_level: level,
                level_kind: LevelKind::Lph,
                rule: EntryRule::LevelBreakout,
                is_gap_fill,
                label: "LPH Breakout",
            });
        }
    }

    if let Some(level) = latest_available(ctx.bars, &ctx.pivots.lpl, i, LevelKind::Lpl, levels) {
        if let Some((price, is_gap_fill)) = short_fill(bar, level, ctx.config.gap_handling) {
            return Some(EntrySignal {
                direction: Direction::Short,
                price,
                traded_level: level,
                level_kind: LevelKind::Lpl,
                rule: EntryRule::LevelBreakout,
                is_gap_fill,
                label: "LPL Breakdown",
            });
        }
    }

    None
}

/// After a long stop-out on an LPH, the first available SPH above that level
/// re-arms a long; mirror for a short stop-out on an LPL with an SPL below.
fn stop_run_reentry(
    ctx: &BacktestContext<'_>,
    i: usize,
    levels: &LevelBook,
    last_stop_out: Option<&StopOut>,
) -> Option<EntrySignal> {
    let stop_out = last_stop_out?;
    let bar = &ctx.bars[i];

    match (stop_out.direction, stop_out.level_kind) {
        (Direction::Long, LevelKind::Lph) => {
            let level = ctx
                .pivots
                .sph
                .iter()
                .rev()
                .filter(|&&p| p < i)
                .map(|&p| ctx.bars[p].high)
                .filter(|&price| price > stop_out.level_price)
                .find(|&price| {
                    levels.status(&LevelKey::new(price, LevelKind::Sph))
                        == Some(LevelStatus::Available)
                })?;
            let (price, is_gap_fill) = long_fill(bar, level, ctx.config.gap_handling)?;
            Some(EntrySignal {
                direction: Direction::Long,
                price,
                traded_level: level,
                level_kind: LevelKind::Sph,
                rule: EntryRule::StopRunReentry,
                is_gap_fill,
                label: "SPH Reentry",
            })
        }
        (Direction::Short, LevelKind::Lpl) => {
            let level = ctx
                .pivots
                .spl
                .iter()
                .rev()
                .filter(|&&p| p < i)
                .map(|&p| ctx.bars[p].low)
                .filter(|&price| price < stop_out.level_price)
                .find(|&price| {
                    levels.status(&LevelKey::new(price, LevelKind::Spl))
                        == Some(LevelStatus::Available)
                })?;
            let (price, is_gap_fill) = short_fill(bar, level, ctx.config.gap_handling)?;
            Some(EntrySignal {
                direction: Direction::Short,
                price,
                traded_level: level,
                level_kind: LevelKind::Spl,
                rule: EntryRule::StopRunReentry,
                is_gap_fill,
                label: "SPL Reentry",
            })
        }
        _ => None,
    }
}
