//! Exit rule evaluation and arbitration.
//!
//! Every enabled exit rule is evaluated on every bar with an open position.
//! When more than one fires, the best fill wins: the highest price for a
//! long, the lowest for a short.

use super::engine::BacktestContext;
use super::pivot::{round_down_to_tick, round_up_to_tick};
use super::position::{Direction, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitRule {
    StopLoss,
    EndOfDay,
    TrailingSmallPivot,
    AggressiveProfit,
}

impl std::fmt::Display for ExitRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitRule::StopLoss => write!(f, "Stop Loss"),
            ExitRule::EndOfDay => write!(f, "EOD Exit"),
            ExitRule::TrailingSmallPivot => write!(f, "Trailing SPL"),
            ExitRule::AggressiveProfit => write!(f, "Aggressive Profit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitSignal {
    pub rule: ExitRule,
    pub price: f64,
    pub label: &'static str,
}

/// Stop price fixed at entry: a percentage from the fill, rounded away from
/// the position (down for longs, up for shorts).
pub fn initial_stop(direction: Direction, entry_price: f64, percent: f64) -> f64 {
    match direction {
        Direction::Long => round_down_to_tick(entry_price * (1.0 - percent / 100.0)),
        Direction::Short => round_up_to_tick(entry_price * (1.0 + percent / 100.0)),
    }
}

/// Evaluate all enabled exits for bar `i`. Mutates the position only to
/// ratchet the aggressive-profit trailing stop.
pub fn evaluate_exits(
    ctx: &BacktestContext<'_>,
    i: usize,
    position: &mut Position,
) -> Option<ExitSignal> {
    let mut signals: Vec<ExitSignal> = Vec::new();

    if ctx.config.stop_loss {
        if let Some(signal) = stop_loss_exit(ctx, i, position) {
            signals.push(signal);
        }
    }
    if ctx.config.eod_exit {
        if let Some(signal) = end_of_day_exit(ctx, i) {
            signals.push(signal);
        }
    }
    if ctx.config.trailing_spl {
        if let Some(signal) = trailing_pivot_exit(ctx, i, position) {
            signals.push(signal);
        }
    }
    if ctx.config.aggressive_profit {
        if let Some(signal) = aggressive_profit_exit(ctx, i, position) {
            signals.push(signal);
        }
    }

    match position.direction {
        Direction::Long => signals
            .into_iter()
            .max_by(|a, b| a.price.total_cmp(&b.price)),
        Direction::Short => signals
            .into_iter()
            .min_by(|a, b| a.price.total_cmp(&b.price)),
    }
}

/// Intrabar stop check. On the entry bar the bar's direction is used as a
/// heuristic for whether the adverse extreme came before or after the
/// breakout entry; gap-fill entries happened at the open, so they check the
/// stop directly. This is an approximation, not tick-level truth.
fn stop_loss_exit(
    ctx: &BacktestContext<'_>,
    i: usize,
    position: &Position,
) -> Option<ExitSignal> {
    let stop = position.stop_loss?;
    let bar = &ctx.bars[i];
    let entry_bar = i == position.entry_bar;

    let hit = match position.direction {
        Direction::Long => {
            if entry_bar && !position.entry_was_gap_fill && bar.is_bullish() {
                false
            } else {
                bar.low <= stop
            }
        }
        Direction::Short => {
            if entry_bar && !position.entry_was_gap_fill && bar.is_bearish() {
                false
            } else {
                bar.high >= stop
            }
        }
    };
    if !hit {
        return None;
    }

    // After the entry bar a gap through the stop fills at the open.
    let price = match position.direction {
        Direction::Long if !entry_bar && bar.open < stop => bar.open,
        Direction::Short if !entry_bar && bar.open > stop => bar.open,
        _ => stop,
    };
    Some(ExitSignal {
        rule: ExitRule::StopLoss,
        price,
        label: "Stop Loss",
    })
}

/// Close at the last bar of each day (and at the end of the data).
fn end_of_day_exit(ctx: &BacktestContext<'_>, i: usize) -> Option<ExitSignal> {
    let bar = &ctx.bars[i];
    let last_of_day = match ctx.bars.get(i + 1) {
        Some(next) => next.day() != bar.day(),
        None => true,
    };
    if last_of_day {
        Some(ExitSignal {
            rule: ExitRule::EndOfDay,
            price: bar.close,
            label: "EOD Exit",
        })
    } else {
        None
    }
}

/// Trail behind the most recent small pivot formed strictly after entry and
/// strictly before the current bar.
fn trailing_pivot_exit(
    ctx: &BacktestContext<'_>,
    i: usize,
    position: &Position,
) -> Option<ExitSignal> {
    let bar = &ctx.bars[i];
    match position.direction {
        Direction::Long => {
            let trail = ctx
                .pivots
                .spl
                .iter()
                .rev()
                .find(|&&p| p > position.entry_bar && p < i)
                .map(|&p| ctx.bars[p].low)?;
            if bar.low <= trail {
                let price = if bar.open < trail { bar.open } else { trail };
                return Some(ExitSignal {
                    rule: ExitRule::TrailingSmallPivot,
                    price,
                    label: "Trailing SPL",
                });
            }
            None
        }
        Direction::Short => {
            let trail = ctx
                .pivots
                .sph
                .iter()
                .rev()
                .find(|&&p| p > position.entry_bar && p < i)
                .map(|&p| ctx.bars[p].high)?;
            if bar.high >= trail {
                let price = if bar.open > trail { bar.open } else { trail };
                return Some(ExitSignal {
                    rule: ExitRule::TrailingSmallPivot,
                    price,
                    label: "Trailing SPH",
                });
            }
            None
        }
    }
}

/// Once the position has moved at least `aggressive_profit_percent` in its
/// favor, trail the worst price of the previous ten bars, floored at the
/// minimum profit level. The stop only ever ratchets toward more profit.
fn aggressive_profit_exit(
    ctx: &BacktestContext<'_>,
    i: usize,
    position: &mut Position,
) -> Option<ExitSignal> {
    let threshold = position.entry_price * ctx.config.aggressive_profit_percent / 100.0;
    let active = position.max_favorable_excursion >= threshold || position.trailing_stop.is_some();
    if !active {
        return None;
    }

    // Previous ten bars, excluding the current one, never before entry.
    let start = i.saturating_sub(10).max(position.entry_bar);
    if start < i {
        let window = &ctx.bars[start..i];
        match position.direction {
            Direction::Long => {
                let floor = position.entry_price + threshold;
                let candidate = window
                    .iter()
                    .map(|b| b.low)
                    .fold(f64::INFINITY, f64::min)
                    .max(floor);
                position.trailing_stop = Some(match position.trailing_stop {
                    Some(current) => current.max(candidate),
                    None => candidate,
                });
            }
            Direction::Short => {
                let ceiling = position.entry_price - threshold;
                let candidate = window
                    .iter()
                    .map(|b| b.high)
                    .fold(f64::NEG_INFINITY, f64::max)
                    .min(ceiling);
                position.trailing_stop = Some(match position.trailing_stop {
                    Some(current) => current.min(candidate),
                    None => candidate,
                });
            }
        }
    }

    let trail = position.trailing_stop?;
    let bar = &ctx.bars[i];
    match position.direction {
        Direction::Long if bar.low <= trail => {
            let price = if bar.open < trail { bar.open } else { trail };
            Some(ExitSignal {
                rule: ExitRule::AggressiveProfit,
                price,
                label: "Aggressive Profit",
            })
        }
        Direction::Short if bar.high >= trail => {
            let price = if bar.open > trail { bar.open } else { trail };
            Some(ExitSignal {
                rule: ExitRule::AggressiveProfit,
                price,
                label: "Aggressive Profit",
            })
        }
        _ => None,
    }
}
