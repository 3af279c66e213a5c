//! Open position state and completed trades.

use super::bar::Bar;
use super::entry::{EntryRule, EntrySignal};
use super::error::PivotraderError;
use super::exit::ExitRule;
use super::level::LevelKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short; multiplies raw price moves into points.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "Long"),
            Direction::Short => write!(f, "Short"),
        }
    }
}

/// The single open position. Excursion fields track the running extremes
/// since entry; `trailing_stop` is ratcheted by the aggressive profit exit.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub id: u64,
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_bar: usize,
    pub entry_rule: EntryRule,
    pub entry_label: &'static str,
    pub stop_loss: Option<f64>,
    pub traded_level: f64,
    pub level_kind: LevelKind,
    pub entry_was_gap_fill: bool,
    pub highest_price: f64,
    pub lowest_price: f64,
    pub max_favorable_excursion: f64,
    pub max_adverse_excursion: f64,
    pub trailing_stop: Option<f64>,
}

/// One completed round trip. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub trade_id: u64,
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_bar: usize,
    pub entry_rule: EntryRule,
    pub entry_label: &'static str,
    pub traded_level: f64,
    pub level_kind: LevelKind,
    pub exit_bar: usize,
    pub exit_price: f64,
    pub exit_rule: ExitRule,
    pub exit_label: &'static str,
    pub points: f64,
    pub duration_bars: usize,
    pub is_win: bool,
}

/// Enforces the single-position invariant and owns the trade log.
#[derive(Debug, Default)]
pub struct PositionManager {
    next_id: u64,
    open: Option<Position>,
    trades: Vec<Trade>,
}

impl PositionManager {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            open: None,
            trades: Vec::new(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.open.is_none()
    }

    pub fn open(&self) -> Option<&Position> {
        self.open.as_ref()
    }

    pub fn open_mut(&mut self) -> Option<&mut Position> {
        self.open.as_mut()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Open a position from an entry signal. Errors if one is already open.
    pub fn enter(
        &mut self,
        signal: &EntrySignal,
        bar_index: usize,
        stop_loss: Option<f64>,
    ) -> Result<&Position, PivotraderError> {
        if self.open.is_some() {
            return Err(PivotraderError::Invariant {
                reason: format!("entry at bar {} while a position is open", bar_index),
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        self.open = Some(Position {
            id,
            direction: signal.direction,
            entry_price: signal.price,
            entry_bar: bar_index,
            entry_rule: signal.rule,
            entry_label: signal.label,
            stop_loss,
            traded_level: signal.traded_level,
            level_kind: signal.level_kind,
            entry_was_gap_fill: signal.is_gap_fill,
            highest_price: signal.price,
            lowest_price: signal.price,
            max_favorable_excursion: 0.0,
            max_adverse_excursion: 0.0,
            trailing_stop: None,
        });
        Ok(self.open.as_ref().unwrap())
    }

    /// Close the open position and append the resulting trade.
    /// Same-bar exits are legal; exits before the entry bar are not.
    pub fn exit(
        &mut self,
        bar_index: usize,
        price: f64,
        rule: ExitRule,
        label: &'static str,
    ) -> Result<&Trade, PivotraderError> {
        let position = self.open.take().ok_or_else(|| PivotraderError::Invariant {
            reason: format!("exit at bar {} with no open position", bar_index),
        })?;

        if bar_index < position.entry_bar {
            return Err(PivotraderError::Invariant {
                reason: format!(
                    "exit bar {} precedes entry bar {}",
                    bar_index, position.entry_bar
                ),
            });
        }

        let points = (price - position.entry_price) * position.direction.sign();
        self.trades.push(Trade {
            trade_id: position.id,
            direction: position.direction,
            entry_price: position.entry_price,
            entry_bar: position.entry_bar,
            entry_rule: position.entry_rule,
            entry_label: position.entry_label,
            traded_level: position.traded_level,
            level_kind: position.level_kind,
            exit_bar: bar_index,
            exit_price: price,
            exit_rule: rule,
            exit_label: label,
            points,
            duration_bars: bar_index - position.entry_bar,
            is_win: points > 0.0,
        });
        Ok(self.trades.last().unwrap())
    }

    /// Fold one bar into the open position's running extremes.
    pub fn update_excursion(&mut self, bar: &Bar) {
        if let Some(position) = self.open.as_mut() {
            position.highest_price = position.highest_price.max(bar.high);
            position.lowest_price = position.lowest_price.min(bar.low);
            let (favorable, adverse) = match position.direction {
                Direction::Long => (
                    position.highest_price - position.entry_price,
                    position.entry_price - position.lowest_price,
                ),
                Direction::Short => (
                    position.entry_price - position.lowest_price,
                    position.highest_price - position.entry_price,
                ),
            };
            position.max_favorable_excursion = favorable.max(0.0);
            position.max_adverse_excursion = adverse.max(0.0);
        }
    }

    /// Consume the manager at end of run.
    pub fn finish(self) -> (Vec<Trade>, Option<Position>) {
        (self.trades, self.open)
    }
}
