//! Price-level trading state.
//!
//! Every pivot price becomes a level the first time a rule looks at it.
//! A level is `Available` until an entry trades it, `Traded` until price
//! retests it against the breakout direction (then `Invalidated`), and
//! `Invalidated` until price breaks back out (then `Available` again).

use chrono::NaiveDate;
use std::collections::HashMap;

use super::bar::Bar;
use super::pivot::TICK;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelKind {
    Lph,
    Lpl,
    Sph,
    Spl,
}

/// Structured level key: price quantized to ticks plus the pivot kind.
/// Avoids float keys and formatted-string lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LevelKey {
    pub ticks: i64,
    pub kind: LevelKind,
}

impl LevelKey {
    pub fn new(price: f64, kind: LevelKind) -> Self {
        Self {
            ticks: (price / TICK).round() as i64,
            kind,
        }
    }

    pub fn price(&self) -> f64 {
        self.ticks as f64 * TICK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelStatus {
    Available,
    Traded,
    Invalidated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelState {
    pub price: f64,
    pub status: LevelStatus,
    pub needs_revalidation: bool,
    pub last_trade_bar: Option<usize>,
    pub last_trade_day: Option<NaiveDate>,
}

/// Owner of all level states for one backtest run.
#[derive(Debug, Clone, Default)]
pub struct LevelBook {
    states: HashMap<LevelKey, LevelState>,
}

impl LevelBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lazily create the level on first observation.
    pub fn ensure(&mut self, price: f64, kind: LevelKind) -> LevelKey {
        let key = LevelKey::new(price, kind);
        self.states.entry(key).or_insert(LevelState {
            price,
            status: LevelStatus::Available,
            needs_revalidation: false,
            last_trade_bar: None,
            last_trade_day: None,
        });
        key
    }

    pub fn status(&self, key: &LevelKey) -> Option<LevelStatus> {
        self.states.get(key).map(|s| s.status)
    }

    pub fn get(&self, key: &LevelKey) -> Option<&LevelState> {
        self.states.get(key)
    }

    /// Per-bar invalidation/revalidation pass over the large-pivot levels.
    /// Called once per bar, before entry evaluation.
    pub fn update(&mut self, bar: &Bar) {
        for (key, state) in self.states.iter_mut() {
            match key.kind {
                LevelKind::Lph | LevelKind::Sph => {
                    if state.status == LevelStatus::Traded
                        && state.needs_revalidation
                        && bar.low <= state.price
                    {
                        state.status = LevelStatus::Invalidated;
                        state.needs_revalidation = false;
                    } else if state.status == LevelStatus::Invalidated && bar.high > state.price {
                        state.status = LevelStatus::Available;
                    }
                }
                LevelKind::Lpl | LevelKind::Spl => {
                    if state.status == LevelStatus::Traded
                        && state.needs_revalidation
                        && bar.high >= state.price
                    {
                        state.status = LevelStatus::Invalidated;
                        state.needs_revalidation = false;
                    } else if state.status == LevelStatus::Invalidated && bar.low < state.price {
                        state.status = LevelStatus::Available;
                    }
                }
            }
        }
    }

    /// Day rollover (daily-reset semantics): levels traded on an earlier day
    /// become available again for gap re-entries. The retest obligation
    /// (`needs_revalidation`) persists across days.
    pub fn roll_day(&mut self, new_day: NaiveDate) {
        for state in self.states.values_mut() {
            if state.status == LevelStatus::Traded && state.last_trade_day != Some(new_day) {
                state.status = LevelStatus::Available;
            }
        }
    }

    /// Entry confirmation bookkeeping.
    pub fn mark_traded(&mut self, key: LevelKey, bar_index: usize, day: NaiveDate) {
        if let Some(state) = self.states.get_mut(&key) {
            state.status = LevelStatus::Traded;
            state.needs_revalidation = true;
            state.last_trade_bar = Some(bar_index);
            state.last_trade_day = Some(day);
        }
    }

    /// Read-only view for diagnostic display.
    pub fn snapshot(&self) -> Vec<(LevelKey, LevelState)> {
        let mut entries: Vec<(LevelKey, LevelState)> = self
            .states
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        entries.sort_by_key(|(k, _)| (k.ticks, k.kind as u8));
        entries
    }
}
