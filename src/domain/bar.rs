//! OHLCV bar representation and series validation.

use chrono::{NaiveDate, NaiveDateTime};

use super::error::PivotraderError;

/// Minimum number of bars pivot detection and backtesting can work with.
pub const MIN_BARS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    /// Trading day this bar belongs to.
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// close > open
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// close < open
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Immutable, validated bar sequence. Construction is the only mutation point;
/// everything downstream borrows the slice.
#[derive(Debug, Clone)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Validate and take ownership of the bars. Indices are rewritten to
    /// match slice positions so callers can build bars without tracking them.
    pub fn new(mut bars: Vec<Bar>) -> Result<Self, PivotraderError> {
        if bars.len() < MIN_BARS {
            return Err(PivotraderError::InsufficientBars {
                have: bars.len(),
                need: MIN_BARS,
            });
        }

        for (i, bar) in bars.iter().enumerate() {
            for (name, value) in [
                ("open", bar.open),
                ("high", bar.high),
                ("low", bar.low),
                ("close", bar.close),
            ] {
                if !value.is_finite() {
                    return Err(PivotraderError::Data {
                        reason: format!("bar {}: {} is not a finite number", i, name),
                    });
                }
            }
        }

        for w in bars.windows(2) {
            if w[1].timestamp <= w[0].timestamp {
                return Err(PivotraderError::Data {
                    reason: format!(
                        "bars out of order at {} ({} then {})",
                        w[1].index, w[0].timestamp, w[1].timestamp
                    ),
                });
            }
        }

        for (i, bar) in bars.iter_mut().enumerate() {
            bar.index = i;
        }

        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
