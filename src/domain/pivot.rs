//! Pivot kinds and detection output.

use super::bar::Bar;

/// Minimum price increment; entry and stop prices are rounded to it.
pub const TICK: f64 = 0.05;

/// Round down to the nearest tick.
pub fn round_down_to_tick(price: f64) -> f64 {
    (price / TICK).floor() * TICK
}

/// Round up to the nearest tick.
pub fn round_up_to_tick(price: f64) -> f64 {
    (price / TICK).ceil() * TICK
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PivotKind {
    /// Small pivot high.
    Sph,
    /// Small pivot low.
    Spl,
    /// Large pivot high.
    Lph,
    /// Large pivot low.
    Lpl,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pivot {
    pub kind: PivotKind,
    pub bar_index: usize,
    pub price: f64,
}

/// Detection output: four strictly increasing lists of bar indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotSet {
    pub sph: Vec<usize>,
    pub spl: Vec<usize>,
    pub lph: Vec<usize>,
    pub lpl: Vec<usize>,
}

impl PivotSet {
    pub fn is_empty(&self) -> bool {
        self.sph.is_empty() && self.spl.is_empty() && self.lph.is_empty() && self.lpl.is_empty()
    }

    /// Materialize one list as `Pivot` values; highs carry the bar high,
    /// lows the bar low.
    pub fn pivots(&self, kind: PivotKind, bars: &[Bar]) -> Vec<Pivot> {
        let (list, is_high) = match kind {
            PivotKind::Sph => (&self.sph, true),
            PivotKind::Spl => (&self.spl, false),
            PivotKind::Lph => (&self.lph, true),
            PivotKind::Lpl => (&self.lpl, false),
        };
        list.iter()
            .map(|&i| Pivot {
                kind,
                bar_index: i,
                price: if is_high { bars[i].high } else { bars[i].low },
            })
            .collect()
    }
}
