//! Two-scale pivot detection.
//!
//! Three stages over a finished bar series:
//!
//! 1. Alternating small-pivot confirmation. A small pivot high (SPH) is
//!    anchored at a bar A and confirmed by the first two later bars whose
//!    `low < A.low && close < A.close`; a small pivot low (SPL) mirrors with
//!    `high > A.high && close > A.close`. Confirmation alternates strictly
//!    between the two kinds. The confirmed pivot sits at the price extreme of
//!    the whole `[anchor, B2]` range, not necessarily at the anchor.
//! 2. Range relocation. Confirming pivot N re-examines pivot N-1 against the
//!    full range it could not see during its own local scan.
//! 3. Large pivots (LPH/LPL) from break-of-structure events over the
//!    finalized small-pivot lists.
//!
//! All price comparisons are strict; equal prices never count as a break.

use super::bar::Bar;
use super::pivot::PivotSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SmallKind {
    Sph,
    Spl,
}

impl SmallKind {
    fn opposite(self) -> Self {
        match self {
            SmallKind::Sph => SmallKind::Spl,
            SmallKind::Spl => SmallKind::Sph,
        }
    }
}

/// Detect all pivots. Pure function of the bars; returns an empty set for
/// fewer than three bars.
pub fn detect_pivots(bars: &[Bar]) -> PivotSet {
    if bars.len() < 3 {
        return PivotSet::default();
    }

    let small = detect_small_pivots(bars);
    let sph: Vec<usize> = small
        .iter()
        .filter(|(k, _)| *k == SmallKind::Sph)
        .map(|&(_, i)| i)
        .collect();
    let spl: Vec<usize> = small
        .iter()
        .filter(|(k, _)| *k == SmallKind::Spl)
        .map(|&(_, i)| i)
        .collect();

    let (lph, lpl) = detect_large_pivots(bars, &sph, &spl);

    PivotSet { sph, spl, lph, lpl }
}

/// Stage 1 + 2: confirmed small pivots in confirmation order.
fn detect_small_pivots(bars: &[Bar]) -> Vec<(SmallKind, usize)> {
    let mut confirmed: Vec<(SmallKind, usize)> = Vec::new();
    let mut last: Option<SmallKind> = None;
    let mut search = 0usize;

    loop {
        let want = match last {
            Some(kind) => kind.opposite(),
            None => SmallKind::Sph,
        };

        let mut hit = find_pattern(bars, search, want);
        let mut kind = want;

        // Nothing confirmed yet and no SPH opener anywhere: try SPL once.
        if hit.is_none() && last.is_none() {
            kind = SmallKind::Spl;
            hit = find_pattern(bars, search, kind);
        }

        let Some((b2, extreme)) = hit else {
            break;
        };

        // An outside bar can carry both range extremes, dragging the
        // previous same-kind pivot onto it by relocation and then
        // re-extreming the next pattern to the same bar. That is the same
        // pivot seen twice, not a new one; skip it and keep searching.
        let repeat = confirmed
            .iter()
            .rev()
            .find(|(k, _)| *k == kind)
            .is_some_and(|&(_, prev)| extreme <= prev);
        if repeat {
            search = b2;
            continue;
        }

        confirmed.push((kind, extreme));
        relocate_previous(bars, &mut confirmed);
        last = Some(kind);
        search = b2;
    }

    confirmed
}

/// First anchor at or after `search` whose pattern completes.
/// Returns `(b2, extreme_index)`.
fn find_pattern(bars: &[Bar], search: usize, kind: SmallKind) -> Option<(usize, usize)> {
    for anchor in search..bars.len() {
        if let Some(b2) = complete_pattern(bars, anchor, kind) {
            return Some((b2, range_extreme(bars, anchor, b2, kind)));
        }
    }
    None
}

/// B2 of the two-bar confirmation pattern for `anchor`, if it exists.
fn complete_pattern(bars: &[Bar], anchor: usize, kind: SmallKind) -> Option<usize> {
    let a = &bars[anchor];
    let mut hits = 0usize;
    for (j, bar) in bars.iter().enumerate().skip(anchor + 1) {
        let breaks = match kind {
            SmallKind::Sph => bar.low < a.low && bar.close < a.close,
            SmallKind::Spl => bar.high > a.high && bar.close > a.close,
        };
        if breaks {
            hits += 1;
            if hits == 2 {
                return Some(j);
            }
        }
    }
    None
}

/// Index of the kind's extreme over `[from, to]` (max high for SPH, min low
/// for SPL). Ties keep the earliest bar.
fn range_extreme(bars: &[Bar], from: usize, to: usize, kind: SmallKind) -> usize {
    let mut best = from;
    for i in from..=to {
        let better = match kind {
            SmallKind::Sph => bars[i].high > bars[best].high,
            SmallKind::Spl => bars[i].low < bars[best].low,
        };
        if better {
            best = i;
        }
    }
    best
}

/// Stage 2: after confirming the newest pivot, re-extreme the one before it
/// over the range bounded by the nearest still-earlier pivot of the newest
/// pivot's kind (exclusive) through the newest pivot's bar (inclusive).
/// Applies only to the immediately preceding pivot.
fn relocate_previous(bars: &[Bar], confirmed: &mut [(SmallKind, usize)]) {
    let n = confirmed.len();
    if n < 2 {
        return;
    }
    let (new_kind, new_idx) = confirmed[n - 1];
    let (prev_kind, _) = confirmed[n - 2];
    if prev_kind == new_kind {
        return;
    }

    // Given alternation this is pivot N-2 when it exists.
    let lower = confirmed[..n - 2]
        .iter()
        .rev()
        .find(|(k, _)| *k == new_kind)
        .map(|&(_, i)| i + 1)
        .unwrap_or(0);

    confirmed[n - 2].1 = range_extreme(bars, lower, new_idx, prev_kind);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expecting {
    Lpl,
    Lph,
}

/// Stage 3: break-of-structure large pivots. Short-circuits to empty output
/// when either small-pivot list is empty.
fn detect_large_pivots(bars: &[Bar], sph: &[usize], spl: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut lph: Vec<usize> = Vec::new();
    let mut lpl: Vec<usize> = Vec::new();
    if sph.is_empty() || spl.is_empty() {
        return (lph, lpl);
    }

    let mut expecting = Expecting::Lpl;
    let mut sph_ref = 0usize;
    let mut spl_ref = 0usize;
    let mut last_lph: Option<usize> = None;
    let mut last_lpl: Option<usize> = None;

    for i in 0..bars.len() {
        match expecting {
            Expecting::Lpl => {
                // Reaching the next SPH without a break moves the reference.
                while sph_ref + 1 < sph.len() && i >= sph[sph_ref + 1] {
                    sph_ref += 1;
                }
                let reference = sph[sph_ref];
                if i > reference && bars[i].high > bars[reference].high {
                    let candidate = spl
                        .iter()
                        .copied()
                        .filter(|&s| last_lph.map_or(true, |l| s > l) && s < i)
                        .min_by(|&a, &b| bars[a].low.total_cmp(&bars[b].low));
                    if let Some(c) = candidate {
                        if !lpl.contains(&c) {
                            lpl.push(c);
                        }
                        last_lpl = Some(c);
                        expecting = Expecting::Lph;
                    }
                }
            }
            Expecting::Lph => {
                while spl_ref + 1 < spl.len() && i >= spl[spl_ref + 1] {
                    spl_ref += 1;
                }
                let reference = spl[spl_ref];
                if i > reference && bars[i].low < bars[reference].low {
                    let candidate = sph
                        .iter()
                        .copied()
                        .filter(|&s| last_lpl.map_or(true, |l| s > l) && s < i)
                        .max_by(|&a, &b| bars[a].high.total_cmp(&bars[b].high));
                    if let Some(c) = candidate {
                        if !lph.contains(&c) {
                            lph.push(c);
                        }
                        last_lph = Some(c);
                        expecting = Expecting::Lpl;
                    }
                }
            }
        }
    }

    (lph, lpl)
}
