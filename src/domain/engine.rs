//! Bar-loop backtest driver.

use super::bar::{Bar, MIN_BARS};
use super::entry::{evaluate_entries, StopOut};
use super::error::{ConfigWarning, PivotraderError};
use super::exit::{evaluate_exits, initial_stop, ExitRule};
use super::level::{LevelBook, LevelKey, LevelKind, LevelState};
use super::pivot::PivotSet;
use super::position::{Position, PositionManager, Trade};
use super::rules::RuleConfig;

/// Borrowed view of everything rule evaluation needs. One per run; no
/// global state anywhere.
pub struct BacktestContext<'a> {
    pub bars: &'a [Bar],
    pub pivots: &'a PivotSet,
    pub config: &'a RuleConfig,
}

/// Outcome of a run: the trade log, whatever was still open when the data
/// ended, the final level states, and any configuration warnings.
#[derive(Debug)]
pub struct BacktestReport {
    pub trades: Vec<Trade>,
    pub open_position: Option<Position>,
    pub level_snapshot: Vec<(LevelKey, LevelState)>,
    pub warnings: Vec<ConfigWarning>,
}

/// Cursors into the pivot index lists; a pivot's level is registered once
/// the scan moves strictly past its bar.
#[derive(Default)]
struct LevelCursors {
    sph: usize,
    spl: usize,
    lph: usize,
    lpl: usize,
}

impl LevelCursors {
    fn register(
        &mut self,
        levels: &mut LevelBook,
        ctx: &BacktestContext<'_>,
        i: usize,
        include_small: bool,
    ) {
        while self.lph < ctx.pivots.lph.len() && ctx.pivots.lph[self.lph] < i {
            levels.ensure(ctx.bars[ctx.pivots.lph[self.lph]].high, LevelKind::Lph);
            self.lph += 1;
        }
        while self.lpl < ctx.pivots.lpl.len() && ctx.pivots.lpl[self.lpl] < i {
            levels.ensure(ctx.bars[ctx.pivots.lpl[self.lpl]].low, LevelKind::Lpl);
            self.lpl += 1;
        }
        if include_small {
            while self.sph < ctx.pivots.sph.len() && ctx.pivots.sph[self.sph] < i {
                levels.ensure(ctx.bars[ctx.pivots.sph[self.sph]].high, LevelKind::Sph);
                self.sph += 1;
            }
            while self.spl < ctx.pivots.spl.len() && ctx.pivots.spl[self.spl] < i {
                levels.ensure(ctx.bars[ctx.pivots.spl[self.spl]].low, LevelKind::Spl);
                self.spl += 1;
            }
        }
    }
}

/// Close the open position and re-arm (or disarm) the stop-run re-entry.
fn close_position(
    manager: &mut PositionManager,
    last_stop_out: &mut Option<StopOut>,
    bar_index: usize,
    price: f64,
    rule: ExitRule,
    label: &'static str,
) -> Result<(), PivotraderError> {
    let trade = manager.exit(bar_index, price, rule, label)?;
    *last_stop_out = if trade.exit_rule == ExitRule::StopLoss
        && matches!(trade.level_kind, LevelKind::Lph | LevelKind::Lpl)
    {
        Some(StopOut {
            direction: trade.direction,
            level_price: trade.traded_level,
            level_kind: trade.level_kind,
        })
    } else {
        None
    };
    Ok(())
}

/// Replay the rules over the bars. Deterministic in `(bars, pivots, config)`.
pub fn run_backtest(
    bars: &[Bar],
    pivots: &PivotSet,
    config: &RuleConfig,
) -> Result<BacktestReport, PivotraderError> {
    let warnings = config.validate()?;
    if bars.len() < MIN_BARS {
        return Err(PivotraderError::InsufficientBars {
            have: bars.len(),
            need: MIN_BARS,
        });
    }

    let ctx = BacktestContext {
        bars,
        pivots,
        config,
    };
    let mut levels = LevelBook::new();
    let mut manager = PositionManager::new();
    let mut cursors = LevelCursors::default();
    let mut last_stop_out: Option<StopOut> = None;

    for i in 0..bars.len() {
        let bar = &bars[i];

        // 1. Day boundary: force out anything the in-day EOD rule missed,
        //    then free up yesterday's traded levels.
        if i > 0 && bar.day() != bars[i - 1].day() {
            if config.eod_exit && !manager.is_flat() {
                close_position(
                    &mut manager,
                    &mut last_stop_out,
                    i,
                    bar.open,
                    ExitRule::EndOfDay,
                    "EOD Exit - Previous Day",
                )?;
            }
            if config.daily_reset {
                levels.roll_day(bar.day());
            }
        }

        // 2. Exits for a position carried into this bar.
        if !manager.is_flat() {
            manager.update_excursion(bar);
            let signal = manager
                .open_mut()
                .and_then(|position| evaluate_exits(&ctx, i, position));
            if let Some(signal) = signal {
                close_position(
                    &mut manager,
                    &mut last_stop_out,
                    i,
                    signal.price,
                    signal.rule,
                    signal.label,
                )?;
            }
        }

        // 3. Register pivots formed strictly before this bar, then run the
        //    invalidation/revalidation pass.
        cursors.register(&mut levels, &ctx, i, config.entry_sph_above_lph);
        levels.update(bar);

        // 4. Entries, with a same-bar exit check on fill.
        if manager.is_flat() {
            if let Some(signal) = evaluate_entries(&ctx, i, &levels, last_stop_out.as_ref()) {
                let stop = if config.stop_loss {
                    Some(initial_stop(
                        signal.direction,
                        signal.price,
                        config.stop_loss_percent,
                    ))
                } else {
                    None
                };
                manager.enter(&signal, i, stop)?;
                levels.mark_traded(
                    LevelKey::new(signal.traded_level, signal.level_kind),
                    i,
                    bar.day(),
                );
                manager.update_excursion(bar);
                let exit = manager
                    .open_mut()
                    .and_then(|position| evaluate_exits(&ctx, i, position));
                if let Some(exit) = exit {
                    close_position(
                        &mut manager,
                        &mut last_stop_out,
                        i,
                        exit.price,
                        exit.rule,
                        exit.label,
                    )?;
                }
            }
        }
    }

    // Without the EOD rule an open position is reported, not force-closed.
    if config.eod_exit && !manager.is_flat() {
        let last = bars.len() - 1;
        close_position(
            &mut manager,
            &mut last_stop_out,
            last,
            bars[last].close,
            ExitRule::EndOfDay,
            "EOD Exit",
        )?;
    }

    let (trades, open_position) = manager.finish();
    Ok(BacktestReport {
        trades,
        open_position,
        level_snapshot: levels.snapshot(),
        warnings,
    })
}
