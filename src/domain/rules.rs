//! Rule configuration and validation.

use super::error::{ConfigWarning, PivotraderError};

/// Which entry and exit rules a backtest runs, plus their parameters.
/// Built from the `[rules]` config section; defaults match `Default`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleConfig {
    /// Entry: breakout through an available LPH (long) or LPL (short).
    pub entry_lph_lpl: bool,
    /// Entry: re-entry through a small pivot after a stop-out on a large level.
    pub entry_sph_above_lph: bool,
    /// Fill at the open when a bar gaps through the level.
    pub gap_handling: bool,
    /// Free traded levels again at the start of each new day.
    pub daily_reset: bool,
    /// Exit: fixed percentage stop from entry.
    pub stop_loss: bool,
    pub stop_loss_percent: f64,
    /// Exit: close any open position at the end of each day.
    pub eod_exit: bool,
    /// Exit: trail behind small pivots formed after entry.
    pub trailing_spl: bool,
    /// Exit: ratcheting profit stop once a minimum gain is reached.
    pub aggressive_profit: bool,
    pub aggressive_profit_percent: f64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            entry_lph_lpl: true,
            entry_sph_above_lph: false,
            gap_handling: false,
            daily_reset: false,
            stop_loss: false,
            stop_loss_percent: 1.0,
            eod_exit: false,
            trailing_spl: false,
            aggressive_profit: false,
            aggressive_profit_percent: 0.5,
        }
    }
}

impl RuleConfig {
    pub fn has_entry_rule(&self) -> bool {
        self.entry_lph_lpl || self.entry_sph_above_lph
    }

    pub fn has_exit_rule(&self) -> bool {
        self.stop_loss || self.eod_exit || self.trailing_spl || self.aggressive_profit
    }

    /// Check the configuration before a run. Fatal problems are errors;
    /// conditions worth telling the user about come back as warnings.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, PivotraderError> {
        if !self.has_entry_rule() {
            return Err(PivotraderError::NoEntryRule);
        }

        if self.stop_loss && !(0.1..=5.0).contains(&self.stop_loss_percent) {
            return Err(PivotraderError::ConfigInvalid {
                section: "rules".into(),
                key: "stop_loss_percent".into(),
                reason: format!(
                    "must be between 0.1 and 5.0, got {}",
                    self.stop_loss_percent
                ),
            });
        }

        if self.aggressive_profit && !(0.1..=2.0).contains(&self.aggressive_profit_percent) {
            return Err(PivotraderError::ConfigInvalid {
                section: "rules".into(),
                key: "aggressive_profit_percent".into(),
                reason: format!(
                    "must be between 0.1 and 2.0, got {}",
                    self.aggressive_profit_percent
                ),
            });
        }

        let mut warnings = Vec::new();
        if !self.has_exit_rule() {
            warnings.push(ConfigWarning::NoExitRule);
        }
        // Any two stop-style exits compete for the same fill.
        let stop_exits = [self.stop_loss, self.trailing_spl, self.aggressive_profit];
        if stop_exits.iter().filter(|&&on| on).count() > 1 {
            warnings.push(ConfigWarning::ConflictingTrailingStops);
        }
        Ok(warnings)
    }
}
