//! Summary statistics over a completed trade list.

use super::position::Trade;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_points: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub average_win: f64,
    pub average_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub average_duration_bars: f64,
    pub max_consecutive_losses: usize,
}

impl Metrics {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut gross_profit = 0.0f64;
        let mut gross_loss = 0.0f64;
        let mut total_points = 0.0f64;
        let mut largest_win = 0.0f64;
        let mut largest_loss = 0.0f64;
        let mut total_duration = 0usize;
        let mut losing_streak = 0usize;
        let mut max_consecutive_losses = 0usize;

        for trade in trades {
            total_points += trade.points;
            total_duration += trade.duration_bars;
            if trade.is_win {
                wins += 1;
                gross_profit += trade.points;
                largest_win = largest_win.max(trade.points);
                losing_streak = 0;
            } else {
                losses += 1;
                gross_loss += -trade.points;
                largest_loss = largest_loss.max(-trade.points);
                losing_streak += 1;
                max_consecutive_losses = max_consecutive_losses.max(losing_streak);
            }
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            wins as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
        let average_win = if wins > 0 { gross_profit / wins as f64 } else { 0.0 };
        let average_loss = if losses > 0 { gross_loss / losses as f64 } else { 0.0 };
        let average_duration_bars = if total_trades > 0 {
            total_duration as f64 / total_trades as f64
        } else {
            0.0
        };

        Self {
            total_trades,
            wins,
            losses,
            total_points,
            win_rate,
            profit_factor,
            average_win,
            average_loss,
            largest_win,
            largest_loss,
            average_duration_bars,
            max_consecutive_losses,
        }
    }
}
