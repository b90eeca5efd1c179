//! Market feature layer — derived panels from a daily price panel.
//!
//! Everything here is a pure function of the price panel: returns,
//! volatilities, drawdowns, and rolling percentile ranks at the resolutions
//! the signal table and allocation engine consume.

use crate::domain::{Frame, TimeSeries};

/// Window for rolling percentile ranks (months of monthly data).
pub const PCT_RANK_WINDOW: usize = 120;

/// Trading days per year, for annualizing daily volatility.
const TRADING_DAYS: f64 = 252.0;

/// Derived market features at daily and monthly resolution.
#[derive(Debug, Clone)]
pub struct MarketFeatures {
    /// Daily close prices (input panel).
    pub px: Frame,
    pub daily_ret: Frame,
    /// Month-end prices.
    pub monthly_px: Frame,
    pub monthly_ret: Frame,
    /// Annualized daily-return volatility over 21/63/252 sessions.
    pub vol_1m: Frame,
    pub vol_3m: Frame,
    pub vol_12m: Frame,
    /// Running drawdown from the all-time peak, daily.
    pub drawdown: Frame,
    /// Rolling 36-month (756-session) maximum drawdown.
    pub rolling_mdd_36m: Frame,
    /// Annualized 12-month volatility of monthly returns.
    pub monthly_vol_12m: Frame,
    /// Rolling percentile rank of monthly returns, [0, 100].
    pub ret_pct: Frame,
}

/// Apply a per-series operation to every column, rejoining on the union index.
fn map_columns(frame: &Frame, f: impl Fn(&TimeSeries) -> TimeSeries) -> Frame {
    let series: Vec<(String, TimeSeries)> = frame
        .columns()
        .iter()
        .filter_map(|name| {
            frame
                .column_series(name)
                .map(|s| (name.clone(), f(&s)))
        })
        .collect();
    Frame::from_series_outer(&series)
}

/// Build the full feature set from a daily price panel.
pub fn build_market_features(px: &Frame) -> MarketFeatures {
    let daily_ret = map_columns(px, |s| s.pct_change(1));
    let monthly_px = map_columns(px, |s| s.drop_non_finite().monthly_last());
    let monthly_ret = map_columns(&monthly_px, |s| s.pct_change(1));

    let ann = TRADING_DAYS.sqrt();
    let vol_1m = map_columns(&daily_ret, |s| s.rolling_std(21).map_values(|v| v * ann));
    let vol_3m = map_columns(&daily_ret, |s| s.rolling_std(63).map_values(|v| v * ann));
    let vol_12m = map_columns(&daily_ret, |s| s.rolling_std(252).map_values(|v| v * ann));

    let drawdown = map_columns(px, |s| s.safe_div(&s.cummax()).map_values(|v| v - 1.0));
    let rolling_mdd_36m = map_columns(&drawdown, |s| s.rolling_min(756));

    let monthly_vol_12m = map_columns(&monthly_ret, |s| {
        s.rolling_std(12).map_values(|v| v * 12f64.sqrt())
    });
    let ret_pct = map_columns(&monthly_ret, |s| s.rolling_pct_rank(PCT_RANK_WINDOW));

    MarketFeatures {
        px: px.clone(),
        daily_ret,
        monthly_px,
        monthly_ret,
        vol_1m,
        vol_3m,
        vol_12m,
        drawdown,
        rolling_mdd_36m,
        monthly_vol_12m,
        ret_pct,
    }
}

/// 60/40 SPY/IEF monthly benchmark return; empty when either leg is missing.
pub fn benchmark_60_40(monthly_ret: &Frame) -> TimeSeries {
    let (Some(spy), Some(ief)) = (
        monthly_ret.column_series("SPY"),
        monthly_ret.column_series("IEF"),
    ) else {
        return TimeSeries::new();
    };
    spy.zip_with(&ief, |a, b| 0.6 * a + 0.4 * b)
}
