//! Momentum signal table — one tidy row per (ticker, month).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::TimeSeries;
use crate::features::{MarketFeatures, PCT_RANK_WINDOW};

/// One monthly signal observation for one ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub mom_3m: f64,
    pub mom_6m: f64,
    pub mom_12m: f64,
    pub vol_12m: f64,
    pub drawdown: f64,
    /// Rolling percentile ranks in [0, 100].
    pub mom_pct: f64,
    pub vol_pct: f64,
    pub dd_pct: f64,
}

/// Compounded momentum over a trailing window of monthly returns.
fn momentum(monthly_ret: &TimeSeries, window: usize) -> TimeSeries {
    monthly_ret.rolling_apply(window, |w| {
        w.iter().map(|r| 1.0 + r).product::<f64>() - 1.0
    })
}

/// Build the per-ticker signal table from the market feature layer.
pub fn build_signals(features: &MarketFeatures) -> Vec<SignalRow> {
    let mut out = Vec::new();
    for ticker in features.monthly_ret.columns() {
        let Some(ret) = features.monthly_ret.column_series(ticker) else {
            continue;
        };
        let mom_3m = momentum(&ret, 3);
        let mom_6m = momentum(&ret, 6);
        let mom_12m = momentum(&ret, 12);
        let vol_12m = features
            .monthly_vol_12m
            .column_series(ticker)
            .unwrap_or_default();
        let drawdown = features
            .drawdown
            .column_series(ticker)
            .map(|s| s.drop_non_finite().monthly_last())
            .unwrap_or_default();
        let mom_pct = mom_12m.rolling_pct_rank(PCT_RANK_WINDOW);
        let vol_pct = vol_12m.rolling_pct_rank(PCT_RANK_WINDOW);
        let dd_pct = drawdown.rolling_pct_rank(PCT_RANK_WINDOW);

        for (date, _) in ret.iter() {
            let at = |s: &TimeSeries| s.get(date).unwrap_or(f64::NAN);
            out.push(SignalRow {
                date,
                ticker: ticker.clone(),
                mom_3m: at(&mom_3m),
                mom_6m: at(&mom_6m),
                mom_12m: at(&mom_12m),
                vol_12m: at(&vol_12m),
                drawdown: at(&drawdown),
                mom_pct: at(&mom_pct),
                vol_pct: at(&vol_pct),
                dd_pct: at(&dd_pct),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frame;
    use crate::features::build_market_features;
    use chrono::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn one_ticker_panel(days: usize) -> Frame {
        let start = d(2015, 1, 1);
        let series = TimeSeries::from_points(
            (0..days)
                .map(|i| {
                    let date = start + Duration::days(i as i64);
                    (date, 100.0 * (1.0_f64 + 0.0003).powi(i as i32))
                })
                .collect(),
        );
        Frame::from_series_outer(&[("SPY".to_string(), series)])
    }

    #[test]
    fn momentum_compounds_returns() {
        let ret = TimeSeries::from_points(
            (0..4)
                .map(|i| (d(2024, 1, 1) + Duration::days(30 * i), 0.01))
                .collect(),
        );
        let mom = momentum(&ret, 3);
        let last = mom.values().last().unwrap();
        assert!((last - (1.01f64.powi(3) - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn one_row_per_ticker_month() {
        let features = build_market_features(&one_ticker_panel(400));
        let rows = build_signals(&features);
        let months = features.monthly_ret.column_series("SPY").unwrap().len();
        assert_eq!(rows.len(), months);
        assert!(rows.iter().all(|r| r.ticker == "SPY"));
    }

    #[test]
    fn steady_uptrend_has_positive_momentum() {
        let features = build_market_features(&one_ticker_panel(800));
        let rows = build_signals(&features);
        let last = rows.last().unwrap();
        assert!(last.mom_12m > 0.0);
        assert!(last.mom_3m > 0.0);
    }

    #[test]
    fn percentile_columns_bounded() {
        let features = build_market_features(&one_ticker_panel(4200));
        for row in build_signals(&features) {
            for v in [row.mom_pct, row.vol_pct, row.dd_pct] {
                if v.is_finite() {
                    assert!((0.0..=100.0).contains(&v));
                }
            }
        }
    }
}
