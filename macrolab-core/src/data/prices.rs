//! Market price panel loading and the allowed-asset boundary.
//!
//! The allowed-ticker registry is a safety boundary, not a quality heuristic:
//! any request naming a ticker outside it fails fast, before a single
//! provider call is made.

use chrono::NaiveDate;
use thiserror::Error;

use super::provider::{DataError, SeriesProvider};
use crate::domain::{Frame, TimeSeries};

/// Fixed set of permitted tickers.
pub const ALLOWED_TICKERS: &[&str] = &[
    "SPY", "VGK", "EWJ", "IEMG", "MCHI", "XLK", "XLF", "XLI", "XLV", "XLP", "XLU", "XLE", "XLB",
    "XLY", "XLRE", "XLC", "QUAL", "MTUM", "USMV", "VLUE", "VUG", "TLT", "IEF", "LQD", "HYG",
    "GLD", "^STOXX", "^GDAXI", "^FCHI", "^IBEX", "^FTSE", "FTSEMIB.MI", "^GSPC", "^IXIC", "^DJI",
    "^RUT", "^N225", "^HSI", "IVE", "IVW", "CV9.PA", "CG9.PA", "ESIF.L", "EXV6.DE", "HLTH.L",
    "ESIE.F", "ESIS.F", "ESIN.L", "EXV3.DE", "ESIC.F", "EXV1.DE", "EXH6.DE", "EXH9.DE",
    "EURUSD=X", "EURGBP=X", "EURJPY=X", "USDJPY=X", "GBPUSD=X", "USDCHF=X", "GC=F", "SI=F",
    "BZ=F", "CL=F", "NG=F", "HG=F", "EM13.MI", "CBE7.AS", "LYXD.DE", "IEAC.L", "IHYG.L", "SHY",
    "IEI",
];

/// Whether a ticker is inside the permitted universe.
pub fn is_allowed(ticker: &str) -> bool {
    ALLOWED_TICKERS.contains(&ticker)
}

/// Tickers from `requested` that fall outside the permitted universe.
pub fn forbidden_tickers<'a>(requested: &'a [String]) -> Vec<&'a str> {
    requested
        .iter()
        .map(|t| t.as_str())
        .filter(|t| !is_allowed(t))
        .collect()
}

/// Human-readable label for well-known tickers; falls back to the symbol.
pub fn display_name(ticker: &str) -> &str {
    match ticker {
        "SPY" => "SPDR S&P 500 ETF",
        "VGK" => "Vanguard FTSE Europe ETF",
        "EWJ" => "iShares MSCI Japan ETF",
        "IEMG" => "iShares Core MSCI EM ETF",
        "TLT" => "iShares 20+ Year Treasury Bond ETF",
        "IEF" => "iShares 7-10 Year Treasury ETF",
        "LQD" => "iShares iBoxx $ Investment Grade Corporate Bond ETF",
        "HYG" => "iShares iBoxx $ High Yield Corporate Bond ETF",
        "GLD" => "SPDR Gold Shares",
        "^GSPC" => "S&P 500 Index",
        "^STOXX" => "STOXX Europe 600 Index",
        "^GDAXI" => "DAX Index",
        "IVE" => "iShares S&P 500 Value ETF",
        "IVW" => "iShares S&P 500 Growth ETF",
        "CV9.PA" => "Amundi MSCI Europe Value",
        "CG9.PA" => "Amundi MSCI Europe Growth",
        "BZ=F" => "Brent Crude Futures",
        "CL=F" => "WTI Crude Futures",
        "GC=F" => "Gold Futures",
        other => other,
    }
}

#[derive(Debug, Error)]
pub enum PriceError {
    /// Hard validation failure at the ingestion boundary — aborts the run.
    #[error("forbidden tickers: {0:?}")]
    ForbiddenTickers(Vec<String>),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Source of per-ticker price series.
pub trait PricePanelProvider: Send + Sync {
    fn fetch_series(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries, DataError>;
}

/// Any series provider can serve as a price panel source: tickers are its
/// series ids.
impl<T: SeriesProvider> PricePanelProvider for T {
    fn fetch_series(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries, DataError> {
        self.fetch(ticker, start, end)
    }
}

/// Fetch a price panel for the requested tickers.
///
/// Validates every ticker against the allowed registry first; a single
/// forbidden ticker aborts with no provider call made. Tickers with no data
/// come back as all-NaN columns.
pub fn fetch_prices(
    provider: &dyn PricePanelProvider,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Frame, PriceError> {
    let forbidden = forbidden_tickers(tickers);
    if !forbidden.is_empty() {
        return Err(PriceError::ForbiddenTickers(
            forbidden.into_iter().map(String::from).collect(),
        ));
    }
    let mut columns = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let series = provider.fetch_series(ticker, start, end)?;
        columns.push((ticker.clone(), series));
    }
    Ok(Frame::from_series_outer(&columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::SyntheticProvider;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    struct CountingProvider(AtomicU32);

    impl SeriesProvider for CountingProvider {
        fn name(&self) -> &str {
            "COUNT"
        }

        fn fetch(
            &self,
            _series_id: &str,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<TimeSeries, DataError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(TimeSeries::from_points(vec![(start, 1.0)]))
        }
    }

    #[test]
    fn forbidden_ticker_aborts_before_any_fetch() {
        let provider = CountingProvider(AtomicU32::new(0));
        let tickers = vec!["SPY".to_string(), "EVIL".to_string()];
        let out = fetch_prices(&provider, &tickers, d(2020, 1, 1), d(2024, 1, 1));
        assert!(matches!(out, Err(PriceError::ForbiddenTickers(ref t)) if t == &["EVIL"]));
        assert_eq!(provider.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn allowed_tickers_build_a_panel() {
        let provider = SyntheticProvider::new("SYN");
        let tickers = vec!["SPY".to_string(), "TLT".to_string(), "GLD".to_string()];
        let panel = fetch_prices(&provider, &tickers, d(2020, 1, 1), d(2023, 12, 31)).unwrap();
        assert_eq!(panel.ncols(), 3);
        assert!(panel.nrows() > 0);
        assert!(panel.has_column("SPY"));
    }

    #[test]
    fn registry_membership() {
        assert!(is_allowed("SPY"));
        assert!(is_allowed("^GSPC"));
        assert!(!is_allowed("DOGE"));
    }
}
