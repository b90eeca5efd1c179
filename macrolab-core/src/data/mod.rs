//! Data layer: provider abstraction, series resolution, price panel loading,
//! and the TTL memoization cache.

pub mod cache;
pub mod csv_store;
pub mod prices;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod synthetic;

pub use cache::{Clock, MemoCache, SystemClock};
pub use csv_store::CsvStore;
pub use prices::{fetch_prices, PriceError, PricePanelProvider, ALLOWED_TICKERS};
pub use provider::{DataError, RetryPolicy, SeriesProvider};
pub use registry::{ProviderFlags, ProviderRegistry};
pub use resolver::{resolve, resolve_cached, AttemptStatus, LineageEntry, ResolvedSeries, SOURCE_NONE};
pub use synthetic::SyntheticProvider;
