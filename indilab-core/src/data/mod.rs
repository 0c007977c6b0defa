//! Market data: providers, ingest, Parquet cache and the load policy.

pub mod cache;
pub mod ingest;
pub mod loader;
pub mod provider;
pub mod yahoo;

pub use cache::{CacheMeta, CacheStatus, CoverageResult, ParquetCache};
pub use ingest::{ingest, IngestResult};
pub use loader::{download, generate_synthetic_bars, load_bars, LoadError, LoadOptions, LoadedData};
pub use provider::{DataError, DataProvider, DataSource, FetchResult, RawBar};
pub use yahoo::YahooProvider;
