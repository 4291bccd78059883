pub mod aggregate;
pub mod config;
pub mod error;
pub mod loader;
pub mod menu;
pub mod models;
pub mod parser;
#[cfg(feature = "plot")]
pub mod plot;
pub mod repair;
pub mod session;
pub mod stats;

pub use aggregate::{aggregate_measurements, Granularity};
pub use error::{AppError, Result};
pub use loader::{load_measurements, LoadReport, Loader};
pub use models::{Measurements, TimeVector, TimeVectorTable, ZoneReading, ZoneTable};
pub use repair::FillPolicy;
pub use stats::{summarize, StatisticsTable};
