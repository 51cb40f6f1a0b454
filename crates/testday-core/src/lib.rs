// Library root: athletic-testing CSV exports in, normalized player report out.
//
// Flow per run: config -> sources (ingest, select) -> metrics -> scoring ->
// report. `pipeline::build_report` drives the whole batch.

pub mod config;
pub mod metrics;
pub mod names;
pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod sources;

pub use config::{load_config, ConfigError, MappingConfig};
pub use pipeline::{build_report, ReportError};
pub use report::{Clock, FixedClock, Report, SystemClock};
