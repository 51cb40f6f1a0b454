// Source handling: file ingestion, vendor timestamps, per-player row selection.

pub mod ingest;
pub mod select;
pub mod temporal;
