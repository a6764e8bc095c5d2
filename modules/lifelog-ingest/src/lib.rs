//! Lifelog ingestion pipeline: export adapters, the Limitless pager and the
//! partitioned record writer.

pub mod adapters;
pub mod config;
pub mod driver;
pub mod error;
pub mod limitless_api;
pub mod remote;
pub mod resume;
pub mod timestamps;
pub mod writer;
