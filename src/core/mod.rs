pub mod common;
pub mod config;
pub mod indexing;
pub mod metric;
pub mod model;
pub mod search;
pub mod sort;
pub mod types;
pub use self::config::{SearchConfig, SearchConfigBuilder};
