pub mod event;
pub mod aggregator;
pub mod source;
pub mod metadata;
pub mod resolver;
pub mod report;
pub mod store;
pub mod render;
pub mod config;
pub mod pipeline;
pub mod errors;

pub use errors::ReportError;
