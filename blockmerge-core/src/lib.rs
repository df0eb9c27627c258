pub mod aggregate;
pub mod consolidate;
pub mod error;
pub mod filter;
pub mod output;
pub mod report;
pub mod sources;
pub mod whitelist;

pub use aggregate::{
    AggregateOptions, AggregateOutcome, SourceReport, SourceReportCallback, SourceStatus,
    execute_aggregate,
};
pub use error::AggregateError;
pub use filter::DomainFilter;
pub use whitelist::Whitelist;
