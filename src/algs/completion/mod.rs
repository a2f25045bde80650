//! Two-phase exchanges (counts, then records) used to complete overlap
//! structures across ranks.

pub mod data_exchange;
pub mod size_exchange;

pub use data_exchange::exchange_records;
pub use size_exchange::{exchange_sizes, exchange_status};
