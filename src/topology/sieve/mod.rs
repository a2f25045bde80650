pub mod in_memory;
pub mod mutable;
pub mod sieve_trait;
pub mod strata;

// Re-export the core traits and in‐memory impl at top level
pub use in_memory::InMemorySieve;
pub use mutable::MutableSieve;
pub use sieve_trait::Sieve;
pub use strata::StrataCache;
