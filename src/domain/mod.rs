//! Domain layer for Email Domain Stats
//!
//! Architecture: Domain Model - Pure data types for records, counts and failures
//! - Independent of where records come from or where results are written
//! - Separates record-level skips from run-level errors in the type system

pub mod records;

// Re-export main domain types for convenience
pub use records::*;
