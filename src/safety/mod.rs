//! Token-safety findings: aggregation and caching

pub mod cache;
pub mod finding;
pub mod verdict;

pub use cache::FindingsCache;
pub use finding::{FindingLevel, SafetyFinding, Verification};
pub use verdict::compute_verdict;
