//! Risk classification and aggregation

pub mod batch;
pub mod classifier;
pub mod types;

pub use batch::fold_batch;
pub use classifier::{Classification, Evidence, RiskClassifier};
pub use types::{DecodeContext, DecodedTransaction, Intent, RiskLevel, Verdict, WireFormat};
