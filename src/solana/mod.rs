//! Solana transaction decoding and drainer detection

pub mod decoder;
pub mod drainer;
pub mod instruction;

pub use decoder::{DecodedInstruction, KeyRef, MessageShape, ResolvedTransaction};
pub use drainer::{AttackType, Confidence, DrainerDetection, DrainerMatcher};
