//! EVM call data decoding

pub mod approval;

pub use approval::{decode_approval, ApprovalIntent, APPROVE_SELECTOR};
