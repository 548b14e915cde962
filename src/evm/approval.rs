//! ERC-20 `approve(address,uint256)` call data decoder

use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

/// `keccak256("approve(address,uint256)")[..4]`
pub const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// Selector plus two ABI words
pub const APPROVE_CALLDATA_LEN: usize = 4 + 32 + 32;

/// Allowances within this distance of `U256::MAX` count as unlimited
pub const UNLIMITED_DELTA: U256 = U256::from_limbs([0, 0, 1, 0]);

/// A decoded token approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalIntent {
    pub token_address: Address,
    pub spender: Address,
    pub amount_raw: U256,
    pub is_unlimited: bool,
}

impl ApprovalIntent {
    /// Approving zero withdraws a previous allowance
    pub fn is_revocation(&self) -> bool {
        self.amount_raw.is_zero()
    }
}

/// Decode `data` sent to `to` as an ERC-20 approval
///
/// Any other selector, or data that does not decode cleanly, is not an
/// approval.
pub fn decode_approval(to: &str, data: &str) -> Option<ApprovalIntent> {
    match try_decode(to, data) {
        Ok(intent) => intent,
        Err(e) => {
            debug!("Call data is not a well-formed approval: {}", e);
            None
        }
    }
}

fn try_decode(to: &str, data: &str) -> Result<Option<ApprovalIntent>> {
    let bytes = decode_hex(data)?;
    if bytes.len() < 4 || bytes[..4] != APPROVE_SELECTOR {
        return Ok(None);
    }
    if bytes.len() < APPROVE_CALLDATA_LEN {
        return Err(Error::InvalidEncoding(format!(
            "approve call data is {} bytes, expected {}",
            bytes.len(),
            APPROVE_CALLDATA_LEN
        )));
    }

    let token_address: Address = to
        .trim()
        .parse()
        .map_err(|e| Error::InvalidEncoding(format!("bad token address: {}", e)))?;

    let spender_word = &bytes[4..36];
    if spender_word[..12].iter().any(|b| *b != 0) {
        return Err(Error::InvalidEncoding(
            "spender word has non-zero upper bytes".to_string(),
        ));
    }
    let spender = Address::from_slice(&spender_word[12..]);

    // Trailing bytes past the two words are ignored
    let amount_raw = U256::from_be_slice(&bytes[36..68]);
    let is_unlimited = amount_raw >= U256::MAX - UNLIMITED_DELTA;

    Ok(Some(ApprovalIntent {
        token_address,
        spender,
        amount_raw,
        is_unlimited,
    }))
}

fn decode_hex(data: &str) -> Result<Vec<u8>> {
    let trimmed = data.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    Ok(hex::decode(digits)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
    const SPENDER: &str = "1111111254eeb25477b68fb85ed929f73a960582";

    fn approve_data(spender_word: &str, amount_word: &str) -> String {
        format!("0x095ea7b3{}{}", spender_word, amount_word)
    }

    fn word(value: U256) -> String {
        hex::encode(value.to_be_bytes::<32>())
    }

    fn spender_word() -> String {
        format!("{:0>64}", SPENDER)
    }

    #[test]
    fn test_max_allowance_is_unlimited() {
        let data = approve_data(&spender_word(), &"f".repeat(64));
        let intent = decode_approval(TOKEN, &data).unwrap();

        assert!(intent.is_unlimited);
        assert_eq!(intent.amount_raw, U256::MAX);
        assert_eq!(intent.spender, SPENDER.parse::<Address>().unwrap());
        assert_eq!(intent.token_address, TOKEN.parse::<Address>().unwrap());
    }

    #[test]
    fn test_small_allowance_is_limited() {
        let data = approve_data(&spender_word(), &word(U256::from(100u64)));
        let intent = decode_approval(TOKEN, &data).unwrap();

        assert!(!intent.is_unlimited);
        assert_eq!(intent.amount_raw, U256::from(100u64));
        assert!(!intent.is_revocation());
    }

    #[test]
    fn test_near_max_counts_as_unlimited() {
        let threshold = U256::MAX - UNLIMITED_DELTA;
        let data = approve_data(&spender_word(), &word(threshold));
        assert!(decode_approval(TOKEN, &data).unwrap().is_unlimited);

        let below = threshold - U256::from(1u64);
        let data = approve_data(&spender_word(), &word(below));
        assert!(!decode_approval(TOKEN, &data).unwrap().is_unlimited);
    }

    #[test]
    fn test_zero_is_revocation() {
        let data = approve_data(&spender_word(), &"0".repeat(64));
        let intent = decode_approval(TOKEN, &data).unwrap();
        assert!(intent.is_revocation());
        assert!(!intent.is_unlimited);
    }

    #[test]
    fn test_other_selector_is_not_approval() {
        let data = format!("0xa9059cbb{}{}", spender_word(), "f".repeat(64));
        assert!(decode_approval(TOKEN, &data).is_none());
    }

    #[test]
    fn test_short_or_invalid_data() {
        assert!(decode_approval(TOKEN, "").is_none());
        assert!(decode_approval(TOKEN, "0x095ea7").is_none());
        assert!(decode_approval(TOKEN, "0x095ea7b3").is_none());
        assert!(decode_approval(TOKEN, &format!("0x095ea7b3{}", spender_word())).is_none());
        assert!(decode_approval(TOKEN, "0xzz5ea7b3").is_none());
        assert!(decode_approval("not-an-address", &approve_data(&spender_word(), &"f".repeat(64))).is_none());
    }

    #[test]
    fn test_dirty_spender_word_rejected() {
        let dirty = format!("ff{:0>62}", SPENDER);
        let data = approve_data(&dirty, &"f".repeat(64));
        assert!(decode_approval(TOKEN, &data).is_none());
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let data = format!("{}deadbeef", approve_data(&spender_word(), &"f".repeat(64)));
        assert!(decode_approval(TOKEN, &data).unwrap().is_unlimited);
    }

    #[test]
    fn test_serializes_camel_case() {
        let data = approve_data(&spender_word(), &"f".repeat(64));
        let intent = decode_approval(TOKEN, &data).unwrap();
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["isUnlimited"], true);
        assert!(json.get("tokenAddress").is_some());
        assert!(json.get("amountRaw").is_some());
    }
}
