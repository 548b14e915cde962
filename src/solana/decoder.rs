//! Solana wire-format decoder
//!
//! Turns base64 transaction bytes into a flat instruction list with every
//! program and account index resolved against the transaction's own static
//! keys. Indices that point into an address lookup table are kept as
//! [`KeyRef::LookupTable`] instead of being guessed.
//!
//! Parse order is versioned first (accepts both legacy and v0 messages),
//! then the legacy `Transaction` layout. bincode runs with a byte limit equal
//! to the payload length, so crafted length prefixes cannot drive reads past
//! the end of the buffer.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bincode::Options;
use serde::de::DeserializeOwned;
use solana_sdk::instruction::CompiledInstruction;
use solana_sdk::message::VersionedMessage;
use solana_sdk::packet::PACKET_DATA_SIZE;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::{Transaction, VersionedTransaction};
use tracing::debug;

use crate::error::{Error, Result};
use crate::risk::types::WireFormat;

/// Largest serialized transaction the network accepts
pub const MAX_TRANSACTION_SIZE: usize = PACKET_DATA_SIZE;

/// Base64 length of a [`MAX_TRANSACTION_SIZE`] payload, with padding
pub const MAX_ENCODED_SIZE: usize = MAX_TRANSACTION_SIZE.div_ceil(3) * 4;

/// A program or account reference after resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRef {
    /// Present in the transaction's static key list
    Static(Pubkey),
    /// Index past the static keys: loaded from a lookup table we have not fetched
    LookupTable { index: u8 },
}

impl KeyRef {
    pub fn as_static(&self) -> Option<&Pubkey> {
        match self {
            KeyRef::Static(key) => Some(key),
            KeyRef::LookupTable { .. } => None,
        }
    }

    /// True only for a static key equal to `key`
    pub fn is(&self, key: &Pubkey) -> bool {
        self.as_static() == Some(key)
    }
}

/// One instruction with its program and accounts resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub program: KeyRef,
    pub data: Vec<u8>,
    pub accounts: Vec<KeyRef>,
}

impl DecodedInstruction {
    /// Account at position `position` of the instruction's account list
    pub fn account(&self, position: usize) -> Result<&KeyRef> {
        self.accounts.get(position).ok_or_else(|| {
            Error::MalformedInstruction(format!(
                "expected at least {} accounts, got {}",
                position + 1,
                self.accounts.len()
            ))
        })
    }
}

/// Message shape, closed so new formats are a compile-time change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageShape {
    Legacy,
    V0 { lookup_tables: usize },
}

/// A parsed transaction ready for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTransaction {
    pub shape: MessageShape,
    pub static_keys: Vec<Pubkey>,
    pub instructions: Vec<DecodedInstruction>,
}

impl ResolvedTransaction {
    /// First static key pays the fee and always signs
    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.static_keys.first()
    }

    pub fn has_lookup_tables(&self) -> bool {
        match self.shape {
            MessageShape::Legacy => false,
            MessageShape::V0 { lookup_tables } => lookup_tables > 0,
        }
    }

    pub fn wire_format(&self) -> WireFormat {
        match self.shape {
            MessageShape::Legacy => WireFormat::Legacy,
            MessageShape::V0 { .. } => WireFormat::V0,
        }
    }
}

/// Decode a base64 transaction
pub fn parse_base64(encoded: &str) -> Result<ResolvedTransaction> {
    let encoded = encoded.trim();
    if encoded.len() > MAX_ENCODED_SIZE {
        return Err(Error::PayloadTooLarge {
            size: encoded.len(),
            limit: MAX_ENCODED_SIZE,
        });
    }

    let bytes = STANDARD.decode(encoded)?;
    parse_bytes(&bytes)
}

/// Decode raw transaction bytes
pub fn parse_bytes(bytes: &[u8]) -> Result<ResolvedTransaction> {
    if bytes.is_empty() {
        return Err(Error::MalformedTransaction("empty payload".to_string()));
    }
    if bytes.len() > MAX_TRANSACTION_SIZE {
        return Err(Error::PayloadTooLarge {
            size: bytes.len(),
            limit: MAX_TRANSACTION_SIZE,
        });
    }

    match limited_deserialize::<VersionedTransaction>(bytes) {
        Ok(tx) => return resolve_versioned(tx.message),
        Err(e) => debug!("Versioned parse failed ({}), trying legacy layout", e),
    }

    let legacy: Transaction = limited_deserialize(bytes)?;
    resolve_legacy(&legacy.message.account_keys, &legacy.message.instructions)
}

fn limited_deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::DefaultOptions::new()
        .with_limit(bytes.len() as u64)
        .with_fixint_encoding()
        .reject_trailing_bytes()
        .deserialize(bytes)
        .map_err(Error::from)
}

fn resolve_versioned(message: VersionedMessage) -> Result<ResolvedTransaction> {
    match message {
        VersionedMessage::Legacy(message) => {
            resolve_legacy(&message.account_keys, &message.instructions)
        }
        VersionedMessage::V0(message) => {
            let static_keys = message.account_keys;
            let instructions = message
                .instructions
                .iter()
                .map(|ix| resolve_v0_instruction(&static_keys, ix))
                .collect();

            Ok(ResolvedTransaction {
                shape: MessageShape::V0 {
                    lookup_tables: message.address_table_lookups.len(),
                },
                static_keys,
                instructions,
            })
        }
    }
}

fn resolve_legacy(
    account_keys: &[Pubkey],
    compiled: &[CompiledInstruction],
) -> Result<ResolvedTransaction> {
    // Legacy messages have no lookup tables, so an index past the key list is corrupt
    let lookup = |index: u8| -> Result<KeyRef> {
        account_keys
            .get(usize::from(index))
            .map(|key| KeyRef::Static(*key))
            .ok_or_else(|| {
                Error::MalformedTransaction(format!(
                    "account index {} out of range ({} keys)",
                    index,
                    account_keys.len()
                ))
            })
    };

    let mut instructions = Vec::with_capacity(compiled.len());
    for ix in compiled {
        instructions.push(DecodedInstruction {
            program: lookup(ix.program_id_index)?,
            data: ix.data.clone(),
            accounts: ix
                .accounts
                .iter()
                .map(|index| lookup(*index))
                .collect::<Result<Vec<_>>>()?,
        });
    }

    Ok(ResolvedTransaction {
        shape: MessageShape::Legacy,
        static_keys: account_keys.to_vec(),
        instructions,
    })
}

fn resolve_v0_instruction(static_keys: &[Pubkey], ix: &CompiledInstruction) -> DecodedInstruction {
    let resolve = |index: u8| match static_keys.get(usize::from(index)) {
        Some(key) => KeyRef::Static(*key),
        None => KeyRef::LookupTable { index },
    };

    DecodedInstruction {
        program: resolve(ix.program_id_index),
        data: ix.data.clone(),
        accounts: ix.accounts.iter().map(|index| resolve(*index)).collect(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Transaction builders shared by the decoder, matcher and firewall tests

    use super::*;
    use solana_sdk::hash::Hash;
    use solana_sdk::instruction::Instruction;
    use solana_sdk::message::v0::{self, MessageAddressTableLookup};
    use solana_sdk::message::{Message, MessageHeader};
    use solana_sdk::signature::Signature;

    pub fn legacy_base64(instructions: &[Instruction], payer: &Pubkey) -> String {
        let message = Message::new(instructions, Some(payer));
        let tx = Transaction::new_unsigned(message);
        STANDARD.encode(bincode::serialize(&tx).unwrap())
    }

    /// v0 transaction whose single instruction calls a program stored in a lookup table
    pub fn v0_lookup_program_base64(payer: &Pubkey, static_keys: &[Pubkey]) -> String {
        let mut account_keys = vec![*payer];
        account_keys.extend_from_slice(static_keys);
        let program_index = account_keys.len() as u8;

        let message = v0::Message {
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: static_keys.len() as u8,
            },
            account_keys,
            recent_blockhash: Hash::default(),
            instructions: vec![CompiledInstruction {
                program_id_index: program_index,
                accounts: vec![0],
                data: vec![0xe5, 0x17, 0xcb, 0x97],
            }],
            address_table_lookups: vec![MessageAddressTableLookup {
                account_key: Pubkey::new_unique(),
                writable_indexes: vec![],
                readonly_indexes: vec![3],
            }],
        };

        let tx = VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::V0(message),
        };
        STANDARD.encode(bincode::serialize(&tx).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use solana_sdk::system_instruction;

    #[test]
    fn test_parse_legacy_transfer() {
        let payer = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let encoded = legacy_base64(&[system_instruction::transfer(&payer, &to, 42)], &payer);

        let tx = parse_base64(&encoded).unwrap();
        assert_eq!(tx.shape, MessageShape::Legacy);
        assert_eq!(tx.fee_payer(), Some(&payer));
        assert_eq!(tx.instructions.len(), 1);

        let ix = &tx.instructions[0];
        assert!(ix.program.is(&solana_sdk::system_program::ID));
        assert_eq!(ix.accounts, vec![KeyRef::Static(payer), KeyRef::Static(to)]);
        assert!(!tx.has_lookup_tables());
    }

    #[test]
    fn test_parse_v0_keeps_lookup_references() {
        let payer = Pubkey::new_unique();
        let encoded = v0_lookup_program_base64(&payer, &[]);

        let tx = parse_base64(&encoded).unwrap();
        assert_eq!(tx.shape, MessageShape::V0 { lookup_tables: 1 });
        assert!(tx.has_lookup_tables());
        assert_eq!(tx.instructions[0].program, KeyRef::LookupTable { index: 1 });
        assert_eq!(tx.instructions[0].accounts, vec![KeyRef::Static(payer)]);
    }

    #[test]
    fn test_rejects_bad_base64() {
        let err = parse_base64("not base64 at all!!").unwrap_err();
        assert!(matches!(err, Error::InvalidEncoding(_)));
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let payer = Pubkey::new_unique();
        let encoded = legacy_base64(
            &[system_instruction::transfer(&payer, &Pubkey::new_unique(), 1)],
            &payer,
        );
        let mut bytes = STANDARD.decode(encoded).unwrap();
        bytes.truncate(bytes.len() - 10);

        assert!(parse_bytes(&bytes).is_err());
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let payer = Pubkey::new_unique();
        let encoded = legacy_base64(
            &[system_instruction::transfer(&payer, &Pubkey::new_unique(), 1)],
            &payer,
        );
        let mut bytes = STANDARD.decode(encoded).unwrap();
        bytes.extend_from_slice(&[0u8; 4]);

        assert!(parse_bytes(&bytes).is_err());
    }

    #[test]
    fn test_rejects_oversized_payload() {
        let bytes = vec![1u8; MAX_TRANSACTION_SIZE + 1];
        assert!(matches!(
            parse_bytes(&bytes),
            Err(Error::PayloadTooLarge { .. })
        ));

        let encoded = "A".repeat(MAX_ENCODED_SIZE + 4);
        assert!(matches!(
            parse_base64(&encoded),
            Err(Error::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_crafted_length_prefix_is_clamped() {
        // One signature, then a message claiming 0x7f7f instructions with nothing behind it
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&[0u8; 64]);
        bytes.extend_from_slice(&[1, 0, 0, 1]);
        bytes.extend_from_slice(&[7u8; 32]);
        bytes.extend_from_slice(&[0u8; 32]);
        bytes.extend_from_slice(&[0xff, 0xff, 0x01]);

        assert!(parse_bytes(&bytes).is_err());
    }

    #[test]
    fn test_legacy_out_of_range_index_is_malformed() {
        let keys = vec![Pubkey::new_unique()];
        let compiled = vec![CompiledInstruction {
            program_id_index: 4,
            accounts: vec![],
            data: vec![],
        }];
        assert!(resolve_legacy(&keys, &compiled).is_err());
    }

    #[test]
    fn test_instruction_account_accessor() {
        let ix = DecodedInstruction {
            program: KeyRef::Static(Pubkey::new_unique()),
            data: vec![],
            accounts: vec![KeyRef::LookupTable { index: 9 }],
        };
        assert!(ix.account(0).unwrap().as_static().is_none());
        assert!(matches!(ix.account(1), Err(Error::MalformedInstruction(_))));
    }
}
