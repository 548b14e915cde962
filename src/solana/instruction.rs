//! Parsers for the two instruction shapes the drainer matcher cares about
//!
//! Only the opcode is checked up front. Instructions with a different
//! opcode return `Ok(None)` without touching the rest of the data, so an
//! unusual-but-valid instruction never counts as a parse failure.

use bincode::Options;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction::SystemInstruction;

use crate::error::{Error, Result};

/// System program `Assign` opcode (u32, little-endian)
pub const SYSTEM_ASSIGN: u32 = 1;

/// Token program `SetAuthority` opcode
pub const TOKEN_SET_AUTHORITY: u8 = 6;

/// Parsed system `Assign`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignInstruction {
    /// New owner program for the assigned account
    pub owner: Pubkey,
}

impl AssignInstruction {
    /// Parse system instruction data, `None` if it is not an `Assign`
    pub fn parse(data: &[u8]) -> Result<Option<Self>> {
        let opcode = data
            .get(..4)
            .and_then(|bytes| bytes.try_into().ok())
            .map(u32::from_le_bytes)
            .ok_or_else(|| {
                Error::MalformedInstruction("system instruction shorter than opcode".to_string())
            })?;

        if opcode != SYSTEM_ASSIGN {
            return Ok(None);
        }

        let instruction: SystemInstruction = bincode::DefaultOptions::new()
            .with_limit(data.len() as u64)
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .deserialize(data)
            .map_err(|e| Error::MalformedInstruction(format!("assign: {}", e)))?;

        match instruction {
            SystemInstruction::Assign { owner } => Ok(Some(Self { owner })),
            _ => Err(Error::MalformedInstruction(
                "assign opcode decoded to another variant".to_string(),
            )),
        }
    }
}

/// Which authority a `SetAuthority` changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityKind {
    MintTokens,
    FreezeAccount,
    AccountOwner,
    CloseAccount,
    /// Token-2022 extension authorities
    Other(u8),
}

impl From<u8> for AuthorityKind {
    fn from(value: u8) -> Self {
        match value {
            0 => AuthorityKind::MintTokens,
            1 => AuthorityKind::FreezeAccount,
            2 => AuthorityKind::AccountOwner,
            3 => AuthorityKind::CloseAccount,
            other => AuthorityKind::Other(other),
        }
    }
}

impl std::fmt::Display for AuthorityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorityKind::MintTokens => write!(f, "mint"),
            AuthorityKind::FreezeAccount => write!(f, "freeze"),
            AuthorityKind::AccountOwner => write!(f, "account owner"),
            AuthorityKind::CloseAccount => write!(f, "close"),
            AuthorityKind::Other(tag) => write!(f, "extension #{}", tag),
        }
    }
}

/// Parsed token `SetAuthority`
///
/// Layout: `[6, authority_type, option_tag, new_authority(32)?]`, shared by
/// SPL Token and Token-2022.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetAuthorityInstruction {
    pub authority_type: AuthorityKind,
    pub new_authority: Option<Pubkey>,
}

impl SetAuthorityInstruction {
    /// Parse token instruction data, `None` if it is not a `SetAuthority`
    pub fn parse(data: &[u8]) -> Result<Option<Self>> {
        let (&opcode, rest) = data.split_first().ok_or_else(|| {
            Error::MalformedInstruction("empty token instruction".to_string())
        })?;

        if opcode != TOKEN_SET_AUTHORITY {
            return Ok(None);
        }

        let (&authority_type, rest) = rest.split_first().ok_or_else(|| {
            Error::MalformedInstruction("set_authority missing authority type".to_string())
        })?;
        let (&option_tag, rest) = rest.split_first().ok_or_else(|| {
            Error::MalformedInstruction("set_authority missing option tag".to_string())
        })?;

        let new_authority = match option_tag {
            0 => None,
            1 => {
                let bytes: [u8; 32] = rest.get(..32).and_then(|b| b.try_into().ok()).ok_or_else(
                    || Error::MalformedInstruction("set_authority pubkey truncated".to_string()),
                )?;
                Some(Pubkey::new_from_array(bytes))
            }
            tag => {
                return Err(Error::MalformedInstruction(format!(
                    "set_authority invalid option tag {}",
                    tag
                )))
            }
        };

        Ok(Some(Self {
            authority_type: AuthorityKind::from(authority_type),
            new_authority,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::system_instruction;
    use spl_token::instruction::AuthorityType;

    #[test]
    fn test_parse_assign() {
        let account = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let ix = system_instruction::assign(&account, &owner);

        let parsed = AssignInstruction::parse(&ix.data).unwrap();
        assert_eq!(parsed, Some(AssignInstruction { owner }));
    }

    #[test]
    fn test_other_system_opcodes_are_ignored() {
        let from = Pubkey::new_unique();
        let ix = system_instruction::transfer(&from, &Pubkey::new_unique(), 5);
        assert_eq!(AssignInstruction::parse(&ix.data).unwrap(), None);
    }

    #[test]
    fn test_truncated_assign_is_malformed() {
        let ix = system_instruction::assign(&Pubkey::new_unique(), &Pubkey::new_unique());
        assert!(AssignInstruction::parse(&ix.data[..20]).is_err());
        assert!(AssignInstruction::parse(&[1, 0]).is_err());
    }

    #[test]
    fn test_parse_set_authority_matches_spl_encoding() {
        let account = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let new_authority = Pubkey::new_unique();
        let ix = spl_token::instruction::set_authority(
            &spl_token::ID,
            &account,
            Some(&new_authority),
            AuthorityType::CloseAccount,
            &owner,
            &[],
        )
        .unwrap();

        let parsed = SetAuthorityInstruction::parse(&ix.data).unwrap().unwrap();
        assert_eq!(parsed.authority_type, AuthorityKind::CloseAccount);
        assert_eq!(parsed.new_authority, Some(new_authority));
    }

    #[test]
    fn test_parse_set_authority_revoke() {
        let ix = spl_token::instruction::set_authority(
            &spl_token::ID,
            &Pubkey::new_unique(),
            None,
            AuthorityType::MintTokens,
            &Pubkey::new_unique(),
            &[],
        )
        .unwrap();

        let parsed = SetAuthorityInstruction::parse(&ix.data).unwrap().unwrap();
        assert_eq!(parsed.authority_type, AuthorityKind::MintTokens);
        assert_eq!(parsed.new_authority, None);
    }

    #[test]
    fn test_set_authority_malformed() {
        assert!(SetAuthorityInstruction::parse(&[]).is_err());
        assert!(SetAuthorityInstruction::parse(&[6]).is_err());
        assert!(SetAuthorityInstruction::parse(&[6, 2, 1, 0, 0]).is_err());
        assert!(SetAuthorityInstruction::parse(&[6, 2, 9]).is_err());
        // Transfer opcode is not our concern
        assert_eq!(SetAuthorityInstruction::parse(&[3, 1, 2]).unwrap(), None);
    }

    #[test]
    fn test_authority_kind_display() {
        assert_eq!(AuthorityKind::from(3).to_string(), "close");
        assert_eq!(AuthorityKind::from(12), AuthorityKind::Other(12));
    }
}
