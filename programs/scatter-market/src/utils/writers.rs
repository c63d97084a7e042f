//! Ledger writer sets
//!
//! Every ledger carries an owner and a short list of identities allowed to
//! mutate it. The owner grants and revokes; writers append.

use anchor_lang::prelude::*;

use crate::errors::MarketError;
use crate::instructions::constants::MAX_WRITERS;

/// Owner plus the identities allowed to write to a ledger.
///
/// Only the first `len` entries of `writers` are valid; remaining slots are
/// always `Pubkey::default()`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Default, InitSpace, Debug)]
pub struct WriterSet {
    pub owner: Pubkey,
    pub writers: [Pubkey; MAX_WRITERS],
    pub len: u8,
}

impl WriterSet {
    pub const SIZE: usize = 32 + // owner
        (32 * MAX_WRITERS) + // writers
        1; // len

    pub fn new(owner: Pubkey) -> Self {
        Self {
            owner,
            ..Self::default()
        }
    }

    pub fn contains(&self, id: &Pubkey) -> bool {
        self.writers[..self.len as usize].contains(id)
    }

    /// Add `writer`. Returns `false` if it was already present.
    pub fn grant(&mut self, writer: Pubkey) -> Result<bool> {
        require!(writer != Pubkey::default(), MarketError::InvalidWriter);
        if self.contains(&writer) {
            return Ok(false);
        }
        let len = self.len as usize;
        require!(len < MAX_WRITERS, MarketError::WriterSetFull);
        self.writers[len] = writer;
        self.len = self
            .len
            .checked_add(1)
            .ok_or(MarketError::ArithmeticOverflow)?;
        Ok(true)
    }

    pub fn revoke(&mut self, writer: &Pubkey) -> Result<()> {
        let len = self.len as usize;
        let index = self.writers[..len]
            .iter()
            .position(|w| w == writer)
            .ok_or(MarketError::WriterNotFound)?;
        // Swap-remove keeps the valid prefix contiguous
        self.writers[index] = self.writers[len - 1];
        self.writers[len - 1] = Pubkey::default();
        self.len -= 1;
        Ok(())
    }
}

/// Write access control shared by every ledger account.
pub trait WriteGuarded {
    fn writer_set(&self) -> &WriterSet;

    fn writer_set_mut(&mut self) -> &mut WriterSet;

    fn owner(&self) -> Pubkey {
        self.writer_set().owner
    }

    fn is_writer(&self, id: &Pubkey) -> bool {
        self.writer_set().contains(id)
    }

    fn require_writer(&self, id: &Pubkey) -> Result<()> {
        require!(self.is_writer(id), MarketError::Unauthorized);
        Ok(())
    }

    fn require_owner(&self, id: &Pubkey) -> Result<()> {
        require_keys_eq!(self.owner(), *id, MarketError::Unauthorized);
        Ok(())
    }

    /// Owner-only. Returns `false` if `writer` already had access.
    fn grant(&mut self, caller: &Pubkey, writer: Pubkey) -> Result<bool> {
        self.require_owner(caller)?;
        self.writer_set_mut().grant(writer)
    }

    /// Owner-only.
    fn revoke(&mut self, caller: &Pubkey, writer: &Pubkey) -> Result<()> {
        self.require_owner(caller)?;
        self.writer_set_mut().revoke(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Guarded {
        set: WriterSet,
    }

    impl WriteGuarded for Guarded {
        fn writer_set(&self) -> &WriterSet {
            &self.set
        }

        fn writer_set_mut(&mut self) -> &mut WriterSet {
            &mut self.set
        }
    }

    fn guarded(owner: Pubkey) -> Guarded {
        Guarded {
            set: WriterSet::new(owner),
        }
    }

    mod grant {
        use super::*;

        #[test]
        fn test_owner_grants_writer() {
            let owner = Pubkey::new_unique();
            let writer = Pubkey::new_unique();
            let mut ledger = guarded(owner);

            assert!(!ledger.is_writer(&writer));
            assert!(ledger.grant(&owner, writer).unwrap());
            assert!(ledger.is_writer(&writer));
            assert!(ledger.require_writer(&writer).is_ok());
        }

        #[test]
        fn test_non_owner_cannot_grant() {
            let owner = Pubkey::new_unique();
            let intruder = Pubkey::new_unique();
            let mut ledger = guarded(owner);

            assert!(ledger.grant(&intruder, intruder).is_err());
            assert!(!ledger.is_writer(&intruder));
        }

        #[test]
        fn test_owner_is_not_implicitly_a_writer() {
            let owner = Pubkey::new_unique();
            let ledger = guarded(owner);
            assert!(ledger.require_writer(&owner).is_err());
        }

        #[test]
        fn test_duplicate_grant_is_noop() {
            let owner = Pubkey::new_unique();
            let writer = Pubkey::new_unique();
            let mut ledger = guarded(owner);

            assert!(ledger.grant(&owner, writer).unwrap());
            assert!(!ledger.grant(&owner, writer).unwrap());
            assert_eq!(ledger.set.len, 1);
        }

        #[test]
        fn test_default_key_rejected() {
            let owner = Pubkey::new_unique();
            let mut ledger = guarded(owner);
            assert!(ledger.grant(&owner, Pubkey::default()).is_err());
        }

        #[test]
        fn test_full_set_rejected() {
            let owner = Pubkey::new_unique();
            let mut ledger = guarded(owner);
            for _ in 0..MAX_WRITERS {
                ledger.grant(&owner, Pubkey::new_unique()).unwrap();
            }
            assert!(ledger.grant(&owner, Pubkey::new_unique()).is_err());
        }
    }

    mod revoke {
        use super::*;

        #[test]
        fn test_revoke_removes_access_and_compacts() {
            let owner = Pubkey::new_unique();
            let first = Pubkey::new_unique();
            let second = Pubkey::new_unique();
            let mut ledger = guarded(owner);
            ledger.grant(&owner, first).unwrap();
            ledger.grant(&owner, second).unwrap();

            ledger.revoke(&owner, &first).unwrap();

            assert!(!ledger.is_writer(&first));
            assert!(ledger.is_writer(&second));
            assert_eq!(ledger.set.len, 1);
            assert_eq!(ledger.set.writers[0], second);
            assert_eq!(ledger.set.writers[1], Pubkey::default());
        }

        #[test]
        fn test_revoke_missing_writer_fails() {
            let owner = Pubkey::new_unique();
            let mut ledger = guarded(owner);
            assert!(ledger.revoke(&owner, &Pubkey::new_unique()).is_err());
        }

        #[test]
        fn test_non_owner_cannot_revoke() {
            let owner = Pubkey::new_unique();
            let writer = Pubkey::new_unique();
            let mut ledger = guarded(owner);
            ledger.grant(&owner, writer).unwrap();

            assert!(ledger.revoke(&writer, &writer).is_err());
            assert!(ledger.is_writer(&writer));
        }
    }
}
