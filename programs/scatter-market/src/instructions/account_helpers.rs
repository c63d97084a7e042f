//! Raw account handling for accounts Anchor cannot declare up front.
//!
//! Bids and challenges are created only on the success path, so their
//! accounts arrive unchecked and are created here. Stake sets for MAD arrive
//! as `remaining_accounts`.

use std::collections::HashSet;

use crate::errors::MarketError;
use crate::state::StakeRecord;
use anchor_lang::prelude::*;
use anchor_lang::system_program::{self, Allocate, Assign, CreateAccount, Transfer};

/// Create a program-owned PDA of `space` bytes, funded by `payer`.
///
/// Handles targets that were pre-funded by a third party, which would make a
/// plain `create_account` fail.
pub fn create_pda_account<'info>(
    payer: &AccountInfo<'info>,
    target: &AccountInfo<'info>,
    system: &AccountInfo<'info>,
    space: usize,
    signer_seeds: &[&[u8]],
) -> Result<()> {
    let required = Rent::get()?.minimum_balance(space);
    let current = target.lamports();
    let seeds = &[signer_seeds];

    if current == 0 {
        return system_program::create_account(
            CpiContext::new_with_signer(
                system.clone(),
                CreateAccount {
                    from: payer.clone(),
                    to: target.clone(),
                },
                seeds,
            ),
            required,
            space as u64,
            &crate::ID,
        );
    }

    let top_up = required.saturating_sub(current);
    if top_up > 0 {
        system_program::transfer(
            CpiContext::new(
                system.clone(),
                Transfer {
                    from: payer.clone(),
                    to: target.clone(),
                },
            ),
            top_up,
        )?;
    }
    system_program::allocate(
        CpiContext::new_with_signer(
            system.clone(),
            Allocate {
                account_to_allocate: target.clone(),
            },
            seeds,
        ),
        space as u64,
    )?;
    system_program::assign(
        CpiContext::new_with_signer(
            system.clone(),
            Assign {
                account_to_assign: target.clone(),
            },
            seeds,
        ),
        &crate::ID,
    )
}

/// Deserialize a program-owned account, checking owner and discriminator.
pub fn read_account<T: AccountDeserialize>(info: &AccountInfo, program_id: &Pubkey) -> Result<T> {
    // Validate account ownership before deserialization
    require!(
        info.owner == program_id,
        MarketError::InvalidAccountOwner
    );
    let data = info.try_borrow_data()?;
    T::try_deserialize(&mut &**data)
}

/// Serialize `value`, discriminator included, over the account data.
pub fn write_account<T: AccountSerialize>(info: &AccountInfo, value: &T) -> Result<()> {
    let mut data = info.try_borrow_mut_data()?;
    value.try_serialize(&mut &mut data[..])
}

/// Banned accounts have a live, program-owned ban record.
pub fn is_banned(ban_record: &AccountInfo, program_id: &Pubkey) -> bool {
    ban_record.owner == program_id && !ban_record.data_is_empty()
}

/// Address of the stake record for (bid, account) under `stake_ledger`.
pub fn stake_address(
    stake_ledger: &Pubkey,
    bid_id: u64,
    account: &Pubkey,
    bump: u8,
    program_id: &Pubkey,
) -> Result<Pubkey> {
    Pubkey::create_program_address(
        &[
            b"stake",
            stake_ledger.as_ref(),
            &bid_id.to_le_bytes(),
            account.as_ref(),
            &[bump],
        ],
        program_id,
    )
    .map_err(|_| error!(MarketError::StakeBidMismatch))
}

/// Checks for duplicate keys among accounts supplied by the caller.
pub fn check_unique_keys<'a, I>(keys: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Pubkey>,
{
    let mut seen: HashSet<Pubkey> = HashSet::new();
    for key in keys {
        require!(seen.insert(*key), MarketError::InvalidStakeSet);
    }
    Ok(())
}

/// Load the stake records of `bid_id` passed as remaining accounts.
///
/// Every account must be a distinct, writable, program-owned stake record
/// at its canonical address. `exclude` is a stake the caller already holds
/// as a typed account and must not appear twice.
pub fn load_stake_set(
    remaining: &[AccountInfo],
    stake_ledger: &Pubkey,
    bid_id: u64,
    exclude: &Pubkey,
    program_id: &Pubkey,
) -> Result<Vec<StakeRecord>> {
    check_unique_keys(remaining.iter().map(|info| info.key).chain(std::iter::once(exclude)))?;

    let mut records = Vec::with_capacity(remaining.len());
    for info in remaining {
        require!(info.is_writable, MarketError::InvalidStakeSet);
        let record: StakeRecord = read_account(info, program_id)?;
        require!(record.bid_id == bid_id, MarketError::StakeBidMismatch);
        let expected = stake_address(stake_ledger, bid_id, &record.account, record.bump, program_id)?;
        require_keys_eq!(expected, *info.key, MarketError::StakeBidMismatch);
        records.push(record);
    }
    Ok(records)
}

/// Write back records loaded by [`load_stake_set`], in the same order.
pub fn store_stake_set(remaining: &[AccountInfo], records: &[StakeRecord]) -> Result<()> {
    require!(
        remaining.len() == records.len(),
        MarketError::InvalidStakeSet
    );
    for (info, record) in remaining.iter().zip(records) {
        write_account(info, record)?;
    }
    Ok(())
}
