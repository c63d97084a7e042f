//! Grant or revoke ledger write access (ledger owner only)

use anchor_lang::prelude::*;

use super::account_helpers::{read_account, write_account};
use crate::events::WriterUpdated;
use crate::state::{BidLedger, ChallengeLedger, DefenseLedger, LedgerKind, StakeLedger};
use crate::utils::writers::WriteGuarded;

#[derive(Accounts)]
pub struct UpdateWriters<'info> {
    /// CHECK: Deserialized in the handler as the ledger type named by `kind`;
    /// owner and discriminator are checked there
    #[account(mut)]
    pub ledger: UncheckedAccount<'info>,

    pub owner: Signer<'info>,
}

fn apply<T>(info: &AccountInfo, program_id: &Pubkey, caller: &Pubkey, writer: Pubkey, grant: bool) -> Result<()>
where
    T: WriteGuarded + AccountSerialize + AccountDeserialize,
{
    let mut ledger: T = read_account(info, program_id)?;
    if grant {
        if !ledger.grant(caller, writer)? {
            msg!("Writer {} already granted", writer);
        }
    } else {
        ledger.revoke(caller, &writer)?;
    }
    write_account(info, &ledger)
}

pub fn handler(ctx: Context<UpdateWriters>, kind: LedgerKind, writer: Pubkey, grant: bool) -> Result<()> {
    let info = ctx.accounts.ledger.to_account_info();
    let caller = ctx.accounts.owner.key();

    match kind {
        LedgerKind::Bid => apply::<BidLedger>(&info, ctx.program_id, &caller, writer, grant)?,
        LedgerKind::Stake => apply::<StakeLedger>(&info, ctx.program_id, &caller, writer, grant)?,
        LedgerKind::Challenge => {
            apply::<ChallengeLedger>(&info, ctx.program_id, &caller, writer, grant)?
        }
        LedgerKind::Defense => {
            apply::<DefenseLedger>(&info, ctx.program_id, &caller, writer, grant)?
        }
    }

    emit!(WriterUpdated {
        ledger: info.key(),
        kind: kind as u8,
        writer,
        granted: grant,
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}
