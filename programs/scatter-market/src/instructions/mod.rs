//! Instruction handlers for the Scatter storage market

pub mod account_helpers;
pub mod bid_helpers;
pub mod constants;
pub mod defense_helpers;
pub mod lamport_transfer;
pub mod stake_helpers;
pub mod withdraw_helpers;

pub mod accept_bid;
pub mod append_records;
pub mod ban_account;
pub mod burn_stakes;
pub mod defend;
pub mod expire_challenge;
pub mod initialize_env;
pub mod initialize_ledgers;
pub mod initialize_market;
pub mod initialize_router;
pub mod pin_bid;
pub mod place_bid;
pub mod register_user;
pub mod release_stake;
pub mod set_env;
pub mod set_route;
pub mod stake_bid;
pub mod sync_params;
pub mod unban_account;
pub mod update_references;
pub mod update_writers;
pub mod validate_bid;
pub mod withdraw;
pub mod withdraw_bid;

#[allow(ambiguous_glob_reexports)]
pub use accept_bid::*;
pub use append_records::*;
#[allow(ambiguous_glob_reexports)]
pub use ban_account::*;
#[allow(ambiguous_glob_reexports)]
pub use burn_stakes::*;
#[allow(ambiguous_glob_reexports)]
pub use defend::*;
#[allow(ambiguous_glob_reexports)]
pub use expire_challenge::*;
#[allow(ambiguous_glob_reexports)]
pub use initialize_env::*;
#[allow(ambiguous_glob_reexports)]
pub use initialize_ledgers::*;
#[allow(ambiguous_glob_reexports)]
pub use initialize_market::*;
#[allow(ambiguous_glob_reexports)]
pub use initialize_router::*;
#[allow(ambiguous_glob_reexports)]
pub use pin_bid::*;
#[allow(ambiguous_glob_reexports)]
pub use place_bid::*;
#[allow(ambiguous_glob_reexports)]
pub use register_user::*;
#[allow(ambiguous_glob_reexports)]
pub use release_stake::*;
pub use set_env::*;
#[allow(ambiguous_glob_reexports)]
pub use set_route::*;
#[allow(ambiguous_glob_reexports)]
pub use stake_bid::*;
#[allow(ambiguous_glob_reexports)]
pub use sync_params::*;
#[allow(ambiguous_glob_reexports)]
pub use unban_account::*;
#[allow(ambiguous_glob_reexports)]
pub use update_references::*;
#[allow(ambiguous_glob_reexports)]
pub use update_writers::*;
#[allow(ambiguous_glob_reexports)]
pub use validate_bid::*;
#[allow(ambiguous_glob_reexports)]
pub use withdraw::*;
#[allow(ambiguous_glob_reexports)]
pub use withdraw_bid::*;
