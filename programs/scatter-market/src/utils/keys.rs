//! Name hashes for router entries and config keys

use solana_keccak_hasher as keccak;

/// keccak256 of a human-readable name, as used for router and env keys
pub fn name_hash(name: &str) -> [u8; 32] {
    keccak::hash(name.as_bytes()).to_bytes()
}
