//! # Program-Derived Addresses
//!
//! A program-derived address is `sha256(seed_0 ‖ … ‖ seed_n ‖ program_id ‖
//! "ProgramDerivedAddress")`, accepted only when the 32 bytes do *not*
//! decode as an Ed25519 point. [`find_program_address`] appends a single
//! bump byte to the caller's seeds, starting at 255 and counting down, and
//! returns the first off-curve result.
//!
//! ## Security Invariant
//!
//! An off-curve address has no private key. The only way to authorize a
//! movement out of an account it owns is to present the seeds and bump
//! that reproduce it together with the owning program id, which is what
//! [`ProgramSigner`] carries.

use solpay_core::{Address, Sha256Accumulator};

use crate::error::CryptoError;

/// Maximum number of seeds in one derivation, bump included.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed in bytes.
pub const MAX_SEED_LEN: usize = 32;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// True if the bytes decode as a point on the Ed25519 curve.
pub fn is_on_curve(address: &Address) -> bool {
    ed25519_dalek::VerifyingKey::from_bytes(address.as_bytes()).is_ok()
}

/// Hash `seeds` under `program_id` into an off-curve address.
///
/// # Errors
///
/// [`CryptoError::MaxSeedsExceeded`] or [`CryptoError::SeedTooLong`] on
/// oversized input, [`CryptoError::OnCurve`] when the hash happens to be
/// a valid point.
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<Address, CryptoError> {
    if seeds.len() > MAX_SEEDS {
        return Err(CryptoError::MaxSeedsExceeded {
            count: seeds.len(),
            max: MAX_SEEDS,
        });
    }
    let mut acc = Sha256Accumulator::new();
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(CryptoError::SeedTooLong {
                index,
                len: seed.len(),
                max: MAX_SEED_LEN,
            });
        }
        acc.update(seed);
    }
    acc.update(program_id.as_bytes()).update(PDA_MARKER);
    let candidate = Address::new(acc.finalize());
    if is_on_curve(&candidate) {
        return Err(CryptoError::OnCurve);
    }
    Ok(candidate)
}

/// Find the highest bump for which `seeds ‖ [bump]` derives an off-curve
/// address.
///
/// Deterministic: the same seeds and program id always yield the same
/// `(address, bump)` pair.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), CryptoError> {
    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);
        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(CryptoError::OnCurve) => {}
            Err(other) => return Err(other),
        }
    }
    Err(CryptoError::NoViableBump)
}

/// Proof of program authority over a derived address: the program id plus
/// the seeds (bump last) that reproduce it.
///
/// The ledger accepts a `ProgramSigner` in place of a wallet signature and
/// recomputes the address itself, so a signer with the wrong seeds or the
/// wrong program simply names a different account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSigner {
    program_id: Address,
    seeds: Vec<Vec<u8>>,
}

impl ProgramSigner {
    /// Bundle seeds and their bump under `program_id`.
    pub fn new(program_id: Address, seeds: &[&[u8]], bump: u8) -> Self {
        let mut owned: Vec<Vec<u8>> = seeds.iter().map(|s| s.to_vec()).collect();
        owned.push(vec![bump]);
        Self {
            program_id,
            seeds: owned,
        }
    }

    /// The program on whose behalf this signer acts.
    pub fn program_id(&self) -> &Address {
        &self.program_id
    }

    /// Recompute the address these seeds sign for.
    pub fn signer_address(&self) -> Result<Address, CryptoError> {
        let seeds: Vec<&[u8]> = self.seeds.iter().map(Vec::as_slice).collect();
        create_program_address(&seeds, &self.program_id)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn derived_addresses_never_on_curve(
            seed in prop::collection::vec(any::<u8>(), 0..=MAX_SEED_LEN),
            id in any::<u64>(),
        ) {
            let id_bytes = id.to_le_bytes();
            let program = Address::from_label("solpay:program");
            let (addr, bump) = find_program_address(&[seed.as_slice(), &id_bytes], &program).unwrap();
            prop_assert!(!is_on_curve(&addr));
            let again = create_program_address(&[seed.as_slice(), &id_bytes, &[bump]], &program).unwrap();
            prop_assert_eq!(again, addr);
        }
    }
}
