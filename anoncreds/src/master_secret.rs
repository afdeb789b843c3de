//! The holder's master secret, a hidden attribute of every credential the holder obtains. Proofs
//! over several credentials show that they share it.

use crate::{constants::LARGE_MASTER_SECRET, error::CredentialError};
use ark_std::{fmt, rand::RngCore};
use bignum_arith::random::random_bits;
use did_keys::{Tags, WalletStore};
use log::debug;
use num::BigUint;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

pub const MASTER_SECRET_RECORD_TYPE: &str = "anoncreds::MasterSecret";

#[serde_as]
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterSecret {
    #[serde_as(as = "DisplayFromStr")]
    ms: BigUint,
}

impl MasterSecret {
    pub fn new<R: RngCore>(rng: &mut R) -> Self {
        Self {
            ms: random_bits(rng, LARGE_MASTER_SECRET),
        }
    }

    pub fn value(&self) -> &BigUint {
        &self.ms
    }
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterSecret(<redacted>)")
    }
}

/// Create a master secret and store it under `name`. Fails if the name is taken.
pub fn create_master_secret<R: RngCore, W: WalletStore>(
    rng: &mut R,
    wallet: &W,
    name: &str,
) -> Result<(), CredentialError> {
    let secret = MasterSecret::new(rng);
    wallet.put_json(MASTER_SECRET_RECORD_TYPE, name, &secret, &Tags::new())?;
    debug!("Created master secret {}", name);
    Ok(())
}

pub fn get_master_secret<W: WalletStore>(
    wallet: &W,
    name: &str,
) -> Result<MasterSecret, CredentialError> {
    Ok(wallet.get_json(MASTER_SECRET_RECORD_TYPE, name)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use did_keys::{InMemoryWallet, WalletError};
    use test_utils::test_serialization;

    #[test]
    fn stored_by_name() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let wallet = InMemoryWallet::new();
        create_master_secret(&mut rng, &wallet, "main").unwrap();
        let ms = get_master_secret(&wallet, "main").unwrap();
        assert!(ms.value().bits() <= LARGE_MASTER_SECRET);
        assert_eq!(format!("{:?}", ms), "MasterSecret(<redacted>)");
        test_serialization!(MasterSecret, ms);

        assert!(matches!(
            create_master_secret(&mut rng, &wallet, "main"),
            Err(CredentialError::Wallet(WalletError::AlreadyExists(..)))
        ));
        assert!(matches!(
            get_master_secret(&wallet, "other"),
            Err(CredentialError::Wallet(WalletError::ItemNotFound(..)))
        ));
    }
}
