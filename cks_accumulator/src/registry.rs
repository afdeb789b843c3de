//! Revocation registry: definition, accumulator value, deltas and the issuer side handle that
//! serializes issuance and revocation.
//!
//! # Examples
//!
//! ```ignore
//! let (handle, creation_delta) = RevocationRegistryHandle::create(
//!     &mut rng,
//!     "rev_reg_id",
//!     "cred_def_id",
//!     &cred_rev_pub_key,
//!     &RevocationRegistryConfig { max_cred_num: 100, issuance_type: IssuanceType::IssuanceOnDemand },
//!     &mut tails,
//!     None,
//! )?;
//!
//! let issued = handle.issue(&mut rng, &cred_rev_pub_key, &cred_rev_priv_key, &tails, &ur, |idx| m2(idx))?;
//! let revocation_delta = handle.revoke(issued.rev_idx, &tails)?;
//! let merged = creation_delta.merge(&issued.delta.unwrap())?.merge(&revocation_delta)?;
//! ```

use crate::{
    error::RevocationError,
    issuance::NonRevocationCredentialSignature,
    setup::{
        CredentialRevocationPrivateKey, CredentialRevocationPublicKey, RevocationKeyPrivate,
        RevocationKeyPublic,
    },
    tails::{accumulator_tail_index, generate_tails, TailsReader, TailsWriter},
    witness::Witness,
};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::Zero;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{
    collections::{BTreeMap, BTreeSet},
    rand::RngCore,
};
use core::sync::atomic::AtomicBool;
use log::{debug, trace};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use ssi_crypto_utils::serde_utils::ArkObjectBytes;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IssuanceType {
    /// Every index is in the accumulator from the start and issuing does not change it
    IssuanceByDefault,
    /// The accumulator starts empty and each issuance adds the index
    #[default]
    IssuanceOnDemand,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRegistryConfig {
    pub max_cred_num: u32,
    #[serde(default)]
    pub issuance_type: IssuanceType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RevocationRegistryDefinition<E: Pairing> {
    pub id: String,
    pub cred_def_id: String,
    pub max_cred_num: u32,
    pub issuance_type: IssuanceType,
    pub tails_hash: String,
    pub tails_location: String,
    pub public_keys: RevocationKeyPublic<E>,
}

impl<E: Pairing> RevocationRegistryDefinition<E> {
    pub fn check_index(&self, rev_idx: u32) -> Result<(), RevocationError> {
        check_index(self.max_cred_num, rev_idx)
    }
}

pub(crate) fn check_index(max_cred_num: u32, rev_idx: u32) -> Result<(), RevocationError> {
    if rev_idx == 0 || rev_idx > max_cred_num {
        Err(RevocationError::InvalidIndex(rev_idx))
    } else {
        Ok(())
    }
}

/// Public state of a registry at some point in time
#[serde_as]
#[derive(
    Clone, Copy, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct RevocationRegistry<E: Pairing> {
    #[serde_as(as = "ArkObjectBytes")]
    pub accum: E::G2Affine,
}

/// Change of a registry between two accumulator values. `prev_accum` is `None` for the delta
/// that starts at registry creation, in which case `issued` is the full set of accumulated
/// indices.
#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct RevocationRegistryDelta<E: Pairing> {
    #[serde_as(as = "Option<ArkObjectBytes>")]
    pub prev_accum: Option<E::G2Affine>,
    #[serde_as(as = "ArkObjectBytes")]
    pub accum: E::G2Affine,
    pub issued: BTreeSet<u32>,
    pub revoked: BTreeSet<u32>,
}

impl<E: Pairing> RevocationRegistryDelta<E> {
    /// Delta that leaves the accumulator unchanged
    pub fn unchanged(accum: E::G2Affine) -> Self {
        Self {
            prev_accum: Some(accum),
            accum,
            issued: BTreeSet::new(),
            revoked: BTreeSet::new(),
        }
    }

    /// Compose `self` followed by `next`. An index issued in one and revoked in the other
    /// cancels out.
    pub fn merge(&self, next: &Self) -> Result<Self, RevocationError> {
        if next.prev_accum != Some(self.accum) {
            return Err(RevocationError::DeltaChainMismatch);
        }
        let mut net = BTreeMap::<u32, i8>::new();
        for (set, sign) in [
            (&self.issued, 1),
            (&self.revoked, -1),
            (&next.issued, 1),
            (&next.revoked, -1),
        ] {
            for i in set {
                *net.entry(*i).or_insert(0) += sign;
            }
        }
        Ok(Self {
            prev_accum: self.prev_accum,
            accum: next.accum,
            issued: net.iter().filter(|(_, n)| **n > 0).map(|(i, _)| *i).collect(),
            revoked: net.iter().filter(|(_, n)| **n < 0).map(|(i, _)| *i).collect(),
        })
    }

    pub fn registry(&self) -> RevocationRegistry<E> {
        RevocationRegistry { accum: self.accum }
    }
}

/// Mutable state of a registry as held by its issuer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RegistryState<E: Pairing> {
    pub registry: RevocationRegistry<E>,
    /// Indices currently in the accumulator
    pub issued: BTreeSet<u32>,
    pub revoked: BTreeSet<u32>,
    /// Next index handed out on issuance, starting at 1
    pub next_index: u32,
}

/// Non-revocation part of a newly issued credential
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedNonRevocation<E: Pairing> {
    pub rev_idx: u32,
    pub signature: NonRevocationCredentialSignature<E>,
    pub witness: Witness<E>,
    /// Registry the witness is valid for
    pub registry: RevocationRegistry<E>,
    /// `None` when issuance did not change the accumulator
    pub delta: Option<RevocationRegistryDelta<E>>,
}

/// Issuer side registry. Issue, revoke and recover hold the registry lock for the whole
/// accumulator update, and a failing update leaves the state untouched.
pub struct RevocationRegistryHandle<E: Pairing> {
    definition: RevocationRegistryDefinition<E>,
    private: RevocationKeyPrivate<E>,
    state: Mutex<RegistryState<E>>,
}

impl<E: Pairing> RevocationRegistryHandle<E> {
    /// Create a registry, writing its tails. Returns the handle and the delta from nothing to the
    /// initial accumulator.
    pub fn create<R: RngCore, W: TailsWriter<E>>(
        rng: &mut R,
        id: &str,
        cred_def_id: &str,
        cred_rev_pub_key: &CredentialRevocationPublicKey<E>,
        config: &RevocationRegistryConfig,
        tails_writer: &mut W,
        cancel: Option<&AtomicBool>,
    ) -> Result<(Self, RevocationRegistryDelta<E>), RevocationError> {
        trace!(
            "RevocationRegistryHandle::create: >>> id: {}, config: {:?}",
            id,
            config
        );
        let max_cred_num = config.max_cred_num;
        if max_cred_num == 0 {
            return Err(RevocationError::RegistryFull(0));
        }
        let private = RevocationKeyPrivate::<E>::generate(rng);
        let (tails_hash, tails_location) = generate_tails(
            tails_writer,
            &cred_rev_pub_key.g_dash,
            &private,
            max_cred_num,
            cancel,
        )?;

        let (accum, issued) = match config.issuance_type {
            IssuanceType::IssuanceByDefault => {
                // Sum of tails 1..=L
                let mut exp = E::ScalarField::zero();
                let mut gamma_pow = private.gamma;
                for _ in 1..=max_cred_num {
                    exp += gamma_pow;
                    gamma_pow *= private.gamma;
                }
                (
                    (cred_rev_pub_key.g_dash * exp).into_affine(),
                    (1..=max_cred_num).collect::<BTreeSet<_>>(),
                )
            }
            IssuanceType::IssuanceOnDemand => (E::G2Affine::zero(), BTreeSet::new()),
        };

        let definition = RevocationRegistryDefinition {
            id: id.to_string(),
            cred_def_id: cred_def_id.to_string(),
            max_cred_num,
            issuance_type: config.issuance_type,
            tails_hash,
            tails_location,
            public_keys: private.public_key(cred_rev_pub_key, max_cred_num),
        };
        let delta = RevocationRegistryDelta {
            prev_accum: None,
            accum,
            issued: issued.clone(),
            revoked: BTreeSet::new(),
        };
        let state = RegistryState {
            registry: RevocationRegistry { accum },
            issued,
            revoked: BTreeSet::new(),
            next_index: 1,
        };
        debug!("Created revocation registry {}", id);
        Ok((
            Self {
                definition,
                private,
                state: Mutex::new(state),
            },
            delta,
        ))
    }

    /// Restore a handle from its persisted parts
    pub fn from_parts(
        definition: RevocationRegistryDefinition<E>,
        private: RevocationKeyPrivate<E>,
        state: RegistryState<E>,
    ) -> Self {
        Self {
            definition,
            private,
            state: Mutex::new(state),
        }
    }

    pub fn definition(&self) -> &RevocationRegistryDefinition<E> {
        &self.definition
    }

    pub fn private_key(&self) -> &RevocationKeyPrivate<E> {
        &self.private
    }

    pub fn registry(&self) -> RevocationRegistry<E> {
        self.state.lock().registry
    }

    pub fn snapshot(&self) -> RegistryState<E> {
        self.state.lock().clone()
    }

    /// Hand out the next index and sign it. `m2_for_index` gives the credential context for the
    /// index, which the signature binds.
    pub fn issue<R, T, F>(
        &self,
        rng: &mut R,
        cred_rev_pub_key: &CredentialRevocationPublicKey<E>,
        cred_rev_priv_key: &CredentialRevocationPrivateKey<E>,
        tails: &T,
        ur: &E::G1Affine,
        m2_for_index: F,
    ) -> Result<IssuedNonRevocation<E>, RevocationError>
    where
        R: RngCore,
        T: TailsReader<E>,
        F: FnOnce(u32) -> E::ScalarField,
    {
        self.issue_and_then(
            rng,
            cred_rev_pub_key,
            cred_rev_priv_key,
            tails,
            ur,
            m2_for_index,
            |_, _| Ok::<_, RevocationError>(()),
        )
        .map(|(issued, _)| issued)
    }

    /// Same as [`Self::issue`], also running `complete` with the new index while the registry is
    /// locked. The registry is only updated when `complete` succeeds, so the rest of a credential
    /// signed under the index either exists or the index is not used.
    #[allow(clippy::too_many_arguments)]
    pub fn issue_and_then<R, T, F, C, O, Er>(
        &self,
        rng: &mut R,
        cred_rev_pub_key: &CredentialRevocationPublicKey<E>,
        cred_rev_priv_key: &CredentialRevocationPrivateKey<E>,
        tails: &T,
        ur: &E::G1Affine,
        m2_for_index: F,
        complete: C,
    ) -> Result<(IssuedNonRevocation<E>, O), Er>
    where
        R: RngCore,
        T: TailsReader<E>,
        F: FnOnce(u32) -> E::ScalarField,
        C: FnOnce(&mut R, u32) -> Result<O, Er>,
        Er: From<RevocationError>,
    {
        let mut state = self.state.lock();
        let max_cred_num = self.definition.max_cred_num;
        let rev_idx = state.next_index;
        trace!("RevocationRegistryHandle::issue: >>> rev_idx: {}", rev_idx);
        if rev_idx > max_cred_num {
            return Err(RevocationError::RegistryFull(max_cred_num).into());
        }

        let (accum, issued, delta) = match self.definition.issuance_type {
            IssuanceType::IssuanceByDefault => (state.registry.accum, state.issued.clone(), None),
            IssuanceType::IssuanceOnDemand => {
                let tail = tails.read(accumulator_tail_index(max_cred_num, rev_idx))?;
                let accum = (state.registry.accum + tail).into_affine();
                let mut issued = state.issued.clone();
                issued.insert(rev_idx);
                let delta = RevocationRegistryDelta {
                    prev_accum: Some(state.registry.accum),
                    accum,
                    issued: [rev_idx].into_iter().collect(),
                    revoked: BTreeSet::new(),
                };
                (accum, issued, Some(delta))
            }
        };

        let witness = Witness::new(rev_idx, max_cred_num, &issued, tails, None)?;
        let signature = NonRevocationCredentialSignature::new(
            rng,
            cred_rev_pub_key,
            cred_rev_priv_key,
            &self.private,
            rev_idx,
            m2_for_index(rev_idx),
            ur,
        )?;
        let completed = complete(rng, rev_idx)?;

        state.registry.accum = accum;
        state.issued = issued;
        state.next_index += 1;
        debug!(
            "Issued index {} in revocation registry {}",
            rev_idx, self.definition.id
        );
        Ok((
            IssuedNonRevocation {
                rev_idx,
                signature,
                witness,
                registry: RevocationRegistry { accum },
                delta,
            },
            completed,
        ))
    }

    /// Remove an issued index from the accumulator
    pub fn revoke<T: TailsReader<E>>(
        &self,
        rev_idx: u32,
        tails: &T,
    ) -> Result<RevocationRegistryDelta<E>, RevocationError> {
        trace!("RevocationRegistryHandle::revoke: >>> rev_idx: {}", rev_idx);
        let mut state = self.state.lock();
        check_index(self.definition.max_cred_num, rev_idx)?;
        if rev_idx >= state.next_index {
            return Err(RevocationError::InvalidIndex(rev_idx));
        }
        if !state.issued.contains(&rev_idx) {
            return Err(RevocationError::AlreadyRevoked(rev_idx));
        }
        let tail = tails.read(accumulator_tail_index(
            self.definition.max_cred_num,
            rev_idx,
        ))?;
        let prev_accum = state.registry.accum;
        let accum = (prev_accum.into_group() - tail).into_affine();

        state.registry.accum = accum;
        state.issued.remove(&rev_idx);
        state.revoked.insert(rev_idx);
        debug!(
            "Revoked index {} in revocation registry {}",
            rev_idx, self.definition.id
        );
        Ok(RevocationRegistryDelta {
            prev_accum: Some(prev_accum),
            accum,
            issued: BTreeSet::new(),
            revoked: [rev_idx].into_iter().collect(),
        })
    }

    /// Put a revoked index back into the accumulator
    pub fn recover<T: TailsReader<E>>(
        &self,
        rev_idx: u32,
        tails: &T,
    ) -> Result<RevocationRegistryDelta<E>, RevocationError> {
        trace!("RevocationRegistryHandle::recover: >>> rev_idx: {}", rev_idx);
        let mut state = self.state.lock();
        check_index(self.definition.max_cred_num, rev_idx)?;
        if !state.revoked.contains(&rev_idx) {
            return Err(RevocationError::NotRevoked(rev_idx));
        }
        let tail = tails.read(accumulator_tail_index(
            self.definition.max_cred_num,
            rev_idx,
        ))?;
        let prev_accum = state.registry.accum;
        let accum = (prev_accum + tail).into_affine();

        state.registry.accum = accum;
        state.revoked.remove(&rev_idx);
        state.issued.insert(rev_idx);
        debug!(
            "Recovered index {} in revocation registry {}",
            rev_idx, self.definition.id
        );
        Ok(RevocationRegistryDelta {
            prev_accum: Some(prev_accum),
            accum,
            issued: [rev_idx].into_iter().collect(),
            revoked: BTreeSet::new(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        setup::{generate_credential_revocation_keys, SetupParams},
        tails::InMemoryTails,
    };
    use ark_bls12_381::{Bls12_381, Fr};
    use ark_ff::UniformRand;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use proptest::prelude::*;
    use test_utils::test_serialization;

    pub(crate) struct TestRegistry {
        pub public: CredentialRevocationPublicKey<Bls12_381>,
        pub private: CredentialRevocationPrivateKey<Bls12_381>,
        pub handle: RevocationRegistryHandle<Bls12_381>,
        pub tails: InMemoryTails<Bls12_381>,
        pub creation_delta: RevocationRegistryDelta<Bls12_381>,
    }

    impl TestRegistry {
        /// Issue the next index and return the holder's unblinded signature and witness
        pub fn issue(
            &self,
            rng: &mut StdRng,
            m2: Fr,
        ) -> (
            NonRevocationCredentialSignature<Bls12_381>,
            Witness<Bls12_381>,
        ) {
            let vr_prime = Fr::rand(rng);
            let ur = (self.public.h2 * vr_prime).into_affine();
            let issued = self
                .handle
                .issue(rng, &self.public, &self.private, &self.tails, &ur, |_| m2)
                .unwrap();
            let mut signature = issued.signature;
            signature.unblind(&vr_prime);
            (signature, issued.witness)
        }
    }

    pub(crate) fn setup_registry(
        rng: &mut StdRng,
        max_cred_num: u32,
        issuance_type: IssuanceType,
    ) -> TestRegistry {
        let params = SetupParams::<Bls12_381>::generate_using_rng(rng);
        let (public, private) = generate_credential_revocation_keys(rng, &params);
        let mut tails = InMemoryTails::new();
        let (handle, creation_delta) = RevocationRegistryHandle::create(
            rng,
            "rev_reg_1",
            "cred_def_1",
            &public,
            &RevocationRegistryConfig {
                max_cred_num,
                issuance_type,
            },
            &mut tails,
            None,
        )
        .unwrap();
        TestRegistry {
            public,
            private,
            handle,
            tails,
            creation_delta,
        }
    }

    /// Accumulator recomputed from scratch for a set of indices
    fn accum_for(setup: &TestRegistry, indices: &BTreeSet<u32>) -> G2Affine {
        let max = setup.handle.definition().max_cred_num;
        let mut accum = <Bls12_381 as Pairing>::G2::zero();
        for i in indices {
            accum += setup.tails.read(accumulator_tail_index(max, *i)).unwrap();
        }
        accum.into_affine()
    }

    type G2Affine = <Bls12_381 as Pairing>::G2Affine;

    #[test]
    fn issue_revoke_recover_on_demand() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let setup = setup_registry(&mut rng, 5, IssuanceType::IssuanceOnDemand);
        assert!(setup.creation_delta.prev_accum.is_none());
        assert!(setup.creation_delta.accum.is_zero());
        assert!(setup.handle.registry().accum.is_zero());
        assert_eq!(
            setup.handle.definition().tails_hash,
            setup.tails.tails_hash().unwrap()
        );

        let reg_pub = setup.handle.definition().public_keys.clone();
        let mut deltas = vec![setup.creation_delta.clone()];
        for m2 in 1..=3u64 {
            let vr_prime = Fr::rand(&mut rng);
            let ur = (setup.public.h2 * vr_prime).into_affine();
            let issued = setup
                .handle
                .issue(&mut rng, &setup.public, &setup.private, &setup.tails, &ur, |i| {
                    Fr::from(i as u64 + 100)
                })
                .unwrap();
            assert_eq!(issued.rev_idx, m2 as u32);
            assert_eq!(issued.signature.m2, Fr::from(m2 + 100));
            let delta = issued.delta.unwrap();
            assert_eq!(delta.prev_accum, Some(deltas.last().unwrap().accum));
            deltas.push(delta);
        }
        let state = setup.handle.snapshot();
        assert_eq!(state.issued, [1, 2, 3].into_iter().collect());
        assert_eq!(state.next_index, 4);
        assert_eq!(state.registry.accum, accum_for(&setup, &state.issued));
        test_serialization!(RegistryState<Bls12_381>, state);

        let revocation = setup.handle.revoke(2, &setup.tails).unwrap();
        assert_eq!(revocation.revoked, [2].into_iter().collect());
        assert!(matches!(
            setup.handle.revoke(2, &setup.tails),
            Err(RevocationError::AlreadyRevoked(2))
        ));
        // Not handed out yet
        assert!(matches!(
            setup.handle.revoke(4, &setup.tails),
            Err(RevocationError::InvalidIndex(4))
        ));
        assert!(matches!(
            setup.handle.revoke(6, &setup.tails),
            Err(RevocationError::InvalidIndex(6))
        ));
        assert!(matches!(
            setup.handle.recover(1, &setup.tails),
            Err(RevocationError::NotRevoked(1))
        ));
        let state = setup.handle.snapshot();
        assert_eq!(state.registry.accum, accum_for(&setup, &[1, 3].into_iter().collect()));
        deltas.push(revocation);

        let recovery = setup.handle.recover(2, &setup.tails).unwrap();
        deltas.push(recovery);
        let state = setup.handle.snapshot();
        assert_eq!(state.registry.accum, accum_for(&setup, &[1, 2, 3].into_iter().collect()));
        assert!(state.revoked.is_empty());

        // Merging all deltas gives the creation delta of the current state
        let merged = deltas[1..]
            .iter()
            .try_fold(deltas[0].clone(), |acc, d| acc.merge(d))
            .unwrap();
        assert!(merged.prev_accum.is_none());
        assert_eq!(merged.accum, state.registry.accum);
        assert_eq!(merged.issued, state.issued);
        assert!(merged.revoked.is_empty());
        test_serialization!(RevocationRegistryDelta<Bls12_381>, merged);
        test_serialization!(RevocationRegistryDefinition<Bls12_381>, setup.handle.definition().clone());

        // Out of order merge is rejected
        assert!(matches!(
            deltas[2].merge(&deltas[1]),
            Err(RevocationError::DeltaChainMismatch)
        ));

        for i in [1, 2, 3] {
            let witness =
                Witness::new(i, 5, &state.issued, &setup.tails, None).unwrap();
            let g_i = (setup.public.g * setup.handle.private_key().gamma_pow(i)).into_affine();
            assert!(witness.is_member(&g_i, &state.registry, &setup.public, &reg_pub));
        }
    }

    #[test]
    fn issuance_by_default_and_full_registry() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let setup = setup_registry(&mut rng, 3, IssuanceType::IssuanceByDefault);
        let all: BTreeSet<u32> = (1..=3).collect();
        assert_eq!(setup.creation_delta.issued, all);
        assert_eq!(setup.creation_delta.accum, accum_for(&setup, &all));

        let reg_pub = setup.handle.definition().public_keys.clone();
        let initial = setup.handle.registry();
        for _ in 0..3 {
            let vr_prime = Fr::rand(&mut rng);
            let ur = (setup.public.h2 * vr_prime).into_affine();
            let issued = setup
                .handle
                .issue(&mut rng, &setup.public, &setup.private, &setup.tails, &ur, |_| {
                    Fr::from(1u64)
                })
                .unwrap();
            assert!(issued.delta.is_none());
            let mut signature = issued.signature;
            signature.unblind(&vr_prime);
            signature
                .verify(&setup.public, &reg_pub, &initial, &issued.witness)
                .unwrap();
        }
        assert_eq!(setup.handle.registry(), initial);

        let vr_prime = Fr::rand(&mut rng);
        let ur = (setup.public.h2 * vr_prime).into_affine();
        assert!(matches!(
            setup
                .handle
                .issue(&mut rng, &setup.public, &setup.private, &setup.tails, &ur, |_| {
                    Fr::from(1u64)
                }),
            Err(RevocationError::RegistryFull(3))
        ));
        // Failed issuance leaves the state as it was
        assert_eq!(setup.handle.snapshot().next_index, 4);

        let mut tails = InMemoryTails::<Bls12_381>::new();
        assert!(matches!(
            RevocationRegistryHandle::create(
                &mut rng,
                "id",
                "cred_def",
                &setup.public,
                &RevocationRegistryConfig {
                    max_cred_num: 0,
                    issuance_type: IssuanceType::IssuanceOnDemand
                },
                &mut tails,
                None,
            ),
            Err(RevocationError::RegistryFull(0))
        ));

        // Restoring from parts keeps the state
        let restored = RevocationRegistryHandle::from_parts(
            setup.handle.definition().clone(),
            setup.handle.private_key().clone(),
            setup.handle.snapshot(),
        );
        assert_eq!(restored.snapshot(), setup.handle.snapshot());
    }

    #[test]
    fn failed_issuance_leaves_registry_unchanged() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let setup = setup_registry(&mut rng, 4, IssuanceType::IssuanceOnDemand);
        setup.issue(&mut rng, Fr::from(5u64));
        let before = setup.handle.snapshot();

        let vr_prime = Fr::rand(&mut rng);
        let ur = (setup.public.h2 * vr_prime).into_affine();
        let res = setup.handle.issue_and_then(
            &mut rng,
            &setup.public,
            &setup.private,
            &setup.tails,
            &ur,
            |_| Fr::from(6u64),
            |_, idx| Err::<(), _>(RevocationError::InvalidIndex(idx)),
        );
        assert!(matches!(res, Err(RevocationError::InvalidIndex(2))));
        assert_eq!(setup.handle.snapshot(), before);

        // The index is handed out again once the completion succeeds
        let (issued, idx) = setup
            .handle
            .issue_and_then(
                &mut rng,
                &setup.public,
                &setup.private,
                &setup.tails,
                &ur,
                |_| Fr::from(6u64),
                |_, idx| Ok::<_, RevocationError>(idx),
            )
            .unwrap();
        assert_eq!(issued.rev_idx, 2);
        assert_eq!(idx, 2);
        let after = setup.handle.snapshot();
        assert_eq!(after.next_index, 3);
        assert_eq!(after.issued, [1, 2].into_iter().collect());
    }

    #[test]
    fn concurrent_revocations() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let setup = setup_registry(&mut rng, 8, IssuanceType::IssuanceByDefault);
        for _ in 0..8 {
            setup.issue(&mut rng, Fr::from(3u64));
        }
        let deltas = std::thread::scope(|s| {
            let handles = (1..=8u32)
                .map(|i| {
                    let setup = &setup;
                    s.spawn(move || setup.handle.revoke(i, &setup.tails).unwrap())
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });
        assert_eq!(deltas.len(), 8);
        let state = setup.handle.snapshot();
        assert!(state.issued.is_empty());
        assert_eq!(state.revoked.len(), 8);
        assert!(state.registry.accum.is_zero());
    }

    #[derive(Clone, Debug)]
    enum Op {
        Revoke(u32),
        Recover(u32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1..=6u32).prop_map(Op::Revoke),
            (1..=6u32).prop_map(Op::Recover),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        // Merge is associative on valid chains and matches the registry state
        #[test]
        fn merge_associative(ops in proptest::collection::vec(op_strategy(), 3..10)) {
            let mut rng = StdRng::seed_from_u64(0u64);
            let setup = setup_registry(&mut rng, 6, IssuanceType::IssuanceByDefault);
            for _ in 0..6 {
                setup.issue(&mut rng, Fr::from(9u64));
            }
            let mut deltas = vec![setup.creation_delta.clone()];
            for op in ops {
                let res = match op {
                    Op::Revoke(i) => setup.handle.revoke(i, &setup.tails),
                    Op::Recover(i) => setup.handle.recover(i, &setup.tails),
                };
                if let Ok(d) = res {
                    deltas.push(d);
                }
            }
            let left = deltas[1..]
                .iter()
                .try_fold(deltas[0].clone(), |acc, d| acc.merge(d))
                .unwrap();
            for w in deltas.windows(3) {
                let outer = w[0].merge(&w[1]).unwrap().merge(&w[2]).unwrap();
                let inner = w[0].merge(&w[1].merge(&w[2]).unwrap()).unwrap();
                prop_assert_eq!(&outer, &inner);
            }

            let state = setup.handle.snapshot();
            prop_assert_eq!(left.accum, state.registry.accum);
            prop_assert_eq!(&left.issued, &state.issued);
            prop_assert!(left.revoked.is_empty());
        }
    }
}
