//! Non-revocation signature of a credential with index `i`:
//!
//! - `sigma = (h0 + h1 * m2 + Ur + g_i + h2 * vr'') * 1/(x + c)` where `Ur = h2 * vr'` is the
//!   holder's blinding commitment and `m2` the credential context,
//! - `sigma_i = g_dash * 1/(sk + gamma^i)` and `u_i = u * gamma^i` bind `g_i = g * gamma^i` to the
//!   credential definition and the registry.
//!
//! The holder adds its blinding `vr'` to `vr''` on receipt so that afterwards
//! `sigma * (x + c) = h0 + h1 * m2 + g_i + h2 * s` with `s = vr' + vr''`.

use crate::{
    error::RevocationError,
    registry::RevocationRegistry,
    setup::{
        CredentialRevocationPrivateKey, CredentialRevocationPublicKey, RevocationKeyPrivate,
        RevocationKeyPublic,
    },
    witness::Witness,
};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::{Field, UniformRand, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::rand::RngCore;
use group_ops::pairing_group::{multi_pairing, pairing};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use ssi_crypto_utils::serde_utils::ArkObjectBytes;

#[serde_as]
#[derive(
    Clone, Copy, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct WitnessSignature<E: Pairing> {
    #[serde_as(as = "ArkObjectBytes")]
    pub sigma_i: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub u_i: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub g_i: E::G1Affine,
}

#[serde_as]
#[derive(
    Clone, Copy, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
#[serde(bound = "")]
pub struct NonRevocationCredentialSignature<E: Pairing> {
    #[serde_as(as = "ArkObjectBytes")]
    pub sigma: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub c: E::ScalarField,
    /// `vr''` as issued, `s = vr' + vr''` once the holder has processed the credential
    #[serde_as(as = "ArkObjectBytes")]
    pub vr_prime_prime: E::ScalarField,
    #[serde(flatten)]
    pub witness_signature: WitnessSignature<E>,
    pub i: u32,
    #[serde_as(as = "ArkObjectBytes")]
    pub m2: E::ScalarField,
}

impl<E: Pairing> NonRevocationCredentialSignature<E> {
    pub fn new<R: RngCore>(
        rng: &mut R,
        pub_key: &CredentialRevocationPublicKey<E>,
        priv_key: &CredentialRevocationPrivateKey<E>,
        reg_priv_key: &RevocationKeyPrivate<E>,
        rev_idx: u32,
        m2: E::ScalarField,
        ur: &E::G1Affine,
    ) -> Result<Self, RevocationError> {
        let vr_prime_prime = E::ScalarField::rand(rng);
        let c = E::ScalarField::rand(rng);
        let gamma_i = reg_priv_key.gamma_pow(rev_idx);
        let g_i = (pub_key.g * gamma_i).into_affine();

        let x_plus_c_inv = (priv_key.x + c)
            .inverse()
            .ok_or(RevocationError::NotInvertible)?;
        let sigma = ((pub_key.h0.into_group()
            + pub_key.h1 * m2
            + ur
            + g_i
            + pub_key.h2 * vr_prime_prime)
            * x_plus_c_inv)
            .into_affine();

        let sk_plus_gamma_i_inv = (priv_key.sk + gamma_i)
            .inverse()
            .ok_or(RevocationError::NotInvertible)?;
        let sigma_i = (pub_key.g_dash * sk_plus_gamma_i_inv).into_affine();
        let u_i = (pub_key.u * gamma_i).into_affine();

        Ok(Self {
            sigma,
            c,
            vr_prime_prime,
            witness_signature: WitnessSignature { sigma_i, u_i, g_i },
            i: rev_idx,
            m2,
        })
    }

    pub fn g_i(&self) -> &E::G1Affine {
        &self.witness_signature.g_i
    }

    /// Fold the holder's blinding factor into `vr''`
    pub fn unblind(&mut self, vr_prime: &E::ScalarField) {
        self.vr_prime_prime += vr_prime;
    }

    /// Check an unblinded signature and the witness that came with it
    pub fn verify(
        &self,
        pub_key: &CredentialRevocationPublicKey<E>,
        rev_key_pub: &RevocationKeyPublic<E>,
        registry: &RevocationRegistry<E>,
        witness: &Witness<E>,
    ) -> Result<(), RevocationError> {
        let g_i = self.witness_signature.g_i;

        // e(sigma, y + h_cap * c) == e(h0 + h1 * m2 + h2 * s + g_i, h_cap)
        let lhs = (pub_key.y + pub_key.h_cap * self.c).into_affine();
        let rhs = (pub_key.h0.into_group()
            + pub_key.h1 * self.m2
            + pub_key.h2 * self.vr_prime_prime
            + g_i)
            .into_affine();
        let sig_ok = multi_pairing::<E>(
            [self.sigma, (-rhs.into_group()).into_affine()],
            [lhs, pub_key.h_cap],
        )
        .is_zero();

        // e(pk + g_i, sigma_i) == e(g, g_dash)
        let sigma_i_ok = pairing::<E>(
            (pub_key.pk + g_i).into_affine(),
            self.witness_signature.sigma_i,
        ) == pairing::<E>(pub_key.g, pub_key.g_dash);

        // e(g_i, u) == e(g, u_i)
        let u_i_ok =
            pairing::<E>(g_i, pub_key.u) == pairing::<E>(pub_key.g, self.witness_signature.u_i);

        if sig_ok
            && sigma_i_ok
            && u_i_ok
            && witness.is_member(&g_i, registry, pub_key, rev_key_pub)
        {
            Ok(())
        } else {
            Err(RevocationError::InvalidNonRevocationSignature)
        }
    }
}
