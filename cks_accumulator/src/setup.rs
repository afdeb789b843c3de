//! Keys for the non-revocation part of a credential definition and for a revocation registry.
//!
//! The credential definition carries generators `g, g_dash, h, h0, h1, h2, htilde, h_cap, u` and
//! the public keys `pk = g * sk` and `y = h_cap * x`. Each registry additionally has a secret
//! `gamma`; its tails are `g_dash * gamma^k` and its public key is `z = e(g, g_dash)^(gamma^(L+1))`
//! for a registry of size `L`.

use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::{Field, UniformRand};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{fmt, rand::RngCore};
use digest::Digest;
use group_ops::pairing_group::{pairing, point_from_label, random_point, Gt};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use ssi_crypto_utils::{concat_slices, serde_utils::ArkObjectBytes};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Generators of both groups. Can be derived from a public label so that nobody knows a discrete
/// log relation between them and the other generators.
#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct SetupParams<E: Pairing> {
    #[serde_as(as = "ArkObjectBytes")]
    pub g: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub g_dash: E::G2Affine,
}

impl<E: Pairing> SetupParams<E> {
    pub fn generate_using_rng<R: RngCore>(rng: &mut R) -> Self {
        Self {
            g: random_point(rng),
            g_dash: random_point(rng),
        }
    }

    /// Generate params by hashing a known string
    pub fn new<D: Digest>(label: &[u8]) -> Self {
        Self {
            g: point_from_label::<E::G1Affine, D>(&concat_slices!(label, b" : g")),
            g_dash: point_from_label::<E::G2Affine, D>(&concat_slices!(label, b" : g_dash")),
        }
    }
}

#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct CredentialRevocationPublicKey<E: Pairing> {
    #[serde_as(as = "ArkObjectBytes")]
    pub g: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub g_dash: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub h: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub h0: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub h1: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub h2: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub htilde: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub h_cap: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub u: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub pk: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub y: E::G2Affine,
}

#[serde_as]
#[derive(
    Clone,
    PartialEq,
    Eq,
    CanonicalSerialize,
    CanonicalDeserialize,
    Serialize,
    Deserialize,
    Zeroize,
    ZeroizeOnDrop,
)]
pub struct CredentialRevocationPrivateKey<E: Pairing> {
    #[serde_as(as = "ArkObjectBytes")]
    pub x: E::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub sk: E::ScalarField,
}

impl<E: Pairing> fmt::Debug for CredentialRevocationPrivateKey<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialRevocationPrivateKey(<redacted>)")
    }
}

/// Create the revocation keys of a credential definition
pub fn generate_credential_revocation_keys<R: RngCore, E: Pairing>(
    rng: &mut R,
    params: &SetupParams<E>,
) -> (
    CredentialRevocationPublicKey<E>,
    CredentialRevocationPrivateKey<E>,
) {
    let x = E::ScalarField::rand(rng);
    let sk = E::ScalarField::rand(rng);
    let h_cap = random_point::<E::G2Affine, _>(rng);
    let public = CredentialRevocationPublicKey {
        g: params.g,
        g_dash: params.g_dash,
        h: random_point(rng),
        h0: random_point(rng),
        h1: random_point(rng),
        h2: random_point(rng),
        htilde: random_point(rng),
        h_cap,
        u: random_point(rng),
        pk: (params.g * sk).into_affine(),
        y: (h_cap * x).into_affine(),
    };
    (public, CredentialRevocationPrivateKey { x, sk })
}

/// Public key of a registry
#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct RevocationKeyPublic<E: Pairing> {
    #[serde_as(as = "ArkObjectBytes")]
    pub z: Gt<E>,
}

#[serde_as]
#[derive(
    Clone,
    PartialEq,
    Eq,
    CanonicalSerialize,
    CanonicalDeserialize,
    Serialize,
    Deserialize,
    Zeroize,
    ZeroizeOnDrop,
)]
pub struct RevocationKeyPrivate<E: Pairing> {
    #[serde_as(as = "ArkObjectBytes")]
    pub gamma: E::ScalarField,
}

impl<E: Pairing> fmt::Debug for RevocationKeyPrivate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RevocationKeyPrivate(<redacted>)")
    }
}

impl<E: Pairing> RevocationKeyPrivate<E> {
    pub fn generate<R: RngCore>(rng: &mut R) -> Self {
        Self {
            gamma: E::ScalarField::rand(rng),
        }
    }

    /// `gamma^i`
    pub fn gamma_pow(&self, i: u32) -> E::ScalarField {
        self.gamma.pow([i as u64])
    }

    pub fn public_key(
        &self,
        cred_rev_pub_key: &CredentialRevocationPublicKey<E>,
        max_cred_num: u32,
    ) -> RevocationKeyPublic<E> {
        let exp = self.gamma_pow(max_cred_num + 1);
        RevocationKeyPublic {
            z: pairing::<E>(cred_rev_pub_key.g, cred_rev_pub_key.g_dash) * exp,
        }
    }
}

impl<E: Pairing> CredentialRevocationPublicKey<E> {
    /// Check that none of the generators is the identity
    pub fn is_valid(&self) -> bool {
        !(self.g.is_zero()
            || self.g_dash.is_zero()
            || self.h.is_zero()
            || self.h0.is_zero()
            || self.h1.is_zero()
            || self.h2.is_zero()
            || self.htilde.is_zero()
            || self.h_cap.is_zero()
            || self.u.is_zero()
            || self.pk.is_zero()
            || self.y.is_zero())
    }
}
