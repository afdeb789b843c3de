//! Zero knowledge proof that a credential's index is in the accumulator, without revealing the
//! index, the witness or the non-revocation signature.
//!
//! The prover blinds the signature and witness into the commitments `E, D, A, G, W, S, U` (the
//! c list) using the randomness `rho, r, r', r'', r''', o, o'`, and proves knowledge of 14
//! scalars (the x list) satisfying 8 relations, 4 in `G1` and 4 in the target group:
//!
//! - `E = h * rho + htilde * o`
//! - `0 = E * c - h * m - htilde * t` with `m = rho * c`, `t = o * c`
//! - `e(A, h_cap) * c + e(htilde, h_cap) * r - e(htilde, y) * rho - e(htilde, h_cap) * m
//!   - e(h1, h_cap) * m2 - e(h2, h_cap) * s = e(h0 + G, h_cap) - e(A, y)`
//! - `e(htilde, accum) * r - e(g, h_cap) * r' = e(G, accum) - e(g, W) - z`
//! - `D = g * r + htilde * o'`
//! - `0 = D * r'' - g * m' - htilde * t'` with `m' = r * r''`, `t' = o' * r''`
//! - `e(pk + G, h_cap) * r'' - e(htilde, h_cap) * m' + e(htilde, S) * r = e(pk + G, S) - e(g, g_dash)`
//! - `e(htilde, u) * r - e(g, h_cap) * r''' = e(G, u) - e(g, U)`
//!
//! Every left side is linear in the x list so the responses are `x~ + c * x` and the verifier
//! recomputes the first message as `lhs(x^) - c * rhs`.
//!
//! The response for `m2` is shared with the CL part of the presentation, which checks that the
//! same credential context is used in both.

use crate::{
    error::RevocationError,
    issuance::NonRevocationCredentialSignature,
    registry::RevocationRegistry,
    setup::{CredentialRevocationPublicKey, RevocationKeyPublic},
    witness::Witness,
};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::{UniformRand, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::rand::RngCore;
use group_ops::pairing_group::{multi_pairing, Gt};
use log::trace;
use num::BigUint;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use ssi_crypto_utils::{
    challenge::{ChallengeBuilder, ChallengeContributor},
    hashing_utils::field_elem_from_biguint,
    serde_utils::ArkObjectBytes,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

const X_LIST_LEN: usize = 14;

#[serde_as]
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Debug,
    CanonicalSerialize,
    CanonicalDeserialize,
    Serialize,
    Deserialize,
    Zeroize,
)]
pub struct NonRevocProofXList<E: Pairing> {
    #[serde_as(as = "ArkObjectBytes")]
    pub rho: E::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub r: E::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub r_prime: E::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub r_prime_prime: E::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub r_prime_prime_prime: E::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub o: E::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub o_prime: E::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub m: E::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub m_prime: E::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub t: E::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub t_prime: E::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub m2: E::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub s: E::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub c: E::ScalarField,
}

impl<E: Pairing> NonRevocProofXList<E> {
    pub fn rand<R: RngCore>(rng: &mut R) -> Self {
        let mut elems = [E::ScalarField::zero(); X_LIST_LEN];
        for e in elems.iter_mut() {
            *e = E::ScalarField::rand(rng);
        }
        Self::from_array(elems)
    }

    pub fn to_array(&self) -> [E::ScalarField; X_LIST_LEN] {
        [
            self.rho,
            self.r,
            self.r_prime,
            self.r_prime_prime,
            self.r_prime_prime_prime,
            self.o,
            self.o_prime,
            self.m,
            self.m_prime,
            self.t,
            self.t_prime,
            self.m2,
            self.s,
            self.c,
        ]
    }

    pub fn from_array(a: [E::ScalarField; X_LIST_LEN]) -> Self {
        let [rho, r, r_prime, r_prime_prime, r_prime_prime_prime, o, o_prime, m, m_prime, t, t_prime, m2, s, c] = a;
        Self {
            rho,
            r,
            r_prime,
            r_prime_prime,
            r_prime_prime_prime,
            o,
            o_prime,
            m,
            m_prime,
            t,
            t_prime,
            m2,
            s,
            c,
        }
    }

    /// `self + challenge * witness`, element wise
    fn response(&self, witness: &Self, challenge: &E::ScalarField) -> Self {
        let mut resp = self.to_array();
        for (r, w) in resp.iter_mut().zip(witness.to_array()) {
            *r += w * challenge;
        }
        Self::from_array(resp)
    }
}

#[serde_as]
#[derive(
    Clone, Copy, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct NonRevocProofCList<E: Pairing> {
    #[serde_as(as = "ArkObjectBytes")]
    pub e: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub d: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub a: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub g: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub w: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub s: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub u: E::G2Affine,
}

impl<E: Pairing> NonRevocProofCList<E> {
    pub fn challenge_contribution(
        &self,
        builder: &mut ChallengeBuilder,
    ) -> Result<(), RevocationError> {
        for p in [&self.e, &self.d, &self.a, &self.g] {
            builder.add_c_elem(p)?;
        }
        for p in [&self.w, &self.s, &self.u] {
            builder.add_c_elem(p)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NonRevocProofTauList<E: Pairing> {
    pub t1: E::G1Affine,
    pub t2: E::G1Affine,
    pub t3: Gt<E>,
    pub t4: Gt<E>,
    pub t5: E::G1Affine,
    pub t6: E::G1Affine,
    pub t7: Gt<E>,
    pub t8: Gt<E>,
}

impl<E: Pairing> NonRevocProofTauList<E> {
    pub fn challenge_contribution(
        &self,
        builder: &mut ChallengeBuilder,
    ) -> Result<(), RevocationError> {
        builder.add_tau_elem(&self.t1)?;
        builder.add_tau_elem(&self.t2)?;
        builder.add_tau_elem(&self.t3)?;
        builder.add_tau_elem(&self.t4)?;
        builder.add_tau_elem(&self.t5)?;
        builder.add_tau_elem(&self.t6)?;
        builder.add_tau_elem(&self.t7)?;
        builder.add_tau_elem(&self.t8)?;
        Ok(())
    }
}

fn neg<G: AffineRepr>(p: &G) -> G {
    (-p.into_group()).into_affine()
}

/// Left sides of the relations evaluated at `x`
pub fn tau_list_values<E: Pairing>(
    pk: &CredentialRevocationPublicKey<E>,
    rev_reg: &RevocationRegistry<E>,
    x: &NonRevocProofXList<E>,
    c: &NonRevocProofCList<E>,
) -> NonRevocProofTauList<E> {
    let t1 = (pk.h * x.rho + pk.htilde * x.o).into_affine();
    let t2 = (c.e * x.c - pk.h * x.m - pk.htilde * x.t).into_affine();

    let t3_g1 = (c.a * x.c + pk.htilde * (x.r - x.m) - pk.h1 * x.m2 - pk.h2 * x.s).into_affine();
    let t3 = multi_pairing::<E>(
        [t3_g1, (pk.htilde * (-x.rho)).into_affine()],
        [pk.h_cap, pk.y],
    );

    let htilde_r = (pk.htilde * x.r).into_affine();
    let t4 = multi_pairing::<E>(
        [htilde_r, (pk.g * (-x.r_prime)).into_affine()],
        [rev_reg.accum, pk.h_cap],
    );

    let t5 = (pk.g * x.r + pk.htilde * x.o_prime).into_affine();
    let t6 = (c.d * x.r_prime_prime - pk.g * x.m_prime - pk.htilde * x.t_prime).into_affine();

    let t7_g1 = ((pk.pk + c.g) * x.r_prime_prime - pk.htilde * x.m_prime).into_affine();
    let t7 = multi_pairing::<E>([t7_g1, htilde_r], [pk.h_cap, c.s]);

    let t8 = multi_pairing::<E>(
        [htilde_r, (pk.g * (-x.r_prime_prime_prime)).into_affine()],
        [pk.u, pk.h_cap],
    );

    NonRevocProofTauList {
        t1,
        t2,
        t3,
        t4,
        t5,
        t6,
        t7,
        t8,
    }
}

/// Right sides of the relations, computable from public values and the c list
pub fn tau_list_expected_values<E: Pairing>(
    pk: &CredentialRevocationPublicKey<E>,
    rev_reg: &RevocationRegistry<E>,
    rev_key_pub: &RevocationKeyPublic<E>,
    c: &NonRevocProofCList<E>,
) -> NonRevocProofTauList<E> {
    let neg_g = neg(&pk.g);
    let pk_plus_g = (pk.pk + c.g).into_affine();
    NonRevocProofTauList {
        t1: c.e,
        t2: E::G1Affine::zero(),
        t3: multi_pairing::<E>([(pk.h0 + c.g).into_affine(), neg(&c.a)], [pk.h_cap, pk.y]),
        t4: multi_pairing::<E>([c.g, neg_g], [rev_reg.accum, c.w]) - rev_key_pub.z,
        t5: c.d,
        t6: E::G1Affine::zero(),
        t7: multi_pairing::<E>([pk_plus_g, neg_g], [c.s, pk.g_dash]),
        t8: multi_pairing::<E>([c.g, neg_g], [pk.u, c.u]),
    }
}

/// Prover's state between committing and responding
#[derive(Clone, Debug, Zeroize, ZeroizeOnDrop)]
pub struct NonRevocInitProof<E: Pairing> {
    values: NonRevocProofXList<E>,
    blindings: NonRevocProofXList<E>,
    #[zeroize(skip)]
    pub c_list: NonRevocProofCList<E>,
    #[zeroize(skip)]
    pub tau_list: NonRevocProofTauList<E>,
}

impl<E: Pairing> NonRevocInitProof<E> {
    /// Commit to an unblinded signature and a witness valid for `rev_reg`
    pub fn new<R: RngCore>(
        rng: &mut R,
        signature: &NonRevocationCredentialSignature<E>,
        witness: &Witness<E>,
        pk: &CredentialRevocationPublicKey<E>,
        rev_reg: &RevocationRegistry<E>,
    ) -> Self {
        trace!("NonRevocInitProof::new: >>> i: {}", signature.i);
        let rho = E::ScalarField::rand(rng);
        let r = E::ScalarField::rand(rng);
        let r_prime = E::ScalarField::rand(rng);
        let r_prime_prime = E::ScalarField::rand(rng);
        let r_prime_prime_prime = E::ScalarField::rand(rng);
        let o = E::ScalarField::rand(rng);
        let o_prime = E::ScalarField::rand(rng);

        let values = NonRevocProofXList {
            rho,
            r,
            r_prime,
            r_prime_prime,
            r_prime_prime_prime,
            o,
            o_prime,
            m: rho * signature.c,
            m_prime: r * r_prime_prime,
            t: o * signature.c,
            t_prime: o_prime * r_prime_prime,
            m2: signature.m2,
            s: signature.vr_prime_prime,
            c: signature.c,
        };

        let ws = &signature.witness_signature;
        let c_list = NonRevocProofCList {
            e: (pk.h * rho + pk.htilde * o).into_affine(),
            d: (pk.g * r + pk.htilde * o_prime).into_affine(),
            a: (signature.sigma + pk.htilde * rho).into_affine(),
            g: (ws.g_i + pk.htilde * r).into_affine(),
            w: (witness.omega + pk.h_cap * r_prime).into_affine(),
            s: (ws.sigma_i + pk.h_cap * r_prime_prime).into_affine(),
            u: (ws.u_i + pk.h_cap * r_prime_prime_prime).into_affine(),
        };

        let blindings = NonRevocProofXList::rand(rng);
        let tau_list = tau_list_values(pk, rev_reg, &blindings, &c_list);
        Self {
            values,
            blindings,
            c_list,
            tau_list,
        }
    }

    /// Blinding of `m2`, to be reused by the CL part of the presentation
    pub fn m2_blinding(&self) -> &E::ScalarField {
        &self.blindings.m2
    }

    pub fn finalize(&self, challenge: &BigUint) -> NonRevocProof<E> {
        let c = field_elem_from_biguint::<E::ScalarField>(challenge);
        NonRevocProof {
            x_list: self.blindings.response(&self.values, &c),
            c_list: self.c_list,
        }
    }
}

impl<E: Pairing> ChallengeContributor for NonRevocInitProof<E> {
    type Error = RevocationError;

    fn tau_contribution(&self, builder: &mut ChallengeBuilder) -> Result<(), Self::Error> {
        self.tau_list.challenge_contribution(builder)
    }

    fn c_contribution(&self, builder: &mut ChallengeBuilder) -> Result<(), Self::Error> {
        self.c_list.challenge_contribution(builder)
    }
}

#[derive(
    Clone, Copy, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
#[serde(bound = "")]
pub struct NonRevocProof<E: Pairing> {
    pub x_list: NonRevocProofXList<E>,
    pub c_list: NonRevocProofCList<E>,
}

impl<E: Pairing> NonRevocProof<E> {
    /// Recompute the prover's first message. The proof is valid if the challenge over this tau
    /// list equals `challenge`.
    pub fn verification_tau_list(
        &self,
        pk: &CredentialRevocationPublicKey<E>,
        rev_reg: &RevocationRegistry<E>,
        rev_key_pub: &RevocationKeyPublic<E>,
        challenge: &BigUint,
    ) -> NonRevocProofTauList<E> {
        let c = field_elem_from_biguint::<E::ScalarField>(challenge);
        let values = tau_list_values(pk, rev_reg, &self.x_list, &self.c_list);
        let expected = tau_list_expected_values(pk, rev_reg, rev_key_pub, &self.c_list);
        NonRevocProofTauList {
            t1: (values.t1.into_group() - expected.t1 * c).into_affine(),
            t2: (values.t2.into_group() - expected.t2 * c).into_affine(),
            t3: values.t3 - expected.t3 * c,
            t4: values.t4 - expected.t4 * c,
            t5: (values.t5.into_group() - expected.t5 * c).into_affine(),
            t6: (values.t6.into_group() - expected.t6 * c).into_affine(),
            t7: values.t7 - expected.t7 * c,
            t8: values.t8 - expected.t8 * c,
        }
    }

    /// Response for `m2`, which the CL part must match
    pub fn m2_response(&self) -> &E::ScalarField {
        &self.x_list.m2
    }
}
