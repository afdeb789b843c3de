//! Credential offer and request.
//!
//! The holder commits to its master secret as `U = S^v' * R_ms^ms` and proves knowledge of the
//! opening with a Schnorr style proof over the issuer's offer nonce. For a revocable definition
//! the holder also sends `Ur = h2 * vr'`, the blinding of the non-revocation signature.

use crate::{
    constants::{LARGE_MVECT, LARGE_VPRIME, LARGE_VPRIME_TILDE, MASTER_SECRET},
    cred_def::{verify_key_correctness_proof, CredentialDefinition, KeyCorrectnessProof},
    error::CredentialError,
    helpers::{multi_pow, random_signed, signed, to_chunks},
    master_secret::MasterSecret,
    proof_request::generate_nonce,
};
use ark_ec::{pairing::Pairing, CurveGroup};
use ark_std::{collections::BTreeMap, fmt, rand::RngCore, vec::Vec, UniformRand};
use bignum_arith::random::random_bits;
use log::trace;
use num::{BigInt, BigUint};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use sha2::Sha256;
use ssi_crypto_utils::{hashing_utils::hash_to_biguint, serde_utils::ArkObjectBytes};

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialOffer {
    pub schema_id: String,
    pub cred_def_id: String,
    pub key_correctness_proof: KeyCorrectnessProof,
    #[serde_as(as = "DisplayFromStr")]
    pub nonce: BigUint,
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedCredentialSecrets<E: Pairing> {
    #[serde_as(as = "DisplayFromStr")]
    pub u: BigUint,
    #[serde_as(as = "Option<ArkObjectBytes>")]
    pub ur: Option<E::G1Affine>,
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedCredentialSecretsCorrectnessProof {
    #[serde_as(as = "DisplayFromStr")]
    pub c: BigUint,
    #[serde_as(as = "DisplayFromStr")]
    pub v_dash_cap: BigInt,
    #[serde_as(as = "BTreeMap<_, DisplayFromStr>")]
    pub m_caps: BTreeMap<String, BigInt>,
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CredentialRequest<E: Pairing> {
    pub prover_did: String,
    pub cred_def_id: String,
    pub blinded_ms: BlindedCredentialSecrets<E>,
    pub blinded_ms_correctness_proof: BlindedCredentialSecretsCorrectnessProof,
    /// Nonce for the issuer's signature correctness proof
    #[serde_as(as = "DisplayFromStr")]
    pub nonce: BigUint,
}

/// Blinding factors the holder needs to unblind the issued signatures
#[serde_as]
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSecretsBlindingFactors<E: Pairing> {
    #[serde_as(as = "DisplayFromStr")]
    pub v_prime: BigUint,
    #[serde_as(as = "Option<ArkObjectBytes>")]
    pub vr_prime: Option<E::ScalarField>,
}

impl<E: Pairing> fmt::Debug for CredentialSecretsBlindingFactors<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialSecretsBlindingFactors(<redacted>)")
    }
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CredentialRequestMetadata<E: Pairing> {
    pub master_secret_blinding_data: CredentialSecretsBlindingFactors<E>,
    #[serde_as(as = "DisplayFromStr")]
    pub nonce: BigUint,
    pub master_secret_name: String,
    pub prover_did: String,
}

/// Create the request for an offer after checking the offer's key correctness proof
pub fn create_credential_request<R: RngCore, E: Pairing>(
    rng: &mut R,
    prover_did: &str,
    cred_def: &CredentialDefinition<E>,
    master_secret: &MasterSecret,
    master_secret_name: &str,
    offer: &CredentialOffer,
) -> Result<(CredentialRequest<E>, CredentialRequestMetadata<E>), CredentialError> {
    trace!(
        "create_credential_request: >>> prover_did: {}, cred_def_id: {}",
        prover_did,
        offer.cred_def_id
    );
    if offer.cred_def_id != cred_def.id || offer.schema_id != cred_def.schema_id {
        return Err(CredentialError::CredentialDefinitionMismatch);
    }
    let primary = &cred_def.value.primary;
    verify_key_correctness_proof(primary, &offer.key_correctness_proof)?;

    let group = primary.group()?;
    let r_ms = primary.r_for(MASTER_SECRET)?;
    let v_prime = random_bits(rng, LARGE_VPRIME);
    let ms = signed(master_secret.value());
    let u = multi_pow(
        &group,
        &[(&primary.s, signed(&v_prime)), (r_ms, ms.clone())],
    )?;

    let (ur, vr_prime) = match cred_def.value.revocation_key() {
        Some(revocation) => {
            let vr_prime = E::ScalarField::rand(rng);
            (Some((revocation.h2 * vr_prime).into_affine()), Some(vr_prime))
        }
        None => (None, None),
    };

    let v_dash_tilde = random_signed(rng, LARGE_VPRIME_TILDE);
    let ms_tilde = random_signed(rng, LARGE_MVECT);
    let u_tilde = multi_pow(
        &group,
        &[(&primary.s, v_dash_tilde.clone()), (r_ms, ms_tilde.clone())],
    )?;
    let c = blinded_secrets_challenge(&u, &u_tilde, &offer.nonce);
    let c_signed = signed(&c);

    let proof = BlindedCredentialSecretsCorrectnessProof {
        v_dash_cap: v_dash_tilde + &c_signed * signed(&v_prime),
        m_caps: [(MASTER_SECRET.to_string(), ms_tilde + &c_signed * ms)]
            .into_iter()
            .collect(),
        c,
    };
    let nonce = generate_nonce(rng);
    let request = CredentialRequest {
        prover_did: prover_did.to_string(),
        cred_def_id: cred_def.id.clone(),
        blinded_ms: BlindedCredentialSecrets { u, ur },
        blinded_ms_correctness_proof: proof,
        nonce: nonce.clone(),
    };
    let metadata = CredentialRequestMetadata {
        master_secret_blinding_data: CredentialSecretsBlindingFactors { v_prime, vr_prime },
        nonce,
        master_secret_name: master_secret_name.to_string(),
        prover_did: prover_did.to_string(),
    };
    trace!("create_credential_request: <<<");
    Ok((request, metadata))
}

fn blinded_secrets_challenge(u: &BigUint, u_tilde: &BigUint, nonce: &BigUint) -> BigUint {
    let chunks = to_chunks(&[u, u_tilde, nonce]);
    hash_to_biguint::<Sha256>(&chunks.iter().map(|c| c.as_slice()).collect::<Vec<_>>())
}

impl<E: Pairing> CredentialRequest<E> {
    /// Issuer side check of the proof of knowledge of the blinded master secret
    pub fn verify(
        &self,
        cred_def: &CredentialDefinition<E>,
        offer: &CredentialOffer,
    ) -> Result<(), CredentialError> {
        trace!("CredentialRequest::verify: >>> prover_did: {}", self.prover_did);
        if self.cred_def_id != offer.cred_def_id || self.cred_def_id != cred_def.id {
            return Err(CredentialError::CredentialDefinitionMismatch);
        }
        let primary = &cred_def.value.primary;
        let group = primary.group()?;
        group
            .check_element(&self.blinded_ms.u)
            .map_err(|_| CredentialError::InvalidBlindedSecretProof)?;
        if cred_def.supports_revocation() && self.blinded_ms.ur.is_none() {
            return Err(CredentialError::MissingValue("ur".to_string()));
        }

        let proof = &self.blinded_ms_correctness_proof;
        let m_cap = proof
            .m_caps
            .get(MASTER_SECRET)
            .filter(|_| proof.m_caps.len() == 1)
            .ok_or(CredentialError::InvalidBlindedSecretProof)?;
        let u_tilde = multi_pow(
            &group,
            &[
                (&self.blinded_ms.u, -signed(&proof.c)),
                (&primary.s, proof.v_dash_cap.clone()),
                (primary.r_for(MASTER_SECRET)?, m_cap.clone()),
            ],
        )?;
        if blinded_secrets_challenge(&self.blinded_ms.u, &u_tilde, &offer.nonce) == proof.c {
            Ok(())
        } else {
            Err(CredentialError::InvalidBlindedSecretProof)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cred_def::{
            generate_credential_keys,
            tests::{fixture_primes, gvt_schema},
            CredentialDefinitionConfig, SignatureType,
        },
        issuer::create_credential_offer,
    };
    use ark_bls12_381::Bls12_381;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use test_utils::test_serialization;

    #[test]
    fn blinded_secrets_proof() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let schema = gvt_schema();
        let (public, _, kcp) = generate_credential_keys::<_, Bls12_381>(
            &mut rng,
            &schema,
            &fixture_primes(),
            &CredentialDefinitionConfig {
                support_revocation: true,
            },
        )
        .unwrap();
        let cred_def = CredentialDefinition {
            id: "issuer:3:CL:schema:tag".to_string(),
            schema_id: schema.id.clone(),
            signature_type: SignatureType::CL,
            tag: "tag".to_string(),
            value: public,
        };
        let offer = create_credential_offer(&mut rng, &cred_def, &kcp);
        let ms = MasterSecret::new(&mut rng);
        let (request, metadata) =
            create_credential_request(&mut rng, "prover", &cred_def, &ms, "main", &offer).unwrap();
        assert!(request.blinded_ms.ur.is_some());
        assert!(metadata.master_secret_blinding_data.vr_prime.is_some());
        assert_ne!(request.nonce, offer.nonce);
        request.verify(&cred_def, &offer).unwrap();
        test_serialization!(CredentialRequest<Bls12_381>, request);
        test_serialization!(CredentialRequestMetadata<Bls12_381>, metadata);

        // Replaying the request against another offer fails
        let other_offer = create_credential_offer(&mut rng, &cred_def, &kcp);
        assert!(matches!(
            request.verify(&cred_def, &other_offer),
            Err(CredentialError::InvalidBlindedSecretProof)
        ));

        let mut tampered = request.clone();
        tampered.blinded_ms_correctness_proof.v_dash_cap += 1;
        assert!(tampered.verify(&cred_def, &offer).is_err());

        let mut missing_ur = request.clone();
        missing_ur.blinded_ms.ur = None;
        assert!(matches!(
            missing_ur.verify(&cred_def, &offer),
            Err(CredentialError::MissingValue(_))
        ));

        // Offer for another definition
        let mut wrong = offer.clone();
        wrong.cred_def_id = "other".to_string();
        assert!(matches!(
            create_credential_request(&mut rng, "prover", &cred_def, &ms, "main", &wrong),
            Err(CredentialError::CredentialDefinitionMismatch)
        ));
        // Offer whose key correctness proof is broken
        let mut broken = offer;
        broken.key_correctness_proof.c += 1u32;
        assert!(matches!(
            create_credential_request(&mut rng, "prover", &cred_def, &ms, "main", &broken),
            Err(CredentialError::InvalidKeyCorrectnessProof)
        ));
    }
}
