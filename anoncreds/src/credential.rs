//! Issued credentials: the CL signature over the attribute values and the holder's blinded
//! master secret, the issuer's proof that the signature was computed with the private key, and
//! the optional non-revocation signature and witness.
//!
//! With `Q = Z / (S^v * R_ms^ms * R_ctxt^m2 * prod R_i^m_i)` a signature `(A, e, v)` satisfies
//! `A^e = Q mod n`. The issuer only sees `U = S^v' * R_ms^ms` and picks `v''`, the holder adds the
//! two parts to get `v = v' + v''`.

use crate::{
    constants::{LARGE_E_END_RANGE, LARGE_E_START, LARGE_VPRIME_PRIME, MASTER_SECRET},
    cred_def::{
        CredentialDefinition, CredentialPrimaryPrivateKey, CredentialPrimaryPublicKey,
    },
    encoding::{encode_attribute, encoded_to_message, is_encoding_of},
    error::CredentialError,
    helpers::{multi_pow, signed, to_chunks},
    master_secret::MasterSecret,
    request::CredentialRequestMetadata,
};
use ark_ec::pairing::Pairing;
use ark_std::{collections::BTreeMap, rand::RngCore, vec::Vec};
use bignum_arith::{
    modular::{mod_inverse, mod_mul, mod_sub},
    primes::{generate_prime_in_range, is_prime, DEFAULT_MILLER_RABIN_ROUNDS},
    random::{random_below, random_bits_exact},
};
use cks_accumulator::{
    issuance::NonRevocationCredentialSignature,
    registry::{RevocationRegistry, RevocationRegistryDefinition},
    witness::Witness,
};
use group_ops::rsa_group::RsaGroup;
use log::{debug, trace};
use num::{BigInt, BigUint, One};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use sha2::Sha256;
use ssi_crypto_utils::hashing_utils::{field_elem_from_biguint, hash_to_biguint};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialValue {
    pub raw: String,
    pub encoded: String,
}

impl CredentialValue {
    /// Value with its canonical encoding
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            encoded: encode_attribute(raw),
        }
    }
}

pub type CredentialValues = BTreeMap<String, CredentialValue>;

/// Encode raw values given as `(attribute, raw)` pairs
pub fn credential_values<'a>(raw: impl IntoIterator<Item = (&'a str, &'a str)>) -> CredentialValues {
    raw.into_iter()
        .map(|(attr, value)| (attr.to_string(), CredentialValue::new(value)))
        .collect()
}

/// Messages signed for each schema attribute. The values must cover exactly the attributes of
/// the key and every encoding must be the canonical one.
pub fn messages_for(
    primary: &CredentialPrimaryPublicKey,
    values: &CredentialValues,
) -> Result<BTreeMap<String, BigInt>, CredentialError> {
    if !values.keys().map(|k| k.as_str()).eq(primary.attributes()) {
        return Err(CredentialError::SchemaMismatch(format!(
            "got values for {:?}",
            values.keys().collect::<Vec<_>>()
        )));
    }
    values
        .iter()
        .map(|(attr, value)| {
            if !is_encoding_of(&value.raw, &value.encoded) {
                return Err(CredentialError::EncodingMismatch(attr.clone()));
            }
            let m = encoded_to_message(&value.encoded)
                .ok_or_else(|| CredentialError::EncodingMismatch(attr.clone()))?;
            Ok((attr.clone(), m))
        })
        .collect()
}

/// Credential context binding a credential to its holder and revocation index. Credentials
/// without an index use `-1`.
pub fn credential_context(prover_did: &str, rev_idx: Option<u32>) -> BigUint {
    let idx = rev_idx.map_or_else(|| "-1".to_string(), |i| i.to_string());
    let did = encode_attribute(prover_did);
    let idx = encode_attribute(&idx);
    hash_to_biguint::<Sha256>(&[did.as_bytes(), idx.as_bytes()])
}

pub fn credential_context_scalar<E: Pairing>(m2: &BigUint) -> E::ScalarField {
    field_elem_from_biguint::<E::ScalarField>(m2)
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryCredentialSignature {
    #[serde_as(as = "DisplayFromStr")]
    pub m_2: BigUint,
    #[serde_as(as = "DisplayFromStr")]
    pub a: BigUint,
    #[serde_as(as = "DisplayFromStr")]
    pub e: BigUint,
    #[serde_as(as = "DisplayFromStr")]
    pub v: BigUint,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CredentialSignature<E: Pairing> {
    pub p_credential: PrimaryCredentialSignature,
    pub r_credential: Option<NonRevocationCredentialSignature<E>>,
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureCorrectnessProof {
    #[serde_as(as = "DisplayFromStr")]
    pub se: BigUint,
    #[serde_as(as = "DisplayFromStr")]
    pub c: BigUint,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Credential<E: Pairing> {
    pub schema_id: String,
    pub cred_def_id: String,
    pub rev_reg_id: Option<String>,
    pub values: CredentialValues,
    pub signature: CredentialSignature<E>,
    pub signature_correctness_proof: SignatureCorrectnessProof,
    pub rev_reg: Option<RevocationRegistry<E>>,
    pub witness: Option<Witness<E>>,
}

impl<E: Pairing> Credential<E> {
    /// Index in the revocation registry, if the credential is revocable
    pub fn rev_idx(&self) -> Option<u32> {
        self.signature.r_credential.as_ref().map(|r| r.i)
    }
}

/// `Z / prod bases^exps`
fn signed_quotient(
    group: &RsaGroup,
    z: &BigUint,
    pairs: &[(&BigUint, BigInt)],
) -> Result<BigUint, CredentialError> {
    Ok(group.div(z, &multi_pow(group, pairs)?)?)
}

fn signature_correctness_challenge(
    q: &BigUint,
    a: &BigUint,
    a_tilde: &BigUint,
    nonce: &BigUint,
) -> BigUint {
    let chunks = to_chunks(&[q, a, a_tilde, nonce]);
    hash_to_biguint::<Sha256>(&chunks.iter().map(|c| c.as_slice()).collect::<Vec<_>>())
}

/// Issuer side: sign the blinded master secret `u` together with the messages and prove the
/// signature correct over the holder's `nonce`. The returned signature carries `v''`.
pub(crate) fn sign_primary<R: RngCore>(
    rng: &mut R,
    public: &CredentialPrimaryPublicKey,
    private: &CredentialPrimaryPrivateKey,
    u: &BigUint,
    messages: &BTreeMap<String, BigInt>,
    m2: &BigUint,
    nonce: &BigUint,
) -> Result<(PrimaryCredentialSignature, SignatureCorrectnessProof), CredentialError> {
    trace!("sign_primary: >>> messages: {}", messages.len());
    let group = public.group()?;
    let order = private.order();

    let v_prime_prime = random_bits_exact(rng, LARGE_VPRIME_PRIME);
    let e_start = BigUint::one() << LARGE_E_START;
    let e_range = BigUint::one() << LARGE_E_END_RANGE;
    let e = generate_prime_in_range(rng, &e_start, &e_range)?;

    let mut pairs = vec![
        (u, BigInt::one()),
        (&public.s, signed(&v_prime_prime)),
        (&public.rctxt, signed(m2)),
    ];
    for (attr, m) in messages {
        pairs.push((public.r_for(attr)?, m.clone()));
    }
    let q = signed_quotient(&group, &public.z, &pairs)?;
    let e_inverse = mod_inverse(&e, &order)?;
    let a = group.pow_u(&q, &e_inverse)?;

    let r = random_below(rng, &order)?;
    let a_tilde = group.pow_u(&q, &r)?;
    let c = signature_correctness_challenge(&q, &a, &a_tilde, nonce);
    let se = mod_sub(&r, &mod_mul(&c, &e_inverse, &order)?, &order)?;

    Ok((
        PrimaryCredentialSignature {
            m_2: m2.clone(),
            a,
            e,
            v: v_prime_prime,
        },
        SignatureCorrectnessProof { se, c },
    ))
}

/// `Q` for a complete primary signature held by the holder
fn holder_q(
    public: &CredentialPrimaryPublicKey,
    signature: &PrimaryCredentialSignature,
    master_secret: &BigUint,
    messages: &BTreeMap<String, BigInt>,
) -> Result<BigUint, CredentialError> {
    let group = public.group()?;
    let mut pairs = vec![
        (&public.s, signed(&signature.v)),
        (public.r_for(MASTER_SECRET)?, signed(master_secret)),
        (&public.rctxt, signed(&signature.m_2)),
    ];
    for (attr, m) in messages {
        pairs.push((public.r_for(attr)?, m.clone()));
    }
    signed_quotient(&group, &public.z, &pairs)
}

fn check_primary_signature<R: RngCore>(
    rng: &mut R,
    public: &CredentialPrimaryPublicKey,
    signature: &PrimaryCredentialSignature,
    proof: &SignatureCorrectnessProof,
    master_secret: &BigUint,
    messages: &BTreeMap<String, BigInt>,
    nonce: &BigUint,
) -> Result<(), CredentialError> {
    let group = public.group()?;
    let e_start = BigUint::one() << LARGE_E_START;
    let e_end = &e_start + (BigUint::one() << LARGE_E_END_RANGE);
    if signature.e < e_start
        || signature.e >= e_end
        || !is_prime(rng, &signature.e, DEFAULT_MILLER_RABIN_ROUNDS)
        || !group.is_element(&signature.a)
    {
        return Err(CredentialError::InvalidSignature);
    }
    let q = holder_q(public, signature, master_secret, messages)?;
    if group.pow_u(&signature.a, &signature.e)? != q {
        return Err(CredentialError::InvalidSignature);
    }
    // A^(c + se * e) = Q^r
    let a_tilde = group.pow_u(&signature.a, &(&proof.c + &proof.se * &signature.e))?;
    if signature_correctness_challenge(&q, &signature.a, &a_tilde, nonce) != proof.c {
        return Err(CredentialError::InvalidSignatureCorrectnessProof);
    }
    Ok(())
}

/// Holder side: unblind the signatures of a received credential and check them, the signature
/// correctness proof and, for a revocable credential, the witness against the registry the
/// credential came with.
pub fn process_credential<R: RngCore, E: Pairing>(
    rng: &mut R,
    credential: &mut Credential<E>,
    metadata: &CredentialRequestMetadata<E>,
    master_secret: &MasterSecret,
    cred_def: &CredentialDefinition<E>,
    rev_reg_def: Option<&RevocationRegistryDefinition<E>>,
) -> Result<(), CredentialError> {
    trace!(
        "process_credential: >>> cred_def_id: {}, rev_reg_id: {:?}",
        credential.cred_def_id,
        credential.rev_reg_id
    );
    if credential.cred_def_id != cred_def.id || credential.schema_id != cred_def.schema_id {
        return Err(CredentialError::CredentialDefinitionMismatch);
    }
    let primary = &cred_def.value.primary;
    let messages = messages_for(primary, &credential.values)?;

    let expected_m2 = credential_context(&metadata.prover_did, credential.rev_idx());
    if credential.signature.p_credential.m_2 != expected_m2 {
        return Err(CredentialError::InvalidSignature);
    }

    let mut p_credential = credential.signature.p_credential.clone();
    p_credential.v += &metadata.master_secret_blinding_data.v_prime;
    check_primary_signature(
        rng,
        primary,
        &p_credential,
        &credential.signature_correctness_proof,
        master_secret.value(),
        &messages,
        &metadata.nonce,
    )?;

    let r_credential = match &credential.signature.r_credential {
        Some(r_credential) => {
            let pub_key = cred_def.value.revocation_key().ok_or_else(|| {
                CredentialError::RevocationNotSupported(cred_def.id.clone())
            })?;
            let vr_prime = metadata
                .master_secret_blinding_data
                .vr_prime
                .ok_or_else(|| CredentialError::MissingValue("vr_prime".to_string()))?;
            let rev_reg_def = rev_reg_def.ok_or_else(|| {
                CredentialError::MissingValue("revocation registry definition".to_string())
            })?;
            if credential.rev_reg_id.as_deref() != Some(rev_reg_def.id.as_str()) {
                return Err(CredentialError::UnknownRevocationRegistry(rev_reg_def.id.clone()));
            }
            let rev_reg = credential
                .rev_reg
                .as_ref()
                .ok_or_else(|| CredentialError::MissingValue("rev_reg".to_string()))?;
            let witness = credential
                .witness
                .as_ref()
                .ok_or_else(|| CredentialError::MissingValue("witness".to_string()))?;
            if r_credential.m2 != credential_context_scalar::<E>(&expected_m2) {
                return Err(CredentialError::InvalidSignature);
            }
            let mut r_credential = *r_credential;
            r_credential.unblind(&vr_prime);
            r_credential.verify(pub_key, &rev_reg_def.public_keys, rev_reg, witness)?;
            Some(r_credential)
        }
        None => None,
    };

    credential.signature = CredentialSignature {
        p_credential,
        r_credential,
    };
    debug!("Processed credential for {}", credential.cred_def_id);
    Ok(())
}
