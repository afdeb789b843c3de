//! Credential definition keys.
//!
//! The primary key is a CL signature key over the RSA modulus `n = pq` of two safe primes:
//! random quadratic residues `S`, `Z = S^xz`, one `R_i = S^xr_i` per schema attribute and for the
//! master secret, and `R_ctxt` for the credential context. The private key is `p' = (p - 1)/2` and
//! `q' = (q - 1)/2`. A key correctness proof shows that `Z` and every `R_i` are in the group
//! generated by `S`.
//!
//! A revocable definition additionally carries the pairing based revocation keys of
//! [`cks_accumulator::setup`].

use crate::{
    constants::{LARGE_PRIME, MASTER_SECRET},
    error::CredentialError,
    helpers::{multi_pow, signed, to_chunks},
    schema::{AttributeNames, Schema},
};
use ark_ec::pairing::Pairing;
use ark_std::{collections::BTreeMap, fmt, rand::RngCore, vec::Vec};
use bignum_arith::{primes::generate_safe_prime, random::random_in_range};
use cks_accumulator::setup::{
    generate_credential_revocation_keys, CredentialRevocationPrivateKey,
    CredentialRevocationPublicKey, SetupParams,
};
use group_ops::{error::GroupError, rsa_group::RsaGroup};
use log::trace;
use num::{BigInt, BigUint};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use sha2::Sha256;
use ssi_crypto_utils::hashing_utils::hash_to_biguint;

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPrimaryPublicKey {
    #[serde_as(as = "DisplayFromStr")]
    pub n: BigUint,
    #[serde_as(as = "DisplayFromStr")]
    pub s: BigUint,
    /// One generator per schema attribute and one for the master secret
    #[serde_as(as = "BTreeMap<_, DisplayFromStr>")]
    pub r: BTreeMap<String, BigUint>,
    #[serde_as(as = "DisplayFromStr")]
    pub rctxt: BigUint,
    #[serde_as(as = "DisplayFromStr")]
    pub z: BigUint,
}

impl CredentialPrimaryPublicKey {
    pub fn group(&self) -> Result<RsaGroup, GroupError> {
        RsaGroup::new(self.n.clone())
    }

    pub fn r_for(&self, attr: &str) -> Result<&BigUint, CredentialError> {
        self.r
            .get(attr)
            .ok_or_else(|| CredentialError::SchemaMismatch(format!("no key for attribute {}", attr)))
    }

    /// Schema attributes the key signs, i.e. all keys of `r` except the master secret
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.r
            .keys()
            .map(|k| k.as_str())
            .filter(|k| *k != MASTER_SECRET)
    }

    /// Check that the generators are units modulo `n`
    pub fn check_elements(&self) -> Result<(), CredentialError> {
        let group = self.group()?;
        group.check_element(&self.s)?;
        group.check_element(&self.z)?;
        group.check_element(&self.rctxt)?;
        for r in self.r.values() {
            group.check_element(r)?;
        }
        if !self.r.contains_key(MASTER_SECRET) {
            return Err(CredentialError::SchemaMismatch(
                "no key for the master secret".to_string(),
            ));
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPrimaryPrivateKey {
    #[serde_as(as = "DisplayFromStr")]
    pub p_prime: BigUint,
    #[serde_as(as = "DisplayFromStr")]
    pub q_prime: BigUint,
}

impl CredentialPrimaryPrivateKey {
    /// Order `p'q'` of the quadratic residues modulo `n`
    pub fn order(&self) -> BigUint {
        &self.p_prime * &self.q_prime
    }
}

impl fmt::Debug for CredentialPrimaryPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialPrimaryPrivateKey(<redacted>)")
    }
}

/// The two safe primes of a new key. Generating them takes a while, so they are an input to key
/// generation.
#[derive(Clone, PartialEq, Eq)]
pub struct SafePrimes {
    p: BigUint,
    q: BigUint,
}

impl SafePrimes {
    pub fn new(p: BigUint, q: BigUint) -> Self {
        Self { p, q }
    }

    pub fn generate<R: RngCore>(rng: &mut R) -> Result<Self, CredentialError> {
        let p = generate_safe_prime(rng, LARGE_PRIME)?;
        let q = generate_safe_prime(rng, LARGE_PRIME)?;
        Ok(Self { p, q })
    }
}

impl fmt::Debug for SafePrimes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SafePrimes(<redacted>)")
    }
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCorrectnessProof {
    #[serde_as(as = "DisplayFromStr")]
    pub c: BigUint,
    #[serde_as(as = "DisplayFromStr")]
    pub xz_cap: BigUint,
    #[serde_as(as = "BTreeMap<_, DisplayFromStr>")]
    pub xr_cap: BTreeMap<String, BigUint>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CredentialPublicKey<E: Pairing> {
    pub primary: CredentialPrimaryPublicKey,
    pub revocation: Option<CredentialRevocationPublicKey<E>>,
}

impl<E: Pairing> CredentialPublicKey<E> {
    pub fn revocation_key(&self) -> Option<&CredentialRevocationPublicKey<E>> {
        self.revocation.as_ref()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CredentialPrivateKey<E: Pairing> {
    pub primary: CredentialPrimaryPrivateKey,
    pub revocation: Option<CredentialRevocationPrivateKey<E>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDefinitionConfig {
    #[serde(default)]
    pub support_revocation: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureType {
    #[default]
    CL,
}

/// Public part of a credential definition, as published
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CredentialDefinition<E: Pairing> {
    pub id: String,
    pub schema_id: String,
    pub signature_type: SignatureType,
    pub tag: String,
    pub value: CredentialPublicKey<E>,
}

impl<E: Pairing> CredentialDefinition<E> {
    pub fn supports_revocation(&self) -> bool {
        self.value.revocation.is_some()
    }

    pub fn issuer_did(&self) -> &str {
        issuer_did_of(&self.id)
    }
}

pub fn cred_def_id(issuer_did: &str, schema_id: &str, tag: &str) -> String {
    format!("{}:3:CL:{}:{}", issuer_did, schema_id, tag)
}

/// DID prefix of a ledger object id
pub fn issuer_did_of(id: &str) -> &str {
    id.split(':').next().unwrap_or(id)
}

/// Generate the keys and key correctness proof of a definition for `schema`
pub fn generate_credential_keys<R: RngCore, E: Pairing>(
    rng: &mut R,
    schema: &Schema,
    primes: &SafePrimes,
    config: &CredentialDefinitionConfig,
) -> Result<
    (
        CredentialPublicKey<E>,
        CredentialPrivateKey<E>,
        KeyCorrectnessProof,
    ),
    CredentialError,
> {
    trace!(
        "generate_credential_keys: >>> schema: {}, config: {:?}",
        schema.id,
        config
    );
    generate_keys_for_attributes(rng, &schema.attr_names, primes, config, None)
}

/// Same as [`generate_credential_keys`] from the attribute names alone, as when rotating the
/// keys of an existing definition. Revocation keys are built over `revocation_params` when given.
/// Registries' tails and `z` depend on `g` and `g_dash`, so a rotation passes the current ones
/// to keep existing registries usable.
pub fn generate_keys_for_attributes<R: RngCore, E: Pairing>(
    rng: &mut R,
    attr_names: &AttributeNames,
    primes: &SafePrimes,
    config: &CredentialDefinitionConfig,
    revocation_params: Option<SetupParams<E>>,
) -> Result<
    (
        CredentialPublicKey<E>,
        CredentialPrivateKey<E>,
        KeyCorrectnessProof,
    ),
    CredentialError,
> {
    let (primary_pub, primary_priv, proof) = generate_primary_keys(rng, attr_names, primes)?;
    let (revocation_pub, revocation_priv) = if config.support_revocation {
        let params =
            revocation_params.unwrap_or_else(|| SetupParams::<E>::generate_using_rng(rng));
        let (public, private) = generate_credential_revocation_keys(rng, &params);
        (Some(public), Some(private))
    } else {
        (None, None)
    };
    Ok((
        CredentialPublicKey {
            primary: primary_pub,
            revocation: revocation_pub,
        },
        CredentialPrivateKey {
            primary: primary_priv,
            revocation: revocation_priv,
        },
        proof,
    ))
}

pub fn generate_primary_keys<R: RngCore>(
    rng: &mut R,
    attr_names: &AttributeNames,
    primes: &SafePrimes,
) -> Result<
    (
        CredentialPrimaryPublicKey,
        CredentialPrimaryPrivateKey,
        KeyCorrectnessProof,
    ),
    CredentialError,
> {
    if primes.p == primes.q {
        return Err(CredentialError::InvalidSchema(
            "the two primes of the modulus must differ".to_string(),
        ));
    }
    let (group, order) = RsaGroup::from_safe_primes(&primes.p, &primes.q)?;
    let two = BigUint::from(2u32);
    let exponent = |rng: &mut R| random_in_range(rng, &two, &order);

    let s = group.random_qr(rng)?;
    let xz = exponent(rng)?;
    let z = group.pow_u(&s, &xz)?;

    let mut xr = BTreeMap::new();
    let mut r = BTreeMap::new();
    for attr in attr_names
        .iter()
        .map(|a| a.as_str())
        .chain(ark_std::iter::once(MASTER_SECRET))
    {
        let x = exponent(rng)?;
        r.insert(attr.to_string(), group.pow_u(&s, &x)?);
        xr.insert(attr.to_string(), x);
    }
    let rctxt = group.pow_u(&s, &exponent(rng)?)?;

    // Key correctness proof
    let xz_tilde = exponent(rng)?;
    let z_tilde = group.pow_u(&s, &xz_tilde)?;
    let mut xr_tilde = BTreeMap::new();
    let mut r_tilde = BTreeMap::new();
    for attr in r.keys() {
        let x = exponent(rng)?;
        r_tilde.insert(attr.clone(), group.pow_u(&s, &x)?);
        xr_tilde.insert(attr.clone(), x);
    }
    let c = key_correctness_challenge(&z, &r, &z_tilde, &r_tilde);
    let xz_cap = &c * &xz + &xz_tilde;
    let xr_cap = xr
        .iter()
        .map(|(attr, x)| (attr.clone(), &c * x + &xr_tilde[attr]))
        .collect();

    let public = CredentialPrimaryPublicKey {
        n: group.modulus().clone(),
        s,
        r,
        rctxt,
        z,
    };
    let private = CredentialPrimaryPrivateKey {
        p_prime: &primes.p >> 1,
        q_prime: &primes.q >> 1,
    };
    Ok((public, private, KeyCorrectnessProof { c, xz_cap, xr_cap }))
}

fn key_correctness_challenge(
    z: &BigUint,
    r: &BTreeMap<String, BigUint>,
    z_tilde: &BigUint,
    r_tilde: &BTreeMap<String, BigUint>,
) -> BigUint {
    let mut values = vec![z];
    values.extend(r.values());
    values.push(z_tilde);
    values.extend(r_tilde.values());
    let chunks = to_chunks(&values);
    hash_to_biguint::<Sha256>(&chunks.iter().map(|c| c.as_slice()).collect::<Vec<_>>())
}

/// Check that `Z` and every `R_i` are powers of `S`
pub fn verify_key_correctness_proof(
    public: &CredentialPrimaryPublicKey,
    proof: &KeyCorrectnessProof,
) -> Result<(), CredentialError> {
    trace!("verify_key_correctness_proof: >>>");
    public.check_elements()?;
    if !proof.xr_cap.keys().eq(public.r.keys()) {
        return Err(CredentialError::InvalidKeyCorrectnessProof);
    }
    let group = public.group()?;
    let neg_c = -signed(&proof.c);
    let z_tilde = multi_pow(
        &group,
        &[(&public.z, neg_c.clone()), (&public.s, signed(&proof.xz_cap))],
    )?;
    let mut r_tilde = BTreeMap::new();
    for (attr, r) in &public.r {
        let x_cap = BigInt::from(proof.xr_cap[attr].clone());
        r_tilde.insert(
            attr.clone(),
            multi_pow(&group, &[(r, neg_c.clone()), (&public.s, x_cap)])?,
        );
    }
    if key_correctness_challenge(&public.z, &public.r, &z_tilde, &r_tilde) == proof.c {
        Ok(())
    } else {
        Err(CredentialError::InvalidKeyCorrectnessProof)
    }
}
