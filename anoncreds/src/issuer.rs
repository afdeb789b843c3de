//! Issuer side: credential definitions with their private keys, revocation registries, offers,
//! issuance and revocation.
//!
//! Key material follows the same pattern as DID keys: each definition's [`IssuerKeyRecord`] is
//! immutable and sits behind a `RwLock<Arc<_>>`. Issuance takes a snapshot of the `Arc` and signs
//! without holding the lock. Rotation builds the next record, writes it to the wallet and swaps
//! the pointer, so an issuance uses either the old key or the new one in full. A credential
//! definition keeps its id across rotations and the keys it had before are kept as history so
//! credentials issued under them can still be checked.

use crate::{
    cred_def::{
        cred_def_id, generate_credential_keys, generate_keys_for_attributes, CredentialDefinition,
        CredentialDefinitionConfig, CredentialPrivateKey, CredentialPublicKey, KeyCorrectnessProof,
        SafePrimes, SignatureType,
    },
    credential::{
        credential_context, credential_context_scalar, messages_for, sign_primary, Credential,
        CredentialSignature, CredentialValues,
    },
    error::CredentialError,
    proof_request::generate_nonce,
    request::{CredentialOffer, CredentialRequest},
    schema::{AttributeNames, Schema},
};
use ark_ec::pairing::Pairing;
use ark_std::{collections::BTreeMap, rand::RngCore, string::ToString, vec::Vec};
use cks_accumulator::{
    registry::{
        RegistryState, RevocationRegistryConfig, RevocationRegistryDefinition,
        RevocationRegistryDelta, RevocationRegistryHandle,
    },
    setup::SetupParams,
    tails::{TailsReader, TailsWriter},
};
use core::sync::atomic::AtomicBool;
use did_keys::{Tags, WalletError, WalletStore};
use log::{debug, trace};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const ISSUER_KEY_RECORD_TYPE: &str = "anoncreds::IssuerKeyRecord";
pub const REV_REG_DEF_RECORD_TYPE: &str = "anoncreds::RevocationRegistryDefinition";

const SCHEMA_ID_TAG: &str = "schema_id";

/// Keys generated by [`IssuerWallet::rotate_start`] and not yet in use
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PendingKeys<E: Pairing> {
    pub public_key: CredentialPublicKey<E>,
    pub private_key: CredentialPrivateKey<E>,
    pub key_correctness_proof: KeyCorrectnessProof,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct IssuerKeyRecord<E: Pairing> {
    pub cred_def: CredentialDefinition<E>,
    pub private_key: CredentialPrivateKey<E>,
    pub key_correctness_proof: KeyCorrectnessProof,
    pub pending: Option<PendingKeys<E>>,
    /// Definitions as they were before each applied rotation, oldest first
    pub retired: Vec<CredentialDefinition<E>>,
}

type Slot<E> = RwLock<Arc<IssuerKeyRecord<E>>>;

pub fn rev_reg_id(issuer_did: &str, cred_def_id: &str, tag: &str) -> String {
    format!("{}:4:{}:CL_ACCUM:{}", issuer_did, cred_def_id, tag)
}

/// Offer for a definition. The nonce is fresh for every offer.
pub fn create_credential_offer<R: RngCore, E: Pairing>(
    rng: &mut R,
    cred_def: &CredentialDefinition<E>,
    key_correctness_proof: &KeyCorrectnessProof,
) -> CredentialOffer {
    CredentialOffer {
        schema_id: cred_def.schema_id.clone(),
        cred_def_id: cred_def.id.clone(),
        key_correctness_proof: key_correctness_proof.clone(),
        nonce: generate_nonce(rng),
    }
}

/// `first` followed by `next`
pub fn merge_revocation_registry_deltas<E: Pairing>(
    first: &RevocationRegistryDelta<E>,
    next: &RevocationRegistryDelta<E>,
) -> Result<RevocationRegistryDelta<E>, CredentialError> {
    Ok(first.merge(next)?)
}

/// A newly issued credential with its revocation index and the registry delta the issuance
/// caused, if any
pub type IssuedCredential<E> = (
    Credential<E>,
    Option<u32>,
    Option<RevocationRegistryDelta<E>>,
);

pub struct IssuerWallet<E: Pairing, W: WalletStore> {
    wallet: Arc<W>,
    slots: RwLock<BTreeMap<String, Arc<Slot<E>>>>,
    registries: RwLock<BTreeMap<String, Arc<RevocationRegistryHandle<E>>>>,
}

impl<E: Pairing, W: WalletStore> IssuerWallet<E, W> {
    pub fn new(wallet: Arc<W>) -> Self {
        Self {
            wallet,
            slots: RwLock::new(BTreeMap::new()),
            registries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn wallet(&self) -> &Arc<W> {
        &self.wallet
    }

    /// Create a definition for `schema` and store its keys. Fails with `AlreadyExists` if the
    /// issuer already has a definition with this schema and tag.
    pub fn create_and_store_credential_definition<R: RngCore>(
        &self,
        rng: &mut R,
        issuer_did: &str,
        schema: &Schema,
        tag: &str,
        primes: &SafePrimes,
        config: &CredentialDefinitionConfig,
    ) -> Result<CredentialDefinition<E>, CredentialError> {
        trace!(
            "create_and_store_credential_definition: >>> issuer_did: {}, schema_id: {}, tag: {}",
            issuer_did,
            schema.id,
            tag
        );
        let (public_key, private_key, key_correctness_proof) =
            generate_credential_keys::<_, E>(rng, schema, primes, config)?;
        let cred_def = CredentialDefinition {
            id: cred_def_id(issuer_did, &schema.id, tag),
            schema_id: schema.id.clone(),
            signature_type: SignatureType::CL,
            tag: tag.to_string(),
            value: public_key,
        };
        let record = IssuerKeyRecord {
            cred_def: cred_def.clone(),
            private_key,
            key_correctness_proof,
            pending: None,
            retired: Vec::new(),
        };
        let tags: Tags = [(SCHEMA_ID_TAG.to_string(), schema.id.clone())]
            .into_iter()
            .collect();
        self.wallet
            .put_json(ISSUER_KEY_RECORD_TYPE, &cred_def.id, &record, &tags)?;
        self.slots
            .write()
            .insert(cred_def.id.clone(), Arc::new(RwLock::new(Arc::new(record))));
        debug!("Created credential definition {}", cred_def.id);
        Ok(cred_def)
    }

    /// Snapshot of the keys of a definition
    pub fn key_record(&self, cred_def_id: &str) -> Result<Arc<IssuerKeyRecord<E>>, CredentialError> {
        Ok(self.slot(cred_def_id)?.read().clone())
    }

    pub fn credential_definition(
        &self,
        cred_def_id: &str,
    ) -> Result<CredentialDefinition<E>, CredentialError> {
        Ok(self.key_record(cred_def_id)?.cred_def.clone())
    }

    /// Every public key the definition has had, oldest first, ending with the current one
    pub fn definition_history(
        &self,
        cred_def_id: &str,
    ) -> Result<Vec<CredentialDefinition<E>>, CredentialError> {
        let record = self.key_record(cred_def_id)?;
        let mut history = record.retired.clone();
        history.push(record.cred_def.clone());
        Ok(history)
    }

    pub fn create_credential_offer<R: RngCore>(
        &self,
        rng: &mut R,
        cred_def_id: &str,
    ) -> Result<CredentialOffer, CredentialError> {
        trace!("create_credential_offer: >>> cred_def_id: {}", cred_def_id);
        let record = self.key_record(cred_def_id)?;
        Ok(create_credential_offer(
            rng,
            &record.cred_def,
            &record.key_correctness_proof,
        ))
    }

    /// Generate new keys for a definition and keep them as pending. Issuance continues with the
    /// current keys until [`Self::rotate_apply`]. Starting again replaces earlier pending keys.
    pub fn rotate_start<R: RngCore>(
        &self,
        rng: &mut R,
        cred_def_id: &str,
        primes: &SafePrimes,
    ) -> Result<CredentialPublicKey<E>, CredentialError> {
        trace!("rotate_start: >>> cred_def_id: {}", cred_def_id);
        let slot = self.slot(cred_def_id)?;
        let current = slot.read().clone();
        let attr_names: AttributeNames = current
            .cred_def
            .value
            .primary
            .attributes()
            .map(|a| a.to_string())
            .collect();
        let config = CredentialDefinitionConfig {
            support_revocation: current.cred_def.supports_revocation(),
        };
        let revocation_params = current.cred_def.value.revocation_key().map(|key| SetupParams {
            g: key.g,
            g_dash: key.g_dash,
        });
        let (public_key, private_key, key_correctness_proof) = generate_keys_for_attributes::<_, E>(
            rng,
            &attr_names,
            primes,
            &config,
            revocation_params,
        )?;

        let mut guard = slot.write();
        let next = IssuerKeyRecord {
            pending: Some(PendingKeys {
                public_key: public_key.clone(),
                private_key,
                key_correctness_proof,
            }),
            ..(**guard).clone()
        };
        self.wallet
            .update_json(ISSUER_KEY_RECORD_TYPE, cred_def_id, &next)?;
        *guard = Arc::new(next);
        drop(guard);

        debug!("Started key rotation for credential definition {}", cred_def_id);
        Ok(public_key)
    }

    /// Make the pending keys current. The replaced public key moves to the history.
    pub fn rotate_apply(&self, cred_def_id: &str) -> Result<CredentialDefinition<E>, CredentialError> {
        trace!("rotate_apply: >>> cred_def_id: {}", cred_def_id);
        let slot = self.slot(cred_def_id)?;

        let mut guard = slot.write();
        let pending = guard
            .pending
            .clone()
            .ok_or_else(|| CredentialError::NoRotationInProgress(cred_def_id.to_string()))?;
        let mut retired = guard.retired.clone();
        retired.push(guard.cred_def.clone());
        let cred_def = CredentialDefinition {
            value: pending.public_key,
            ..guard.cred_def.clone()
        };
        let next = IssuerKeyRecord {
            cred_def: cred_def.clone(),
            private_key: pending.private_key,
            key_correctness_proof: pending.key_correctness_proof,
            pending: None,
            retired,
        };
        self.wallet
            .update_json(ISSUER_KEY_RECORD_TYPE, cred_def_id, &next)?;
        *guard = Arc::new(next);
        drop(guard);

        debug!("Applied key rotation for credential definition {}", cred_def_id);
        Ok(cred_def)
    }

    /// Create a registry for a revocable definition, writing its tails to `tails_writer`.
    /// Returns the definition and the delta from nothing to the initial accumulator.
    #[allow(clippy::too_many_arguments)]
    pub fn create_revocation_registry<R: RngCore, T: TailsWriter<E>>(
        &self,
        rng: &mut R,
        issuer_did: &str,
        cred_def_id: &str,
        tag: &str,
        config: &RevocationRegistryConfig,
        tails_writer: &mut T,
        cancel: Option<&AtomicBool>,
    ) -> Result<(RevocationRegistryDefinition<E>, RevocationRegistryDelta<E>), CredentialError>
    {
        trace!(
            "create_revocation_registry: >>> cred_def_id: {}, tag: {}",
            cred_def_id,
            tag
        );
        let record = self.key_record(cred_def_id)?;
        let pub_key = record
            .cred_def
            .value
            .revocation_key()
            .ok_or_else(|| CredentialError::RevocationNotSupported(cred_def_id.to_string()))?;
        let id = rev_reg_id(issuer_did, cred_def_id, tag);
        let (handle, delta) = RevocationRegistryHandle::create(
            rng,
            &id,
            cred_def_id,
            pub_key,
            config,
            tails_writer,
            cancel,
        )?;
        let definition = handle.definition().clone();
        self.wallet
            .put_json(REV_REG_DEF_RECORD_TYPE, &id, &definition, &Tags::new())?;
        self.registries.write().insert(id, Arc::new(handle));
        Ok((definition, delta))
    }

    pub fn revocation_registry_definition(
        &self,
        rev_reg_id: &str,
    ) -> Result<RevocationRegistryDefinition<E>, CredentialError> {
        Ok(self.registry(rev_reg_id)?.definition().clone())
    }

    /// Current accumulator and index sets of a registry
    pub fn registry_state(&self, rev_reg_id: &str) -> Result<RegistryState<E>, CredentialError> {
        Ok(self.registry(rev_reg_id)?.snapshot())
    }

    /// Sign the values for the holder of `request`. With a registry id the credential gets the
    /// next index of that registry and its non-revocation signature and witness.
    pub fn issue_credential<R: RngCore, T: TailsReader<E>>(
        &self,
        rng: &mut R,
        offer: &CredentialOffer,
        request: &CredentialRequest<E>,
        values: &CredentialValues,
        rev_reg_id: Option<&str>,
        tails: Option<&T>,
    ) -> Result<IssuedCredential<E>, CredentialError> {
        trace!(
            "issue_credential: >>> cred_def_id: {}, rev_reg_id: {:?}",
            offer.cred_def_id,
            rev_reg_id
        );
        let record = self.key_record(&offer.cred_def_id)?;
        let cred_def = &record.cred_def;
        request.verify(cred_def, offer)?;
        let primary = &cred_def.value.primary;
        let messages = messages_for(primary, values)?;
        let prover_did = request.prover_did.as_str();

        let sign = |rng: &mut R, rev_idx: Option<u32>| {
            sign_primary(
                rng,
                primary,
                &record.private_key.primary,
                &request.blinded_ms.u,
                &messages,
                &credential_context(prover_did, rev_idx),
                &request.nonce,
            )
        };

        // With a registry the index is committed only once the primary signature exists
        let (rev_idx, r_credential, rev_reg, witness, delta, primary_signature) = match rev_reg_id
        {
            Some(id) => {
                let handle = self.registry(id)?;
                if handle.definition().cred_def_id != cred_def.id {
                    return Err(CredentialError::CredentialDefinitionMismatch);
                }
                let (pub_key, priv_key) = cred_def
                    .value
                    .revocation_key()
                    .zip(record.private_key.revocation.as_ref())
                    .ok_or_else(|| CredentialError::RevocationNotSupported(cred_def.id.clone()))?;
                let ur = request
                    .blinded_ms
                    .ur
                    .as_ref()
                    .ok_or_else(|| CredentialError::MissingValue("ur".to_string()))?;
                let tails = tails.ok_or_else(|| CredentialError::MissingValue("tails".to_string()))?;
                let (issued, primary_signature) = handle.issue_and_then(
                    rng,
                    pub_key,
                    priv_key,
                    tails,
                    ur,
                    |idx| credential_context_scalar::<E>(&credential_context(prover_did, Some(idx))),
                    |rng, idx| sign(rng, Some(idx)),
                )?;
                (
                    Some(issued.rev_idx),
                    Some(issued.signature),
                    Some(issued.registry),
                    Some(issued.witness),
                    issued.delta,
                    primary_signature,
                )
            }
            None => (None, None, None, None, None, sign(rng, None)?),
        };
        let (p_credential, signature_correctness_proof) = primary_signature;

        let credential = Credential {
            schema_id: cred_def.schema_id.clone(),
            cred_def_id: cred_def.id.clone(),
            rev_reg_id: rev_reg_id.map(|id| id.to_string()),
            values: values.clone(),
            signature: CredentialSignature {
                p_credential,
                r_credential,
            },
            signature_correctness_proof,
            rev_reg,
            witness,
        };
        debug!(
            "Issued credential for {} under {}",
            prover_did, cred_def.id
        );
        Ok((credential, rev_idx, delta))
    }

    pub fn revoke_credential<T: TailsReader<E>>(
        &self,
        rev_reg_id: &str,
        rev_idx: u32,
        tails: &T,
    ) -> Result<RevocationRegistryDelta<E>, CredentialError> {
        trace!(
            "revoke_credential: >>> rev_reg_id: {}, rev_idx: {}",
            rev_reg_id,
            rev_idx
        );
        Ok(self.registry(rev_reg_id)?.revoke(rev_idx, tails)?)
    }

    pub fn recover_credential<T: TailsReader<E>>(
        &self,
        rev_reg_id: &str,
        rev_idx: u32,
        tails: &T,
    ) -> Result<RevocationRegistryDelta<E>, CredentialError> {
        trace!(
            "recover_credential: >>> rev_reg_id: {}, rev_idx: {}",
            rev_reg_id,
            rev_idx
        );
        Ok(self.registry(rev_reg_id)?.recover(rev_idx, tails)?)
    }

    fn registry(
        &self,
        rev_reg_id: &str,
    ) -> Result<Arc<RevocationRegistryHandle<E>>, CredentialError> {
        self.registries
            .read()
            .get(rev_reg_id)
            .cloned()
            .ok_or_else(|| CredentialError::UnknownRevocationRegistry(rev_reg_id.to_string()))
    }

    /// Cached slot for a definition, loading its record from the wallet on first use
    fn slot(&self, cred_def_id: &str) -> Result<Arc<Slot<E>>, CredentialError> {
        if let Some(slot) = self.slots.read().get(cred_def_id) {
            return Ok(slot.clone());
        }
        let record: IssuerKeyRecord<E> = match self.wallet.get_json(ISSUER_KEY_RECORD_TYPE, cred_def_id) {
            Ok(record) => record,
            Err(WalletError::ItemNotFound(..)) => {
                return Err(CredentialError::UnknownCredentialDefinition(
                    cred_def_id.to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        };
        let mut slots = self.slots.write();
        let slot = slots
            .entry(cred_def_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Arc::new(record))));
        Ok(slot.clone())
    }
}
