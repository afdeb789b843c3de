//! Key records per DID (or per plain key) with two phase rotation.
//!
//! Each record is an immutable [`KeyRecord`] behind a `RwLock<Arc<_>>`. Signing and decryption
//! take a snapshot of the `Arc` under the read lock and work on it without holding the lock.
//! Rotation builds a new record, writes it through to the wallet and swaps the pointer under the
//! write lock, so a reader sees either the old record or the new one, never something in between.

use crate::{
    error::{KeyError, StateError, WalletError},
    keys::{
        build_full_verkey, did_from_verkey, validate_did, KeyInfo, KeyPair, MyDidInfo, TheirDid,
        TheirDidInfo,
    },
    wallet::{Tags, WalletStore},
};
use ark_std::{collections::BTreeMap, rand::RngCore, vec::Vec};
use log::{debug, trace};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const KEY_RECORD_TYPE: &str = "did_keys::KeyRecord";
pub const THEIR_DID_TYPE: &str = "did_keys::TheirDid";

const KIND_TAG: &str = "kind";
const KIND_DID: &str = "did";
const KIND_KEY: &str = "key";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// DID, or the original verkey for a key created without a DID
    pub handle: String,
    pub current: KeyPair,
    pub pending: Option<KeyPair>,
}

impl KeyRecord {
    pub fn verkey(&self) -> &str {
        &self.current.verkey
    }

    pub fn pending_verkey(&self) -> Option<&str> {
        self.pending.as_ref().map(|k| k.verkey.as_str())
    }
}

type Slot = RwLock<Arc<KeyRecord>>;

pub struct KeyManager<W: WalletStore> {
    wallet: Arc<W>,
    slots: RwLock<BTreeMap<String, Arc<Slot>>>,
}

impl<W: WalletStore> KeyManager<W> {
    pub fn new(wallet: Arc<W>) -> Self {
        Self {
            wallet,
            slots: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn wallet(&self) -> &Arc<W> {
        &self.wallet
    }

    /// Create a key not bound to any DID. Returns its verkey which is also the handle used for
    /// later operations on it.
    pub fn create_key<R: RngCore>(&self, rng: &mut R, info: &KeyInfo) -> Result<String, KeyError> {
        trace!("create_key: >>> crypto_type: {:?}", info.crypto_type);
        let key = KeyPair::generate(rng, info)?;
        let verkey = key.verkey.clone();
        self.insert(verkey.clone(), key, KIND_KEY)?;
        trace!("create_key: <<< verkey: {}", verkey);
        Ok(verkey)
    }

    /// Returns `(did, verkey)`
    pub fn create_my_did<R: RngCore>(
        &self,
        rng: &mut R,
        info: &MyDidInfo,
    ) -> Result<(String, String), KeyError> {
        trace!("create_my_did: >>> did: {:?}, cid: {:?}", info.did, info.cid);
        let key = KeyPair::generate(
            rng,
            &KeyInfo {
                seed: info.seed.clone(),
                crypto_type: info.crypto_type.clone(),
            },
        )?;
        let did = match &info.did {
            Some(did) => {
                validate_did(did)?;
                did.clone()
            }
            None => did_from_verkey(&key.verifying_key(), info.cid.unwrap_or(false)),
        };
        let verkey = key.verkey.clone();
        self.insert(did.clone(), key, KIND_DID)?;
        debug!("Created DID {}", did);
        trace!("create_my_did: <<< did: {}, verkey: {}", did, verkey);
        Ok((did, verkey))
    }

    /// Store a DID owned by someone else. The verkey may be abbreviated.
    pub fn store_their_did(&self, info: &TheirDidInfo) -> Result<(), KeyError> {
        trace!("store_their_did: >>> did: {}", info.did);
        validate_did(&info.did)?;
        let verkey = build_full_verkey(&info.did, info.verkey.as_deref())?;
        let their = TheirDid {
            did: info.did.clone(),
            verkey,
        };
        self.wallet
            .put_json(THEIR_DID_TYPE, &their.did, &their, &Tags::new())?;
        Ok(())
    }

    pub fn get_their_did(&self, did: &str) -> Result<TheirDid, KeyError> {
        Ok(self.wallet.get_json(THEIR_DID_TYPE, did)?)
    }

    /// Snapshot of the current state of a key record
    pub fn key_record(&self, handle: &str) -> Result<Arc<KeyRecord>, KeyError> {
        Ok(self.slot(handle)?.read().clone())
    }

    /// Current verkey for one of our DIDs, falling back to stored DIDs of others
    pub fn key_for_local_did(&self, did: &str) -> Result<String, KeyError> {
        match self.key_record(did) {
            Ok(r) => Ok(r.verkey().to_string()),
            Err(KeyError::Wallet(WalletError::ItemNotFound(..))) => {
                Ok(self.get_their_did(did)?.verkey)
            }
            Err(e) => Err(e),
        }
    }

    /// Verkey for a DID, preferring stored DIDs of others over our own
    pub fn key_for_did(&self, did: &str) -> Result<String, KeyError> {
        match self.get_their_did(did) {
            Ok(t) => Ok(t.verkey),
            Err(KeyError::Wallet(WalletError::ItemNotFound(..))) => {
                Ok(self.key_record(did)?.verkey().to_string())
            }
            Err(e) => Err(e),
        }
    }

    /// `(did, current verkey)` for every DID we own
    pub fn list_my_dids(&self) -> Result<Vec<(String, String)>, KeyError> {
        let query: Tags = [(KIND_TAG.to_string(), KIND_DID.to_string())]
            .into_iter()
            .collect();
        self.wallet
            .search(KEY_RECORD_TYPE, &query)?
            .map(|r| -> Result<(String, String), KeyError> {
                let id = r.id.clone();
                // Prefer the cached record
                let record = match self.slots.read().get(&id) {
                    Some(slot) => slot.read().clone(),
                    None => Arc::new(r.deserialize_value::<KeyRecord>()?),
                };
                Ok((id, record.verkey().to_string()))
            })
            .collect()
    }

    /// Sign with the current key of a DID or plain key
    pub fn sign(&self, handle: &str, msg: &[u8]) -> Result<Vec<u8>, KeyError> {
        let record = self.key_record(handle)?;
        Ok(record.current.sign(msg))
    }

    /// Generate a key and store it as pending. The current key stays in use until
    /// [`Self::apply_rotation`]. Starting again replaces an earlier pending key.
    pub fn start_rotation<R: RngCore>(
        &self,
        rng: &mut R,
        handle: &str,
        info: &KeyInfo,
    ) -> Result<String, KeyError> {
        trace!("start_rotation: >>> handle: {}", handle);
        let slot = self.slot(handle)?;
        let pending = KeyPair::generate(rng, info)?;
        let pending_verkey = pending.verkey.clone();

        let mut guard = slot.write();
        let next = KeyRecord {
            handle: guard.handle.clone(),
            current: guard.current.clone(),
            pending: Some(pending),
        };
        self.wallet.update_json(KEY_RECORD_TYPE, handle, &next)?;
        *guard = Arc::new(next);
        drop(guard);

        debug!("Started key rotation for {}", handle);
        trace!("start_rotation: <<< pending verkey: {}", pending_verkey);
        Ok(pending_verkey)
    }

    /// Promote the pending key to current and discard the old current key. Returns the new verkey.
    pub fn apply_rotation(&self, handle: &str) -> Result<String, KeyError> {
        trace!("apply_rotation: >>> handle: {}", handle);
        let slot = self.slot(handle)?;

        let mut guard = slot.write();
        let pending = guard
            .pending
            .clone()
            .ok_or_else(|| StateError::NoRotationInProgress(handle.to_string()))?;
        let verkey = pending.verkey.clone();
        let next = KeyRecord {
            handle: guard.handle.clone(),
            current: pending,
            pending: None,
        };
        self.wallet.update_json(KEY_RECORD_TYPE, handle, &next)?;
        *guard = Arc::new(next);
        drop(guard);

        debug!("Applied key rotation for {}", handle);
        trace!("apply_rotation: <<< verkey: {}", verkey);
        Ok(verkey)
    }

    fn insert(&self, handle: String, key: KeyPair, kind: &str) -> Result<(), KeyError> {
        let record = KeyRecord {
            handle: handle.clone(),
            current: key,
            pending: None,
        };
        let tags: Tags = [(KIND_TAG.to_string(), kind.to_string())]
            .into_iter()
            .collect();
        self.wallet
            .put_json(KEY_RECORD_TYPE, &handle, &record, &tags)?;
        self.slots
            .write()
            .insert(handle, Arc::new(RwLock::new(Arc::new(record))));
        Ok(())
    }

    /// Cached slot for a handle, loading the record from the wallet on first use
    fn slot(&self, handle: &str) -> Result<Arc<Slot>, KeyError> {
        if let Some(slot) = self.slots.read().get(handle) {
            return Ok(slot.clone());
        }
        let record: KeyRecord = self.wallet.get_json(KEY_RECORD_TYPE, handle)?;
        let mut slots = self.slots.write();
        let slot = slots
            .entry(handle.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Arc::new(record))));
        Ok(slot.clone())
    }
}
