//! Ed25519 key pairs, seeds, DIDs and verkey encodings.
//!
//! Verkeys are base58 of the 32 byte public key. A DID is base58 of the first 16 bytes of the
//! verkey, or of all 32 bytes for a "cryptonym" DID. Since a 16 byte DID already carries half
//! the verkey, the verkey can be shared in abbreviated form `~<base58 of the other 16 bytes>`.

use crate::error::KeyError;
use ark_std::rand::RngCore;
use core::{fmt, str::FromStr};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

pub const DEFAULT_CRYPTO_TYPE: &str = "ed25519";

/// Byte size of a seed and of an Ed25519 public key
pub const KEY_BYTE_SIZE: usize = 32;

/// Byte size of a DID derived from the first half of a verkey
pub const SHORT_DID_BYTE_SIZE: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CryptoType {
    #[default]
    #[serde(rename = "ed25519")]
    Ed25519,
}

impl FromStr for CryptoType {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            DEFAULT_CRYPTO_TYPE => Ok(Self::Ed25519),
            other => Err(KeyError::UnknownCryptoType(other.to_string())),
        }
    }
}

impl fmt::Display for CryptoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => f.write_str(DEFAULT_CRYPTO_TYPE),
        }
    }
}

fn parse_crypto_type(crypto_type: Option<&str>) -> Result<CryptoType, KeyError> {
    crypto_type.map_or(Ok(CryptoType::default()), CryptoType::from_str)
}

/// Parameters for creating a key
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub seed: Option<String>,
    pub crypto_type: Option<String>,
}

/// Parameters for creating one of our own DIDs
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyDidInfo {
    pub did: Option<String>,
    pub seed: Option<String>,
    pub crypto_type: Option<String>,
    pub cid: Option<bool>,
}

/// Parameters for storing a DID owned by someone else
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TheirDidInfo {
    pub did: String,
    pub verkey: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TheirDid {
    pub did: String,
    pub verkey: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub verkey: String,
    #[serde(with = "signkey_base58")]
    signkey: SigningKey,
    pub crypto_type: CryptoType,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("verkey", &self.verkey)
            .field("signkey", &"<redacted>")
            .field("crypto_type", &self.crypto_type)
            .finish()
    }
}

impl KeyPair {
    /// Deterministic when `info.seed` is given, otherwise the secret is drawn from `rng`.
    pub fn generate<R: RngCore>(rng: &mut R, info: &KeyInfo) -> Result<Self, KeyError> {
        let crypto_type = parse_crypto_type(info.crypto_type.as_deref())?;
        let seed = match info.seed.as_deref() {
            Some(s) => convert_seed(s)?,
            None => {
                let mut s = Zeroizing::new([0u8; KEY_BYTE_SIZE]);
                rng.fill_bytes(&mut s[..]);
                s
            }
        };
        let signkey = SigningKey::from_bytes(&seed);
        Ok(Self {
            verkey: encode_verkey(&signkey.verifying_key()),
            signkey,
            crypto_type,
        })
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signkey.verifying_key()
    }

    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.signkey.sign(msg).to_bytes().to_vec()
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signkey
    }
}

/// A seed is either exactly 32 bytes of UTF-8 text or 64 hex characters.
pub fn convert_seed(seed: &str) -> Result<Zeroizing<[u8; KEY_BYTE_SIZE]>, KeyError> {
    let mut out = Zeroizing::new([0u8; KEY_BYTE_SIZE]);
    if seed.len() == KEY_BYTE_SIZE {
        out.copy_from_slice(seed.as_bytes());
        return Ok(out);
    }
    if seed.len() == 2 * KEY_BYTE_SIZE {
        let mut bytes = hex::decode(seed)
            .map_err(|_| KeyError::InvalidSeed("seed of 64 chars must be hex".to_string()))?;
        out.copy_from_slice(&bytes);
        bytes.zeroize();
        return Ok(out);
    }
    Err(KeyError::InvalidSeed(format!(
        "expected 32 bytes or 64 hex characters, got {} characters",
        seed.len()
    )))
}

pub fn encode_verkey(vk: &VerifyingKey) -> String {
    bs58::encode(vk.as_bytes()).into_string()
}

/// Decode a full (not abbreviated) verkey
pub fn decode_verkey(verkey: &str) -> Result<VerifyingKey, KeyError> {
    let bytes = bs58::decode(verkey)
        .into_vec()
        .map_err(|e| KeyError::InvalidVerkey(e.to_string()))?;
    let bytes: [u8; KEY_BYTE_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| {
        KeyError::InvalidVerkey(format!("expected {} bytes, got {}", KEY_BYTE_SIZE, b.len()))
    })?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| KeyError::InvalidVerkey(e.to_string()))
}

/// DID for a verkey, the full key for a cryptonym
pub fn did_from_verkey(vk: &VerifyingKey, cid: bool) -> String {
    let bytes = vk.as_bytes();
    if cid {
        bs58::encode(bytes).into_string()
    } else {
        bs58::encode(&bytes[..SHORT_DID_BYTE_SIZE]).into_string()
    }
}

/// Returns the decoded bytes of a DID, which must be 16 or 32 bytes long
pub fn validate_did(did: &str) -> Result<Vec<u8>, KeyError> {
    let bytes = bs58::decode(did)
        .into_vec()
        .map_err(|e| KeyError::InvalidDid(e.to_string()))?;
    if bytes.len() != SHORT_DID_BYTE_SIZE && bytes.len() != KEY_BYTE_SIZE {
        return Err(KeyError::InvalidDid(format!(
            "{} decodes to {} bytes, expected 16 or 32",
            did,
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// `~<base58 of the last 16 bytes>`
pub fn abbreviate_verkey(did: &str, verkey: &str) -> Result<String, KeyError> {
    let did_bytes = validate_did(did)?;
    let vk = decode_verkey(verkey)?;
    if did_bytes.len() != SHORT_DID_BYTE_SIZE || did_bytes[..] != vk.as_bytes()[..SHORT_DID_BYTE_SIZE] {
        return Ok(verkey.to_string());
    }
    Ok(format!(
        "~{}",
        bs58::encode(&vk.as_bytes()[SHORT_DID_BYTE_SIZE..]).into_string()
    ))
}

/// Expand a possibly abbreviated verkey. Without a verkey the DID must itself be a full key.
pub fn build_full_verkey(did: &str, verkey: Option<&str>) -> Result<String, KeyError> {
    match verkey {
        Some(abbr) if abbr.starts_with('~') => {
            let did_bytes = validate_did(did)?;
            if did_bytes.len() != SHORT_DID_BYTE_SIZE {
                return Err(KeyError::InvalidVerkey(
                    "abbreviated verkey needs a 16 byte DID".to_string(),
                ));
            }
            let tail = bs58::decode(&abbr[1..])
                .into_vec()
                .map_err(|e| KeyError::InvalidVerkey(e.to_string()))?;
            let full = [did_bytes, tail].concat();
            let verkey = bs58::encode(full).into_string();
            decode_verkey(&verkey)?;
            Ok(verkey)
        }
        Some(full) => {
            decode_verkey(full)?;
            Ok(full.to_string())
        }
        None => {
            decode_verkey(did)?;
            Ok(did.to_string())
        }
    }
}

/// Check an Ed25519 signature. A well formed but wrong signature gives `Ok(false)`.
pub fn verify(verkey: &str, msg: &[u8], signature: &[u8]) -> Result<bool, KeyError> {
    let vk = decode_verkey(verkey)?;
    let sig = Signature::from_slice(signature).map_err(|_| KeyError::InvalidSignature)?;
    Ok(vk.verify(msg, &sig).is_ok())
}

mod signkey_base58 {
    use super::KEY_BYTE_SIZE;
    use ed25519_dalek::SigningKey;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use zeroize::Zeroizing;

    pub fn serialize<S: Serializer>(sk: &SigningKey, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = Zeroizing::new(bs58::encode(sk.to_bytes()).into_string());
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SigningKey, D::Error> {
        let encoded = Zeroizing::new(String::deserialize(deserializer)?);
        let bytes = Zeroizing::new(
            bs58::decode(encoded.as_str())
                .into_vec()
                .map_err(D::Error::custom)?,
        );
        let seed: [u8; KEY_BYTE_SIZE] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| D::Error::invalid_length(bytes.len(), &"a 32 byte signing key"))?;
        Ok(SigningKey::from_bytes(&seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use proptest::prelude::*;

    const SEED: &str = "000000000000000000000000Trustee1";

    #[test]
    fn seeded_generation_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let info = KeyInfo {
            seed: Some(SEED.to_string()),
            crypto_type: None,
        };
        let k1 = KeyPair::generate(&mut rng, &info).unwrap();
        let k2 = KeyPair::generate(&mut rng, &info).unwrap();
        assert_eq!(k1, k2);

        // Hex form of the same seed gives the same key
        let hex_info = KeyInfo {
            seed: Some(hex::encode(SEED)),
            crypto_type: Some("ed25519".to_string()),
        };
        assert_eq!(KeyPair::generate(&mut rng, &hex_info).unwrap(), k1);

        let r1 = KeyPair::generate(&mut rng, &KeyInfo::default()).unwrap();
        let r2 = KeyPair::generate(&mut rng, &KeyInfo::default()).unwrap();
        assert_ne!(r1.verkey, r2.verkey);
    }

    #[test]
    fn bad_inputs() {
        let mut rng = StdRng::seed_from_u64(0u64);
        assert!(matches!(
            KeyPair::generate(
                &mut rng,
                &KeyInfo {
                    seed: Some("short".to_string()),
                    crypto_type: None
                }
            ),
            Err(KeyError::InvalidSeed(_))
        ));
        assert!(matches!(
            KeyPair::generate(
                &mut rng,
                &KeyInfo {
                    seed: Some("z".repeat(64)),
                    crypto_type: None
                }
            ),
            Err(KeyError::InvalidSeed(_))
        ));
        assert!(matches!(
            KeyPair::generate(
                &mut rng,
                &KeyInfo {
                    seed: None,
                    crypto_type: Some("secp256k1".to_string())
                }
            ),
            Err(KeyError::UnknownCryptoType(_))
        ));
        assert!(matches!(validate_did("abc"), Err(KeyError::InvalidDid(_))));
        assert!(matches!(
            validate_did("0OIl"),
            Err(KeyError::InvalidDid(_))
        ));
        assert!(matches!(
            decode_verkey("3yZe7d"),
            Err(KeyError::InvalidVerkey(_))
        ));
    }

    #[test]
    fn dids_and_abbreviated_verkeys() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let key = KeyPair::generate(&mut rng, &KeyInfo::default()).unwrap();
        let vk = key.verifying_key();

        let did = did_from_verkey(&vk, false);
        assert_eq!(validate_did(&did).unwrap().len(), SHORT_DID_BYTE_SIZE);
        let cid = did_from_verkey(&vk, true);
        assert_eq!(cid, key.verkey);

        let abbr = abbreviate_verkey(&did, &key.verkey).unwrap();
        assert!(abbr.starts_with('~'));
        assert_eq!(build_full_verkey(&did, Some(&abbr)).unwrap(), key.verkey);
        assert_eq!(
            build_full_verkey(&did, Some(&key.verkey)).unwrap(),
            key.verkey
        );
        assert_eq!(build_full_verkey(&cid, None).unwrap(), key.verkey);
        assert!(build_full_verkey(&did, None).is_err());
        // A cryptonym cannot use an abbreviated verkey
        assert!(build_full_verkey(&cid, Some(&abbr)).is_err());
    }

    #[test]
    fn sign_verify() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let key = KeyPair::generate(&mut rng, &KeyInfo::default()).unwrap();
        let other = KeyPair::generate(&mut rng, &KeyInfo::default()).unwrap();
        let msg = b"message to sign";
        let sig = key.sign(msg);
        assert!(verify(&key.verkey, msg, &sig).unwrap());
        assert!(!verify(&key.verkey, b"other message", &sig).unwrap());
        assert!(!verify(&other.verkey, msg, &sig).unwrap());
        assert!(matches!(
            verify(&key.verkey, msg, &sig[..10]),
            Err(KeyError::InvalidSignature)
        ));
    }

    #[test]
    fn serialization_keeps_secret_and_redacts_debug() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let key = KeyPair::generate(&mut rng, &KeyInfo::default()).unwrap();
        let ser = serde_json::to_string(&key).unwrap();
        let deser: KeyPair = serde_json::from_str(&ser).unwrap();
        assert_eq!(deser, key);
        assert!(ser.contains("\"crypto_type\":\"ed25519\""));

        let dbg = format!("{:?}", key);
        assert!(dbg.contains("<redacted>"));
        assert!(!dbg.contains(&bs58::encode(key.signing_key().to_bytes()).into_string()));
    }

    proptest! {
        #[test]
        fn hex_seeds_give_expandable_dids(seed in any::<[u8; 32]>()) {
            let mut rng = StdRng::seed_from_u64(0u64);
            let info = KeyInfo { seed: Some(hex::encode(seed)), crypto_type: None };
            let key = KeyPair::generate(&mut rng, &info).unwrap();
            prop_assert_eq!(&KeyPair::generate(&mut rng, &info).unwrap(), &key);

            let did = did_from_verkey(&key.verifying_key(), false);
            let abbr = abbreviate_verkey(&did, &key.verkey).unwrap();
            prop_assert_eq!(build_full_verkey(&did, Some(&abbr)).unwrap(), key.verkey);
        }
    }
}
