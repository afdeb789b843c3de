//! Pairwise message encryption with DID keys.
//!
//! The Ed25519 keys are mapped to X25519 (the birationally equivalent Montgomery form), a
//! Diffie-Hellman shared secret is expanded with HKDF-SHA256 and the payload sealed with
//! ChaCha20-Poly1305.
//!
//! - `anon_crypt` uses a fresh ephemeral key, so the recipient learns nothing about the sender.
//! - `auth_crypt` seals the payload with the static sender and recipient keys and then anon-crypts
//!   it together with the sender's verkey, so only the recipient learns who sent it.

use crate::{
    error::KeyError,
    key_manager::KeyManager,
    keys::{decode_verkey, KEY_BYTE_SIZE},
    wallet::WalletStore,
};
use ark_std::{rand::RngCore, vec::Vec};
use chacha20poly1305::ChaCha20Poly1305;
use curve25519_dalek::montgomery::MontgomeryPoint;
use ed25519_dalek::SigningKey;
use log::trace;
use serde::{Deserialize, Serialize};
use ssi_crypto_utils::ecies::SealedMessage;
use zeroize::Zeroizing;

pub const NONCE_BYTE_SIZE: usize = 12;
const SYM_KEY_BYTE_SIZE: usize = 32;

const ANON_CRYPT_INFO: &[u8] = b"did_keys : anon_crypt";
const AUTH_CRYPT_INFO: &[u8] = b"did_keys : auth_crypt";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonCryptMessage {
    /// base58 X25519 public key of the ephemeral key pair
    pub ephemeral_key: String,
    pub sealed: SealedMessage<NONCE_BYTE_SIZE>,
}

#[derive(Serialize, Deserialize)]
struct AuthCryptPayload {
    sender_verkey: String,
    sealed: SealedMessage<NONCE_BYTE_SIZE>,
}

fn x25519_public(verkey: &str) -> Result<MontgomeryPoint, KeyError> {
    Ok(decode_verkey(verkey)?.to_montgomery())
}

fn x25519_secret(sk: &SigningKey) -> Zeroizing<[u8; KEY_BYTE_SIZE]> {
    Zeroizing::new(sk.to_scalar_bytes())
}

/// `None` when the peer key has small order and the shared secret is the identity
fn diffie_hellman(
    secret: &[u8; KEY_BYTE_SIZE],
    public: &MontgomeryPoint,
) -> Option<Zeroizing<[u8; KEY_BYTE_SIZE]>> {
    let shared = public.mul_clamped(*secret);
    if shared.as_bytes() == &[0u8; KEY_BYTE_SIZE] {
        None
    } else {
        Some(Zeroizing::new(shared.to_bytes()))
    }
}

fn salt(a: &MontgomeryPoint, b: &MontgomeryPoint) -> Vec<u8> {
    [a.as_bytes().as_slice(), b.as_bytes().as_slice()].concat()
}

/// Encrypt for the owner of `their_verkey` without revealing the sender
pub fn anon_crypt<R: RngCore>(
    rng: &mut R,
    their_verkey: &str,
    msg: &[u8],
) -> Result<AnonCryptMessage, KeyError> {
    let their = x25519_public(their_verkey)?;
    let mut eph = Zeroizing::new([0u8; KEY_BYTE_SIZE]);
    rng.fill_bytes(&mut eph[..]);
    let eph_pub = MontgomeryPoint::mul_base_clamped(*eph);
    let shared = diffie_hellman(&eph, &their)
        .ok_or_else(|| KeyError::EncryptionFailed("recipient key has small order".to_string()))?;
    let sealed = SealedMessage::seal::<_, ChaCha20Poly1305, SYM_KEY_BYTE_SIZE>(
        rng,
        shared.as_slice(),
        Some(&salt(&eph_pub, &their)),
        ANON_CRYPT_INFO,
        msg,
        &[],
    )?;
    Ok(AnonCryptMessage {
        ephemeral_key: bs58::encode(eph_pub.as_bytes()).into_string(),
        sealed,
    })
}

fn open_anon(sk: &SigningKey, msg: &AnonCryptMessage) -> Result<Vec<u8>, KeyError> {
    let eph_bytes: [u8; KEY_BYTE_SIZE] = bs58::decode(&msg.ephemeral_key)
        .into_vec()
        .map_err(|e| KeyError::DecryptionFailed(e.to_string()))?
        .try_into()
        .map_err(|_| KeyError::DecryptionFailed("bad ephemeral key size".to_string()))?;
    let eph_pub = MontgomeryPoint(eph_bytes);
    let secret = x25519_secret(sk);
    let own_pub = sk.verifying_key().to_montgomery();
    let shared = diffie_hellman(&secret, &eph_pub)
        .ok_or_else(|| KeyError::DecryptionFailed("ephemeral key has small order".to_string()))?;
    Ok(msg.sealed.open::<ChaCha20Poly1305, SYM_KEY_BYTE_SIZE>(
        shared.as_slice(),
        Some(&salt(&eph_pub, &own_pub)),
        ANON_CRYPT_INFO,
        &[],
    )?)
}

impl<W: WalletStore> KeyManager<W> {
    /// Decrypt an anon-crypted message with the current key of `handle`
    pub fn anon_decrypt(&self, handle: &str, msg: &AnonCryptMessage) -> Result<Vec<u8>, KeyError> {
        trace!("anon_decrypt: >>> handle: {}", handle);
        let record = self.key_record(handle)?;
        open_anon(record.current.signing_key(), msg)
    }

    /// Encrypt for `their_verkey` so that only they can decrypt and learn the sender is `handle`
    pub fn auth_crypt<R: RngCore>(
        &self,
        rng: &mut R,
        handle: &str,
        their_verkey: &str,
        msg: &[u8],
    ) -> Result<AnonCryptMessage, KeyError> {
        trace!("auth_crypt: >>> handle: {}", handle);
        let record = self.key_record(handle)?;
        let sk = record.current.signing_key();
        let their = x25519_public(their_verkey)?;
        let own_pub = sk.verifying_key().to_montgomery();
        let shared = diffie_hellman(&x25519_secret(sk), &their).ok_or_else(|| {
            KeyError::EncryptionFailed("recipient key has small order".to_string())
        })?;
        let sender_verkey = record.verkey().to_string();
        let sealed = SealedMessage::seal::<_, ChaCha20Poly1305, SYM_KEY_BYTE_SIZE>(
            rng,
            shared.as_slice(),
            Some(&salt(&own_pub, &their)),
            AUTH_CRYPT_INFO,
            msg,
            sender_verkey.as_bytes(),
        )?;
        let payload = serde_json::to_vec(&AuthCryptPayload {
            sender_verkey,
            sealed,
        })
        .map_err(|e| KeyError::EncryptionFailed(e.to_string()))?;
        anon_crypt(rng, their_verkey, &payload)
    }

    /// Returns the sender's verkey and the plaintext
    pub fn auth_decrypt(
        &self,
        handle: &str,
        msg: &AnonCryptMessage,
    ) -> Result<(String, Vec<u8>), KeyError> {
        trace!("auth_decrypt: >>> handle: {}", handle);
        let record = self.key_record(handle)?;
        let sk = record.current.signing_key();
        let payload: AuthCryptPayload = serde_json::from_slice(&open_anon(sk, msg)?)
            .map_err(|e| KeyError::DecryptionFailed(e.to_string()))?;
        let sender = x25519_public(&payload.sender_verkey)?;
        let own_pub = sk.verifying_key().to_montgomery();
        let shared = diffie_hellman(&x25519_secret(sk), &sender).ok_or_else(|| {
            KeyError::DecryptionFailed("sender key has small order".to_string())
        })?;
        let plaintext = payload
            .sealed
            .open::<ChaCha20Poly1305, SYM_KEY_BYTE_SIZE>(
                shared.as_slice(),
                Some(&salt(&sender, &own_pub)),
                AUTH_CRYPT_INFO,
                payload.sender_verkey.as_bytes(),
            )?;
        Ok((payload.sender_verkey, plaintext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        keys::{KeyInfo, MyDidInfo},
        wallet::InMemoryWallet,
    };
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use std::sync::Arc;

    fn manager() -> KeyManager<InMemoryWallet> {
        KeyManager::new(Arc::new(InMemoryWallet::new()))
    }

    #[test]
    fn anon_crypt_round_trip() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let alice = manager();
        let (did, verkey) = alice
            .create_my_did(&mut rng, &MyDidInfo::default())
            .unwrap();
        let msg = b"for alice only".to_vec();

        let ct = anon_crypt(&mut rng, &verkey, &msg).unwrap();
        assert_eq!(alice.anon_decrypt(&did, &ct).unwrap(), msg);

        let ser = serde_json::to_string(&ct).unwrap();
        let deser: AnonCryptMessage = serde_json::from_str(&ser).unwrap();
        assert_eq!(alice.anon_decrypt(&did, &deser).unwrap(), msg);

        // Someone else cannot open it
        let (eve, _) = alice
            .create_my_did(&mut rng, &MyDidInfo::default())
            .unwrap();
        assert!(matches!(
            alice.anon_decrypt(&eve, &ct),
            Err(KeyError::DecryptionFailed(_))
        ));

        let mut tampered = ct.clone();
        tampered.sealed.ciphertext[0] ^= 1;
        assert!(matches!(
            alice.anon_decrypt(&did, &tampered),
            Err(KeyError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn auth_crypt_round_trip() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let alice = manager();
        let bob = manager();
        let (alice_did, alice_vk) = alice
            .create_my_did(&mut rng, &MyDidInfo::default())
            .unwrap();
        let (bob_did, bob_vk) = bob.create_my_did(&mut rng, &MyDidInfo::default()).unwrap();

        let msg = b"hello bob, it's alice".to_vec();
        let ct = alice
            .auth_crypt(&mut rng, &alice_did, &bob_vk, &msg)
            .unwrap();
        let (sender, pt) = bob.auth_decrypt(&bob_did, &ct).unwrap();
        assert_eq!(sender, alice_vk);
        assert_eq!(pt, msg);

        // An auth-crypted message is also a valid anon-crypted envelope but its content is
        // the inner sealed payload, not the plaintext
        assert_ne!(bob.anon_decrypt(&bob_did, &ct).unwrap(), msg);
    }

    #[test]
    fn pending_rotation_keeps_decryption() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let km = manager();
        let (did, verkey) = km.create_my_did(&mut rng, &MyDidInfo::default()).unwrap();
        let ct = anon_crypt(&mut rng, &verkey, b"before rotation").unwrap();

        let pending = km
            .start_rotation(&mut rng, &did, &KeyInfo::default())
            .unwrap();
        assert_eq!(km.anon_decrypt(&did, &ct).unwrap(), b"before rotation");

        km.apply_rotation(&did).unwrap();
        assert!(km.anon_decrypt(&did, &ct).is_err());
        let ct = anon_crypt(&mut rng, &pending, b"after rotation").unwrap();
        assert_eq!(km.anon_decrypt(&did, &ct).unwrap(), b"after rotation");
    }
}
