//! Symmetric half of ECIES. A shared secret from some Diffie-Hellman exchange is expanded with
//! HKDF-SHA256 into a key for an AEAD cipher which then seals the message. The caller does the
//! key agreement so this works for any curve.

use aead::{generic_array::GenericArray, Aead, KeyInit, Payload};
use ark_std::{rand::RngCore, vec::Vec};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

#[derive(Debug, thiserror::Error)]
pub enum EciesError {
    #[error("cannot derive a symmetric key of the requested size")]
    KeyDerivation,
    #[error("encryption failed")]
    Encryption,
    #[error("decryption failed")]
    Decryption,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedMessage<const NONCE_BYTE_SIZE: usize> {
    #[serde(with = "serde_bytes_array")]
    pub nonce: [u8; NONCE_BYTE_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Derive a symmetric key from a shared secret.
pub fn derive_key<const KEY_BYTE_SIZE: usize>(
    shared_secret: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
) -> Result<[u8; KEY_BYTE_SIZE], EciesError> {
    let hk = Hkdf::<Sha256>::new(salt, shared_secret);
    let mut sym_key = [0u8; KEY_BYTE_SIZE];
    hk.expand(info, &mut sym_key)
        .map_err(|_| EciesError::KeyDerivation)?;
    Ok(sym_key)
}

impl<const NONCE_BYTE_SIZE: usize> SealedMessage<NONCE_BYTE_SIZE> {
    /// Encrypt `msg` under a key derived from `shared_secret`. `aad` is authenticated but not encrypted.
    pub fn seal<R: RngCore, A: Aead + KeyInit, const KEY_BYTE_SIZE: usize>(
        rng: &mut R,
        shared_secret: &[u8],
        salt: Option<&[u8]>,
        info: &[u8],
        msg: &[u8],
        aad: &[u8],
    ) -> Result<Self, EciesError> {
        let sym_key = derive_key::<KEY_BYTE_SIZE>(shared_secret, salt, info)?;
        let mut nonce = [0u8; NONCE_BYTE_SIZE];
        rng.fill_bytes(&mut nonce);
        let cipher = A::new(GenericArray::from_slice(&sym_key));
        let ciphertext = cipher
            .encrypt(GenericArray::from_slice(&nonce), Payload { msg, aad })
            .map_err(|_| EciesError::Encryption)?;
        Ok(Self { nonce, ciphertext })
    }

    pub fn open<A: Aead + KeyInit, const KEY_BYTE_SIZE: usize>(
        &self,
        shared_secret: &[u8],
        salt: Option<&[u8]>,
        info: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, EciesError> {
        let sym_key = derive_key::<KEY_BYTE_SIZE>(shared_secret, salt, info)?;
        let cipher = A::new(GenericArray::from_slice(&sym_key));
        cipher
            .decrypt(
                GenericArray::from_slice(&self.nonce),
                Payload {
                    msg: self.ciphertext.as_ref(),
                    aad,
                },
            )
            .map_err(|_| EciesError::Decryption)
    }
}

mod serde_bytes_array {
    use ark_std::vec::Vec;
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        bytes.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let v = Vec::<u8>::deserialize(deserializer)?;
        v.try_into()
            .map_err(|v: Vec<u8>| D::Error::invalid_length(v.len(), &"a fixed size nonce"))
    }
}
