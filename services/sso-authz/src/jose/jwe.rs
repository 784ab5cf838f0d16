//! Compact JWE encryption and decryption bound to a single key.
//!
//! Content is sealed with AES-GCM. The additional authenticated data is the
//! ASCII of the encoded protected header, the IV is 96 bits and the tag
//! 128 bits.

use super::algorithm::{EncryptionMethod, JweAlgorithm};
use super::error::JoseError;
use super::jwk::{Jwk, KeyKind};
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes128Gcm, Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use tracing::warn;
use zeroize::Zeroizing;

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

const RSA_ALGORITHMS: &[JweAlgorithm] = &[JweAlgorithm::RsaOaep256];
const DIRECT_ALGORITHMS: &[JweAlgorithm] = &[JweAlgorithm::Dir];
const ALL_METHODS: &[EncryptionMethod] = &[EncryptionMethod::A128Gcm, EncryptionMethod::A256Gcm];

#[derive(Debug, Serialize, Deserialize)]
struct JweHeader {
    alg: JweAlgorithm,
    enc: EncryptionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cty: Option<String>,
}

/// Result of a JWE encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedToken {
    /// Compact serialization
    pub compact: String,
    /// Key used
    pub key_id: String,
    /// Key management algorithm used
    pub algorithm: JweAlgorithm,
    /// Content encryption method used
    pub method: EncryptionMethod,
}

impl EncryptedToken {
    /// Compact serialization.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.compact
    }
}

fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn direct_methods(method: EncryptionMethod) -> &'static [EncryptionMethod] {
    match method {
        EncryptionMethod::A128Gcm => &ALL_METHODS[..1],
        EncryptionMethod::A256Gcm => &ALL_METHODS[1..],
    }
}

fn seal(
    method: EncryptionMethod,
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, aes_gcm::Error> {
    let payload = Payload { msg: plaintext, aad };
    match method {
        EncryptionMethod::A128Gcm => Aes128Gcm::new_from_slice(cek)
            .map_err(|_| aes_gcm::Error)?
            .encrypt(Nonce::from_slice(iv), payload),
        EncryptionMethod::A256Gcm => Aes256Gcm::new_from_slice(cek)
            .map_err(|_| aes_gcm::Error)?
            .encrypt(Nonce::from_slice(iv), payload),
    }
}

fn open(
    method: EncryptionMethod,
    cek: &[u8],
    iv: &[u8],
    aad: &[u8],
    sealed: &[u8],
) -> Result<Vec<u8>, aes_gcm::Error> {
    let payload = Payload { msg: sealed, aad };
    match method {
        EncryptionMethod::A128Gcm => Aes128Gcm::new_from_slice(cek)
            .map_err(|_| aes_gcm::Error)?
            .decrypt(Nonce::from_slice(iv), payload),
        EncryptionMethod::A256Gcm => Aes256Gcm::new_from_slice(cek)
            .map_err(|_| aes_gcm::Error)?
            .decrypt(Nonce::from_slice(iv), payload),
    }
}

/// Encrypter bound to one key.
pub enum Encrypter {
    /// RSA public key, `RSA-OAEP-256` key wrapping
    Rsa {
        /// Key id
        kid: String,
        /// Recipient public key
        key: RsaPublicKey,
    },
    /// Shared secret used directly as the content key
    Direct {
        /// Key id
        kid: String,
        /// Content encryption key
        secret: Zeroizing<Vec<u8>>,
        /// The one method the secret length allows
        method: EncryptionMethod,
    },
}

impl fmt::Debug for Encrypter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa { kid, .. } => f.debug_struct("Rsa").field("kid", kid).finish_non_exhaustive(),
            Self::Direct { kid, method, .. } => f
                .debug_struct("Direct")
                .field("kid", kid)
                .field("method", method)
                .finish_non_exhaustive(),
        }
    }
}

impl Encrypter {
    /// Build the encrypter for a key, or `None` if the key cannot encrypt.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyMaterial` if an RSA or `oct` key is malformed.
    pub fn from_jwk(kid: &str, jwk: &Jwk) -> Result<Option<Self>, JoseError> {
        match jwk.kind() {
            KeyKind::Rsa => Ok(Some(Self::Rsa {
                kid: kid.to_string(),
                key: jwk.rsa_public_key()?,
            })),
            KeyKind::Oct => {
                let secret = jwk.octet_bytes()?;
                match EncryptionMethod::for_key_len(secret.len()) {
                    Some(method) => Ok(Some(Self::Direct {
                        kid: kid.to_string(),
                        secret,
                        method,
                    })),
                    None => {
                        warn!(kid, bytes = secret.len(), "secret length fits no content encryption method, no encrypter built");
                        Ok(None)
                    }
                }
            }
            KeyKind::Ec | KeyKind::Okp | KeyKind::Other(_) => {
                warn!(kid, kty = %jwk.kty, "key type not supported for encryption, skipped");
                Ok(None)
            }
        }
    }

    /// Key id.
    #[must_use]
    pub fn kid(&self) -> &str {
        match self {
            Self::Rsa { kid, .. } | Self::Direct { kid, .. } => kid,
        }
    }

    /// Key management algorithms this encrypter implements.
    #[must_use]
    pub const fn supported_algorithms(&self) -> &'static [JweAlgorithm] {
        match self {
            Self::Rsa { .. } => RSA_ALGORITHMS,
            Self::Direct { .. } => DIRECT_ALGORITHMS,
        }
    }

    /// Content encryption methods this encrypter implements.
    #[must_use]
    pub fn supported_methods(&self) -> &'static [EncryptionMethod] {
        match self {
            Self::Rsa { .. } => ALL_METHODS,
            Self::Direct { method, .. } => direct_methods(*method),
        }
    }

    /// Algorithm and method used when the caller has no preference.
    #[must_use]
    pub const fn preferred(&self) -> (JweAlgorithm, EncryptionMethod) {
        match self {
            Self::Rsa { .. } => (JweAlgorithm::RsaOaep256, EncryptionMethod::A256Gcm),
            Self::Direct { method, .. } => (JweAlgorithm::Dir, *method),
        }
    }

    /// Encrypt into compact serialization.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedAlgorithm` if this key cannot use `algorithm` or
    /// `method`, and `EncryptionFailed` on any cryptographic failure.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        algorithm: JweAlgorithm,
        method: EncryptionMethod,
        content_type: Option<&str>,
    ) -> Result<EncryptedToken, JoseError> {
        let kid = self.kid();
        if !self.supported_algorithms().contains(&algorithm) {
            return Err(JoseError::unsupported(algorithm.as_str(), Some(kid)));
        }
        if !self.supported_methods().contains(&method) {
            return Err(JoseError::unsupported(method.as_str(), Some(kid)));
        }

        let mut rng = rand::thread_rng();
        let (cek, encrypted_key) = match self {
            Self::Rsa { key, .. } => {
                let mut cek = Zeroizing::new(vec![0u8; method.key_len()]);
                rng.fill_bytes(&mut cek);
                let wrapped = key
                    .encrypt(&mut rng, Oaep::new::<Sha256>(), &cek)
                    .map_err(|e| JoseError::encryption(kid, e.to_string()))?;
                (cek, wrapped)
            }
            Self::Direct { secret, .. } => (secret.clone(), Vec::new()),
        };

        let header = JweHeader {
            alg: algorithm,
            enc: method,
            kid: Some(kid.to_string()),
            cty: content_type.map(str::to_string),
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|e| JoseError::encryption(kid, e.to_string()))?;
        let protected = encode(&header_json);

        let mut iv = [0u8; IV_LEN];
        rng.fill_bytes(&mut iv);

        let mut sealed = seal(method, &cek, &iv, protected.as_bytes(), plaintext)
            .map_err(|_| JoseError::encryption(kid, "content encryption failed"))?;
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(EncryptedToken {
            compact: format!(
                "{protected}.{}.{}.{}.{}",
                encode(&encrypted_key),
                encode(&iv),
                encode(&sealed),
                encode(&tag)
            ),
            key_id: kid.to_string(),
            algorithm,
            method,
        })
    }
}

/// Decrypter bound to one key.
pub enum Decrypter {
    /// RSA private key, `RSA-OAEP-256` key unwrapping
    Rsa {
        /// Key id
        kid: String,
        /// Private key
        key: Box<RsaPrivateKey>,
    },
    /// Shared secret used directly as the content key
    Direct {
        /// Key id
        kid: String,
        /// Content encryption key
        secret: Zeroizing<Vec<u8>>,
        /// The one method the secret length allows
        method: EncryptionMethod,
    },
}

impl fmt::Debug for Decrypter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa { kid, .. } => f.debug_struct("Rsa").field("kid", kid).finish_non_exhaustive(),
            Self::Direct { kid, method, .. } => f
                .debug_struct("Direct")
                .field("kid", kid)
                .field("method", method)
                .finish_non_exhaustive(),
        }
    }
}

impl Decrypter {
    /// Build the decrypter for a key, or `None` if the key cannot decrypt.
    ///
    /// RSA keys decrypt only when their private half is present.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyMaterial` if an RSA or `oct` key is malformed.
    pub fn from_jwk(kid: &str, jwk: &Jwk) -> Result<Option<Self>, JoseError> {
        match jwk.kind() {
            KeyKind::Rsa => Ok(jwk.rsa_private_key()?.map(|key| Self::Rsa {
                kid: kid.to_string(),
                key: Box::new(key),
            })),
            KeyKind::Oct => {
                let secret = jwk.octet_bytes()?;
                Ok(EncryptionMethod::for_key_len(secret.len()).map(|method| Self::Direct {
                    kid: kid.to_string(),
                    secret,
                    method,
                }))
            }
            KeyKind::Ec | KeyKind::Okp | KeyKind::Other(_) => Ok(None),
        }
    }

    /// Key id.
    #[must_use]
    pub fn kid(&self) -> &str {
        match self {
            Self::Rsa { kid, .. } | Self::Direct { kid, .. } => kid,
        }
    }

    /// Key management algorithms this decrypter implements.
    #[must_use]
    pub const fn supported_algorithms(&self) -> &'static [JweAlgorithm] {
        match self {
            Self::Rsa { .. } => RSA_ALGORITHMS,
            Self::Direct { .. } => DIRECT_ALGORITHMS,
        }
    }

    /// Content encryption methods this decrypter implements.
    #[must_use]
    pub fn supported_methods(&self) -> &'static [EncryptionMethod] {
        match self {
            Self::Rsa { .. } => ALL_METHODS,
            Self::Direct { method, .. } => direct_methods(*method),
        }
    }

    /// Decrypt a compact JWE.
    ///
    /// # Errors
    ///
    /// Returns `DecryptionFailed` if the token is malformed, uses an
    /// algorithm this key does not implement, or fails authentication.
    pub fn decrypt(&self, compact: &str) -> Result<Vec<u8>, JoseError> {
        let kid = self.kid();
        let fail = |reason: &str| JoseError::decryption(kid, reason);
        let decode = |part: &str, name: &str| {
            URL_SAFE_NO_PAD
                .decode(part)
                .map_err(|_| JoseError::decryption(kid, format!("{name} is not base64url")))
        };

        let parts: Vec<&str> = compact.split('.').collect();
        let [protected, encrypted_key, iv, ciphertext, tag] = parts.as_slice() else {
            return Err(fail("expected five compact segments"));
        };

        let header: JweHeader = serde_json::from_slice(&decode(protected, "header")?)
            .map_err(|_| fail("unsupported or malformed protected header"))?;
        if !self.supported_algorithms().contains(&header.alg) {
            return Err(JoseError::decryption(kid, format!("key cannot unwrap '{}'", header.alg)));
        }
        if !self.supported_methods().contains(&header.enc) {
            return Err(JoseError::decryption(kid, format!("key cannot decrypt '{}'", header.enc)));
        }

        let encrypted_key = decode(encrypted_key, "encrypted key")?;
        let cek = match self {
            Self::Rsa { key, .. } => Zeroizing::new(
                key.decrypt(Oaep::new::<Sha256>(), &encrypted_key)
                    .map_err(|_| fail("key unwrap failed"))?,
            ),
            Self::Direct { secret, .. } => {
                if !encrypted_key.is_empty() {
                    return Err(fail("direct encryption carries no encrypted key"));
                }
                secret.clone()
            }
        };
        if cek.len() != header.enc.key_len() {
            return Err(fail("content key length does not match method"));
        }

        let iv = decode(iv, "iv")?;
        if iv.len() != IV_LEN {
            return Err(fail("iv must be 96 bits"));
        }
        let tag = decode(tag, "tag")?;
        if tag.len() != TAG_LEN {
            return Err(fail("tag must be 128 bits"));
        }
        let mut sealed = decode(ciphertext, "ciphertext")?;
        sealed.extend_from_slice(&tag);

        open(header.enc, &cek, &iv, protected.as_bytes(), &sealed)
            .map_err(|_| fail("authentication failed"))
    }
}
