//! Authenticated public-key encryption for direct messages.
//!
//! X25519 Diffie-Hellman between the sender's private key and the
//! recipient's public key, HKDF-SHA256 to turn the raw shared secret into a
//! cipher key, and XChaCha20-Poly1305 with a fresh 24-byte random nonce for
//! the authenticated ciphertext.
//!
//! The derivation uses no party-specific context, so the key is symmetric in
//! the pair: (A-private, B-public) and (B-private, A-public) yield the same
//! cipher key, and a sender can in principle open its own ciphertext.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ClientError, ClientResult};

/// Size of an X25519 public key in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Size of an X25519 private key in bytes.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Size of a message nonce in bytes.
pub const NONCE_LEN: usize = 24;

/// Domain separation string for the cipher-key derivation. Must not encode
/// anything pair-asymmetric, or the decrypt symmetry breaks.
const KDF_CONTEXT: &[u8] = b"murmur box v1";

/// X25519 public key half of an identity keypair.
#[derive(Clone, PartialEq, Eq)]
pub struct BoxPublicKey {
    bytes: [u8; PUBLIC_KEY_LEN],
}

impl BoxPublicKey {
    pub fn from_bytes(bytes: &[u8]) -> ClientResult<Self> {
        let arr: [u8; PUBLIC_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| ClientError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len())))?;
        Ok(Self { bytes: arr })
    }

    pub fn from_base64(encoded: &str) -> ClientResult<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| ClientError::InvalidKey("invalid base64".into()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for BoxPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BoxPublicKey({:02x}{:02x}..)",
            self.bytes[0], self.bytes[1]
        )
    }
}

/// X25519 private key half. Zeroized on drop; Debug is redacted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct BoxPrivateKey {
    bytes: [u8; PRIVATE_KEY_LEN],
}

impl BoxPrivateKey {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        Self {
            bytes: secret.to_bytes(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> ClientResult<Self> {
        let arr: [u8; PRIVATE_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| ClientError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len())))?;
        Ok(Self { bytes: arr })
    }

    pub fn from_base64(encoded: &str) -> ClientResult<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| ClientError::InvalidKey("invalid base64".into()))?;
        Self::from_bytes(&bytes)
    }

    /// Base64 for local persistence only. The value never goes on the wire.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.bytes)
    }

    pub fn public_key(&self) -> BoxPublicKey {
        let secret = StaticSecret::from(self.bytes);
        let public = PublicKey::from(&secret);
        BoxPublicKey {
            bytes: public.to_bytes(),
        }
    }
}

impl std::fmt::Debug for BoxPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BoxPrivateKey([REDACTED])")
    }
}

/// Generate a fresh identity keypair.
pub fn generate_keypair() -> (BoxPublicKey, BoxPrivateKey) {
    let private = BoxPrivateKey::generate();
    let public = private.public_key();
    (public, private)
}

/// Generate a fresh 24-byte random nonce. The 192-bit space makes accidental
/// collision negligible over the lifetime of a key pair.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Derive the pair's cipher key: DH shared secret expanded through
/// HKDF-SHA256 under a pair-independent context.
fn derive_pair_key(my_private: &BoxPrivateKey, their_public: &BoxPublicKey) -> [u8; 32] {
    let secret = StaticSecret::from(my_private.bytes);
    let peer = PublicKey::from(*their_public.as_bytes());
    let shared = secret.diffie_hellman(&peer);

    let hk = Hkdf::<Sha256>::new(None, shared.as_bytes());
    let mut key = [0u8; 32];
    hk.expand(KDF_CONTEXT, &mut key)
        .expect("HKDF expand must succeed for 32 byte output");
    key
}

/// Encrypt `plaintext` for the holder of `their_public`.
///
/// Returns the authenticated ciphertext and the fresh nonce bound to it.
pub fn seal(
    plaintext: &[u8],
    their_public: &BoxPublicKey,
    my_private: &BoxPrivateKey,
) -> ClientResult<(Vec<u8>, [u8; NONCE_LEN])> {
    let mut key = derive_pair_key(my_private, their_public);
    let cipher = XChaCha20Poly1305::new((&key).into());

    let nonce = generate_nonce();
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| ClientError::Authentication)?;
    key.zeroize();

    Ok((ciphertext, nonce))
}

/// Decrypt and verify a message from the holder of `their_public`.
///
/// The Poly1305 tag is verified before any plaintext is released; a
/// tampered ciphertext, wrong nonce or wrong counterpart key fails with
/// [`ClientError::Authentication`] and never yields partial output.
pub fn open(
    ciphertext: &[u8],
    nonce: &[u8],
    their_public: &BoxPublicKey,
    my_private: &BoxPrivateKey,
) -> ClientResult<Vec<u8>> {
    if nonce.len() != NONCE_LEN {
        return Err(ClientError::InvalidNonce(format!(
            "expected {} bytes, got {}",
            NONCE_LEN,
            nonce.len()
        )));
    }

    let mut key = derive_pair_key(my_private, their_public);
    let cipher = XChaCha20Poly1305::new((&key).into());

    let plaintext = cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| ClientError::Authentication);
    key.zeroize();

    plaintext
}
