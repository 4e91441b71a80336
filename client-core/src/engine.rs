//! CryptoEngine: the local keypair plus the two caches that ride along with
//! it — counterpart public keys and locally composed plaintext.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::crypto::{self, BoxPrivateKey, BoxPublicKey};
use crate::error::{ClientError, ClientResult};
use crate::keystore::{keys, Keystore};

pub struct CryptoEngine<K: Keystore> {
    store: K,
}

impl<K: Keystore> CryptoEngine<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    /// Generate and persist the identity keypair if none exists yet.
    /// Idempotent: an existing keypair is never overwritten.
    pub fn ensure_keypair(&self) -> ClientResult<BoxPublicKey> {
        if let (Some(_), Some(public)) = (
            self.store.get(keys::IDENTITY_PRIVATE_KEY)?,
            self.store.get(keys::IDENTITY_PUBLIC_KEY)?,
        ) {
            return BoxPublicKey::from_base64(&public);
        }

        let (public, private) = crypto::generate_keypair();
        self.store
            .put(keys::IDENTITY_PRIVATE_KEY, &private.to_base64())?;
        self.store
            .put(keys::IDENTITY_PUBLIC_KEY, &public.to_base64())?;
        Ok(public)
    }

    pub fn public_key(&self) -> ClientResult<BoxPublicKey> {
        let encoded = self
            .store
            .get(keys::IDENTITY_PUBLIC_KEY)?
            .ok_or_else(|| ClientError::Keystore("no identity keypair".into()))?;
        BoxPublicKey::from_base64(&encoded)
    }

    fn private_key(&self) -> ClientResult<BoxPrivateKey> {
        let encoded = self
            .store
            .get(keys::IDENTITY_PRIVATE_KEY)?
            .ok_or_else(|| ClientError::Keystore("no identity keypair".into()))?;
        BoxPrivateKey::from_base64(&encoded)
    }

    /// Encrypt `plaintext` for a peer and cache the plaintext under the
    /// nonce so self-authored history entries can be shown again without a
    /// second decryption pass.
    ///
    /// Returns base64 `(ciphertext, nonce)` ready for the wire.
    pub fn encrypt_for(
        &self,
        peer_public_b64: &str,
        plaintext: &str,
    ) -> ClientResult<(String, String)> {
        let peer = BoxPublicKey::from_base64(peer_public_b64)?;
        let private = self.private_key()?;

        let (ciphertext, nonce) = crypto::seal(plaintext.as_bytes(), &peer, &private)?;
        let nonce_b64 = STANDARD.encode(nonce);

        self.store.put(&keys::outbox(&nonce_b64), plaintext)?;

        Ok((STANDARD.encode(ciphertext), nonce_b64))
    }

    /// Decrypt a message from a peer. Fails with
    /// [`ClientError::Authentication`] on any tag mismatch.
    pub fn decrypt_from(
        &self,
        peer_public_b64: &str,
        ciphertext_b64: &str,
        nonce_b64: &str,
    ) -> ClientResult<String> {
        let peer = BoxPublicKey::from_base64(peer_public_b64)?;
        let private = self.private_key()?;

        let ciphertext = STANDARD
            .decode(ciphertext_b64)
            .map_err(|_| ClientError::Authentication)?;
        let nonce = STANDARD
            .decode(nonce_b64)
            .map_err(|_| ClientError::InvalidNonce("invalid base64".into()))?;

        let plaintext = crypto::open(&ciphertext, &nonce, &peer, &private)?;
        String::from_utf8(plaintext).map_err(|_| ClientError::Authentication)
    }

    pub fn cached_peer_key(&self, username: &str) -> ClientResult<Option<String>> {
        self.store.get(&keys::peer_public_key(username))
    }

    pub fn cache_peer_key(&self, username: &str, public_key_b64: &str) -> ClientResult<()> {
        self.store
            .put(&keys::peer_public_key(username), public_key_b64)
    }

    /// Locally composed plaintext for a sent message, if still cached.
    pub fn cached_sent_plaintext(&self, nonce_b64: &str) -> ClientResult<Option<String>> {
        self.store.get(&keys::outbox(nonce_b64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::MemoryKeystore;

    #[test]
    fn ensure_keypair_is_idempotent() {
        let engine = CryptoEngine::new(MemoryKeystore::new());
        let first = engine.ensure_keypair().unwrap();
        let second = engine.ensure_keypair().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn encrypt_populates_outbox_cache() {
        let alice = CryptoEngine::new(MemoryKeystore::new());
        alice.ensure_keypair().unwrap();
        let bob = CryptoEngine::new(MemoryKeystore::new());
        let bob_public = bob.ensure_keypair().unwrap();

        let (_, nonce) = alice
            .encrypt_for(&bob_public.to_base64(), "hello bob")
            .unwrap();

        assert_eq!(
            alice.cached_sent_plaintext(&nonce).unwrap().as_deref(),
            Some("hello bob")
        );
    }

    #[test]
    fn engines_round_trip_between_two_parties() {
        let alice = CryptoEngine::new(MemoryKeystore::new());
        let alice_public = alice.ensure_keypair().unwrap();
        let bob = CryptoEngine::new(MemoryKeystore::new());
        let bob_public = bob.ensure_keypair().unwrap();

        let (ciphertext, nonce) = alice.encrypt_for(&bob_public.to_base64(), "hi").unwrap();
        let plaintext = bob
            .decrypt_from(&alice_public.to_base64(), &ciphertext, &nonce)
            .unwrap();
        assert_eq!(plaintext, "hi");
    }

    #[test]
    fn peer_key_cache_round_trips() {
        let engine = CryptoEngine::new(MemoryKeystore::new());
        assert_eq!(engine.cached_peer_key("bob").unwrap(), None);
        engine.cache_peer_key("bob", "a2V5").unwrap();
        assert_eq!(
            engine.cached_peer_key("bob").unwrap().as_deref(),
            Some("a2V5")
        );
    }
}
