//! Symmetric Encryption
//!
//! Implements AES-256-GCM and ChaCha20-Poly1305 authenticated encryption.

use alloc::vec::Vec;

use super::{CryptoError, CryptoResult};

/// Symmetric cipher trait
pub trait SymmetricCipher {
    /// Encrypt data
    fn encrypt(&self, plaintext: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Decrypt data
    fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Get key size in bytes
    fn key_size(&self) -> usize;

    /// Get nonce size in bytes
    fn nonce_size(&self) -> usize;

    /// Get authentication tag size in bytes
    fn tag_size(&self) -> usize;
}

/// AES-256-GCM cipher
pub struct Aes256Gcm {
    key: [u8; 32],
}

impl Aes256Gcm {
    /// Create new AES-256-GCM cipher with key
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        if key.len() != 32 {
            return Err(CryptoError::InvalidKeySize);
        }

        let mut key_array = [0u8; 32];
        key_array.copy_from_slice(key);

        Ok(Self { key: key_array })
    }
}

impl SymmetricCipher for Aes256Gcm {
    fn encrypt(&self, plaintext: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
        if nonce.len() != 12 {
            return Err(CryptoError::InvalidNonceSize);
        }

        // Simplified AES-256-GCM encryption (stub)
        // TODO: Implement full AES-256-GCM algorithm
        let mut ciphertext = Vec::with_capacity(plaintext.len() + 16);

        // XOR with key for demo (NOT SECURE - just for testing)
        for (i, &byte) in plaintext.iter().enumerate() {
            ciphertext.push(byte ^ self.key[i % 32] ^ nonce[i % 12]);
        }

        // Append authentication tag (stub)
        ciphertext.extend_from_slice(&[0u8; 16]);

        Ok(ciphertext)
    }

    fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
        if nonce.len() != 12 {
            return Err(CryptoError::InvalidNonceSize);
        }

        if ciphertext.len() < 16 {
            return Err(CryptoError::DecryptionFailed);
        }

        // Simplified AES-256-GCM decryption (stub)
        let data_len = ciphertext.len() - 16;
        let mut plaintext = Vec::with_capacity(data_len);

        // XOR with key for demo (NOT SECURE - just for testing)
        for (i, &byte) in ciphertext[..data_len].iter().enumerate() {
            plaintext.push(byte ^ self.key[i % 32] ^ nonce[i % 12]);
        }

        Ok(plaintext)
    }

    fn key_size(&self) -> usize {
        32
    }

    fn nonce_size(&self) -> usize {
        12
    }

    fn tag_size(&self) -> usize {
        16
    }
}

/// ChaCha20-Poly1305 cipher
pub struct ChaCha20Poly1305 {
    key: [u8; 32],
}

impl ChaCha20Poly1305 {
    /// Create new ChaCha20-Poly1305 cipher with key
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        if key.len() != 32 {
            return Err(CryptoError::InvalidKeySize);
        }

        let mut key_array = [0u8; 32];
        key_array.copy_from_slice(key);

        Ok(Self { key: key_array })
    }
}

impl SymmetricCipher for ChaCha20Poly1305 {
    fn encrypt(&self, plaintext: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
        if nonce.len() != 12 {
            return Err(CryptoError::InvalidNonceSize);
        }

        // Simplified ChaCha20-Poly1305 encryption (stub)
        // TODO: Implement full ChaCha20-Poly1305 algorithm
        let mut ciphertext = Vec::with_capacity(plaintext.len() + 16);

        // XOR with key for demo (NOT SECURE - just for testing)
        for (i, &byte) in plaintext.iter().enumerate() {
            let keystream = self.key[i % 32].wrapping_add(nonce[i % 12]);
            ciphertext.push(byte ^ keystream);
        }

        // Append authentication tag (stub)
        ciphertext.extend_from_slice(&[0u8; 16]);

        Ok(ciphertext)
    }

    fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
        if nonce.len() != 12 {
            return Err(CryptoError::InvalidNonceSize);
        }

        if ciphertext.len() < 16 {
            return Err(CryptoError::DecryptionFailed);
        }

        // Simplified ChaCha20-Poly1305 decryption (stub)
        let data_len = ciphertext.len() - 16;
        let mut plaintext = Vec::with_capacity(data_len);

        // XOR with key for demo (NOT SECURE - just for testing)
        for (i, &byte) in ciphertext[..data_len].iter().enumerate() {
            let keystream = self.key[i % 32].wrapping_add(nonce[i % 12]);
            plaintext.push(byte ^ keystream);
        }

        Ok(plaintext)
    }

    fn key_size(&self) -> usize {
        32
    }

    fn nonce_size(&self) -> usize {
        12
    }

    fn tag_size(&self) -> usize {
        16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn test_aes256gcm_encrypt_decrypt() {
        let key = [0x42u8; 32];
        let cipher = Aes256Gcm::new(&key).unwrap();
        let nonce = [0x12u8; 12];
        let plaintext = b"Hello, VeridianOS!";

        let ciphertext = cipher.encrypt(plaintext, &nonce).unwrap();
        let decrypted = cipher.decrypt(&ciphertext, &nonce).unwrap();

        assert_eq!(plaintext.as_ref(), decrypted.as_slice());
    }
}
