//! Key derivation and per-segment AEAD sealing

use super::format::{Header, NONCE_LEN};
use super::{CipherAlgo, CryptoError, DigestAlgo};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::ChaCha20Poly1305;
use hmac::Hmac;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

/// Authentication tag appended to every sealed segment
pub const TAG_LEN: usize = 16;

/// Derive the cipher key from the passphrase with PBKDF2
pub fn derive_key(passphrase: &[u8], header: &Header) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let mut key = Zeroizing::new(vec![0u8; header.cipher.key_len()]);
    let result = match header.digest {
        DigestAlgo::Sha256 => pbkdf2::pbkdf2::<Hmac<Sha256>>(
            passphrase,
            &header.salt,
            header.iterations,
            key.as_mut_slice(),
        ),
        DigestAlgo::Sha512 => pbkdf2::pbkdf2::<Hmac<Sha512>>(
            passphrase,
            &header.salt,
            header.iterations,
            key.as_mut_slice(),
        ),
    };
    result.map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// XOR a segment counter into the last 8 bytes of the base nonce
pub fn segment_nonce(base: &[u8; NONCE_LEN], counter: u64) -> [u8; NONCE_LEN] {
    let mut nonce = *base;
    for (slot, byte) in nonce[NONCE_LEN - 8..].iter_mut().zip(counter.to_be_bytes()) {
        *slot ^= byte;
    }
    nonce
}

/// AAD binding a segment to the header, its position and finality
pub fn segment_aad(header_bytes: &[u8], counter: u64, last: bool) -> Vec<u8> {
    let mut aad = Vec::with_capacity(header_bytes.len() + 9);
    aad.extend_from_slice(header_bytes);
    aad.extend_from_slice(&counter.to_be_bytes());
    aad.push(u8::from(last));
    aad
}

pub enum SegmentCipher {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
    ChaCha20(ChaCha20Poly1305),
}

impl SegmentCipher {
    pub fn new(algo: CipherAlgo, key: &[u8]) -> Result<Self, CryptoError> {
        let invalid = |_| CryptoError::InvalidKeyLength {
            expected: algo.key_len(),
            got: key.len(),
        };
        Ok(match algo {
            CipherAlgo::Aes128 => SegmentCipher::Aes128(Aes128Gcm::new_from_slice(key).map_err(invalid)?),
            CipherAlgo::Aes256 => SegmentCipher::Aes256(Aes256Gcm::new_from_slice(key).map_err(invalid)?),
            CipherAlgo::ChaCha20 => {
                SegmentCipher::ChaCha20(ChaCha20Poly1305::new_from_slice(key).map_err(invalid)?)
            }
        })
    }

    pub fn seal(&self, nonce: &[u8; NONCE_LEN], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let payload = Payload { msg, aad };
        let sealed = match self {
            SegmentCipher::Aes128(c) => c.encrypt(aes_gcm::Nonce::from_slice(nonce), payload),
            SegmentCipher::Aes256(c) => c.encrypt(aes_gcm::Nonce::from_slice(nonce), payload),
            SegmentCipher::ChaCha20(c) => c.encrypt(chacha20poly1305::Nonce::from_slice(nonce), payload),
        };
        sealed.map_err(|e| CryptoError::Seal(e.to_string()))
    }

    pub fn open(&self, nonce: &[u8; NONCE_LEN], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let payload = Payload { msg, aad };
        let opened = match self {
            SegmentCipher::Aes128(c) => c.decrypt(aes_gcm::Nonce::from_slice(nonce), payload),
            SegmentCipher::Aes256(c) => c.decrypt(aes_gcm::Nonce::from_slice(nonce), payload),
            SegmentCipher::ChaCha20(c) => c.decrypt(chacha20poly1305::Nonce::from_slice(nonce), payload),
        };
        // A failed tag check is indistinguishable from a wrong passphrase
        opened.map_err(|_| CryptoError::Authentication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CompressionAlgo;

    fn header(cipher: CipherAlgo, digest: DigestAlgo) -> Header {
        Header {
            cipher,
            digest,
            compression: CompressionAlgo::None,
            level: 0,
            iterations: 1_000,
            salt: [0x42; 16],
            nonce: [0x01; 12],
            filename: "a.txt".to_string(),
        }
    }

    #[test]
    fn test_derive_key_deterministic_and_sized() {
        let h = header(CipherAlgo::Aes128, DigestAlgo::Sha256);
        let k1 = derive_key(b"passphrase", &h).unwrap();
        let k2 = derive_key(b"passphrase", &h).unwrap();
        assert_eq!(k1.as_slice(), k2.as_slice());
        assert_eq!(k1.len(), 16);

        let h256 = header(CipherAlgo::Aes256, DigestAlgo::Sha512);
        assert_eq!(derive_key(b"passphrase", &h256).unwrap().len(), 32);
    }

    #[test]
    fn test_digest_changes_key() {
        let a = derive_key(b"pw", &header(CipherAlgo::Aes256, DigestAlgo::Sha256)).unwrap();
        let b = derive_key(b"pw", &header(CipherAlgo::Aes256, DigestAlgo::Sha512)).unwrap();
        assert_ne!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_segment_nonce_xor() {
        let base = [0xFF; 12];
        assert_eq!(segment_nonce(&base, 0), base);
        let n = segment_nonce(&base, 1);
        assert_eq!(n[11], 0xFE);
        assert_eq!(n[0..4], [0xFF; 4]);
    }

    #[test]
    fn test_seal_open_each_cipher() {
        for algo in [CipherAlgo::Aes128, CipherAlgo::Aes256, CipherAlgo::ChaCha20] {
            let key = vec![0x11; algo.key_len()];
            let cipher = SegmentCipher::new(algo, &key).unwrap();
            let nonce = [3u8; 12];
            let sealed = cipher.seal(&nonce, b"segment", b"aad").unwrap();
            assert_eq!(sealed.len(), b"segment".len() + TAG_LEN);
            assert_eq!(cipher.open(&nonce, &sealed, b"aad").unwrap(), b"segment");
            assert!(matches!(
                cipher.open(&nonce, &sealed, b"other"),
                Err(CryptoError::Authentication)
            ));
        }
    }

    #[test]
    fn test_wrong_key_length() {
        assert!(matches!(
            SegmentCipher::new(CipherAlgo::Aes256, &[0u8; 16]),
            Err(CryptoError::InvalidKeyLength { expected: 32, got: 16 })
        ));
    }
}
