//! Hash and HMAC primitives backing `hash` and `keyedHash`.

use std::str::FromStr;

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use super::CapabilityError;

/// Digest algorithms reachable from scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// MD5 (RFC 1321).
    Md5,
    /// SHA-1.
    Sha1,
    /// SHA-224.
    Sha224,
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

impl HashAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [Self; 6] = [
        Self::Md5,
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
    ];

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = CapabilityError;

    /// Case-insensitive; `-` and `_` are ignored so `SHA-256` parses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == normalized)
            .ok_or_else(|| CapabilityError::UnknownAlgorithm(s.to_owned()))
    }
}

/// Digest `data` with `alg`.
pub fn hash(alg: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match alg {
        HashAlgorithm::Md5 => Md5::digest(data).to_vec(),
        HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
        HashAlgorithm::Sha224 => Sha224::digest(data).to_vec(),
        HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
        HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
    }
}

/// HMAC (RFC 2104) of `message` under `key` using `alg`.
///
/// # Errors
///
/// Returns [`CapabilityError::InvalidArgument`] if the MAC rejects the key.
pub fn keyed_hash(
    alg: HashAlgorithm,
    key: &[u8],
    message: &[u8],
) -> Result<Vec<u8>, CapabilityError> {
    match alg {
        HashAlgorithm::Md5 => mac::<Hmac<Md5>>(key, message),
        HashAlgorithm::Sha1 => mac::<Hmac<Sha1>>(key, message),
        HashAlgorithm::Sha224 => mac::<Hmac<Sha224>>(key, message),
        HashAlgorithm::Sha256 => mac::<Hmac<Sha256>>(key, message),
        HashAlgorithm::Sha384 => mac::<Hmac<Sha384>>(key, message),
        HashAlgorithm::Sha512 => mac::<Hmac<Sha512>>(key, message),
    }
}

fn mac<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> Result<Vec<u8>, CapabilityError> {
    let mut mac = <M as KeyInit>::new_from_slice(key)
        .map_err(|e| CapabilityError::InvalidArgument(format!("unusable HMAC key: {e}")))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}
