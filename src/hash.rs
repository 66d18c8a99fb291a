use std::fmt::{self, Display};
use std::io::Read;
use std::str::FromStr;

use anyhow::Result;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use sha3::{Keccak512, Sha3_512};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("input is empty")]
    EmptyInput,
    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    Md5,
    Sha1,
    Sha256,
    Sha512,
    /// SHA3-512 (FIPS 202)
    Sha3,
    /// Keccak-512 with the padding used before FIPS 202
    Keccak512,
}

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Md5,
        Algorithm::Sha1,
        Algorithm::Sha256,
        Algorithm::Sha512,
        Algorithm::Sha3,
        Algorithm::Keccak512,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
            Algorithm::Sha3 => "sha3",
            Algorithm::Keccak512 => "keccak512",
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "md5" => Ok(Algorithm::Md5),
            "sha1" | "sha-1" => Ok(Algorithm::Sha1),
            "sha256" | "sha-256" => Ok(Algorithm::Sha256),
            "sha512" | "sha-512" => Ok(Algorithm::Sha512),
            "sha3" | "sha3-512" => Ok(Algorithm::Sha3),
            "keccak" | "keccak512" | "keccak-512" => Ok(Algorithm::Keccak512),
            _ => Err(HashError::UnknownAlgorithm(s.to_string())),
        }
    }
}

fn hexsum<D: Digest + std::io::Write, R: Read>(mut reader: R) -> Result<String> {
    let mut hasher = D::new();
    if std::io::copy(&mut reader, &mut hasher)? == 0 {
        return Err(HashError::EmptyInput.into());
    }

    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

/// Calculate the hex digest of the given stream. An empty stream is rejected.
pub fn hexsum_reader<R: Read>(algorithm: Algorithm, reader: R) -> Result<String> {
    match algorithm {
        Algorithm::Md5 => hexsum::<Md5, _>(reader),
        Algorithm::Sha1 => hexsum::<Sha1, _>(reader),
        Algorithm::Sha256 => hexsum::<Sha256, _>(reader),
        Algorithm::Sha512 => hexsum::<Sha512, _>(reader),
        Algorithm::Sha3 => hexsum::<Sha3_512, _>(reader),
        Algorithm::Keccak512 => hexsum::<Keccak512, _>(reader),
    }
}

/// Hex digest of the UTF-8 bytes of `input`
pub fn digest(algorithm: Algorithm, input: &str) -> Result<String, HashError> {
    if input.is_empty() {
        return Err(HashError::EmptyInput);
    }
    let bytes = input.as_bytes();

    Ok(match algorithm {
        Algorithm::Md5 => format!("{:x}", Md5::digest(bytes)),
        Algorithm::Sha1 => format!("{:x}", Sha1::digest(bytes)),
        Algorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
        Algorithm::Sha512 => format!("{:x}", Sha512::digest(bytes)),
        Algorithm::Sha3 => format!("{:x}", Sha3_512::digest(bytes)),
        Algorithm::Keccak512 => format!("{:x}", Keccak512::digest(bytes)),
    })
}

// tests
#[test]
fn test_known_digests() {
    assert_eq!(
        digest(Algorithm::Md5, "abc").unwrap(),
        "900150983cd24fb0d6963f7d28e17f72"
    );
    assert_eq!(
        digest(Algorithm::Sha1, "abc").unwrap(),
        "a9993e364706816aba3e25717850c26c9cd0d89d"
    );
    assert_eq!(
        digest(Algorithm::Sha256, "abc").unwrap(),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(
        digest(Algorithm::Sha512, "abc").unwrap(),
        "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
         2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
    );
    assert_eq!(
        digest(Algorithm::Sha3, "abc").unwrap(),
        "b751850b1a57168a5693cd924b6b096e08f621827444f70d884f5d0240d2712e\
         10e116e9192af3c91a7ec57647e3934057340b4cf408d5a56592f8274eec53f0"
    );
}

#[test]
fn test_reader_matches_str() {
    for algorithm in Algorithm::ALL {
        let text = "toolset\nhash me";
        assert_eq!(
            hexsum_reader(algorithm, text.as_bytes()).unwrap(),
            digest(algorithm, text).unwrap()
        );
    }
}

#[test]
fn test_keccak_differs_from_sha3() {
    let keccak = digest(Algorithm::Keccak512, "abc").unwrap();
    assert_eq!(keccak.len(), 128);
    assert_ne!(keccak, digest(Algorithm::Sha3, "abc").unwrap());
    assert_eq!(
        "keccak-512".parse::<Algorithm>().unwrap(),
        Algorithm::Keccak512
    );
}

#[test]
fn test_empty_input() {
    assert!(matches!(digest(Algorithm::Md5, ""), Err(HashError::EmptyInput)));
    let err = hexsum_reader(Algorithm::Sha256, std::io::empty()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HashError>(),
        Some(HashError::EmptyInput)
    ));
    // whitespace is hashed as-is
    assert!(digest(Algorithm::Md5, " ").is_ok());
}

#[test]
fn test_algorithm_parse() {
    assert_eq!("SHA-256".parse::<Algorithm>().unwrap(), Algorithm::Sha256);
    assert_eq!("sha3".parse::<Algorithm>().unwrap(), Algorithm::Sha3);
    assert!("crc32".parse::<Algorithm>().is_err());
    for algorithm in Algorithm::ALL {
        assert_eq!(algorithm.to_string().parse::<Algorithm>().unwrap(), algorithm);
    }
}
