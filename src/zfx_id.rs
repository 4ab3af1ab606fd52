//! Hash-based identifiers for validators, chains, virtual machines and containers.
//!
//! See the documentation of [Id] for details.

use std::convert::TryInto;
use std::fmt;
use std::str::FromStr;

use base58check::{FromBase58Check, ToBase58Check};
use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;
use rand::{self, Rng};

/// Generic hash-based ID for use throughout the node
///
/// The `Id` wraps a 32-byte hash. Validators, chains, virtual machines and containers are
/// all identified by an `Id`; a container's `Id` is the hash of its bytes.
///
/// They are displayed using the Base58check format.
#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Serialize, Deserialize, Default)]
pub struct Id([u8; 32]);

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.to_base58check(0))
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.to_base58check(0))
    }
}

impl FromStr for Id {
    type Err = crate::Error;

    /// Converts a base58check encoded string to bytes of an Id
    fn from_str(id_str: &str) -> Result<Self, crate::Error> {
        let (vsn, bytes) =
            id_str.from_base58check().map_err(|_| crate::Error::TryFromStringError)?;
        if vsn != 0 {
            return Err(crate::Error::TryFromStringError);
        }
        let bytes: [u8; 32] =
            bytes.as_slice().try_into().map_err(|_| crate::Error::TryFromStringError)?;
        Ok(Id(bytes))
    }
}

impl Id {
    /// A new id is created by hashing an input byte slice
    pub fn new(bytes: &[u8]) -> Id {
        Id(hash(bytes))
    }

    /// Wraps an existing 32-byte hash
    pub fn from_bytes(bytes: [u8; 32]) -> Id {
        Id(bytes)
    }

    /// Generate a random `Id`
    pub fn generate() -> Id {
        let mut rng = rand::thread_rng();
        let v: [u8; 32] = rng.gen();
        Id(v)
    }

    /// All-zeroes `Id`, also the identifier of the platform chain
    pub fn zero() -> Id {
        Id([0u8; 32])
    }

    /// All-ones `Id` (for testing)
    pub fn one() -> Id {
        Id([1u8; 32])
    }

    /// All-twos `Id` (for testing)
    pub fn two() -> Id {
        Id([2u8; 32])
    }

    pub fn bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hashes a u64 prefixed to this id in order to derive a new one.
    pub fn hash_prefix(&self, prefix: u64) -> Id {
        let mut bytes: Vec<u8> = prefix.to_be_bytes().to_vec();
        bytes.extend_from_slice(&self.0);
        Id(hash(&bytes))
    }

    /// Shortened hex rendering for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

fn hash(input: &[u8]) -> [u8; 32] {
    let mut buf = [0u8; 32];
    // A 32 byte output is always a valid blake2b length.
    if let Ok(mut hasher) = Blake2bVar::new(32) {
        hasher.update(input);
        let _ = hasher.finalize_variable(&mut buf);
    }
    buf
}
