//! Hardcoded network identifiers and their human readable names.
use crate::{Error, Result};

pub const MAINNET_ID: u32 = 1;
pub const TESTNET_ID: u32 = 2;
pub const BOREALIS_ID: u32 = 2;
pub const LOCAL_ID: u32 = 12345;

pub const MAINNET_NAME: &str = "mainnet";
pub const TESTNET_NAME: &str = "testnet";
pub const BOREALIS_NAME: &str = "borealis";
pub const LOCAL_NAME: &str = "local";

const NETWORK_PREFIX: &str = "network-";

// The testnet is displayed under its borealis name.
const ID_TO_NAME: [(u32, &str); 3] =
    [(MAINNET_ID, MAINNET_NAME), (TESTNET_ID, BOREALIS_NAME), (LOCAL_ID, LOCAL_NAME)];

const NAME_TO_ID: [(&str, u32); 4] = [
    (MAINNET_NAME, MAINNET_ID),
    (TESTNET_NAME, TESTNET_ID),
    (BOREALIS_NAME, BOREALIS_ID),
    (LOCAL_NAME, LOCAL_ID),
];

/// Returns a human readable name for the network with id `network_id`.
pub fn network_name(network_id: u32) -> String {
    for (id, name) in ID_TO_NAME.iter() {
        if *id == network_id {
            return name.to_string();
        }
    }
    format!("{}{}", NETWORK_PREFIX, network_id)
}

/// Returns the id of the network called `network_name`.
///
/// Accepts the well known names (case insensitive), a plain decimal id or the
/// `network-<id>` form.
pub fn network_id(network_name: &str) -> Result<u32> {
    let name = network_name.to_lowercase();
    for (known, id) in NAME_TO_ID.iter() {
        if *known == name {
            return Ok(*id);
        }
    }
    if let Some(id) = parse_u32(&name)? {
        return Ok(id);
    }
    if let Some(suffix) = name.strip_prefix(NETWORK_PREFIX) {
        if let Some(id) = parse_u32(suffix)? {
            return Ok(id);
        }
    }
    Err(Error::InvalidNetworkName(network_name.to_string()))
}

// `Ok(None)` when `s` is not a number at all, an error when it is one outside of `u32`.
fn parse_u32(s: &str) -> Result<Option<u32>> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return Ok(None);
    }
    match s.parse::<u64>() {
        Ok(id) if id <= u32::MAX as u64 => Ok(Some(id as u32)),
        _ => Err(Error::InvalidNetworkName(format!("network id {} not in [0, 2^32)", s))),
    }
}
