//! Utility functions for identifiers and payload digests

use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Hex SHA-256 of a record or payload encoded into CBOR.
pub fn cbor_digest<T: minicbor::Encode<()>>(value: &T) -> anyhow::Result<String> {
    let contents = minicbor::to_vec(value)?;
    Ok(sha256::digest(&contents))
}
