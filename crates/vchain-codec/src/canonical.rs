//! Canonical block encoding.
//!
//! The content address of a block is computed over its serialized bytes, so
//! the encoding must be reproducible: pretty-printed JSON with four-space
//! indentation, fields in declaration order, absent optional fields omitted.

use serde::{Deserialize, Serialize};
use vchain_types::{Block, SchemaVersion};

use crate::error::{CodecError, CodecResult};

const INDENT: &[u8] = b"    ";

/// Encode a block into its canonical byte form.
pub fn encode_block(block: &Block) -> CodecResult<Vec<u8>> {
    encode_pretty(block)
}

/// Decode a block body.
pub fn decode_block(bytes: &[u8]) -> CodecResult<Block> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// What can be read from a block body without knowing its schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: SchemaVersion,
    /// Highest `sequence` among the body's operations, if it lists any
    /// operation objects carrying one.
    pub max_operation_sequence: Option<u64>,
}

/// Read the schema version and operation sequence range of a block body.
///
/// Blocks written under other schema versions may not decode as a current
/// [`Block`]; this lets readers classify them without a full decode.
pub fn decode_header(bytes: &[u8]) -> CodecResult<BlockHeader> {
    #[derive(Deserialize)]
    struct Header {
        version: SchemaVersion,
        #[serde(default)]
        operations: serde_json::Value,
    }

    let header: Header =
        serde_json::from_slice(bytes).map_err(|e| CodecError::Serialization(e.to_string()))?;
    let max_operation_sequence = header.operations.as_array().and_then(|ops| {
        ops.iter()
            .filter_map(|op| op.get("sequence").and_then(serde_json::Value::as_u64))
            .max()
    });
    Ok(BlockHeader {
        version: header.version,
        max_operation_sequence,
    })
}

fn encode_pretty<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| CodecError::Serialization(e.to_string()))?;
    Ok(out)
}
