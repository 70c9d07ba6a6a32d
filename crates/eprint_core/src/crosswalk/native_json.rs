//! Native JSON document: `{"eprint": [ ... ]}`.

use super::{CodecError, CodecResult};
use crate::model::{EPrints, Record};

/// Pretty-printed native JSON envelope holding `records`.
pub fn to_native_json(records: &[Record]) -> CodecResult<String> {
    let envelope = EPrints {
        records: records.to_vec(),
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// Parses a native JSON envelope.
///
/// # Errors
/// - `Json` for syntax or type errors.
/// - `Malformed` when the envelope holds no records.
pub fn from_native_json(src: &str) -> CodecResult<EPrints> {
    let envelope: EPrints = serde_json::from_str(src)?;
    if envelope.records.is_empty() {
        return Err(CodecError::Malformed("no eprint records".to_string()));
    }
    Ok(envelope)
}
