//! The safetensors header: an 8-byte little-endian length followed by a JSON
//! object mapping tensor names to records.
//!
//! ```text
//! [0, 8)        u64 LE header length N
//! [8, 8+N)      {"name": {"dtype": "F32", "shape": [..], "data_offsets": [s, e]}, ...}
//! [8+N, ..)     tensor payloads; offsets are relative to 8+N
//! ```
//!
//! Entry order is preserved exactly as read, and anything the converter does
//! not touch (the `__metadata__` map, `shape`, unknown record fields) is
//! written back verbatim.

use std::io::Read;

use serde_json::{Map, Value};
use stdc_dtype::DType;

use crate::error::{FormatError, Result, TensorError};

/// Reserved key holding a free-form string map; never treated as a tensor.
pub const METADATA_KEY: &str = "__metadata__";
/// Size of the little-endian header length prefix.
pub const HEADER_LEN_BYTES: u64 = 8;

/// One tensor entry, as decoded from the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorRecord {
    pub name: String,
    /// Header dtype string as written in the file.
    pub dtype_name: String,
    /// Resolved encoding; [`DType::Unknown`] if the name is not recognised.
    pub dtype: DType,
    /// Half-open byte range into the data section.
    pub data_offsets: (u64, u64),
}

impl TensorRecord {
    pub fn byte_len(&self) -> u64 {
        self.data_offsets.1 - self.data_offsets.0
    }
}

/// Parsed header, mutated in place as tensors are rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderDocument {
    entries: Map<String, Value>,
}

impl HeaderDocument {
    /// Parse header JSON bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(entries) => Ok(Self { entries }),
            _ => Err(FormatError::HeaderNotObject),
        }
    }

    /// Read the length prefix and header from the start of `reader`.
    ///
    /// Returns the document and the header length `N`; the data section starts
    /// at `8 + N`. The reader is left positioned at the data section.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<(Self, u64)> {
        let mut len_bytes = [0u8; HEADER_LEN_BYTES as usize];
        reader.read_exact(&mut len_bytes).map_err(FormatError::HeaderLength)?;
        let header_len = u64::from_le_bytes(len_bytes);
        tracing::debug!(header_len, "reading header");

        let mut header = Vec::new();
        let read = reader.by_ref().take(header_len).read_to_end(&mut header)? as u64;
        if read != header_len {
            return Err(FormatError::ShortHeader { read, expected: header_len });
        }

        Ok((Self::parse(&header)?, header_len))
    }

    /// Serialize compactly, preserving entry order.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.entries)?)
    }

    /// Tensor names in header order, skipping [`METADATA_KEY`].
    pub fn tensor_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str).filter(|k| *k != METADATA_KEY)
    }

    /// Number of tensor entries (excluding metadata).
    pub fn tensor_count(&self) -> usize {
        self.tensor_names().count()
    }

    /// The `__metadata__` map, if present.
    pub fn metadata(&self) -> Option<&Value> {
        self.entries.get(METADATA_KEY)
    }

    /// Raw JSON for an entry.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Decode the record for `name`.
    pub fn record(&self, name: &str) -> std::result::Result<TensorRecord, TensorError> {
        let value =
            self.entries.get(name).ok_or_else(|| TensorError::malformed(name, "no such entry"))?;
        decode_record(name, value)
    }

    /// Replace `data_offsets` with `[start, end]`.
    pub fn set_offsets(
        &mut self,
        name: &str,
        start: u64,
        end: u64,
    ) -> std::result::Result<(), TensorError> {
        let fields = self.fields_mut(name)?;
        match fields.get_mut("data_offsets") {
            Some(Value::Array(pair)) if pair.len() == 2 => {
                pair[0] = Value::from(start);
                pair[1] = Value::from(end);
                Ok(())
            }
            _ => Err(TensorError::malformed(name, "missing or malformed data_offsets")),
        }
    }

    /// Replace the `dtype` string.
    pub fn set_dtype(&mut self, name: &str, dtype: DType) -> std::result::Result<(), TensorError> {
        let fields = self.fields_mut(name)?;
        match fields.get_mut("dtype") {
            Some(slot @ Value::String(_)) => {
                *slot = Value::from(dtype.name());
                Ok(())
            }
            _ => Err(TensorError::malformed(name, "missing or non-string dtype")),
        }
    }

    fn fields_mut(&mut self, name: &str) -> std::result::Result<&mut Map<String, Value>, TensorError> {
        match self.entries.get_mut(name) {
            Some(Value::Object(fields)) => Ok(fields),
            Some(_) => Err(TensorError::malformed(name, "record is not an object")),
            None => Err(TensorError::malformed(name, "no such entry")),
        }
    }
}

/// Validate and decode a tensor record.
pub fn decode_record(name: &str, value: &Value) -> std::result::Result<TensorRecord, TensorError> {
    let fields = value.as_object().ok_or_else(|| TensorError::malformed(name, "record is not an object"))?;

    let dtype_name = fields
        .get("dtype")
        .and_then(Value::as_str)
        .ok_or_else(|| TensorError::malformed(name, "missing or non-string dtype"))?;

    let offsets = fields
        .get("data_offsets")
        .and_then(Value::as_array)
        .ok_or_else(|| TensorError::malformed(name, "missing or malformed data_offsets"))?;
    let (start, end) = match offsets.as_slice() {
        [start, end] => match (start.as_u64(), end.as_u64()) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(TensorError::malformed(name, "data_offsets must be non-negative integers")),
        },
        _ => return Err(TensorError::malformed(name, "data_offsets must have exactly two entries")),
    };
    if end < start {
        return Err(TensorError::malformed(name, format!("data_offsets end {end} < start {start}")));
    }

    Ok(TensorRecord {
        name: name.to_string(),
        dtype_name: dtype_name.to_string(),
        dtype: DType::resolve(dtype_name),
        data_offsets: (start, end),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"{"__metadata__":{"format":"pt"},"b":{"dtype":"F64","shape":[2],"data_offsets":[0,16]},"a":{"dtype":"I8","shape":[3],"data_offsets":[16,19]}}"#;

    #[test]
    fn preserves_entry_order() {
        let doc = HeaderDocument::parse(HEADER.as_bytes()).unwrap();
        let names: Vec<&str> = doc.tensor_names().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(doc.tensor_count(), 2);
    }

    #[test]
    fn unmodified_document_serializes_identically() {
        let doc = HeaderDocument::parse(HEADER.as_bytes()).unwrap();
        assert_eq!(doc.to_bytes().unwrap(), HEADER.as_bytes());
    }

    #[test]
    fn decodes_records() {
        let doc = HeaderDocument::parse(HEADER.as_bytes()).unwrap();
        let rec = doc.record("a").unwrap();
        assert_eq!(rec.dtype, DType::I8);
        assert_eq!(rec.data_offsets, (16, 19));
        assert_eq!(rec.byte_len(), 3);
    }

    #[test]
    fn set_offsets_and_dtype() {
        let mut doc = HeaderDocument::parse(HEADER.as_bytes()).unwrap();
        doc.set_offsets("b", 0, 8).unwrap();
        doc.set_dtype("b", DType::F32).unwrap();
        let rec = doc.record("b").unwrap();
        assert_eq!(rec.dtype_name, "F32");
        assert_eq!(rec.data_offsets, (0, 8));
        // shape untouched
        assert_eq!(doc.get("b").unwrap()["shape"], serde_json::json!([2]));
    }

    #[test]
    fn metadata_is_not_a_tensor() {
        let doc = HeaderDocument::parse(HEADER.as_bytes()).unwrap();
        assert_eq!(doc.metadata().unwrap()["format"], "pt");
        assert!(doc.tensor_names().all(|n| n != METADATA_KEY));
    }

    #[test]
    fn rejects_malformed_records() {
        let cases = [
            (r#"{"t":{"shape":[1],"data_offsets":[0,4]}}"#, "dtype"),
            (r#"{"t":{"dtype":7,"data_offsets":[0,4]}}"#, "dtype"),
            (r#"{"t":{"dtype":"F32","shape":[1]}}"#, "data_offsets"),
            (r#"{"t":{"dtype":"F32","data_offsets":[0]}}"#, "two entries"),
            (r#"{"t":{"dtype":"F32","data_offsets":[0,-4]}}"#, "non-negative"),
            (r#"{"t":{"dtype":"F32","data_offsets":[8,4]}}"#, "end 4 < start 8"),
            (r#"{"t":[1,2]}"#, "not an object"),
        ];
        for (json, needle) in cases {
            let doc = HeaderDocument::parse(json.as_bytes()).unwrap();
            let err = doc.record("t").unwrap_err();
            assert!(matches!(err, TensorError::MalformedRecord { .. }), "{json}");
            assert!(err.to_string().contains(needle), "{json}: {err}");
        }
    }

    #[test]
    fn unknown_dtype_resolves_to_unknown() {
        let doc =
            HeaderDocument::parse(br#"{"t":{"dtype":"F8_E5M2","data_offsets":[0,1]}}"#).unwrap();
        assert_eq!(doc.record("t").unwrap().dtype, DType::Unknown);
    }

    #[test]
    fn top_level_must_be_object() {
        assert!(matches!(HeaderDocument::parse(b"[1,2]"), Err(FormatError::HeaderNotObject)));
        assert!(matches!(HeaderDocument::parse(b"{not json"), Err(FormatError::MalformedHeader(_))));
    }

    #[test]
    fn read_from_detects_short_header() {
        let mut bytes = 100u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        let err = HeaderDocument::read_from(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, FormatError::ShortHeader { read: 2, expected: 100 }));
    }

    #[test]
    fn read_from_detects_missing_length() {
        let err = HeaderDocument::read_from(&mut [1u8, 2, 3].as_slice()).unwrap_err();
        assert!(matches!(err, FormatError::HeaderLength(_)));
    }

    #[test]
    fn read_from_accepts_trailing_padding() {
        let json = b"{\"t\":{\"dtype\":\"U8\",\"data_offsets\":[0,0]}}   ";
        let mut bytes = (json.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(json);
        let (doc, len) = HeaderDocument::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(len, json.len() as u64);
        assert_eq!(doc.tensor_count(), 1);
    }
}
