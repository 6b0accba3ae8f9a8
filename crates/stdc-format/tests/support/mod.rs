//! Shared fixtures for `stdc-format` integration tests.

#![allow(dead_code)]

use serde_json::{Map, Value, json};

/// One tensor to place in a fixture container.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub name: String,
    pub dtype: &'static str,
    pub shape: Vec<usize>,
    pub data: Vec<u8>,
}

impl Fixture {
    pub fn new(name: &str, dtype: &'static str, shape: &[usize], data: Vec<u8>) -> Self {
        Self { name: name.to_string(), dtype, shape: shape.to_vec(), data }
    }
}

/// Build a safetensors container with tensors laid out back to back in the
/// given order.
pub fn container(tensors: &[Fixture], metadata: Option<Value>) -> Vec<u8> {
    let mut header = Map::new();
    if let Some(meta) = metadata {
        header.insert("__metadata__".to_string(), meta);
    }
    let mut data = Vec::new();
    for t in tensors {
        let start = data.len();
        data.extend_from_slice(&t.data);
        header.insert(
            t.name.clone(),
            json!({"dtype": t.dtype, "shape": t.shape, "data_offsets": [start, data.len()]}),
        );
    }
    raw_container(&serde_json::to_vec(&header).unwrap(), &data)
}

/// `[len][header][data]` with the header bytes taken verbatim.
pub fn raw_container(header: &[u8], data: &[u8]) -> Vec<u8> {
    let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
    bytes.extend_from_slice(header);
    bytes.extend_from_slice(data);
    bytes
}

/// Split a container into its parsed header and data section.
pub fn split(bytes: &[u8]) -> (Value, &[u8]) {
    let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
    let header: Value = serde_json::from_slice(&bytes[8..8 + n]).unwrap();
    (header, &bytes[8 + n..])
}

pub fn le_f64(xs: &[f64]) -> Vec<u8> {
    xs.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn le_f32(xs: &[f32]) -> Vec<u8> {
    xs.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn le_i32(xs: &[i32]) -> Vec<u8> {
    xs.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn le_u16(xs: &[u16]) -> Vec<u8> {
    xs.iter().flat_map(|v| v.to_le_bytes()).collect()
}
