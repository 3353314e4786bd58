//! Binary serialization primitives specified by spec §6: little-endian
//! throughout, three building blocks (`Number`, `String`, `String map`)
//! that the DBG, exact annotation and Bloom annotation wire formats are
//! built from.
//!
//! Ported from `original_source/dbg_hash.cpp`'s `serialization::` calls;
//! unlike the C++ original this never throws, returning
//! [`AnnotationError::Format`] on any truncated or oversized length prefix.

use crate::error::{AnnotationError, Result};
use std::collections::HashMap;
use std::io::{Read, Write};

/// Guards against a corrupt length prefix causing an enormous allocation.
const MAX_REASONABLE_LEN: u64 = 1 << 40;

pub fn write_number<W: Write>(out: &mut W, n: u64) -> Result<u64> {
    out.write_all(&n.to_le_bytes())
        .map_err(|e| AnnotationError::Format(e.to_string()))?;
    Ok(8)
}

pub fn read_number<R: Read>(input: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    input
        .read_exact(&mut buf)
        .map_err(|e| AnnotationError::Format(e.to_string()))?;
    Ok(u64::from_le_bytes(buf))
}

pub fn write_string<W: Write>(out: &mut W, s: &str) -> Result<u64> {
    let mut written = write_number(out, s.len() as u64)?;
    out.write_all(s.as_bytes())
        .map_err(|e| AnnotationError::Format(e.to_string()))?;
    written += s.len() as u64;
    Ok(written)
}

pub fn read_string<R: Read>(input: &mut R) -> Result<String> {
    let len = read_number(input)?;
    if len > MAX_REASONABLE_LEN {
        return Err(AnnotationError::Format(format!(
            "string length prefix {len} exceeds sanity bound"
        )));
    }
    let mut buf = vec![0u8; len as usize];
    input
        .read_exact(&mut buf)
        .map_err(|e| AnnotationError::Format(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| AnnotationError::Format(e.to_string()))
}

pub fn write_string_map<W: Write>(out: &mut W, map: &HashMap<String, u64>) -> Result<u64> {
    let mut written = write_number(out, map.len() as u64)?;
    for (key, value) in map {
        written += write_string(out, key)?;
        written += write_number(out, *value)?;
    }
    Ok(written)
}

pub fn read_string_map<R: Read>(input: &mut R) -> Result<HashMap<String, u64>> {
    let n = read_number(input)?;
    if n > MAX_REASONABLE_LEN {
        return Err(AnnotationError::Format(format!(
            "string map entry count {n} exceeds sanity bound"
        )));
    }
    let mut map = HashMap::with_capacity(n as usize);
    for _ in 0..n {
        let key = read_string(input)?;
        let value = read_number(input)?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Writes a length-prefixed raw bit array (`ceil(len_bits/8)` bytes).
pub fn write_bytes<W: Write>(out: &mut W, bytes: &[u8]) -> Result<u64> {
    out.write_all(bytes)
        .map_err(|e| AnnotationError::Format(e.to_string()))?;
    Ok(bytes.len() as u64)
}

pub fn read_bytes<R: Read>(input: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    input
        .read_exact(&mut buf)
        .map_err(|e| AnnotationError::Format(e.to_string()))?;
    Ok(buf)
}

pub fn write_f64<W: Write>(out: &mut W, value: f64) -> Result<u64> {
    out.write_all(&value.to_le_bytes())
        .map_err(|e| AnnotationError::Format(e.to_string()))?;
    Ok(8)
}

pub fn read_f64<R: Read>(input: &mut R) -> Result<f64> {
    let mut buf = [0u8; 8];
    input
        .read_exact(&mut buf)
        .map_err(|e| AnnotationError::Format(e.to_string()))?;
    Ok(f64::from_le_bytes(buf))
}
