//! Solidity ABI codec for the car registry contract.
//!
//! Only the shapes the registry uses are supported: `(string,string)` call
//! arguments, a `uint256` return, a dynamic array of `(string,string)` tuples,
//! and the `CarRegistered(uint256 indexed, string, string)` event.

use sha3::{Digest, Keccak256};

use crate::core::entry::{Entry, RegistryRecord};

pub const REGISTER_CAR: &str = "registerCar(string,string)";
pub const GET_ALL_CARS: &str = "getAllCars()";
pub const GET_CAR_COUNT: &str = "getCarCount()";
pub const CAR_REGISTERED: &str = "CarRegistered(uint256,string,string)";

const WORD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("invalid hex: {0}")]
    Hex(String),
    #[error("truncated data: need {need} bytes at offset {offset}, have {have}")]
    Truncated { offset: usize, need: usize, have: usize },
    #[error("value does not fit in 64 bits at offset {0}")]
    Overflow(usize),
    #[error("invalid utf-8 string at offset {0}")]
    Utf8(usize),
}

pub type AbiResult<T> = Result<T, AbiError>;

pub fn keccak256(data: &[u8]) -> [u8; 32] { Keccak256::digest(data).into() }

/// First four bytes of the keccak hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn event_topic(signature: &str) -> [u8; 32] { keccak256(signature.as_bytes()) }

pub fn encode_hex(bytes: &[u8]) -> String { format!("0x{}", hex::encode(bytes)) }

pub fn decode_hex(value: &str) -> AbiResult<Vec<u8>> {
    let body = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(body).map_err(|_| AbiError::Hex(value.to_string()))
}

// =============================================================================
// Encoding
// =============================================================================

pub fn word_u64(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Head/tail encoding of a tuple of strings.
fn encode_strings(values: &[&str]) -> Vec<u8> {
    let head_len = WORD * values.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for value in values {
        head.extend_from_slice(&word_u64((head_len + tail.len()) as u64));
        tail.extend_from_slice(&word_u64(value.len() as u64));
        tail.extend_from_slice(value.as_bytes());
        pad_to_word(&mut tail);
    }
    head.extend(tail);
    head
}

fn pad_to_word(buf: &mut Vec<u8>) {
    let rem = buf.len() % WORD;
    if rem != 0 {
        buf.resize(buf.len() + WORD - rem, 0);
    }
}

pub fn encode_string_pair(first: &str, second: &str) -> Vec<u8> { encode_strings(&[first, second]) }

/// Calldata for `registerCar(ownerName, carModel)`.
pub fn encode_register_car(owner_name: &str, car_model: &str) -> Vec<u8> {
    let mut data = selector(REGISTER_CAR).to_vec();
    data.extend(encode_string_pair(owner_name, car_model));
    data
}

pub fn encode_get_all_cars() -> Vec<u8> { selector(GET_ALL_CARS).to_vec() }

pub fn encode_get_car_count() -> Vec<u8> { selector(GET_CAR_COUNT).to_vec() }

/// Return data of `getAllCars()`; the inverse of [`decode_records`].
pub fn encode_records(records: &[RegistryRecord]) -> Vec<u8> {
    let encoded: Vec<Vec<u8>> = records
        .iter()
        .map(|r| encode_string_pair(&r.owner_name, &r.car_model))
        .collect();
    let mut out = Vec::new();
    out.extend_from_slice(&word_u64(WORD as u64));
    out.extend_from_slice(&word_u64(records.len() as u64));
    let mut offset = WORD * records.len();
    for element in &encoded {
        out.extend_from_slice(&word_u64(offset as u64));
        offset += element.len();
    }
    for element in encoded {
        out.extend(element);
    }
    out
}

// =============================================================================
// Decoding
// =============================================================================

fn word_at(data: &[u8], offset: usize) -> AbiResult<&[u8]> {
    let end = offset.checked_add(WORD).ok_or(AbiError::Overflow(offset))?;
    data.get(offset..end)
        .ok_or(AbiError::Truncated { offset, need: WORD, have: data.len() })
}

fn read_u64(data: &[u8], offset: usize) -> AbiResult<u64> {
    let word = word_at(data, offset)?;
    if word[..24].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow(offset));
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(tail))
}

fn read_usize(data: &[u8], offset: usize) -> AbiResult<usize> {
    usize::try_from(read_u64(data, offset)?).map_err(|_| AbiError::Overflow(offset))
}

fn read_string(data: &[u8], offset: usize) -> AbiResult<String> {
    let len = read_usize(data, offset)?;
    let start = offset + WORD;
    let end = start.checked_add(len).ok_or(AbiError::Overflow(offset))?;
    let bytes = data
        .get(start..end)
        .ok_or(AbiError::Truncated { offset: start, need: len, have: data.len() })?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::Utf8(start))
}

/// Decode a `(string,string)` tuple whose encoding starts at `base`.
pub fn decode_string_pair(data: &[u8], base: usize) -> AbiResult<(String, String)> {
    let first = read_usize(data, base)?;
    let second = read_usize(data, base + WORD)?;
    let first = read_string(data, base.checked_add(first).ok_or(AbiError::Overflow(base))?)?;
    let second = read_string(data, base.checked_add(second).ok_or(AbiError::Overflow(base))?)?;
    Ok((first, second))
}

pub fn decode_u64(data: &[u8]) -> AbiResult<u64> { read_u64(data, 0) }

/// Decode the `(string,string)[]` returned by `getAllCars()`.
pub fn decode_records(data: &[u8]) -> AbiResult<Vec<RegistryRecord>> {
    let array = read_usize(data, 0)?;
    let count = read_usize(data, array)?;
    let base = array.checked_add(WORD).ok_or(AbiError::Overflow(0))?;
    if count > data.len().saturating_sub(base) / WORD {
        return Err(AbiError::Truncated { offset: base, need: count.saturating_mul(WORD), have: data.len() });
    }
    (0..count)
        .map(|i| {
            let head = base + i * WORD;
            let element = read_usize(data, head)?;
            let start = base.checked_add(element).ok_or(AbiError::Overflow(head))?;
            let (owner_name, car_model) = decode_string_pair(data, start)?;
            Ok(RegistryRecord { owner_name, car_model })
        })
        .collect()
}

/// Decode a `CarRegistered` log. Logs from other events yield `None`.
pub fn decode_car_registered(topics: &[Vec<u8>], data: &[u8]) -> AbiResult<Option<Entry>> {
    let topic = event_topic(CAR_REGISTERED);
    match topics.first() {
        Some(first) if first.as_slice() == topic.as_slice() => {}
        _ => return Ok(None),
    }
    let index = match topics.get(1) {
        Some(word) => read_u64(word, 0)?,
        None => return Err(AbiError::Truncated { offset: 0, need: WORD, have: 0 }),
    };
    let (owner_name, car_model) = decode_string_pair(data, 0)?;
    Ok(Some(Entry { index, owner_name, car_model }))
}
