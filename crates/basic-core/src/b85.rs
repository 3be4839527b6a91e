//! # Base85 Text Encoding
//!
//! RFC 1924 alphabet, the same output as the common `b85encode` implementations:
//! each 4-byte big-endian group becomes 5 characters; a short final group
//! is zero-padded for encoding and the padding characters are dropped.

const ALPHABET: &[u8; 85] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+-;<=>?@^_`{|}~";

fn digit(c: u8) -> Option<u32> {
    ALPHABET.iter().position(|&a| a == c).map(|p| p as u32)
}

/// Encode bytes as base85 text.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(4) * 5);
    for chunk in data.chunks(4) {
        let mut group = [0u8; 4];
        group[..chunk.len()].copy_from_slice(chunk);
        let mut acc = u32::from_be_bytes(group);
        let mut digits = [0u8; 5];
        for slot in digits.iter_mut().rev() {
            *slot = ALPHABET[(acc % 85) as usize];
            acc /= 85;
        }
        let keep = if chunk.len() == 4 { 5 } else { chunk.len() + 1 };
        out.extend(digits[..keep].iter().map(|&d| d as char));
    }
    out
}

/// Decode base85 text back to bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, String> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() / 5 * 4 + 4);
    for (index, chunk) in bytes.chunks(5).enumerate() {
        if chunk.len() == 1 {
            return Err("truncated base85 group".to_string());
        }
        let mut acc: u64 = 0;
        for position in 0..5 {
            let value = match chunk.get(position) {
                Some(&c) => digit(c).ok_or_else(|| {
                    format!("bad base85 character {:?} at offset {}", c as char, index * 5 + position)
                })?,
                None => 84,
            };
            acc = acc * 85 + u64::from(value);
        }
        let acc = u32::try_from(acc).map_err(|_| format!("base85 overflow in group {index}"))?;
        let group = acc.to_be_bytes();
        out.extend_from_slice(&group[..chunk.len() - 1]);
    }
    Ok(out)
}
