//! Base62 短码编解码
//!
//! 字母表顺序为 `0-9a-zA-Z`，低位在前：第 i 个字符对应 `62^i` 的位权。
//! 0 编码为空字符串。

use std::fmt;

pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const BASE: u64 = ALPHABET.len() as u64;

/// u64::MAX 的 base62 表示长度
pub const MAX_ENCODED_LEN: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    InvalidCharacter(char),
    Overflow,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidCharacter(ch) => write!(f, "invalid character: {:?}", ch),
            DecodeError::Overflow => write!(f, "value does not fit into u64"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<DecodeError> for crate::errors::ShortenerError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::InvalidCharacter(_) => Self::invalid_character(err.to_string()),
            DecodeError::Overflow => Self::validation(err.to_string()),
        }
    }
}

pub fn encode(mut val: u64) -> String {
    let mut out = String::with_capacity(MAX_ENCODED_LEN);
    while val > 0 {
        out.push(ALPHABET[(val % BASE) as usize] as char);
        val /= BASE;
    }
    out
}

pub fn decode(encoded: &str) -> Result<u64, DecodeError> {
    let mut val: u64 = 0;
    let mut weight: Option<u64> = Some(1);

    for ch in encoded.chars() {
        let digit = digit_of(ch).ok_or(DecodeError::InvalidCharacter(ch))?;

        if digit > 0 {
            let w = weight.ok_or(DecodeError::Overflow)?;
            val = w
                .checked_mul(digit)
                .and_then(|term| val.checked_add(term))
                .ok_or(DecodeError::Overflow)?;
        }
        // 位权溢出只在后面还有非零位时才算错误
        weight = weight.and_then(|w| w.checked_mul(BASE));
    }

    Ok(val)
}

/// 是否仅由字母表字符组成
pub fn is_valid(encoded: &str) -> bool {
    encoded.chars().all(|ch| digit_of(ch).is_some())
}

#[inline]
fn digit_of(ch: char) -> Option<u64> {
    match ch {
        '0'..='9' => Some(ch as u64 - '0' as u64),
        'a'..='z' => Some(ch as u64 - 'a' as u64 + 10),
        'A'..='Z' => Some(ch as u64 - 'A' as u64 + 36),
        _ => None,
    }
}
