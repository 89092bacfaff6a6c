//! Base-37 call sign text codec
//!
//! Nine digits over `" 0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ"`, most
//! significant first. Letters are case-insensitive.

use crate::error::{ModemError, Result};
use crate::framing::check_call_sign;

const ALPHABET: &[u8; 37] = b" 0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const CALL_SIGN_DIGITS: usize = 9;

/// Pack call sign text into the header's call sign field
pub fn encode(text: &str) -> Result<u64> {
    if text.chars().count() > CALL_SIGN_DIGITS {
        return Err(ModemError::InvalidConfig(format!(
            "call sign {:?} longer than {} characters",
            text, CALL_SIGN_DIGITS
        )));
    }
    let mut acc = 0u64;
    for c in text.chars() {
        let digit = match c {
            ' ' => 0,
            '0'..='9' => c as u64 - '0' as u64 + 1,
            'a'..='z' => c as u64 - 'a' as u64 + 11,
            'A'..='Z' => c as u64 - 'A' as u64 + 11,
            _ => {
                return Err(ModemError::InvalidConfig(format!(
                    "call sign {:?} has invalid character {:?}",
                    text, c
                )))
            }
        };
        acc = acc * 37 + digit;
    }
    check_call_sign(acc)?;
    Ok(acc)
}

/// Render a call sign field as text without surrounding padding
pub fn decode(mut value: u64) -> String {
    let mut digits = [b' '; CALL_SIGN_DIGITS];
    for d in digits.iter_mut().rev() {
        *d = ALPHABET[(value % 37) as usize];
        value /= 37;
    }
    String::from_utf8_lossy(&digits).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for text in ["N0CALL", "DL1ABC", "A", "ZZZZZZZZZ", "9"] {
            let value = encode(text).unwrap();
            assert_eq!(decode(value), text);
        }
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(encode("dl1abc").unwrap(), encode("DL1ABC").unwrap());
    }

    #[test]
    fn test_digit_values() {
        assert_eq!(encode("0").unwrap(), 1);
        assert_eq!(encode("A").unwrap(), 11);
        assert_eq!(encode("10").unwrap(), 2 * 37 + 1);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(encode("N0-CALL").is_err());
        assert!(encode("ABCDEFGHIJ").is_err());
        assert!(matches!(encode(""), Err(ModemError::InvalidCallSign(0))));
        assert!(matches!(encode("   "), Err(ModemError::InvalidCallSign(0))));
    }
}
