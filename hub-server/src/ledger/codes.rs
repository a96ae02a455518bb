//! Voucher codes, confirmation tokens and phone numbers
//!
//! Voucher codes look like `SPOT-XXXX-XXXX-XXXX`: 60 random bits in Crockford
//! base32, printed on the QR. Confirmation tokens are 128-bit random hex
//! strings; only their SHA-256 hash is persisted.

use super::error::{LedgerError, LedgerResult};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

pub const VOUCHER_CODE_PREFIX: &str = "SPOT";

/// Crockford base32 (no I, L, O, U)
const CROCKFORD: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

const CODE_GROUPS: usize = 3;
const GROUP_LEN: usize = 4;
const TOKEN_BYTES: usize = 16;

/// Phone length limits, digits only
const MIN_PHONE_DIGITS: usize = 6;
const MAX_PHONE_DIGITS: usize = 15;

fn random_bytes<const N: usize>() -> LedgerResult<[u8; N]> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| LedgerError::Internal("system random source unavailable".to_string()))?;
    Ok(buf)
}

/// Generate a fresh voucher code
pub fn generate_voucher_code() -> LedgerResult<String> {
    let bits = u64::from_be_bytes(random_bytes::<8>()?);
    Ok(format_voucher_code(bits))
}

/// Render the low 60 bits as `SPOT-XXXX-XXXX-XXXX`
fn format_voucher_code(bits: u64) -> String {
    let symbols = CODE_GROUPS * GROUP_LEN;
    let mut out = String::with_capacity(VOUCHER_CODE_PREFIX.len() + symbols + CODE_GROUPS);
    out.push_str(VOUCHER_CODE_PREFIX);
    for i in 0..symbols {
        if i % GROUP_LEN == 0 {
            out.push('-');
        }
        let shift = 5 * (symbols - 1 - i);
        let index = ((bits >> shift) & 0x1f) as usize;
        out.push(CROCKFORD[index] as char);
    }
    out
}

/// Canonical form of a scanned or typed code
pub fn normalize_voucher_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

/// Generate a confirmation token (hex, 32 chars)
pub fn generate_token() -> LedgerResult<String> {
    Ok(hex::encode(random_bytes::<TOKEN_BYTES>()?))
}

/// SHA-256 hex digest of a confirmation token
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Check a presented token against the stored hash
pub fn token_matches(token: &str, stored_hash: &str) -> bool {
    hash_token(token) == stored_hash
}

/// Normalize a client phone number to its digits
///
/// Spaces, `+`, `-`, `.` and parentheses are stripped; anything else is
/// rejected.
pub fn normalize_phone(input: &str) -> LedgerResult<String> {
    let mut digits = String::with_capacity(input.len());
    for c in input.trim().chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '+' | '-' | '.' | '(' | ')' => {}
            _ => {
                return Err(LedgerError::InvalidPhone(format!(
                    "unexpected character '{}' in phone number",
                    c
                )));
            }
        }
    }

    if digits.len() < MIN_PHONE_DIGITS || digits.len() > MAX_PHONE_DIGITS {
        return Err(LedgerError::InvalidPhone(format!(
            "phone number must have {}-{} digits, got {}",
            MIN_PHONE_DIGITS,
            MAX_PHONE_DIGITS,
            digits.len()
        )));
    }

    Ok(digits)
}
