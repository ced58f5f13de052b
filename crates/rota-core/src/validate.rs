//! Entity Validator: pure predicates over raw field values.
//!
//! Nothing here performs I/O or reports errors; callers decide how a failed
//! predicate is surfaced (see the services in [`crate::mutation`] and
//! [`crate::profile`]).

/// Digits in a company tax ID (CNPJ).
pub const TAX_ID_LEN: usize = 14;
/// Digits in a person ID (CPF).
pub const PERSON_ID_LEN: usize = 11;
/// Digits in a postal code (CEP).
pub const POSTAL_CODE_LEN: usize = 8;

/// Strip every non-digit character. Total; never fails.
pub fn normalize_digits(s: &str) -> String {
  s.chars().filter(char::is_ascii_digit).collect()
}

/// `true` if every character of `digits` is the same digit.
fn all_same(digits: &[u32]) -> bool {
  digits.windows(2).all(|w| w[0] == w[1])
}

fn to_digits(s: &str) -> Vec<u32> {
  s.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// Modulo-11 check digit over `digits`, with `weights` applied from the
/// rightmost digit leftwards.
fn mod11_check_digit(
  digits: &[u32],
  weights: impl Iterator<Item = u32>,
) -> u32 {
  let sum: u32 = digits.iter().rev().zip(weights).map(|(d, w)| d * w).sum();
  match sum % 11 {
    r if r < 2 => 0,
    r => 11 - r,
  }
}

/// Validate a 14-digit company tax ID: two check digits, weights cycling
/// 2..=9 from the right.
pub fn is_valid_tax_id(raw: &str) -> bool {
  let digits = to_digits(raw);
  if digits.len() != TAX_ID_LEN || all_same(&digits) {
    return false;
  }
  let d1 = mod11_check_digit(&digits[..12], (2..=9).cycle());
  let d2 = mod11_check_digit(&digits[..13], (2..=9).cycle());
  d1 == digits[12] && d2 == digits[13]
}

/// Validate an 11-digit person ID: two check digits, weights growing from 2
/// without wrapping.
pub fn is_valid_person_id(raw: &str) -> bool {
  let digits = to_digits(raw);
  if digits.len() != PERSON_ID_LEN || all_same(&digits) {
    return false;
  }
  let d1 = mod11_check_digit(&digits[..9], 2..);
  let d2 = mod11_check_digit(&digits[..10], 2..);
  d1 == digits[9] && d2 == digits[10]
}

/// Landline (area code + 8) or mobile (area code + 9) number.
pub fn is_valid_phone(raw: &str) -> bool {
  matches!(normalize_digits(raw).len(), 10 | 11)
}

pub fn is_valid_postal_code(raw: &str) -> bool {
  normalize_digits(raw).len() == POSTAL_CODE_LEN
}

/// 24-hour `HH:mm`: hours 00–23, minutes 00–59, leading zeros required.
pub fn is_valid_time_of_day(s: &str) -> bool {
  let b = s.as_bytes();
  if b.len() != 5 || b[2] != b':' {
    return false;
  }
  let two = |hi: u8, lo: u8| -> Option<u8> {
    (hi.is_ascii_digit() && lo.is_ascii_digit())
      .then(|| (hi - b'0') * 10 + (lo - b'0'))
  };
  matches!(
    (two(b[0], b[1]), two(b[3], b[4])),
    (Some(h), Some(m)) if h <= 23 && m <= 59
  )
}

/// Both bounds finite and `min <= max` (equal bounds allowed).
pub fn is_valid_price_range(min: f64, max: f64) -> bool {
  min.is_finite() && max.is_finite() && min <= max
}

/// `true` if `s` is empty after trimming whitespace.
pub fn is_blank(s: &str) -> bool { s.trim().is_empty() }
