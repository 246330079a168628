// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use murmur_core::MurmurError;

/// Strips spaces, dashes and parentheses and checks the rest is 10 to 15
/// digits.
pub fn normalize_mobile_number(raw: &str) -> Result<String, MurmurError> {
    let normalized: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    if normalized.is_empty() {
        return Err(MurmurError::Validation("Mobile number is required".into()));
    }
    if !normalized.chars().all(|c| c.is_ascii_digit()) || !(10..=15).contains(&normalized.len()) {
        return Err(MurmurError::Validation("Invalid mobile number format".into()));
    }
    Ok(normalized)
}
