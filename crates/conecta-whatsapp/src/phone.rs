// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! E.164 validation against the countries merchants ship to.

use crate::error::WhatsAppError;

/// Country calling code with the allowed national-number length.
struct CountryRule {
    code: &'static str,
    min: usize,
    max: usize,
}

const COUNTRIES: &[CountryRule] = &[
    CountryRule { code: "57", min: 10, max: 11 },  // Colombia
    CountryRule { code: "1", min: 10, max: 10 },   // NANP
    CountryRule { code: "52", min: 10, max: 10 },  // Mexico
    CountryRule { code: "34", min: 9, max: 9 },    // Spain
    CountryRule { code: "51", min: 9, max: 9 },    // Peru
    CountryRule { code: "593", min: 9, max: 9 },   // Ecuador
    CountryRule { code: "58", min: 10, max: 10 },  // Venezuela
    CountryRule { code: "54", min: 10, max: 11 },  // Argentina
    CountryRule { code: "56", min: 9, max: 9 },    // Chile
    CountryRule { code: "55", min: 10, max: 11 },  // Brazil
    CountryRule { code: "507", min: 7, max: 8 },   // Panama
    CountryRule { code: "506", min: 8, max: 8 },   // Costa Rica
];

/// A validated phone number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    pub country_code: &'static str,
    pub national: String,
}

impl PhoneNumber {
    /// `+<country><national>`.
    pub fn e164(&self) -> String {
        format!("+{}{}", self.country_code, self.national)
    }

    /// Digits only, the form the Cloud API expects in `to` and sends in `from`.
    pub fn wa_id(&self) -> String {
        format!("{}{}", self.country_code, self.national)
    }
}

/// Parses `input` with or without a leading `+`.
///
/// Spaces, dashes, dots and parentheses are ignored. The longest matching
/// country code wins and the remaining digits must fit its length range.
pub fn parse(input: &str) -> Result<PhoneNumber, WhatsAppError> {
    let invalid = |reason: &str| WhatsAppError::InvalidPhoneNumber {
        number: input.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = body
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();
    if digits.is_empty() {
        return Err(invalid("empty"));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("contains non-digit characters"));
    }

    let rule = COUNTRIES
        .iter()
        .filter(|r| digits.starts_with(r.code))
        .max_by_key(|r| r.code.len())
        .ok_or_else(|| invalid("unknown country code"))?;

    let national = &digits[rule.code.len()..];
    if national.len() < rule.min || national.len() > rule.max {
        return Err(invalid(&format!(
            "country {} expects {}-{} digits, got {}",
            rule.code,
            rule.min,
            rule.max,
            national.len()
        )));
    }
    Ok(PhoneNumber {
        country_code: rule.code,
        national: national.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colombian_mobile() {
        let p = parse("+573001234567").unwrap();
        assert_eq!(p.country_code, "57");
        assert_eq!(p.national, "3001234567");
        assert_eq!(p.e164(), "+573001234567");
        assert_eq!(p.wa_id(), "573001234567");
    }

    #[test]
    fn too_short_for_colombia() {
        assert!(matches!(
            parse("+573001234"),
            Err(WhatsAppError::InvalidPhoneNumber { .. })
        ));
    }

    #[test]
    fn accepted_without_plus() {
        let p = parse("5730012345670").unwrap();
        assert_eq!(p.country_code, "57");
        assert_eq!(p.national.len(), 11);
    }

    #[test]
    fn unknown_country() {
        let err = parse("+999123").unwrap_err();
        assert!(err.to_string().contains("unknown country code"));
    }

    #[test]
    fn longest_prefix_wins() {
        let p = parse("+593 99 123 4567").unwrap();
        assert_eq!(p.country_code, "593");
        assert_eq!(p.national, "991234567");
    }

    #[test]
    fn formatting_is_ignored_but_letters_are_not() {
        assert_eq!(parse("+57 (300) 123-4567").unwrap().national, "3001234567");
        assert!(parse("+57300abc4567").is_err());
        assert!(parse("   ").is_err());
    }
}
