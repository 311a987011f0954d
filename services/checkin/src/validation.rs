//! Input validation utilities

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Accepted national id format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NationalIdPolicy {
    /// Brazilian CPF with check digits, `XXX.XXX.XXX-XX` or bare digits
    #[default]
    Cpf,
    /// Any run of 1 to 20 ASCII digits
    Numeric,
}

/// Validate a national id and return its normalized, digits-only form
pub fn validate_national_id(policy: NationalIdPolicy, national_id: &str) -> Result<String, String> {
    let national_id = national_id.trim();
    if national_id.is_empty() {
        return Err("National id is required".to_string());
    }

    match policy {
        NationalIdPolicy::Cpf => validate_cpf(national_id),
        NationalIdPolicy::Numeric => {
            static NUMERIC_REGEX: OnceLock<Regex> = OnceLock::new();
            let regex = NUMERIC_REGEX
                .get_or_init(|| Regex::new(r"^[0-9]{1,20}$").expect("Failed to compile numeric regex"));

            if !regex.is_match(national_id) {
                return Err("National id must contain 1 to 20 digits".to_string());
            }
            Ok(national_id.to_string())
        }
    }
}

fn validate_cpf(cpf: &str) -> Result<String, String> {
    static CPF_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = CPF_REGEX.get_or_init(|| {
        Regex::new(r"^[0-9]{3}\.?[0-9]{3}\.?[0-9]{3}-?[0-9]{2}$").expect("Failed to compile CPF regex")
    });

    if !regex.is_match(cpf) {
        return Err("CPF must have 11 digits".to_string());
    }

    let digits: Vec<u32> = cpf.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 {
        return Err("CPF must have 11 digits".to_string());
    }

    if digits.iter().all(|d| *d == digits[0]) {
        return Err("Invalid CPF".to_string());
    }

    if cpf_check_digit(&digits[..9]) != digits[9] || cpf_check_digit(&digits[..10]) != digits[10]
    {
        return Err("Invalid CPF check digits".to_string());
    }

    Ok(digits.iter().map(|d| char::from(b'0' + *d as u8)).collect())
}

/// Modulo-11 check digit over `digits`, weights counting down to 2
fn cpf_check_digit(digits: &[u32]) -> u32 {
    let weight_start = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (weight_start - i as u32))
        .sum();

    match (sum * 10) % 11 {
        10 => 0,
        r => r,
    }
}

/// Validate a display name and return it trimmed
pub fn validate_display_name(name: &str) -> Result<String, String> {
    let name = name.trim();

    if name.is_empty() {
        return Err("Name is required".to_string());
    }

    if name.chars().count() > 100 {
        return Err("Name must be at most 100 characters long".to_string());
    }

    Ok(name.to_string())
}

/// Validate an optional professional registration code (CRM, COREN)
///
/// Blank input counts as absent.
pub fn validate_professional_code(code: Option<&str>) -> Result<Option<String>, String> {
    let code = match code.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(code) => code,
    };

    static CODE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = CODE_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9/\-]{1,20}$").expect("Failed to compile professional code regex")
    });

    if !regex.is_match(code) {
        return Err(
            "Professional code must be at most 20 letters, digits, '-' or '/'".to_string(),
        );
    }

    Ok(Some(code.to_string()))
}
