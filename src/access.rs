use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ACCESS_CODE: Regex = Regex::new(r"^[A-Za-z0-9_-]{4,32}$").unwrap();
}

/// Checks the shape of a private poll's access code and returns it trimmed.
pub fn validate_access_code(code: &str) -> Result<String, String> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err("private polls need an access code".to_string());
    }
    if !ACCESS_CODE.is_match(trimmed) {
        return Err(
            "access codes are 4-32 characters of letters, digits, '-' or '_'".to_string(),
        );
    }
    Ok(trimmed.to_string())
}

pub fn access_code_matches(expected: &str, supplied: Option<&str>) -> bool {
    match supplied {
        Some(code) => code.trim() == expected,
        None => false,
    }
}
