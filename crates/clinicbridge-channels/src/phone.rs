//! Phone number normalization to chat-network addresses.

/// Addressing suffix for individual accounts on the chat network.
pub const ADDRESS_SUFFIX: &str = "@c.us";

/// National trunk prefix replaced by the country code.
const TRUNK_PREFIX: char = '0';

/// Turn free-form phone input into a canonical recipient address.
///
/// Non-digits are stripped from both inputs. A single leading trunk prefix
/// is replaced by the country code; otherwise the country code is prepended
/// unless already present. Malformed input yields a malformed address
/// rather than an error.
pub fn normalize(raw: &str, country_code: &str) -> String {
    let mut digits = national_digits(raw, country_code);
    digits.push_str(ADDRESS_SUFFIX);
    digits
}

/// The digit portion of [`normalize`], without the addressing suffix.
pub fn national_digits(raw: &str, country_code: &str) -> String {
    let digits = digits_only(raw);
    let code = digits_only(country_code);

    if let Some(rest) = digits.strip_prefix(TRUNK_PREFIX) {
        format!("{code}{rest}")
    } else if digits.starts_with(&code) {
        digits
    } else {
        format!("{code}{digits}")
    }
}

fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}
