//! Card-data redaction for log output
//!
//! Every line emitted through the logging macros passes through [`redact`],
//! so a primary account number that slips into a format string is masked to
//! its last four digits before it reaches stderr.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

/// Character used in place of hidden digits.
pub const MASK_CHAR: char = '*';

/// Number of trailing digits left visible.
pub const VISIBLE_DIGITS: usize = 4;

/// 13 to 19 digits, optionally grouped by single spaces or dashes.
static PAN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d(?:[ -]?\d){12,18}\b").expect("valid PAN pattern"));

/// `x_card_code=123` style parameters.
static CVV_PARAM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(x_card_code|card_?code|cvv)([=:]\s*)\d{3,4}\b")
        .expect("valid CVV pattern")
});

/// Mask all but the last four characters of `number`, preserving its length.
///
/// ```
/// use authorize_log::mask_card_number;
///
/// assert_eq!(mask_card_number("4111111111111111"), "************1111");
/// assert_eq!(mask_card_number("123"), "123");
/// ```
pub fn mask_card_number(number: &str) -> String {
    let len = number.chars().count();
    if len <= VISIBLE_DIGITS {
        return number.to_string();
    }
    let hidden = len - VISIBLE_DIGITS;
    number
        .chars()
        .enumerate()
        .map(|(i, c)| if i < hidden { MASK_CHAR } else { c })
        .collect()
}

/// Replace card numbers and CVV parameters in `input` with masked values.
pub fn redact(input: &str) -> Cow<'_, str> {
    if !PAN_REGEX.is_match(input) && !CVV_PARAM_REGEX.is_match(input) {
        return Cow::Borrowed(input);
    }

    let masked = PAN_REGEX.replace_all(input, |caps: &Captures| {
        let digits: String = caps[0].chars().filter(|c| c.is_ascii_digit()).collect();
        mask_card_number(&digits)
    });

    let masked = CVV_PARAM_REGEX.replace_all(&masked, |caps: &Captures| {
        format!("{}{}***", &caps[1], &caps[2])
    });

    Cow::Owned(masked.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_preserves_length() {
        let masked = mask_card_number("370000000000002");
        assert_eq!(masked.len(), 15);
        assert!(masked.ends_with("0002"));
        assert!(masked[..11].chars().all(|c| c == MASK_CHAR));
    }

    #[test]
    fn test_redact_plain_pan() {
        assert_eq!(
            redact("charging 4111111111111111 now"),
            "charging ************1111 now"
        );
    }

    #[test]
    fn test_redact_grouped_pan() {
        assert_eq!(redact("card 4111-1111-1111-1111"), "card ************1111");
    }

    #[test]
    fn test_redact_cvv_param() {
        assert_eq!(redact("x_card_code=911&x_type=AUTH_ONLY"), "x_card_code=***&x_type=AUTH_ONLY");
    }

    #[test]
    fn test_short_numbers_untouched() {
        let line = "transaction 2171062816 approved, amount 20.00";
        assert!(matches!(redact(line), Cow::Borrowed(_)));
    }
}
