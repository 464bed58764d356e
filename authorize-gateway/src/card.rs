//! Card validation and classification
//!
//! A [`CreditCard`] can only be constructed from data that passes
//! [`CardValidator::validate`]: a Luhn-valid number of a recognized issuer, an
//! expiry that has not passed, and a 3-4 digit CVV. Once built it is
//! immutable; every adapter can rely on those checks having happened.

use crate::error::{GatewayError, GatewayResult};
use chrono::{Local, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Character used to hide digits in [`CreditCard::masked_number`]
pub const MASK_CHAR: char = '*';

static CVV_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3,4}$").unwrap());

/// Issuer patterns, checked in order; the first match wins.
static ISSUER_PATTERNS: Lazy<Vec<(CardType, Regex)>> = Lazy::new(|| {
    vec![
        (CardType::Visa, Regex::new(r"^4\d{12}(\d{3})?$").unwrap()),
        (CardType::Amex, Regex::new(r"^37\d{13}$").unwrap()),
        (CardType::MasterCard, Regex::new(r"^5[1-5]\d{14}$").unwrap()),
        (CardType::Discover, Regex::new(r"^6011\d{12}").unwrap()),
        (
            CardType::Diners,
            Regex::new(r"^(30[0-5]\d{11}|(36|38)\d{12})$").unwrap(),
        ),
    ]
});

/// Card issuer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Visa,
    Amex,
    #[serde(rename = "mc")]
    MasterCard,
    Discover,
    Diners,
}

impl CardType {
    /// Short issuer code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Visa => "visa",
            Self::Amex => "amex",
            Self::MasterCard => "mc",
            Self::Discover => "discover",
            Self::Diners => "diners",
        }
    }

    /// Detect the issuer of a cleaned (digits only) number
    pub fn detect(number: &str) -> Option<Self> {
        ISSUER_PATTERNS
            .iter()
            .find(|(_, pattern)| pattern.is_match(number))
            .map(|(card_type, _)| *card_type)
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Stateless checks behind [`CreditCard::new`].
pub struct CardValidator;

impl CardValidator {
    /// Strip the separators people type into card numbers.
    pub fn clean(number: &str) -> String {
        number
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect()
    }

    /// Mod-10 checksum over an all-digit string.
    pub fn luhn_valid(digits: &str) -> bool {
        let mut sum = 0u32;
        for (i, c) in digits.chars().rev().enumerate() {
            let Some(d) = c.to_digit(10) else {
                return false;
            };
            sum += if i % 2 == 1 {
                let doubled = d * 2;
                doubled / 10 + doubled % 10
            } else {
                d
            };
        }
        sum % 10 == 0
    }

    /// Last second of the expiry month (23:59:59 on its final day).
    pub fn expiration(exp_month: u32, exp_year: i32) -> GatewayResult<NaiveDateTime> {
        if !(1..=12).contains(&exp_month) {
            return Err(GatewayError::validation("Credit card expiration month is invalid."));
        }
        let next = if exp_month == 12 {
            exp_year.checked_add(1).map(|year| (year, 1))
        } else {
            Some((exp_year, exp_month + 1))
        };
        next.and_then(|(year, month)| NaiveDate::from_ymd_opt(year, month, 1))
            .and_then(|first| first.pred_opt())
            .and_then(|last| last.and_hms_opt(23, 59, 59))
            .ok_or_else(|| GatewayError::validation("Credit card expiration date is invalid."))
    }

    /// Reject an expiry month that has already ended.
    pub fn check_not_expired(exp_month: u32, exp_year: i32) -> GatewayResult<()> {
        if Self::expiration(exp_month, exp_year)? < Local::now().naive_local() {
            return Err(GatewayError::validation("Credit card is expired."));
        }
        Ok(())
    }

    /// Validate raw card data, returning the detected issuer.
    pub fn validate(
        number: &str,
        exp_month: u32,
        exp_year: i32,
        cvv: &str,
    ) -> GatewayResult<CardType> {
        let number = Self::clean(number);
        if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(GatewayError::validation("Credit card number is not valid."));
        }
        if !Self::luhn_valid(&number) {
            return Err(GatewayError::validation("Credit card number is not valid."));
        }
        Self::check_not_expired(exp_month, exp_year)?;
        if !CVV_REGEX.is_match(cvv) {
            return Err(GatewayError::validation("Credit card CVV is invalid format."));
        }
        CardType::detect(&number)
            .ok_or_else(|| GatewayError::validation("Credit card number is not valid."))
    }
}

/// A validated credit card.
///
/// `Debug` and `Display` only ever show the issuer and masked number.
#[derive(Clone, PartialEq, Eq)]
pub struct CreditCard {
    number: String,
    exp_month: u32,
    exp_year: i32,
    cvv: String,
    first_name: Option<String>,
    last_name: Option<String>,
    card_type: CardType,
}

impl CreditCard {
    /// Validate and build a card. Spaces and dashes in `number` are ignored.
    pub fn new(number: &str, exp_month: u32, exp_year: i32, cvv: &str) -> GatewayResult<Self> {
        let card_type = CardValidator::validate(number, exp_month, exp_year, cvv)?;
        Ok(Self {
            number: CardValidator::clean(number),
            exp_month,
            exp_year,
            cvv: cvv.to_string(),
            first_name: None,
            last_name: None,
            card_type,
        })
    }

    /// Attach the card holder's name
    pub fn with_holder(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self.last_name = Some(last_name.into());
        self
    }

    /// Account number, digits only
    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn exp_month(&self) -> u32 {
        self.exp_month
    }

    pub fn exp_year(&self) -> i32 {
        self.exp_year
    }

    pub fn cvv(&self) -> &str {
        &self.cvv
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    /// Whether both first and last name are present
    pub fn has_holder_name(&self) -> bool {
        self.first_name.as_deref().is_some_and(|n| !n.is_empty())
            && self.last_name.as_deref().is_some_and(|n| !n.is_empty())
    }

    /// Detected issuer
    pub fn card_type(&self) -> CardType {
        self.card_type
    }

    /// Number with all but the last four digits replaced by [`MASK_CHAR`]
    pub fn masked_number(&self) -> String {
        let hidden = self.number.len().saturating_sub(4);
        let mut masked = MASK_CHAR.to_string().repeat(hidden);
        masked.push_str(&self.number[hidden..]);
        masked
    }

    /// Last four digits
    pub fn last_four(&self) -> &str {
        &self.number[self.number.len().saturating_sub(4)..]
    }

    /// Expiry instant: 23:59:59 on the last day of the expiry month
    pub fn expiration(&self) -> NaiveDateTime {
        // Validated in `new`, so the date always exists.
        CardValidator::expiration(self.exp_month, self.exp_year)
            .unwrap_or(NaiveDateTime::MAX)
    }

    /// `YYYY-MM`, as the SOAP services expect
    pub fn expiration_wire(&self) -> String {
        format!("{}-{:02}", self.exp_year, self.exp_month)
    }

    /// `MM-YYYY`, as the delimited protocol expects
    pub fn legacy_expiration(&self) -> String {
        format!("{:02}-{}", self.exp_month, self.exp_year)
    }
}

impl fmt::Debug for CreditCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreditCard")
            .field("card_type", &self.card_type)
            .field("number", &self.masked_number())
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for CreditCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.card_type, self.masked_number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration};

    const TEST_CARD_NUMBERS: &[(CardType, &str)] = &[
        (CardType::Amex, "370000000000002"),
        (CardType::MasterCard, "5555555555554444"),
        (CardType::MasterCard, "5105105105105100"),
        (CardType::Discover, "6011000000000012"),
        (CardType::Visa, "4007000000027"),
        (CardType::Visa, "4012888818888"),
        (CardType::Visa, "4111111111111111"),
        (CardType::Diners, "38000000000006"),
    ];

    fn future_year() -> i32 {
        Local::now().year() + 10
    }

    fn bump_last_digit(number: &str) -> String {
        let (head, last) = number.split_at(number.len() - 1);
        let digit = last.parse::<u32>().unwrap();
        format!("{}{}", head, (digit + 1) % 10)
    }

    #[test]
    fn test_known_numbers_detect_issuer() {
        for (card_type, number) in TEST_CARD_NUMBERS {
            let card = CreditCard::new(number, 1, future_year(), "911").unwrap();
            assert_eq!(card.card_type(), *card_type, "{}", number);
        }
    }

    #[test]
    fn test_bumped_last_digit_fails_luhn() {
        for (_, number) in TEST_CARD_NUMBERS {
            let bumped = bump_last_digit(number);
            let err = CreditCard::new(&bumped, 1, future_year(), "911").unwrap_err();
            assert!(err.is_validation(), "{}", bumped);
        }
    }

    #[test]
    fn test_separators_are_stripped() {
        let card = CreditCard::new("4111-1111 1111-1111", 1, future_year(), "911").unwrap();
        assert_eq!(card.number(), "4111111111111111");
    }

    #[test]
    fn test_non_numeric_rejected() {
        let err = CreditCard::new("4111x11111111111", 1, future_year(), "911").unwrap_err();
        assert!(err.is_validation());
        assert!(CreditCard::new("", 1, future_year(), "911").is_err());
    }

    #[test]
    fn test_expired_card_rejected() {
        let expired = Local::now().date_naive() - Duration::days(31);
        let err = CreditCard::new(
            "4111111111111111",
            expired.month(),
            expired.year(),
            "911",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid data: Credit card is expired.");
    }

    #[test]
    fn test_current_month_still_valid() {
        let today = Local::now().date_naive();
        assert!(CreditCard::new("4111111111111111", today.month(), today.year(), "911").is_ok());
    }

    #[test]
    fn test_cvv_format() {
        let year = future_year();
        assert!(CreditCard::new("4111111111111111", 1, year, "incorrect").is_err());
        assert!(CreditCard::new("4111111111111111", 1, year, "12").is_err());
        assert!(CreditCard::new("4111111111111111", 1, year, "12345").is_err());
        assert!(CreditCard::new("4111111111111111", 1, year, "1234").is_ok());
    }

    #[test]
    fn test_unknown_issuer_rejected() {
        // Luhn-valid but matches no issuer pattern
        let err = CreditCard::new("0000000000000000", 1, future_year(), "911").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_invalid_month_rejected() {
        assert!(CreditCard::new("4111111111111111", 13, future_year(), "911").is_err());
        assert!(CreditCard::new("4111111111111111", 0, future_year(), "911").is_err());
    }

    #[test]
    fn test_expiration_is_end_of_month() {
        let year = future_year();
        let card = CreditCard::new("4111111111111111", 1, year, "911").unwrap();
        let expected = NaiveDate::from_ymd_opt(year, 1, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(card.expiration(), expected);

        let december = CardValidator::expiration(12, year).unwrap();
        assert_eq!(december.date(), NaiveDate::from_ymd_opt(year, 12, 31).unwrap());
    }

    #[test]
    fn test_masked_number() {
        for (_, number) in TEST_CARD_NUMBERS {
            let card = CreditCard::new(number, 1, future_year(), "911").unwrap();
            let masked = card.masked_number();
            assert_eq!(masked.len(), number.len());
            assert_eq!(&masked[masked.len() - 4..], &number[number.len() - 4..]);
            assert!(masked[..masked.len() - 4].chars().all(|c| c == MASK_CHAR));
        }
    }

    #[test]
    fn test_wire_expiration_formats() {
        let year = future_year();
        let card = CreditCard::new("4111111111111111", 1, year, "911").unwrap();
        assert_eq!(card.expiration_wire(), format!("{}-01", year));
        assert_eq!(card.legacy_expiration(), format!("01-{}", year));
    }

    #[test]
    fn test_debug_hides_number_and_cvv() {
        let card = CreditCard::new("4111111111111111", 1, future_year(), "911")
            .unwrap()
            .with_holder("Jeff", "Schenck");
        let debug = format!("{:?}", card);
        assert!(!debug.contains("4111111111111111"));
        assert!(!debug.contains("911"));
        assert_eq!(card.to_string(), "visa ************1111");
    }

    #[test]
    fn test_holder_name() {
        let card = CreditCard::new("4111111111111111", 1, future_year(), "911").unwrap();
        assert!(!card.has_holder_name());
        let card = card.with_holder("Jeff", "Schenck");
        assert!(card.has_holder_name());
        assert_eq!(card.first_name(), Some("Jeff"));
    }

    #[test]
    fn test_out_of_range_year_is_rejected() {
        let err = CreditCard::new("4111111111111111", 12, i32::MAX, "911").unwrap_err();
        assert!(err.is_validation());
        assert!(CreditCard::new("4111111111111111", 6, i32::MAX, "911").is_err());
        assert!(CardValidator::expiration(12, i32::MAX).is_err());
    }
}
