//! Request and snapshot types shared by the adapters and the gateway

use crate::money::Amount;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Country sent when an address does not name one
pub const DEFAULT_COUNTRY: &str = "US";

/// Billing address
///
/// No validation happens beyond presence; absent parts are simply not sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Street line
    pub street: Option<String>,
    /// City
    pub city: Option<String>,
    /// State or province
    pub state: Option<String>,
    /// Postal code
    pub zip: Option<String>,
    /// Country
    pub country: Option<String>,
}

impl Address {
    /// Create a full address in the default country
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        zip: impl Into<String>,
    ) -> Self {
        Self {
            street: Some(street.into()),
            city: Some(city.into()),
            state: Some(state.into()),
            zip: Some(zip.into()),
            country: Some(DEFAULT_COUNTRY.to_string()),
        }
    }

    /// With country
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Check if no part besides the country is set
    pub fn is_empty(&self) -> bool {
        self.street.is_none() && self.city.is_none() && self.state.is_none() && self.zip.is_none()
    }
}

impl Default for Address {
    /// Empty address in the default country
    fn default() -> Self {
        Self {
            street: None,
            city: None,
            state: None,
            zip: None,
            country: Some(DEFAULT_COUNTRY.to_string()),
        }
    }
}

/// Saved payment as reported by the profile service.
///
/// Number and expiry come back masked (e.g. `XXXX1111` / `XXXX`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPaymentInfo {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Address,
    /// Masked card number
    pub number: Option<String>,
    /// Masked expiration date
    pub expiration: Option<String>,
    /// Email held on the owning profile
    pub email: Option<String>,
}

/// Partial update for a saved payment.
///
/// Fields left as `None` keep their stored value. The expiry is only replaced
/// when both month and year are given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedPaymentUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<Address>,
    pub email: Option<String>,
    /// Replacement card number, digits only
    pub number: Option<String>,
    pub exp_month: Option<u32>,
    pub exp_year: Option<i32>,
}

impl SavedPaymentUpdate {
    /// Create an empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// With holder name
    pub fn holder(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self.last_name = Some(last_name.into());
        self
    }

    /// With billing address
    pub fn address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// With profile email
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// With replacement card number
    pub fn number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    /// With replacement expiry
    pub fn expiration(mut self, exp_month: u32, exp_year: i32) -> Self {
        self.exp_month = Some(exp_month);
        self.exp_year = Some(exp_year);
        self
    }

    /// `YYYY-MM` when both month and year are set
    pub fn expiration_wire(&self) -> Option<String> {
        match (self.exp_month, self.exp_year) {
            (Some(month), Some(year)) => Some(format!("{}-{:02}", year, month)),
            _ => None,
        }
    }
}

/// Billing interval of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Days,
    Months,
}

impl IntervalUnit {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Months => "months",
        }
    }
}

/// New recurring billing schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    /// Amount billed each interval
    pub amount: Amount,
    /// First billing date
    pub start: NaiveDate,
    /// Interval in days (7 to 365)
    pub days: Option<u32>,
    /// Interval in months (1 to 12)
    pub months: Option<u32>,
    /// Number of billings; `None` bills until canceled
    pub occurrences: Option<u32>,
    /// Amount billed during the trial
    pub trial_amount: Option<Amount>,
    /// Number of trial billings
    pub trial_occurrences: Option<u32>,
}

impl SubscriptionRequest {
    /// Create a schedule with no interval yet
    pub fn new(amount: impl Into<Amount>, start: NaiveDate) -> Self {
        Self {
            amount: amount.into(),
            start,
            days: None,
            months: None,
            occurrences: None,
            trial_amount: None,
            trial_occurrences: None,
        }
    }

    /// Bill every `days` days
    pub fn days(mut self, days: u32) -> Self {
        self.days = Some(days);
        self
    }

    /// Bill every `months` months
    pub fn months(mut self, months: u32) -> Self {
        self.months = Some(months);
        self
    }

    /// Stop after `occurrences` billings
    pub fn occurrences(mut self, occurrences: u32) -> Self {
        self.occurrences = Some(occurrences);
        self
    }

    /// Trial amount
    pub fn trial_amount(mut self, amount: impl Into<Amount>) -> Self {
        self.trial_amount = Some(amount.into());
        self
    }

    /// Trial length in billings
    pub fn trial_occurrences(mut self, occurrences: u32) -> Self {
        self.trial_occurrences = Some(occurrences);
        self
    }
}

/// Partial update of an existing subscription; only set fields are sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub amount: Option<Amount>,
    pub start: Option<NaiveDate>,
    pub occurrences: Option<u32>,
    pub trial_amount: Option<Amount>,
    pub trial_occurrences: Option<u32>,
}

impl SubscriptionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn amount(mut self, amount: impl Into<Amount>) -> Self {
        self.amount = Some(amount.into());
        self
    }

    pub fn start(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    pub fn occurrences(mut self, occurrences: u32) -> Self {
        self.occurrences = Some(occurrences);
        self
    }

    pub fn trial_amount(mut self, amount: impl Into<Amount>) -> Self {
        self.trial_amount = Some(amount.into());
        self
    }

    pub fn trial_occurrences(mut self, occurrences: u32) -> Self {
        self.trial_occurrences = Some(occurrences);
        self
    }

    /// Check if nothing would be sent
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
