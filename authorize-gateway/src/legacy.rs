//! Delimited transaction protocol (AIM)
//!
//! Every operation is a single form-encoded POST. The processor answers with
//! one `;`-delimited line whose fields are identified by position only; see
//! [`RESPONSE_FIELDS`].

use crate::card::CreditCard;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult, ProcessorResponse};
use crate::money::Amount;
use crate::types::Address;
use authorize_log::{debug, error, warn};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Production endpoint
pub const PRODUCTION_URL: &str = "https://secure.authorize.net/gateway/transact.dll";

/// Sandbox endpoint
pub const TEST_URL: &str = "https://test.authorize.net/gateway/transact.dll";

/// Protocol version sent with every request
pub const API_VERSION: &str = "3.1";

/// Field delimiter requested from the processor
pub const DELIMITER: char = ';';

/// Charset assumed when the response does not declare one
pub const DEFAULT_CHARSET: &str = "iso-8859-1";

/// Position and name of each field extracted from a response line
pub const RESPONSE_FIELDS: [(usize, &str); 9] = [
    (0, "response_code"),
    (2, "response_reason_code"),
    (3, "response_reason_text"),
    (4, "authorization_code"),
    (5, "avs_response"),
    (6, "transaction_id"),
    (9, "amount"),
    (11, "transaction_type"),
    (38, "cvv_response"),
];

/// Request parameters, keyed by wire name
pub type Params = BTreeMap<&'static str, String>;

/// `x_type` of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    AuthOnly,
    AuthCapture,
    PriorAuthCapture,
    Credit,
    Void,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthOnly => "AUTH_ONLY",
            Self::AuthCapture => "AUTH_CAPTURE",
            Self::PriorAuthCapture => "PRIOR_AUTH_CAPTURE",
            Self::Credit => "CREDIT",
            Self::Void => "VOID",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Meaning of the response code field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Approved,
    Declined,
    Error,
    HeldForReview,
    Unknown,
}

/// Named fields of a delimited response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub response_code: String,
    pub response_reason_code: String,
    pub response_reason_text: String,
    pub authorization_code: String,
    pub avs_response: String,
    pub transaction_id: String,
    pub amount: String,
    pub transaction_type: String,
    pub cvv_response: String,
}

impl TransactionResponse {
    /// Split a response line into its named fields.
    ///
    /// A line too short to contain every field is treated as unreadable.
    pub fn parse(line: &str) -> GatewayResult<Self> {
        Self::parse_delimited(line, DELIMITER)
    }

    /// Same as [`parse`](Self::parse) for an arbitrary delimiter.
    pub fn parse_delimited(line: &str, delimiter: char) -> GatewayResult<Self> {
        let parts: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(delimiter).collect();
        let field = |index: usize| -> GatewayResult<String> {
            parts.get(index).map(|s| s.to_string()).ok_or_else(|| {
                GatewayError::connection(format!(
                    "unreadable transaction response: {} fields, expected at least {}",
                    parts.len(),
                    RESPONSE_FIELDS[RESPONSE_FIELDS.len() - 1].0 + 1
                ))
            })
        };

        Ok(Self {
            response_code: field(0)?,
            response_reason_code: field(2)?,
            response_reason_text: field(3)?,
            authorization_code: field(4)?,
            avs_response: field(5)?,
            transaction_id: field(6)?,
            amount: field(9)?,
            transaction_type: field(11)?,
            cvv_response: field(38)?,
        })
    }

    /// Interpret the response code
    pub fn code(&self) -> ResponseCode {
        match self.response_code.as_str() {
            "1" => ResponseCode::Approved,
            "2" => ResponseCode::Declined,
            "3" => ResponseCode::Error,
            "4" => ResponseCode::HeldForReview,
            _ => ResponseCode::Unknown,
        }
    }

    /// Only code `1` counts as success
    pub fn is_approved(&self) -> bool {
        self.code() == ResponseCode::Approved
    }

    /// Pass approved responses through, turn anything else into a
    /// [`GatewayError::Response`] carrying the full field map.
    pub fn approved(self) -> GatewayResult<Self> {
        if self.is_approved() {
            return Ok(self);
        }
        Err(GatewayError::Response {
            reason: self.response_reason_text.clone(),
            response: Box::new(ProcessorResponse::Transaction(self)),
        })
    }

    /// Field map keyed by field name
    pub fn fields(&self) -> BTreeMap<&'static str, &str> {
        let values = [
            &self.response_code,
            &self.response_reason_code,
            &self.response_reason_text,
            &self.authorization_code,
            &self.avs_response,
            &self.transaction_id,
            &self.amount,
            &self.transaction_type,
            &self.cvv_response,
        ];
        RESPONSE_FIELDS
            .iter()
            .zip(values)
            .map(|((_, name), value)| (*name, value.as_str()))
            .collect()
    }
}

/// Card identification for a credit
#[derive(Debug, Clone, Copy)]
pub enum CardReference<'a> {
    /// Last four digits, enough for a credit linked to a prior transaction
    LastFour(&'a str),
    /// Full card, for credits with no prior transaction
    Card(&'a CreditCard),
}

impl CardReference<'_> {
    fn number(&self) -> &str {
        match self {
            Self::LastFour(digits) => digits,
            Self::Card(card) => card.number(),
        }
    }
}

/// Client for the delimited transaction protocol
pub struct LegacyTransactionAdapter {
    client: reqwest::Client,
    endpoint: String,
    login_id: String,
    transaction_key: SecretString,
    test: bool,
}

impl LegacyTransactionAdapter {
    /// Create an adapter posting to `endpoint`
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        login_id: impl Into<String>,
        transaction_key: SecretString,
        test: bool,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            login_id: login_id.into(),
            transaction_key,
            test,
        }
    }

    /// Create from gateway configuration, using the endpoint it resolves to
    pub fn from_config(client: reqwest::Client, config: &GatewayConfig) -> Self {
        Self::new(
            client,
            config.legacy_url(),
            config.login_id(),
            SecretString::new(config.transaction_key().expose_secret().into()),
            config.test(),
        )
    }

    /// Endpoint requests are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn base_params(&self, transaction_type: TransactionType) -> Params {
        let mut params = Params::new();
        params.insert("x_login", self.login_id.clone());
        params.insert("x_tran_key", self.transaction_key.expose_secret().to_string());
        params.insert("x_version", API_VERSION.to_string());
        params.insert(
            "x_test_request",
            if self.test { "TRUE" } else { "FALSE" }.to_string(),
        );
        params.insert("x_delim_data", "TRUE".to_string());
        params.insert("x_delim_char", DELIMITER.to_string());
        params.insert("x_type", transaction_type.as_str().to_string());
        params
    }

    fn add_card(params: &mut Params, card: &CreditCard) {
        params.insert("x_card_num", card.number().to_string());
        params.insert("x_exp_date", card.legacy_expiration());
        params.insert("x_card_code", card.cvv().to_string());
        insert_opt(params, "x_first_name", card.first_name());
        insert_opt(params, "x_last_name", card.last_name());
    }

    fn add_address(params: &mut Params, address: &Address) {
        insert_opt(params, "x_address", address.street.as_deref());
        insert_opt(params, "x_city", address.city.as_deref());
        insert_opt(params, "x_state", address.state.as_deref());
        insert_opt(params, "x_zip", address.zip.as_deref());
        insert_opt(params, "x_country", address.country.as_deref());
    }

    /// Reserve `amount` on the card
    pub async fn auth(
        &self,
        amount: Amount,
        card: &CreditCard,
        address: Option<&Address>,
        email: Option<&str>,
    ) -> GatewayResult<TransactionResponse> {
        self.charge(TransactionType::AuthOnly, amount, card, address, email)
            .await
    }

    /// Authorize and capture `amount` immediately
    pub async fn capture(
        &self,
        amount: Amount,
        card: &CreditCard,
        address: Option<&Address>,
        email: Option<&str>,
    ) -> GatewayResult<TransactionResponse> {
        self.charge(TransactionType::AuthCapture, amount, card, address, email)
            .await
    }

    async fn charge(
        &self,
        transaction_type: TransactionType,
        amount: Amount,
        card: &CreditCard,
        address: Option<&Address>,
        email: Option<&str>,
    ) -> GatewayResult<TransactionResponse> {
        let mut params = self.base_params(transaction_type);
        Self::add_card(&mut params, card);
        insert_opt(&mut params, "x_email", email);
        if let Some(address) = address {
            Self::add_address(&mut params, address);
        }
        params.insert("x_amount", amount.to_wire());

        debug!(
            "{} {} on {}",
            transaction_type,
            amount,
            card.masked_number()
        );
        self.call(transaction_type, &params).await
    }

    /// Settle a prior authorization; no amount settles the full authorized amount
    pub async fn settle(
        &self,
        transaction_id: &str,
        amount: Option<Amount>,
    ) -> GatewayResult<TransactionResponse> {
        let mut params = self.base_params(TransactionType::PriorAuthCapture);
        params.insert("x_trans_id", transaction_id.to_string());
        if let Some(amount) = amount {
            params.insert("x_amount", amount.to_wire());
        }

        debug!("PRIOR_AUTH_CAPTURE of transaction {}", transaction_id);
        self.call(TransactionType::PriorAuthCapture, &params).await
    }

    /// Refund money to a card.
    ///
    /// With a `transaction_id` the credit is linked to that settled charge.
    /// Without one it is an unlinked credit, which requires an amount and a
    /// merchant account enabled for it.
    pub async fn credit(
        &self,
        card: CardReference<'_>,
        transaction_id: Option<&str>,
        amount: Option<Amount>,
    ) -> GatewayResult<TransactionResponse> {
        if transaction_id.is_none() && amount.is_none() {
            return Err(GatewayError::validation(
                "An unlinked credit requires an amount.",
            ));
        }

        let mut params = self.base_params(TransactionType::Credit);
        match card {
            CardReference::Card(card) => Self::add_card(&mut params, card),
            CardReference::LastFour(_) => {
                params.insert("x_card_num", card.number().to_string());
            }
        }
        insert_opt(&mut params, "x_trans_id", transaction_id);
        if let Some(amount) = amount {
            params.insert("x_amount", amount.to_wire());
        }

        debug!(
            "CREDIT to card ending {} (transaction {})",
            last_four(card.number()),
            transaction_id.unwrap_or("none")
        );
        self.call(TransactionType::Credit, &params).await
    }

    /// Void an unsettled transaction
    pub async fn void(&self, transaction_id: &str) -> GatewayResult<TransactionResponse> {
        let mut params = self.base_params(TransactionType::Void);
        params.insert("x_trans_id", transaction_id.to_string());

        debug!("VOID of transaction {}", transaction_id);
        self.call(TransactionType::Void, &params).await
    }

    async fn call(
        &self,
        transaction_type: TransactionType,
        params: &Params,
    ) -> GatewayResult<TransactionResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                error!("{} request failed: {}", transaction_type, e);
                GatewayError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("{} request returned HTTP {}", transaction_type, status);
            return Err(GatewayError::connection(format!(
                "transaction endpoint returned HTTP {}",
                status
            )));
        }

        let body = response.text_with_charset(DEFAULT_CHARSET).await?;
        let parsed = TransactionResponse::parse(&body)?;

        if !parsed.is_approved() {
            warn!(
                "{} not approved: code {} reason {} ({})",
                transaction_type,
                parsed.response_code,
                parsed.response_reason_code,
                parsed.response_reason_text
            );
        }
        parsed.approved()
    }
}

impl fmt::Debug for LegacyTransactionAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyTransactionAdapter")
            .field("endpoint", &self.endpoint)
            .field("login_id", &self.login_id)
            .field("test", &self.test)
            .finish_non_exhaustive()
    }
}

fn insert_opt(params: &mut Params, key: &'static str, value: Option<&str>) {
    if let Some(value) = value {
        params.insert(key, value.to_string());
    }
}

fn last_four(number: &str) -> &str {
    &number[number.len().saturating_sub(4)..]
}
