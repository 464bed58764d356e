//! SOAP service shared by the profile (CIM) and subscription (ARB) adapters
//!
//! Requests are typed structs serialized with quick-xml and wrapped in a SOAP
//! 1.1 envelope. Every reply carries a `resultCode` and an ordered list of
//! `(code, text)` messages inside a `<{Action}Result>` element; anything but
//! `Ok` is a rejection.
//!
//! The [`SoapTransport`] trait is the seam between the adapters and the wire.
//! [`HttpSoapTransport`] talks to the processor; tests use
//! [`RecordingTransport`](crate::testing::RecordingTransport).

use crate::error::{GatewayError, GatewayResult, ProcessorResponse};
use crate::types::Address;
use async_trait::async_trait;
use authorize_log::{debug, error};
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Target namespace of the service, also the SOAPAction prefix
pub const SOAP_NAMESPACE: &str = "https://api.authorize.net/soap/v1/";

/// Production endpoint
pub const PRODUCTION_URL: &str = "https://api.authorize.net/soap/v1/Service.asmx";

/// Sandbox endpoint
pub const TEST_URL: &str = "https://apitest.authorize.net/soap/v1/Service.asmx";

/// The only successful result code
pub const RESULT_OK: &str = "Ok";

/// Options making profile transactions answer with a `;`-delimited direct
/// response readable by [`TransactionResponse::parse`](crate::legacy::TransactionResponse::parse)
pub const DIRECT_RESPONSE_OPTIONS: &str =
    "x_delim_data=TRUE&x_version=3.1&x_delim_char=%3B&x_test_request=F";

/// Validation mode sent when creating or updating payment profiles
pub const VALIDATION_MODE: &str = "none";

const ENVELOPE_OPEN: &str = r#"<?xml version="1.0" encoding="utf-8"?><soap:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body>"#;
const ENVELOPE_CLOSE: &str = "</soap:Body></soap:Envelope>";

// ---------------------------------------------------------------------------
// Message types
// ---------------------------------------------------------------------------

/// Credentials carried by every request
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantAuthentication {
    pub name: String,
    pub transaction_key: String,
}

impl fmt::Debug for MerchantAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantAuthentication")
            .field("name", &self.name)
            .field("transaction_key", &"[REDACTED]")
            .finish()
    }
}

/// One `(code, text)` entry of a reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoapMessage {
    pub code: String,
    pub text: String,
}

/// `<messages>` wrapper
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageList {
    #[serde(rename = "MessagesTypeMessage", default)]
    pub items: Vec<SoapMessage>,
}

/// Result code and messages of a reply, kept on rejections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapStatus {
    pub result_code: String,
    pub messages: Vec<SoapMessage>,
}

impl SoapStatus {
    /// Rejection status with a single message
    pub fn error(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            result_code: "Error".to_string(),
            messages: vec![SoapMessage {
                code: code.into(),
                text: text.into(),
            }],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result_code == RESULT_OK
    }

    /// `"<code>: <text>"` of the first message
    pub fn reason(&self) -> String {
        match self.messages.first() {
            Some(message) => format!("{}: {}", message.code, message.text),
            None => format!("result code '{}' without messages", self.result_code),
        }
    }
}

/// `<customerPaymentProfileIdList>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdList {
    #[serde(rename = "long", default)]
    pub ids: Vec<String>,
}

/// Billing name and address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillTo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl BillTo {
    pub fn new(first_name: Option<&str>, last_name: Option<&str>, address: Option<&Address>) -> Self {
        let mut bill_to = Self {
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
            ..Default::default()
        };
        if let Some(address) = address {
            bill_to.set_address(address);
        }
        bill_to
    }

    /// Replace the address part, keeping names
    pub fn set_address(&mut self, address: &Address) {
        self.address = address.street.clone();
        self.city = address.city.clone();
        self.state = address.state.clone();
        self.zip = address.zip.clone();
        self.country = address.country.clone();
    }

    pub fn to_address(&self) -> Address {
        Address {
            street: self.address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip: self.zip.clone(),
            country: self.country.clone(),
        }
    }
}

/// `<creditCard>`; masked when returned by the service
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardData {
    pub card_number: String,
    pub expiration_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_code: Option<String>,
}

impl fmt::Debug for CardData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardData")
            .field("card_number", &authorize_log::mask_card_number(&self.card_number))
            .field("expiration_date", &self.expiration_date)
            .finish_non_exhaustive()
    }
}

/// `<payment>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Payment {
    pub credit_card: CardData,
}

/// Payment profile, both as sent and as returned (masked)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_to: Option<BillTo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<Payment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_payment_profile_id: Option<String>,
}

/// `<paymentProfiles>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProfileList {
    #[serde(
        rename = "CustomerPaymentProfileType",
        alias = "CustomerPaymentProfileMaskedType",
        default
    )]
    pub items: Vec<PaymentProfile>,
}

/// Customer profile, both as sent and as returned
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_profiles: Option<PaymentProfileList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_profile_id: Option<String>,
}

impl CustomerProfile {
    /// Payment profiles, empty when none were returned
    pub fn payment_profiles(&self) -> &[PaymentProfile] {
        self.payment_profiles
            .as_ref()
            .map(|list| list.items.as_slice())
            .unwrap_or_default()
    }
}

/// Details of a profile transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileTransDetail {
    pub amount: String,
    pub customer_profile_id: String,
    pub customer_payment_profile_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trans_id: Option<String>,
}

/// `<transaction>`; exactly one member is set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileTransaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_trans_auth_only: Option<ProfileTransDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_trans_auth_capture: Option<ProfileTransDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_trans_refund: Option<ProfileTransDetail>,
}

/// Billing interval of a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub length: u32,
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSchedule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<Interval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_occurrences: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_occurrences: Option<u32>,
}

impl PaymentSchedule {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// `<subscription>`; on update only the set members are changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbSubscription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_schedule: Option<PaymentSchedule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<Payment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_to: Option<BillTo>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerProfile {
    pub merchant_authentication: MerchantAuthentication,
    pub profile: CustomerProfile,
    pub validation_mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerPaymentProfile {
    pub merchant_authentication: MerchantAuthentication,
    pub customer_profile_id: String,
    pub payment_profile: PaymentProfile,
    pub validation_mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCustomerProfile {
    pub merchant_authentication: MerchantAuthentication,
    pub customer_profile_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerPaymentProfile {
    pub merchant_authentication: MerchantAuthentication,
    pub customer_profile_id: String,
    pub payment_profile: PaymentProfile,
    pub validation_mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerProfile {
    pub merchant_authentication: MerchantAuthentication,
    pub profile: CustomerProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCustomerProfile {
    pub merchant_authentication: MerchantAuthentication,
    pub customer_profile_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCustomerPaymentProfile {
    pub merchant_authentication: MerchantAuthentication,
    pub customer_profile_id: String,
    pub customer_payment_profile_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerProfileTransaction {
    pub merchant_authentication: MerchantAuthentication,
    pub transaction: ProfileTransaction,
    pub extra_options: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbCreateSubscription {
    pub merchant_authentication: MerchantAuthentication,
    pub subscription: ArbSubscription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbUpdateSubscription {
    pub merchant_authentication: MerchantAuthentication,
    pub subscription_id: String,
    pub subscription: ArbSubscription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbCancelSubscription {
    pub merchant_authentication: MerchantAuthentication,
    pub subscription_id: String,
}

/// A request to the SOAP service, one variant per action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoapRequest {
    CreateCustomerProfile(CreateCustomerProfile),
    CreateCustomerPaymentProfile(CreateCustomerPaymentProfile),
    GetCustomerProfile(GetCustomerProfile),
    UpdateCustomerPaymentProfile(UpdateCustomerPaymentProfile),
    UpdateCustomerProfile(UpdateCustomerProfile),
    DeleteCustomerProfile(DeleteCustomerProfile),
    DeleteCustomerPaymentProfile(DeleteCustomerPaymentProfile),
    CreateCustomerProfileTransaction(CreateCustomerProfileTransaction),
    ArbCreateSubscription(ArbCreateSubscription),
    ArbUpdateSubscription(ArbUpdateSubscription),
    ArbCancelSubscription(ArbCancelSubscription),
}

impl SoapRequest {
    /// Operation name, used as body element and SOAPAction suffix
    pub fn action(&self) -> &'static str {
        match self {
            Self::CreateCustomerProfile(_) => "CreateCustomerProfile",
            Self::CreateCustomerPaymentProfile(_) => "CreateCustomerPaymentProfile",
            Self::GetCustomerProfile(_) => "GetCustomerProfile",
            Self::UpdateCustomerPaymentProfile(_) => "UpdateCustomerPaymentProfile",
            Self::UpdateCustomerProfile(_) => "UpdateCustomerProfile",
            Self::DeleteCustomerProfile(_) => "DeleteCustomerProfile",
            Self::DeleteCustomerPaymentProfile(_) => "DeleteCustomerPaymentProfile",
            Self::CreateCustomerProfileTransaction(_) => "CreateCustomerProfileTransaction",
            Self::ArbCreateSubscription(_) => "ARBCreateSubscription",
            Self::ArbUpdateSubscription(_) => "ARBUpdateSubscription",
            Self::ArbCancelSubscription(_) => "ARBCancelSubscription",
        }
    }

    /// Value of the SOAPAction header
    pub fn soap_action(&self) -> String {
        format!("\"{}{}\"", SOAP_NAMESPACE, self.action())
    }

    /// Body element in the service namespace
    pub fn to_xml(&self) -> GatewayResult<String> {
        let action = self.action();
        let body = quick_xml::se::to_string_with_root(action, self)?;
        Ok(body.replacen(
            &format!("<{}>", action),
            &format!("<{} xmlns=\"{}\">", action, SOAP_NAMESPACE),
            1,
        ))
    }

    /// Complete SOAP envelope
    pub fn to_envelope(&self) -> GatewayResult<String> {
        Ok(format!("{}{}{}", ENVELOPE_OPEN, self.to_xml()?, ENVELOPE_CLOSE))
    }
}

impl Serialize for SoapRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::CreateCustomerProfile(body) => body.serialize(serializer),
            Self::CreateCustomerPaymentProfile(body) => body.serialize(serializer),
            Self::GetCustomerProfile(body) => body.serialize(serializer),
            Self::UpdateCustomerPaymentProfile(body) => body.serialize(serializer),
            Self::UpdateCustomerProfile(body) => body.serialize(serializer),
            Self::DeleteCustomerProfile(body) => body.serialize(serializer),
            Self::DeleteCustomerPaymentProfile(body) => body.serialize(serializer),
            Self::CreateCustomerProfileTransaction(body) => body.serialize(serializer),
            Self::ArbCreateSubscription(body) => body.serialize(serializer),
            Self::ArbUpdateSubscription(body) => body.serialize(serializer),
            Self::ArbCancelSubscription(body) => body.serialize(serializer),
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Contents of a `<{Action}Result>` element.
///
/// Covers the members of every reply the adapters read; members an action
/// does not return stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoapResponse {
    pub result_code: String,
    pub messages: MessageList,
    pub customer_profile_id: Option<String>,
    pub customer_payment_profile_id_list: Option<IdList>,
    pub customer_payment_profile_id: Option<String>,
    pub direct_response: Option<String>,
    pub profile: Option<CustomerProfile>,
    pub subscription_id: Option<String>,
}

impl SoapResponse {
    /// Successful reply with the usual `I00001` message
    pub fn ok() -> Self {
        Self {
            result_code: RESULT_OK.to_string(),
            messages: MessageList {
                items: vec![SoapMessage {
                    code: "I00001".to_string(),
                    text: "Successful.".to_string(),
                }],
            },
            ..Default::default()
        }
    }

    /// Rejected reply with a single message
    pub fn error(code: impl Into<String>, text: impl Into<String>) -> Self {
        let status = SoapStatus::error(code, text);
        Self {
            result_code: status.result_code,
            messages: MessageList {
                items: status.messages,
            },
            ..Default::default()
        }
    }

    pub fn with_customer_profile_id(mut self, id: impl Into<String>) -> Self {
        self.customer_profile_id = Some(id.into());
        self
    }

    pub fn with_payment_profile_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.customer_payment_profile_id_list = Some(IdList {
            ids: ids.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn with_payment_profile_id(mut self, id: impl Into<String>) -> Self {
        self.customer_payment_profile_id = Some(id.into());
        self
    }

    pub fn with_direct_response(mut self, direct_response: impl Into<String>) -> Self {
        self.direct_response = Some(direct_response.into());
        self
    }

    pub fn with_profile(mut self, profile: CustomerProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_subscription_id(mut self, id: impl Into<String>) -> Self {
        self.subscription_id = Some(id.into());
        self
    }

    /// Result code and messages
    pub fn status(&self) -> SoapStatus {
        SoapStatus {
            result_code: self.result_code.clone(),
            messages: self.messages.items.clone(),
        }
    }

    /// Pass `Ok` replies through; anything else becomes a
    /// [`GatewayError::Response`] reading `"<code>: <text>"`.
    pub fn into_result(self) -> GatewayResult<Self> {
        if self.result_code == RESULT_OK {
            return Ok(self);
        }
        let status = self.status();
        Err(GatewayError::Response {
            reason: status.reason(),
            response: Box::new(ProcessorResponse::Soap(status)),
        })
    }

    /// Payment profile ids, in request order
    pub fn payment_profile_ids(&self) -> Option<&[String]> {
        self.customer_payment_profile_id_list
            .as_ref()
            .map(|list| list.ids.as_slice())
    }
}

/// Extract the `<{Action}Result>` element of a reply envelope.
///
/// A SOAP fault and an envelope without a result element are both
/// connection errors: the outcome of the call is unknown.
pub fn parse_envelope(xml: &str) -> GatewayResult<SoapResponse> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let local = e.local_name();
                if local.as_ref() == b"Fault" {
                    let reason = fault_string(xml).unwrap_or_else(|| "unknown fault".to_string());
                    return Err(GatewayError::connection(format!("SOAP fault: {}", reason)));
                }
                if local.as_ref().ends_with(b"Result") {
                    let name = e.name().as_ref().to_vec();
                    let span = reader.read_to_end(QName(&name))?;
                    let inner = xml
                        .get(span.start as usize..span.end as usize)
                        .ok_or_else(|| GatewayError::connection("truncated SOAP result"))?;
                    let wrapped = format!("<result>{}</result>", inner);
                    return Ok(quick_xml::de::from_str(&wrapped)?);
                }
            }
            Event::Empty(e) if e.local_name().as_ref().ends_with(b"Result") => {
                return Ok(SoapResponse::default());
            }
            Event::Eof => {
                return Err(GatewayError::connection("SOAP reply has no result element"));
            }
            _ => {}
        }
    }
}

/// Text of the first `<faultstring>` in `xml`, if any
pub fn fault_string(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().ok()? {
            Event::Start(e) if e.local_name().as_ref() == b"faultstring" => {
                let name = e.name().as_ref().to_vec();
                let text = reader.read_text(QName(&name)).ok()?;
                let text = quick_xml::escape::unescape(&text)
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| text.into_owned());
                return Some(text.trim().to_string());
            }
            Event::Eof => return None,
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Sends one request and returns the decoded result element.
///
/// Implementations report transport problems and faults as
/// [`GatewayError::Connection`]; the result code is checked by the caller.
#[async_trait]
pub trait SoapTransport: Send + Sync {
    async fn call(&self, request: &SoapRequest) -> GatewayResult<SoapResponse>;
}

/// SOAP 1.1 over HTTP POST
pub struct HttpSoapTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSoapTransport {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SoapTransport for HttpSoapTransport {
    async fn call(&self, request: &SoapRequest) -> GatewayResult<SoapResponse> {
        let action = request.action();
        let envelope = request.to_envelope()?;
        debug!("SOAP {} to {}", action, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", request.soap_action())
            .body(envelope)
            .send()
            .await
            .map_err(|e| {
                error!("SOAP {} failed: {}", action, e);
                GatewayError::from(e)
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let reason = fault_string(&body).unwrap_or_else(|| format!("HTTP {}", status));
            error!("SOAP {} failed: {}", action, reason);
            return Err(GatewayError::connection(format!("SOAP fault: {}", reason)));
        }

        parse_envelope(&body).inspect_err(|e| error!("SOAP {} failed: {}", action, e))
    }
}

impl fmt::Debug for HttpSoapTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSoapTransport")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
