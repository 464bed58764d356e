//! Saved payment profiles (CIM)
//!
//! A customer profile owns one or more payment profiles. Profiles are created
//! together with their first payments; further payments are attached with
//! [`ProfileAdapter::create_saved_payment`]. Charging a saved payment goes
//! through a profile transaction whose direct response is read with the same
//! parser and approval rule as the delimited protocol.

use crate::card::{CardType, CardValidator, CreditCard};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::legacy::TransactionResponse;
use crate::money::Amount;
use crate::soap::{
    BillTo, CardData, CreateCustomerPaymentProfile, CreateCustomerProfile,
    CreateCustomerProfileTransaction, CustomerProfile, DeleteCustomerPaymentProfile,
    DeleteCustomerProfile, GetCustomerProfile, HttpSoapTransport, MerchantAuthentication, Payment,
    PaymentProfile, PaymentProfileList, ProfileTransDetail, ProfileTransaction, SoapRequest,
    SoapResponse, SoapTransport, UpdateCustomerPaymentProfile, UpdateCustomerProfile,
    DIRECT_RESPONSE_OPTIONS, VALIDATION_MODE,
};
use crate::types::{Address, SavedPaymentInfo, SavedPaymentUpdate};
use authorize_log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// Result of [`ProfileAdapter::create_saved_payment`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedPayment {
    /// Built locally, to be passed to [`ProfileAdapter::create_saved_profile`]
    Unsaved(PaymentProfile),
    /// Stored under an existing profile with this payment id
    Created(String),
}

/// Kind of profile transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProfileTransKind {
    AuthOnly,
    AuthCapture,
    Refund,
}

/// Client for the saved payment service
pub struct ProfileAdapter<T: SoapTransport = HttpSoapTransport> {
    transport: Arc<T>,
    auth: MerchantAuthentication,
}

impl<T: SoapTransport> ProfileAdapter<T> {
    pub fn new(transport: Arc<T>, login_id: impl Into<String>, transaction_key: &SecretString) -> Self {
        Self {
            transport,
            auth: MerchantAuthentication {
                name: login_id.into(),
                transaction_key: transaction_key.expose_secret().to_string(),
            },
        }
    }

    pub fn from_config(transport: Arc<T>, config: &GatewayConfig) -> Self {
        Self::new(transport, config.login_id(), config.transaction_key())
    }

    /// Transport in use
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    async fn call(&self, request: SoapRequest) -> GatewayResult<SoapResponse> {
        let action = request.action();
        self.transport
            .call(&request)
            .await?
            .into_result()
            .inspect_err(|e| warn!("{} rejected: {}", action, e))
    }

    /// Payment profile for `card`, not yet stored anywhere
    pub fn payment_profile(card: &CreditCard, address: Option<&Address>) -> PaymentProfile {
        PaymentProfile {
            customer_type: None,
            bill_to: Some(BillTo::new(card.first_name(), card.last_name(), address)),
            payment: Some(Payment {
                credit_card: CardData {
                    card_number: card.number().to_string(),
                    expiration_date: card.expiration_wire(),
                    card_code: Some(card.cvv().to_string()),
                },
            }),
            customer_payment_profile_id: None,
        }
    }

    /// Create a customer profile holding `payments`.
    ///
    /// Returns the profile id and, when payments were given, their ids in
    /// the same order.
    pub async fn create_saved_profile(
        &self,
        external_ref: &str,
        payments: Vec<PaymentProfile>,
        email: Option<&str>,
    ) -> GatewayResult<(String, Option<Vec<String>>)> {
        let has_payments = !payments.is_empty();
        debug!(
            "CreateCustomerProfile {} with {} payment(s)",
            external_ref,
            payments.len()
        );

        let response = self
            .call(SoapRequest::CreateCustomerProfile(CreateCustomerProfile {
                merchant_authentication: self.auth.clone(),
                profile: CustomerProfile {
                    merchant_customer_id: Some(external_ref.to_string()),
                    email: email.map(str::to_string),
                    payment_profiles: has_payments.then(|| PaymentProfileList { items: payments }),
                    customer_profile_id: None,
                },
                validation_mode: VALIDATION_MODE.to_string(),
            }))
            .await?;

        let payment_ids = has_payments.then(|| {
            response
                .payment_profile_ids()
                .map(<[String]>::to_vec)
                .unwrap_or_default()
        });
        let profile_id = required(response.customer_profile_id, "customerProfileId")?;
        Ok((profile_id, payment_ids))
    }

    /// Build a payment for `card`, storing it right away when `profile_id`
    /// names an existing profile.
    pub async fn create_saved_payment(
        &self,
        card: &CreditCard,
        address: Option<&Address>,
        profile_id: Option<&str>,
    ) -> GatewayResult<SavedPayment> {
        let payment = Self::payment_profile(card, address);
        let Some(profile_id) = profile_id else {
            return Ok(SavedPayment::Unsaved(payment));
        };

        debug!(
            "CreateCustomerPaymentProfile {} on profile {}",
            card.masked_number(),
            profile_id
        );
        let response = self
            .call(SoapRequest::CreateCustomerPaymentProfile(
                CreateCustomerPaymentProfile {
                    merchant_authentication: self.auth.clone(),
                    customer_profile_id: profile_id.to_string(),
                    payment_profile: payment,
                    validation_mode: VALIDATION_MODE.to_string(),
                },
            ))
            .await?;

        required(response.customer_payment_profile_id, "customerPaymentProfileId")
            .map(SavedPayment::Created)
    }

    async fn fetch_profile(&self, profile_id: &str) -> GatewayResult<CustomerProfile> {
        debug!("GetCustomerProfile {}", profile_id);
        let response = self
            .call(SoapRequest::GetCustomerProfile(GetCustomerProfile {
                merchant_authentication: self.auth.clone(),
                customer_profile_id: profile_id.to_string(),
            }))
            .await?;
        response
            .profile
            .ok_or_else(|| GatewayError::connection("reply is missing profile"))
    }

    fn find_payment<'p>(
        profile: &'p CustomerProfile,
        profile_id: &str,
        payment_id: &str,
    ) -> GatewayResult<&'p PaymentProfile> {
        profile
            .payment_profiles()
            .iter()
            .find(|p| p.customer_payment_profile_id.as_deref() == Some(payment_id))
            .ok_or_else(|| {
                GatewayError::connection(format!(
                    "payment {} not found on profile {}",
                    payment_id, profile_id
                ))
            })
    }

    fn snapshot(profile: &CustomerProfile, payment: &PaymentProfile) -> SavedPaymentInfo {
        let bill_to = payment.bill_to.clone().unwrap_or_default();
        let card = payment.payment.as_ref().map(|p| &p.credit_card);
        SavedPaymentInfo {
            first_name: bill_to.first_name.clone(),
            last_name: bill_to.last_name.clone(),
            address: bill_to.to_address(),
            number: card.map(|c| c.card_number.clone()),
            expiration: card.map(|c| c.expiration_date.clone()),
            email: profile.email.clone(),
        }
    }

    /// Names, address, masked number and expiry of a saved payment, plus the
    /// profile's email
    pub async fn retrieve_saved_payment(
        &self,
        profile_id: &str,
        payment_id: &str,
    ) -> GatewayResult<SavedPaymentInfo> {
        let profile = self.fetch_profile(profile_id).await?;
        let payment = Self::find_payment(&profile, profile_id, payment_id)?;
        Ok(Self::snapshot(&profile, payment))
    }

    /// Merge `update` over the stored payment and send the full replacement.
    ///
    /// The stored number and expiry come back masked; sending the masked
    /// values keeps them unchanged. The email lives on the profile, which is
    /// updated as well when one is present after merging.
    pub async fn update_saved_payment(
        &self,
        profile_id: &str,
        payment_id: &str,
        update: &SavedPaymentUpdate,
    ) -> GatewayResult<()> {
        let number = update
            .number
            .as_deref()
            .map(validate_replacement_number)
            .transpose()?;
        if let (Some(month), Some(year)) = (update.exp_month, update.exp_year) {
            CardValidator::check_not_expired(month, year)?;
        }

        let profile = self.fetch_profile(profile_id).await?;
        let current = Self::snapshot(
            &profile,
            Self::find_payment(&profile, profile_id, payment_id)?,
        );

        let first_name = update.first_name.clone().or(current.first_name);
        let last_name = update.last_name.clone().or(current.last_name);
        let address = update.address.clone().unwrap_or(current.address);
        let email = update.email.clone().or(current.email);
        let card_number = number.or(current.number).unwrap_or_default();
        let expiration_date = update
            .expiration_wire()
            .or(current.expiration)
            .unwrap_or_default();

        debug!(
            "UpdateCustomerPaymentProfile {} on profile {}",
            payment_id, profile_id
        );
        self.call(SoapRequest::UpdateCustomerPaymentProfile(
            UpdateCustomerPaymentProfile {
                merchant_authentication: self.auth.clone(),
                customer_profile_id: profile_id.to_string(),
                payment_profile: PaymentProfile {
                    customer_type: None,
                    bill_to: Some(BillTo::new(
                        first_name.as_deref(),
                        last_name.as_deref(),
                        Some(&address),
                    )),
                    payment: Some(Payment {
                        credit_card: CardData {
                            card_number,
                            expiration_date,
                            card_code: None,
                        },
                    }),
                    customer_payment_profile_id: Some(payment_id.to_string()),
                },
                validation_mode: VALIDATION_MODE.to_string(),
            },
        ))
        .await?;

        if let Some(email) = email {
            debug!("UpdateCustomerProfile {}", profile_id);
            self.call(SoapRequest::UpdateCustomerProfile(UpdateCustomerProfile {
                merchant_authentication: self.auth.clone(),
                profile: CustomerProfile {
                    merchant_customer_id: profile.merchant_customer_id.clone(),
                    email: Some(email),
                    payment_profiles: None,
                    customer_profile_id: Some(profile_id.to_string()),
                },
            }))
            .await?;
        }
        Ok(())
    }

    /// Delete a customer profile with all of its payments
    pub async fn delete_saved_profile(&self, profile_id: &str) -> GatewayResult<()> {
        debug!("DeleteCustomerProfile {}", profile_id);
        self.call(SoapRequest::DeleteCustomerProfile(DeleteCustomerProfile {
            merchant_authentication: self.auth.clone(),
            customer_profile_id: profile_id.to_string(),
        }))
        .await
        .map(|_| ())
    }

    /// Delete one payment from a profile
    pub async fn delete_saved_payment(&self, profile_id: &str, payment_id: &str) -> GatewayResult<()> {
        debug!(
            "DeleteCustomerPaymentProfile {} on profile {}",
            payment_id, profile_id
        );
        self.call(SoapRequest::DeleteCustomerPaymentProfile(
            DeleteCustomerPaymentProfile {
                merchant_authentication: self.auth.clone(),
                customer_profile_id: profile_id.to_string(),
                customer_payment_profile_id: payment_id.to_string(),
            },
        ))
        .await
        .map(|_| ())
    }

    /// Reserve `amount` on a saved payment
    pub async fn auth(
        &self,
        profile_id: &str,
        payment_id: &str,
        amount: Amount,
        cvv: Option<&str>,
    ) -> GatewayResult<TransactionResponse> {
        let detail = Self::detail(profile_id, payment_id, amount, cvv, None);
        self.transact(ProfileTransKind::AuthOnly, detail).await
    }

    /// Charge `amount` to a saved payment
    pub async fn capture(
        &self,
        profile_id: &str,
        payment_id: &str,
        amount: Amount,
        cvv: Option<&str>,
    ) -> GatewayResult<TransactionResponse> {
        let detail = Self::detail(profile_id, payment_id, amount, cvv, None);
        self.transact(ProfileTransKind::AuthCapture, detail).await
    }

    /// Refund `amount` to a saved payment, optionally against a prior
    /// transaction
    pub async fn credit(
        &self,
        profile_id: &str,
        payment_id: &str,
        amount: Amount,
        transaction_id: Option<&str>,
    ) -> GatewayResult<TransactionResponse> {
        let detail = Self::detail(profile_id, payment_id, amount, None, transaction_id);
        self.transact(ProfileTransKind::Refund, detail).await
    }

    fn detail(
        profile_id: &str,
        payment_id: &str,
        amount: Amount,
        cvv: Option<&str>,
        transaction_id: Option<&str>,
    ) -> ProfileTransDetail {
        ProfileTransDetail {
            amount: amount.to_wire(),
            customer_profile_id: profile_id.to_string(),
            customer_payment_profile_id: payment_id.to_string(),
            card_code: cvv.map(str::to_string),
            trans_id: transaction_id.map(str::to_string),
        }
    }

    async fn transact(
        &self,
        kind: ProfileTransKind,
        detail: ProfileTransDetail,
    ) -> GatewayResult<TransactionResponse> {
        debug!(
            "CreateCustomerProfileTransaction {:?} {} on {}|{}",
            kind, detail.amount, detail.customer_profile_id, detail.customer_payment_profile_id
        );

        let mut transaction = ProfileTransaction::default();
        match kind {
            ProfileTransKind::AuthOnly => transaction.profile_trans_auth_only = Some(detail),
            ProfileTransKind::AuthCapture => transaction.profile_trans_auth_capture = Some(detail),
            ProfileTransKind::Refund => transaction.profile_trans_refund = Some(detail),
        }

        let response = self
            .call(SoapRequest::CreateCustomerProfileTransaction(
                CreateCustomerProfileTransaction {
                    merchant_authentication: self.auth.clone(),
                    transaction,
                    extra_options: DIRECT_RESPONSE_OPTIONS.to_string(),
                },
            ))
            .await?;

        let direct = required(response.direct_response, "directResponse")?;
        TransactionResponse::parse(&direct)?
            .approved()
            .inspect_err(|e| warn!("profile transaction {:?} not approved: {}", kind, e))
    }
}

fn required(value: Option<String>, member: &str) -> GatewayResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GatewayError::connection(format!("reply is missing {}", member)))
}

fn validate_replacement_number(number: &str) -> GatewayResult<String> {
    let cleaned = CardValidator::clean(number);
    let valid = !cleaned.is_empty()
        && cleaned.chars().all(|c| c.is_ascii_digit())
        && CardValidator::luhn_valid(&cleaned)
        && CardType::detect(&cleaned).is_some();
    if valid {
        Ok(cleaned)
    } else {
        Err(GatewayError::validation("Credit card number is not valid."))
    }
}
