//! One entry point over the three services
//!
//! ```text
//!                      Gateway
//!     ┌───────────────┬──────┴────────┬───────────────┐
//!   card()      transaction()    saved_card()     recurring()
//!     │               │               │               │
//!   Card ───auth──▶ Transaction    SavedCard       Recurring
//!     │  ──save──▶ SavedCard ──auth──▶ Transaction
//!     └──recurring──▶ Recurring
//! ```
//!
//! Handles are keys, not snapshots: each operation is a fresh call to the
//! processor and returns the next handle.

use crate::card::CreditCard;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::legacy::{CardReference, LegacyTransactionAdapter, TransactionResponse};
use crate::money::Amount;
use crate::profile::{ProfileAdapter, SavedPayment};
use crate::soap::{HttpSoapTransport, SoapTransport};
use crate::subscription::SubscriptionAdapter;
use crate::types::{Address, SavedPaymentInfo, SavedPaymentUpdate, SubscriptionRequest, SubscriptionUpdate};
use authorize_log::{debug, info};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Length of the merchant reference given to profiles created by [`Card::save`]
pub const PROFILE_REFERENCE_LEN: usize = 20;

/// Card processing, saved payments and recurring billing behind one API.
///
/// Cheap to share: adapters are built once and every method takes `&self`.
pub struct Gateway<T: SoapTransport = HttpSoapTransport> {
    transactions: LegacyTransactionAdapter,
    profiles: ProfileAdapter<T>,
    subscriptions: SubscriptionAdapter<T>,
}

impl Gateway<HttpSoapTransport> {
    /// Build the HTTP client and all adapters from `config`
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let client = build_client()?;
        let transport = Arc::new(HttpSoapTransport::new(client.clone(), config.soap_url()));
        Self::build(config, client, transport)
    }
}

impl<T: SoapTransport> Gateway<T> {
    /// Build with a custom SOAP transport; the delimited protocol still
    /// goes over HTTP.
    pub fn with_transport(config: &GatewayConfig, transport: Arc<T>) -> GatewayResult<Self> {
        Self::build(config, build_client()?, transport)
    }

    fn build(config: &GatewayConfig, client: reqwest::Client, transport: Arc<T>) -> GatewayResult<Self> {
        config.validate()?;
        info!(
            "gateway for {} using {} and {}",
            config.login_id(),
            config.legacy_url(),
            config.soap_url()
        );
        Ok(Self {
            transactions: LegacyTransactionAdapter::from_config(client, config),
            profiles: ProfileAdapter::from_config(Arc::clone(&transport), config),
            subscriptions: SubscriptionAdapter::from_config(transport, config),
        })
    }

    /// Assemble from existing adapters
    pub fn from_adapters(
        transactions: LegacyTransactionAdapter,
        profiles: ProfileAdapter<T>,
        subscriptions: SubscriptionAdapter<T>,
    ) -> Self {
        Self {
            transactions,
            profiles,
            subscriptions,
        }
    }

    pub fn transactions(&self) -> &LegacyTransactionAdapter {
        &self.transactions
    }

    pub fn profiles(&self) -> &ProfileAdapter<T> {
        &self.profiles
    }

    pub fn subscriptions(&self) -> &SubscriptionAdapter<T> {
        &self.subscriptions
    }

    /// Work with a card
    pub fn card(&self, card: CreditCard) -> Card<'_, T> {
        Card {
            gateway: self,
            card,
            address: None,
            email: None,
        }
    }

    /// Work with an existing transaction
    pub fn transaction(&self, id: impl Into<String>) -> Transaction<'_, T> {
        Transaction {
            gateway: self,
            id: id.into(),
            response: None,
        }
    }

    /// Work with a saved card by its `profile|payment` uid
    pub fn saved_card(&self, uid: &str) -> GatewayResult<SavedCard<'_, T>> {
        Ok(SavedCard {
            gateway: self,
            id: uid.parse()?,
        })
    }

    /// Work with an existing subscription
    pub fn recurring(&self, id: impl Into<String>) -> Recurring<'_, T> {
        Recurring {
            gateway: self,
            id: id.into(),
        }
    }

    fn transaction_from(&self, response: TransactionResponse) -> Transaction<'_, T> {
        Transaction {
            gateway: self,
            id: response.transaction_id.clone(),
            response: Some(response),
        }
    }
}

impl<T: SoapTransport> fmt::Debug for Gateway<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("transactions", &self.transactions)
            .finish_non_exhaustive()
    }
}

fn build_client() -> GatewayResult<reqwest::Client> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| GatewayError::Config(format!("could not build HTTP client: {}", e)))
}

/// Identifier of a saved card: customer profile id and payment profile id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SavedCardId {
    pub profile_id: String,
    pub payment_id: String,
}

impl SavedCardId {
    /// Separator between the two ids in a uid
    pub const SEPARATOR: char = '|';

    pub fn new(profile_id: impl Into<String>, payment_id: impl Into<String>) -> GatewayResult<Self> {
        let id = Self {
            profile_id: profile_id.into(),
            payment_id: payment_id.into(),
        };
        if id.profile_id.contains(Self::SEPARATOR) || id.payment_id.contains(Self::SEPARATOR) {
            return Err(GatewayError::validation(format!(
                "saved card ids may not contain '{}'",
                Self::SEPARATOR
            )));
        }
        Ok(id)
    }
}

impl std::str::FromStr for SavedCardId {
    type Err = GatewayError;

    fn from_str(uid: &str) -> Result<Self, Self::Err> {
        let mut parts = uid.split(Self::SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(profile_id), Some(payment_id), None) => Ok(Self {
                profile_id: profile_id.to_string(),
                payment_id: payment_id.to_string(),
            }),
            _ => Err(GatewayError::validation(format!(
                "saved card uid '{}' must contain exactly one '{}'",
                uid,
                Self::SEPARATOR
            ))),
        }
    }
}

impl fmt::Display for SavedCardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.profile_id, Self::SEPARATOR, self.payment_id)
    }
}

/// A card about to be charged, saved or billed on a schedule
pub struct Card<'g, T: SoapTransport = HttpSoapTransport> {
    gateway: &'g Gateway<T>,
    card: CreditCard,
    address: Option<Address>,
    email: Option<String>,
}

impl<'g, T: SoapTransport> Card<'g, T> {
    /// With billing address
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// With customer email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn credit_card(&self) -> &CreditCard {
        &self.card
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Reserve `amount` on the card
    pub async fn auth(&self, amount: impl Into<Amount>) -> GatewayResult<Transaction<'g, T>> {
        let response = self
            .gateway
            .transactions
            .auth(amount.into(), &self.card, self.address.as_ref(), self.email())
            .await?;
        Ok(self.gateway.transaction_from(response))
    }

    /// Charge `amount` to the card
    pub async fn capture(&self, amount: impl Into<Amount>) -> GatewayResult<Transaction<'g, T>> {
        let response = self
            .gateway
            .transactions
            .capture(amount.into(), &self.card, self.address.as_ref(), self.email())
            .await?;
        Ok(self.gateway.transaction_from(response))
    }

    /// Refund `amount` to the card without a prior transaction.
    ///
    /// The merchant account must be enabled for unlinked credits; otherwise
    /// the processor rejects the request.
    pub async fn credit(&self, amount: impl Into<Amount>) -> GatewayResult<Transaction<'g, T>> {
        let response = self
            .gateway
            .transactions
            .credit(CardReference::Card(&self.card), None, Some(amount.into()))
            .await?;
        Ok(self.gateway.transaction_from(response))
    }

    /// Store the card in a new customer profile
    pub async fn save(&self) -> GatewayResult<SavedCard<'g, T>> {
        let profiles = &self.gateway.profiles;
        let payment = match profiles
            .create_saved_payment(&self.card, self.address.as_ref(), None)
            .await?
        {
            SavedPayment::Unsaved(payment) => payment,
            SavedPayment::Created(_) => {
                return Err(GatewayError::connection("payment was stored without a profile"));
            }
        };

        let reference = profile_reference();
        debug!("saving {} as {}", self.card, reference);
        let (profile_id, payment_ids) = profiles
            .create_saved_profile(&reference, vec![payment], self.email())
            .await?;
        let payment_id = payment_ids
            .and_then(|ids| ids.into_iter().next())
            .ok_or_else(|| GatewayError::connection("reply is missing the payment profile id"))?;

        Ok(SavedCard {
            gateway: self.gateway,
            id: SavedCardId::new(profile_id, payment_id)?,
        })
    }

    /// Bill the card on a schedule
    pub async fn recurring(&self, request: &SubscriptionRequest) -> GatewayResult<Recurring<'g, T>> {
        let id = self
            .gateway
            .subscriptions
            .create_subscription(&self.card, request)
            .await?;
        Ok(self.gateway.recurring(id))
    }
}

impl<T: SoapTransport> fmt::Debug for Card<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Card({})", self.card)
    }
}

/// A processed transaction
pub struct Transaction<'g, T: SoapTransport = HttpSoapTransport> {
    gateway: &'g Gateway<T>,
    id: String,
    response: Option<TransactionResponse>,
}

impl<'g, T: SoapTransport> Transaction<'g, T> {
    /// Processor transaction id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Response that produced this handle, when it came from a call
    pub fn response(&self) -> Option<&TransactionResponse> {
        self.response.as_ref()
    }

    /// Capture a prior authorization; `None` settles the full amount
    pub async fn settle(&self, amount: Option<Amount>) -> GatewayResult<Transaction<'g, T>> {
        let response = self.gateway.transactions.settle(&self.id, amount).await?;
        Ok(self.gateway.transaction_from(response))
    }

    /// Refund a settled charge to the card ending in `last_four`
    pub async fn credit(
        &self,
        last_four: &str,
        amount: Option<Amount>,
    ) -> GatewayResult<Transaction<'g, T>> {
        let response = self
            .gateway
            .transactions
            .credit(CardReference::LastFour(last_four), Some(&self.id), amount)
            .await?;
        Ok(self.gateway.transaction_from(response))
    }

    /// Cancel an unsettled transaction
    pub async fn void(&self) -> GatewayResult<Transaction<'g, T>> {
        let response = self.gateway.transactions.void(&self.id).await?;
        Ok(self.gateway.transaction_from(response))
    }
}

impl<T: SoapTransport> fmt::Debug for Transaction<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transaction({})", self.id)
    }
}

/// A card stored with the profile service
pub struct SavedCard<'g, T: SoapTransport = HttpSoapTransport> {
    gateway: &'g Gateway<T>,
    id: SavedCardId,
}

impl<'g, T: SoapTransport> SavedCard<'g, T> {
    /// `profile|payment` uid, stable across sessions
    pub fn uid(&self) -> String {
        self.id.to_string()
    }

    pub fn id(&self) -> &SavedCardId {
        &self.id
    }

    /// Reserve `amount` on the saved card
    pub async fn auth(
        &self,
        amount: impl Into<Amount>,
        cvv: Option<&str>,
    ) -> GatewayResult<Transaction<'g, T>> {
        let response = self
            .gateway
            .profiles
            .auth(&self.id.profile_id, &self.id.payment_id, amount.into(), cvv)
            .await?;
        Ok(self.gateway.transaction_from(response))
    }

    /// Charge `amount` to the saved card
    pub async fn capture(
        &self,
        amount: impl Into<Amount>,
        cvv: Option<&str>,
    ) -> GatewayResult<Transaction<'g, T>> {
        let response = self
            .gateway
            .profiles
            .capture(&self.id.profile_id, &self.id.payment_id, amount.into(), cvv)
            .await?;
        Ok(self.gateway.transaction_from(response))
    }

    /// Refund `amount` to the saved card
    pub async fn credit(&self, amount: impl Into<Amount>) -> GatewayResult<Transaction<'g, T>> {
        let response = self
            .gateway
            .profiles
            .credit(&self.id.profile_id, &self.id.payment_id, amount.into(), None)
            .await?;
        Ok(self.gateway.transaction_from(response))
    }

    /// Stored names, address and email; number and expiry are masked
    pub async fn payment_info(&self) -> GatewayResult<SavedPaymentInfo> {
        self.gateway
            .profiles
            .retrieve_saved_payment(&self.id.profile_id, &self.id.payment_id)
            .await
    }

    /// Change stored details; unset fields keep their current value
    pub async fn update(&self, update: &SavedPaymentUpdate) -> GatewayResult<()> {
        self.gateway
            .profiles
            .update_saved_payment(&self.id.profile_id, &self.id.payment_id, update)
            .await
    }

    /// Remove this card from its profile
    pub async fn delete(&self) -> GatewayResult<()> {
        self.gateway
            .profiles
            .delete_saved_payment(&self.id.profile_id, &self.id.payment_id)
            .await
    }

    /// Remove the whole customer profile, including any other cards on it
    pub async fn delete_profile(&self) -> GatewayResult<()> {
        self.gateway
            .profiles
            .delete_saved_profile(&self.id.profile_id)
            .await
    }
}

impl<T: SoapTransport> fmt::Debug for SavedCard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SavedCard({})", self.id)
    }
}

/// A recurring billing schedule
pub struct Recurring<'g, T: SoapTransport = HttpSoapTransport> {
    gateway: &'g Gateway<T>,
    id: String,
}

impl<T: SoapTransport> Recurring<'_, T> {
    /// Processor subscription id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Change amount, start, occurrences or trial
    pub async fn update(&self, update: &SubscriptionUpdate) -> GatewayResult<()> {
        self.gateway
            .subscriptions
            .update_subscription(&self.id, update)
            .await
    }

    /// Cancel future billings
    pub async fn delete(&self) -> GatewayResult<()> {
        self.gateway.subscriptions.delete_subscription(&self.id).await
    }
}

impl<T: SoapTransport> fmt::Debug for Recurring<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Recurring({})", self.id)
    }
}

fn profile_reference() -> String {
    let mut reference = Uuid::new_v4().simple().to_string();
    reference.truncate(PROFILE_REFERENCE_LEN);
    reference
}
