//! Authorize.net gateway for Rust
//!
//! One API over the three Authorize.net services: card transactions over the
//! delimited protocol (AIM), saved customer payments (CIM) and recurring
//! billing (ARB).
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Gateway                                │
//! │                                                                 │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │   Card | Transaction | SavedCard | Recurring handles      │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                            │                                    │
//! │         ┌──────────────────┼──────────────────┐                 │
//! │         ▼                  ▼                  ▼                 │
//! │  ┌────────────┐    ┌──────────────┐   ┌──────────────┐          │
//! │  │   Legacy   │    │   Profiles   │   │ Subscriptions│          │
//! │  │ (AIM form) │    │  (CIM SOAP)  │   │  (ARB SOAP)  │          │
//! │  └────────────┘    └──────────────┘   └──────────────┘          │
//! │                            │                  │                 │
//! │                    ┌───────┴──────────────────┘                 │
//! │                    ▼                                            │
//! │             ┌──────────────┐                                    │
//! │             │ SoapTransport│                                    │
//! │             └──────────────┘                                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use authorize_gateway::{Amount, CreditCard, Gateway, GatewayConfig};
//!
//! let gateway = Gateway::new(&GatewayConfig::new("login", "key").debug(true))?;
//!
//! let card = CreditCard::new("4111111111111111", 1, 2030, "911")?
//!     .with_holder("Jeff", "Schenck");
//!
//! // Authorize now, settle later
//! let transaction = gateway.card(card.clone()).auth(Amount::from_cents(2000)).await?;
//! transaction.settle(None).await?;
//!
//! // Keep the card on file
//! let saved = gateway.card(card).save().await?;
//! let uid = saved.uid();
//! gateway.saved_card(&uid)?.capture(15i64, None).await?;
//! ```

pub mod card;
pub mod config;
pub mod error;
pub mod gateway;
pub mod legacy;
pub mod money;
pub mod profile;
pub mod soap;
pub mod subscription;
pub mod testing;
pub mod types;

pub use card::{CardType, CardValidator, CreditCard};
pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult, ProcessorResponse};
pub use gateway::{Card, Gateway, Recurring, SavedCard, SavedCardId, Transaction};
pub use legacy::{CardReference, LegacyTransactionAdapter, ResponseCode, TransactionResponse};
pub use money::Amount;
pub use profile::{ProfileAdapter, SavedPayment};
pub use soap::{HttpSoapTransport, SoapRequest, SoapResponse, SoapStatus, SoapTransport};
pub use subscription::SubscriptionAdapter;
pub use types::*;

/// Prelude for common imports
pub mod prelude {
    pub use crate::card::{CardType, CreditCard};
    pub use crate::config::GatewayConfig;
    pub use crate::error::{GatewayError, GatewayResult};
    pub use crate::gateway::{Card, Gateway, Recurring, SavedCard, Transaction};
    pub use crate::money::Amount;
    pub use crate::types::{Address, SavedPaymentUpdate, SubscriptionRequest, SubscriptionUpdate};
}
