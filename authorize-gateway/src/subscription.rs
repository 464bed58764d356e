//! Recurring billing (ARB)

use crate::card::CreditCard;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::soap::{
    ArbCancelSubscription, ArbCreateSubscription, ArbSubscription, ArbUpdateSubscription, BillTo,
    CardData, HttpSoapTransport, Interval, MerchantAuthentication, Payment, PaymentSchedule,
    SoapRequest, SoapResponse, SoapTransport,
};
use crate::types::{IntervalUnit, SubscriptionRequest, SubscriptionUpdate};
use authorize_log::{debug, warn};
use chrono::{Local, NaiveDate};
use secrecy::{ExposeSecret, SecretString};
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Occurrence count the processor reads as "until canceled"
pub const UNTIL_CANCELED_OCCURRENCES: u32 = 9999;

/// Allowed interval length in days
pub const INTERVAL_DAYS: RangeInclusive<u32> = 7..=365;

/// Allowed interval length in months
pub const INTERVAL_MONTHS: RangeInclusive<u32> = 1..=12;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Client for the recurring billing service
pub struct SubscriptionAdapter<T: SoapTransport = HttpSoapTransport> {
    transport: Arc<T>,
    auth: MerchantAuthentication,
}

impl<T: SoapTransport> SubscriptionAdapter<T> {
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

    async fn call(&self, request: SoapRequest) -> GatewayResult<SoapResponse> {
        let action = request.action();
        self.transport
            .call(&request)
            .await?
            .into_result()
            .inspect_err(|e| warn!("{} rejected: {}", action, e))
    }

    /// Start billing `card` on a schedule, returning the subscription id.
    ///
    /// Every rule below is checked before anything is sent:
    /// the card carries a first and last name, exactly one of days or months
    /// is set and within range, the start is not in the past, and trial
    /// amount and trial occurrences are given together.
    pub async fn create_subscription(
        &self,
        card: &CreditCard,
        request: &SubscriptionRequest,
    ) -> GatewayResult<String> {
        let subscription = build_subscription(card, request, today())?;
        debug!(
            "ARBCreateSubscription {} on {} from {}",
            request.amount,
            card.masked_number(),
            request.start
        );

        let response = self
            .call(SoapRequest::ArbCreateSubscription(ArbCreateSubscription {
                merchant_authentication: self.auth.clone(),
                subscription,
            }))
            .await?;

        response
            .subscription_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GatewayError::connection("reply is missing subscriptionId"))
    }

    /// Change the set fields of a subscription
    pub async fn update_subscription(
        &self,
        subscription_id: &str,
        update: &SubscriptionUpdate,
    ) -> GatewayResult<()> {
        let subscription = build_update(update, today())?;
        debug!("ARBUpdateSubscription {}", subscription_id);

        self.call(SoapRequest::ArbUpdateSubscription(ArbUpdateSubscription {
            merchant_authentication: self.auth.clone(),
            subscription_id: subscription_id.to_string(),
            subscription,
        }))
        .await
        .map(|_| ())
    }

    /// Cancel all future billings
    pub async fn delete_subscription(&self, subscription_id: &str) -> GatewayResult<()> {
        debug!("ARBCancelSubscription {}", subscription_id);
        self.call(SoapRequest::ArbCancelSubscription(ArbCancelSubscription {
            merchant_authentication: self.auth.clone(),
            subscription_id: subscription_id.to_string(),
        }))
        .await
        .map(|_| ())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn interval(request: &SubscriptionRequest) -> GatewayResult<Interval> {
    let (length, unit) = match (request.days, request.months) {
        (Some(days), None) => {
            if !INTERVAL_DAYS.contains(&days) {
                return Err(GatewayError::validation(
                    "The interval days must be an integer value between 7 and 365.",
                ));
            }
            (days, IntervalUnit::Days)
        }
        (None, Some(months)) => {
            if !INTERVAL_MONTHS.contains(&months) {
                return Err(GatewayError::validation(
                    "The interval months must be an integer value between 1 and 12.",
                ));
            }
            (months, IntervalUnit::Months)
        }
        _ => {
            return Err(GatewayError::validation(
                "Please provide either the months or days argument to define the subscription interval.",
            ));
        }
    };
    Ok(Interval {
        length,
        unit: unit.as_str().to_string(),
    })
}

fn build_subscription(
    card: &CreditCard,
    request: &SubscriptionRequest,
    today: NaiveDate,
) -> GatewayResult<ArbSubscription> {
    if !card.has_holder_name() {
        return Err(GatewayError::validation(
            "Subscriptions require first name and last name to be provided with the credit card.",
        ));
    }
    let interval = interval(request)?;
    if request.start < today {
        return Err(GatewayError::validation(
            "The start date for the subscription may not be in the past.",
        ));
    }
    let (trial_amount, trial_occurrences) =
        match (request.trial_amount, request.trial_occurrences) {
            (Some(amount), Some(occurrences)) => (Some(amount.to_wire()), Some(occurrences)),
            (None, None) => (None, None),
            _ => {
                return Err(GatewayError::validation(
                    "To indicate a trial period, you must provide both a trial amount and occurrences.",
                ));
            }
        };

    Ok(ArbSubscription {
        name: None,
        payment_schedule: Some(PaymentSchedule {
            interval: Some(interval),
            start_date: Some(request.start.format(DATE_FORMAT).to_string()),
            total_occurrences: Some(request.occurrences.unwrap_or(UNTIL_CANCELED_OCCURRENCES)),
            trial_occurrences,
        }),
        amount: Some(request.amount.to_wire()),
        trial_amount,
        payment: Some(Payment {
            credit_card: CardData {
                card_number: card.number().to_string(),
                expiration_date: card.expiration_wire(),
                card_code: Some(card.cvv().to_string()),
            },
        }),
        bill_to: Some(BillTo::new(card.first_name(), card.last_name(), None)),
    })
}

fn build_update(update: &SubscriptionUpdate, today: NaiveDate) -> GatewayResult<ArbSubscription> {
    if let Some(start) = update.start {
        if start < today {
            return Err(GatewayError::validation(
                "The start date for the subscription may not be in the past.",
            ));
        }
    }

    let schedule = PaymentSchedule {
        interval: None,
        start_date: update.start.map(|d| d.format(DATE_FORMAT).to_string()),
        total_occurrences: update.occurrences,
        trial_occurrences: update.trial_occurrences,
    };

    Ok(ArbSubscription {
        payment_schedule: (!schedule.is_empty()).then_some(schedule),
        amount: update.amount.map(|a| a.to_wire()),
        trial_amount: update.trial_amount.map(|a| a.to_wire()),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Amount;
    use crate::testing::RecordingTransport;
    use chrono::{Datelike, Duration};

    fn adapter() -> (Arc<RecordingTransport>, SubscriptionAdapter<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        let adapter = SubscriptionAdapter::new(
            Arc::clone(&transport),
            "loginid",
            &SecretString::new("txnkey".into()),
        );
        (transport, adapter)
    }

    fn card() -> CreditCard {
        CreditCard::new("4111111111111111", 1, Local::now().year() + 10, "911")
            .unwrap()
            .with_holder("Jeff", "Schenck")
    }

    fn tomorrow() -> NaiveDate {
        today() + Duration::days(1)
    }

    async fn assert_rejected(card: &CreditCard, request: SubscriptionRequest) {
        let (transport, adapter) = adapter();
        let err = adapter
            .create_subscription(card, &request)
            .await
            .unwrap_err();
        assert!(err.is_validation(), "{:?} gave {}", request, err);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_sends_schedule() {
        let (transport, adapter) = adapter();
        transport.respond(SoapResponse::ok().with_subscription_id("1234"));

        let start = tomorrow();
        let request = SubscriptionRequest::new("19.995".parse::<Amount>().unwrap(), start)
            .months(1)
            .occurrences(12)
            .trial_amount(5i64)
            .trial_occurrences(2);
        let id = adapter.create_subscription(&card(), &request).await.unwrap();
        assert_eq!(id, "1234");

        let body = &transport.last_call().unwrap().body["subscription"];
        assert_eq!(body["amount"], "20.00");
        assert_eq!(body["trialAmount"], "5.00");
        assert_eq!(body["paymentSchedule"]["interval"]["length"], 1);
        assert_eq!(body["paymentSchedule"]["interval"]["unit"], "months");
        assert_eq!(
            body["paymentSchedule"]["startDate"],
            start.format("%Y-%m-%d").to_string()
        );
        assert_eq!(body["paymentSchedule"]["totalOccurrences"], 12);
        assert_eq!(body["paymentSchedule"]["trialOccurrences"], 2);
        assert_eq!(body["billTo"]["firstName"], "Jeff");
        assert_eq!(body["billTo"]["lastName"], "Schenck");
        assert_eq!(
            body["payment"]["creditCard"]["expirationDate"],
            format!("{}-01", Local::now().year() + 10)
        );
    }

    #[tokio::test]
    async fn test_no_occurrences_sends_sentinel() {
        let (transport, adapter) = adapter();
        transport.respond(SoapResponse::ok().with_subscription_id("1"));
        let request = SubscriptionRequest::new(10i64, today()).days(30);
        adapter.create_subscription(&card(), &request).await.unwrap();

        let body = &transport.last_call().unwrap().body["subscription"];
        assert_eq!(body["paymentSchedule"]["totalOccurrences"], 9999);
        assert_eq!(body["paymentSchedule"]["interval"]["unit"], "days");
        assert!(body.get("trialAmount").is_none());
        assert!(body["paymentSchedule"].get("trialOccurrences").is_none());
    }

    #[tokio::test]
    async fn test_requires_holder_name() {
        let card = CreditCard::new("4111111111111111", 1, Local::now().year() + 10, "911").unwrap();
        assert_rejected(&card, SubscriptionRequest::new(10i64, tomorrow()).months(1)).await;
    }

    #[tokio::test]
    async fn test_interval_rules() {
        let card = card();
        let start = tomorrow();
        assert_rejected(&card, SubscriptionRequest::new(10i64, start)).await;
        assert_rejected(&card, SubscriptionRequest::new(10i64, start).days(30).months(1)).await;
        assert_rejected(&card, SubscriptionRequest::new(10i64, start).days(6)).await;
        assert_rejected(&card, SubscriptionRequest::new(10i64, start).days(366)).await;
        assert_rejected(&card, SubscriptionRequest::new(10i64, start).months(0)).await;
        assert_rejected(&card, SubscriptionRequest::new(10i64, start).months(13)).await;
    }

    #[tokio::test]
    async fn test_past_start_rejected() {
        let yesterday = today() - Duration::days(1);
        assert_rejected(&card(), SubscriptionRequest::new(10i64, yesterday).months(1)).await;
    }

    #[tokio::test]
    async fn test_trial_fields_go_together() {
        let start = tomorrow();
        assert_rejected(
            &card(),
            SubscriptionRequest::new(10i64, start).months(1).trial_amount(5i64),
        )
        .await;
        assert_rejected(
            &card(),
            SubscriptionRequest::new(10i64, start).months(1).trial_occurrences(2),
        )
        .await;
    }

    #[test]
    fn test_interval_bounds_inclusive() {
        let start = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        for request in [
            SubscriptionRequest::new(1i64, start).days(7),
            SubscriptionRequest::new(1i64, start).days(365),
            SubscriptionRequest::new(1i64, start).months(1),
            SubscriptionRequest::new(1i64, start).months(12),
        ] {
            assert!(interval(&request).is_ok(), "{:?}", request);
        }
    }

    #[tokio::test]
    async fn test_update_sends_only_given_fields() {
        let (transport, adapter) = adapter();
        transport.respond(SoapResponse::ok());
        let update = SubscriptionUpdate::new().amount(25i64);
        adapter.update_subscription("1234", &update).await.unwrap();

        let call = transport.last_call().unwrap();
        assert_eq!(call.action, "ARBUpdateSubscription");
        assert_eq!(call.body["subscriptionId"], "1234");
        assert_eq!(
            call.body["subscription"],
            serde_json::json!({"amount": "25.00"})
        );
    }

    #[tokio::test]
    async fn test_update_schedule_fields() {
        let (transport, adapter) = adapter();
        transport.respond(SoapResponse::ok());
        let start = tomorrow();
        let update = SubscriptionUpdate::new().start(start).occurrences(6);
        adapter.update_subscription("1234", &update).await.unwrap();

        let schedule = &transport.last_call().unwrap().body["subscription"]["paymentSchedule"];
        assert_eq!(schedule["startDate"], start.format("%Y-%m-%d").to_string());
        assert_eq!(schedule["totalOccurrences"], 6);
        assert!(schedule.get("interval").is_none());
    }

    #[tokio::test]
    async fn test_update_past_start_rejected() {
        let (transport, adapter) = adapter();
        let update = SubscriptionUpdate::new().start(today() - Duration::days(1));
        let err = adapter.update_subscription("1234", &update).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_subscription() {
        let (transport, adapter) = adapter();
        transport.respond(SoapResponse::error("E00035", "The subscription cannot be found."));
        let err = adapter.delete_subscription("1234").await.unwrap_err();
        assert_eq!(err.to_string(), "E00035: The subscription cannot be found.");
        assert_eq!(transport.actions(), vec!["ARBCancelSubscription"]);
    }
}
