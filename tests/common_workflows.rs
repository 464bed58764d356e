//! Integration tests for common gateway workflows.
//!
//! These run against the in-memory SOAP transport, so no processor
//! credentials or network are needed.

use authorize::prelude::*;
use authorize::testing::RecordingTransport;
use authorize::{CardValidator, SavedCardId, SoapResponse};
use chrono::{Datelike, Duration, Local};
use std::sync::Arc;

fn gateway() -> (Arc<RecordingTransport>, Gateway<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::new());
    let config = GatewayConfig::new("loginid", "txnkey");
    let gateway = Gateway::with_transport(&config, Arc::clone(&transport)).unwrap();
    (transport, gateway)
}

fn card() -> CreditCard {
    CreditCard::new("4111 1111 1111 1111", 12, Local::now().year() + 5, "123")
        .unwrap()
        .with_holder("Jeff", "Schenck")
}

// =============================================================================
// Card Validation
// =============================================================================

#[test]
fn test_card_validation_rules() {
    let year = Local::now().year() + 5;

    assert_eq!(
        CardValidator::validate("4111111111111111", 1, year, "123").unwrap(),
        CardType::Visa
    );
    assert_eq!(
        CardValidator::validate("378282246310005", 1, year, "1234").unwrap(),
        CardType::Amex
    );
    assert_eq!(card().card_type().code(), "visa");

    // Luhn failure
    assert!(CreditCard::new("4111111111111112", 1, year, "123").is_err());
    // Expired last month
    let last_month = Local::now().date_naive() - Duration::days(40);
    assert!(CreditCard::new("4111111111111111", last_month.month(), last_month.year(), "123").is_err());
    // CVV format
    assert!(CreditCard::new("4111111111111111", 1, year, "12").is_err());
}

#[test]
fn test_card_never_prints_number() {
    let card = card();
    assert!(!format!("{:?}", card).contains("4111111111111111"));
    assert!(!card.to_string().contains("4111111111111111"));
    assert_eq!(card.last_four(), "1111");
}

// =============================================================================
// Saved Cards
// =============================================================================

#[test]
fn test_saved_card_uid_survives_sessions() {
    let (_, gateway) = gateway();
    let uid = SavedCardId::new("1234", "5678").unwrap().to_string();
    let saved = gateway.saved_card(&uid).unwrap();
    assert_eq!(saved.id().profile_id, "1234");
    assert_eq!(saved.id().payment_id, "5678");
    assert!(gateway.saved_card("1234").is_err());
}

#[tokio::test]
async fn test_save_then_charge_saved_card() {
    let (transport, gateway) = gateway();
    let mut direct = vec![String::new(); 40];
    direct[0] = "1".to_string();
    direct[6] = "2171062816".to_string();
    transport
        .respond(
            SoapResponse::ok()
                .with_customer_profile_id("1234")
                .with_payment_profile_ids(["5678"]),
        )
        .respond(SoapResponse::ok().with_direct_response(direct.join(";")));

    let saved = gateway
        .card(card())
        .with_address(Address::new("45 Rose Ave", "Venice", "CA", "90291"))
        .save()
        .await
        .unwrap();
    let uid = saved.uid();

    let transaction = gateway
        .saved_card(&uid)
        .unwrap()
        .capture(Amount::from_cents(1999), Some("123"))
        .await
        .unwrap();
    assert_eq!(transaction.id(), "2171062816");

    let charge = &transport.calls()[1].body["transaction"]["profileTransAuthCapture"];
    assert_eq!(charge["amount"], "19.99");
    assert_eq!(charge["cardCode"], "123");
}

#[tokio::test]
async fn test_rejected_profile_call_reports_code_and_text() {
    let (transport, gateway) = gateway();
    transport.respond(SoapResponse::error("E00039", "A duplicate record already exists."));

    let err = gateway.card(card()).save().await.unwrap_err();
    assert!(err.is_response());
    assert_eq!(err.to_string(), "E00039: A duplicate record already exists.");
}

// =============================================================================
// Recurring Billing
// =============================================================================

#[tokio::test]
async fn test_recurring_rejects_bad_schedule_locally() {
    let (transport, gateway) = gateway();
    let tomorrow = Local::now().date_naive() + Duration::days(1);
    let yesterday = Local::now().date_naive() - Duration::days(1);

    let cases = [
        SubscriptionRequest::new(10i64, tomorrow),
        SubscriptionRequest::new(10i64, tomorrow).days(7).months(1),
        SubscriptionRequest::new(10i64, tomorrow).months(13),
        SubscriptionRequest::new(10i64, yesterday).months(1),
        SubscriptionRequest::new(10i64, tomorrow).months(1).trial_amount(1i64),
    ];
    for request in &cases {
        let err = gateway.card(card()).recurring(request).await.unwrap_err();
        assert!(err.is_validation(), "{:?} should be rejected", request);
    }
    assert_eq!(transport.call_count(), 0);
}
