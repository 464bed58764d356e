//! HTTP tests for the delimited transaction protocol.
//!
//! | x_type | Test |
//! |--------|------|
//! | `AUTH_ONLY` | `auth_*` |
//! | `AUTH_CAPTURE` | `capture_*` |
//! | `PRIOR_AUTH_CAPTURE` | `settle_*` |
//! | `CREDIT` | `credit_*` |
//! | `VOID` | `void_*` |

use authorize_gateway::{
    Address, Amount, CardReference, CreditCard, GatewayConfig, LegacyTransactionAdapter,
    ProcessorResponse,
};
use chrono::{Datelike, Local};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn response_line(code: &str, reason: &str, transaction_id: &str, x_type: &str) -> String {
    let mut fields = vec![String::new(); 40];
    fields[0] = code.to_string();
    fields[1] = "1".to_string();
    fields[2] = if code == "1" { "1" } else { "2" }.to_string();
    fields[3] = reason.to_string();
    fields[4] = "IKRAGJ".to_string();
    fields[5] = "Y".to_string();
    fields[6] = transaction_id.to_string();
    fields[9] = "20.00".to_string();
    fields[11] = x_type.to_string();
    fields[38] = "P".to_string();
    fields.join(";")
}

fn approved(transaction_id: &str, x_type: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(response_line(
        "1",
        "This transaction has been approved.",
        transaction_id,
        x_type,
    ))
}

async fn adapter(mock_server: &MockServer) -> LegacyTransactionAdapter {
    let config = GatewayConfig::new("loginid", "txnkey")
        .test_mode(true)
        .legacy_endpoint(format!("{}/gateway/transact.dll", mock_server.uri()));
    LegacyTransactionAdapter::from_config(reqwest::Client::new(), &config)
}

fn card() -> CreditCard {
    CreditCard::new("4111-1111-1111-1111", 1, Local::now().year() + 10, "911")
        .unwrap()
        .with_holder("Jeffrey", "Schenck")
}

// ── AUTH_ONLY ─────────────────────────────────────────────────────────

#[tokio::test]
async fn auth_posts_form_with_card_and_credentials() {
    let mock_server = MockServer::start().await;
    let expiry = format!("x_exp_date=01-{}", Local::now().year() + 10);

    Mock::given(method("POST"))
        .and(path("/gateway/transact.dll"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("x_type=AUTH_ONLY"))
        .and(body_string_contains("x_login=loginid"))
        .and(body_string_contains("x_tran_key=txnkey"))
        .and(body_string_contains("x_version=3.1"))
        .and(body_string_contains("x_test_request=TRUE"))
        .and(body_string_contains("x_delim_data=TRUE"))
        .and(body_string_contains("x_delim_char=%3B"))
        .and(body_string_contains("x_card_num=4111111111111111"))
        .and(body_string_contains(expiry.as_str()))
        .and(body_string_contains("x_card_code=911"))
        .and(body_string_contains("x_first_name=Jeffrey"))
        .and(body_string_contains("x_amount=20.00"))
        .and(body_string_contains("x_email=jeff%40example.com"))
        .and(body_string_contains("x_zip=90291"))
        .respond_with(approved("2171062816", "auth_only"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let address = Address::new("45 Rose Ave", "Venice", "CA", "90291");
    let response = adapter(&mock_server)
        .await
        .auth(Amount::from(20i64), &card(), Some(&address), Some("jeff@example.com"))
        .await
        .unwrap();

    assert_eq!(response.transaction_id, "2171062816");
    assert_eq!(response.authorization_code, "IKRAGJ");
    assert_eq!(response.cvv_response, "P");
}

#[tokio::test]
async fn auth_decline_carries_field_map() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response_line(
            "2",
            "This transaction has been declined.",
            "0",
            "auth_only",
        )))
        .mount(&mock_server)
        .await;

    let err = adapter(&mock_server)
        .await
        .auth(Amount::from(20i64), &card(), None, None)
        .await
        .unwrap_err();

    assert!(err.is_response());
    assert_eq!(err.to_string(), "This transaction has been declined.");
    let response = err.transaction_response().unwrap();
    assert_eq!(response.response_code, "2");
    assert_eq!(response.fields()["avs_response"], "Y");
    assert!(matches!(
        err.response(),
        Some(ProcessorResponse::Transaction(_))
    ));
}

#[tokio::test]
async fn auth_http_error_is_connection_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let err = adapter(&mock_server)
        .await
        .auth(Amount::from(20i64), &card(), None, None)
        .await
        .unwrap_err();
    assert!(err.is_connection());
}

#[tokio::test]
async fn auth_short_response_is_connection_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1;1;1;Approved"))
        .mount(&mock_server)
        .await;

    let err = adapter(&mock_server)
        .await
        .auth(Amount::from(20i64), &card(), None, None)
        .await
        .unwrap_err();
    assert!(err.is_connection());
}

// ── AUTH_CAPTURE ──────────────────────────────────────────────────────

#[tokio::test]
async fn capture_rounds_amount_half_up() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("x_type=AUTH_CAPTURE"))
        .and(body_string_contains("x_amount=20.00"))
        .respond_with(approved("2171062817", "auth_capture"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let amount: Amount = "19.995".parse().unwrap();
    adapter(&mock_server)
        .await
        .capture(amount, &card(), None, None)
        .await
        .unwrap();
}

// ── PRIOR_AUTH_CAPTURE ────────────────────────────────────────────────

#[tokio::test]
async fn settle_with_amount() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("x_type=PRIOR_AUTH_CAPTURE"))
        .and(body_string_contains("x_trans_id=2171062816"))
        .and(body_string_contains("x_amount=15.50"))
        .respond_with(approved("2171062816", "prior_auth_capture"))
        .expect(1)
        .mount(&mock_server)
        .await;

    adapter(&mock_server)
        .await
        .settle("2171062816", Some(Amount::from_cents(1550)))
        .await
        .unwrap();
}

#[tokio::test]
async fn settle_without_amount_omits_it() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("x_type=PRIOR_AUTH_CAPTURE"))
        .respond_with(approved("2171062816", "prior_auth_capture"))
        .expect(1)
        .mount(&mock_server)
        .await;

    adapter(&mock_server)
        .await
        .settle("2171062816", None)
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(!body.contains("x_amount"));
    assert!(!body.contains("x_card_num"));
}

// ── CREDIT ────────────────────────────────────────────────────────────

#[tokio::test]
async fn credit_linked_to_transaction() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("x_type=CREDIT"))
        .and(body_string_contains("x_card_num=1111"))
        .and(body_string_contains("x_trans_id=2171062816"))
        .and(body_string_contains("x_amount=5.00"))
        .respond_with(approved("2171062900", "credit"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = adapter(&mock_server)
        .await
        .credit(
            CardReference::LastFour("1111"),
            Some("2171062816"),
            Some(Amount::from(5i64)),
        )
        .await
        .unwrap();
    assert_eq!(response.transaction_id, "2171062900");
}

#[tokio::test]
async fn credit_unlinked_without_amount_makes_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(approved("1", "credit"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let card = card();
    let err = adapter(&mock_server)
        .await
        .credit(CardReference::Card(&card), None, None)
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

// ── VOID ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn void_sends_transaction_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("x_type=VOID"))
        .and(body_string_contains("x_trans_id=2171062816"))
        .respond_with(approved("2171062816", "void"))
        .expect(1)
        .mount(&mock_server)
        .await;

    adapter(&mock_server).await.void("2171062816").await.unwrap();
}
