//! Payment intent and webhook flows through the HTTP API.

mod common;

use axum::http::StatusCode;
use common::{fixtures, TestFixture};
use serde_json::{json, Value};
use valet_core::TicketStore;

fn guest_pays(base_rate: i64) -> Value {
    json!({
        "model": "GUEST_PAYS",
        "baseRate": base_rate,
        "allowTips": true,
        "timing": "AT_PICKUP"
    })
}

async fn deliver(fixture: &TestFixture, payload: Vec<u8>) -> common::TestResponse {
    let header = fixtures::sign_webhook(fixtures::WEBHOOK_SECRET, &payload);
    fixture
        .post_raw(
            "/api/v1/webhooks/stripe",
            payload,
            &[("Stripe-Signature", header.as_str())],
        )
        .await
}

#[tokio::test]
async fn test_intent_then_webhook_marks_paid() {
    let fixture = TestFixture::new();
    let ticket = fixture.open_ticket(Some(guest_pays(500))).await;
    let id = ticket["id"].as_str().unwrap();
    fixture.set_status(id, "READY").await;

    let code = ticket["code"].as_str().unwrap();
    let view = fixture.get(&format!("/api/v1/tickets/code/{}", code)).await;
    assert_eq!(view.body["view"]["payment"]["kind"], "full");
    assert_eq!(view.body["view"]["payment"]["base_rate"], 500);

    let intent = fixture
        .post(
            "/api/v1/payments/intent",
            json!({ "ticketId": id, "tipDollars": 5 }),
        )
        .await;
    assert_status!(intent, StatusCode::OK);
    assert!(intent.body["clientHandle"].is_string());

    let request = fixture.provider.requests().remove(0);
    assert_eq!(request.amount, 1000);

    let payload = fixtures::payment_succeeded_event(
        "pi_http_1",
        request.amount,
        id,
        &request.metadata["baseRate"],
        &request.metadata["tipAmount"],
    );
    let ack = deliver(&fixture, payload).await;
    assert_status!(ack, StatusCode::OK);
    assert_eq!(ack.body["received"], true);

    let view = fixture.get(&format!("/api/v1/tickets/code/{}", code)).await;
    assert_eq!(view.body["ticket"]["payment_status"], "paid");
    assert_eq!(view.body["view"]["paid"], true);
    assert!(view.body["view"]["payment"].is_null());

    let ledger = fixture
        .get(&format!("/api/v1/ops/tickets/{}/transactions", id))
        .await;
    assert_status!(ledger, StatusCode::OK);
    let transactions = ledger.body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["base_amount"], 500);
    assert_eq!(transactions[0]["tip_amount"], 500);
}

#[tokio::test]
async fn test_tip_amount_alias_accepted() {
    let fixture = TestFixture::new();
    let ticket = fixture.open_ticket(None).await;

    let intent = fixture
        .post(
            "/api/v1/payments/intent",
            json!({ "ticketId": ticket["id"], "tipAmount": 10.0 }),
        )
        .await;
    assert_status!(intent, StatusCode::OK);
    assert_eq!(fixture.provider.requests()[0].amount, 1000);
}

#[tokio::test]
async fn test_intent_validation_errors() {
    let fixture = TestFixture::new();
    let ticket = fixture.open_ticket(None).await;

    let missing = fixture
        .post("/api/v1/payments/intent", json!({ "tipDollars": 5 }))
        .await;
    assert_status!(missing, StatusCode::BAD_REQUEST);

    let unknown = fixture
        .post(
            "/api/v1/payments/intent",
            json!({ "ticketId": "no-such-ticket", "tipDollars": 5 }),
        )
        .await;
    assert_status!(unknown, StatusCode::NOT_FOUND);

    // Nothing owed and no tip
    let zero = fixture
        .post("/api/v1/payments/intent", json!({ "ticketId": ticket["id"] }))
        .await;
    assert_status!(zero, StatusCode::BAD_REQUEST);

    let malformed = fixture
        .post_raw("/api/v1/payments/intent", b"{not json".to_vec(), &[])
        .await;
    assert_status!(malformed, StatusCode::BAD_REQUEST);

    assert!(fixture.provider.requests().is_empty());
}

#[tokio::test]
async fn test_provider_failure_is_generic_500() {
    let fixture = TestFixture::new();
    let ticket = fixture.open_ticket(Some(guest_pays(500))).await;
    fixture.provider.fail_next("card network down");

    let response = fixture
        .post("/api/v1/payments/intent", json!({ "ticketId": ticket["id"] }))
        .await;
    assert_status!(response, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["error"], "Internal server error");
}

#[tokio::test]
async fn test_webhook_redelivery_is_idempotent() {
    let fixture = TestFixture::new();
    let ticket = fixture.open_ticket(None).await;
    let id = ticket["id"].as_str().unwrap();

    let payload = fixtures::payment_succeeded_event("pi_dup", 1500, id, "500", "1000");
    for _ in 0..2 {
        let ack = deliver(&fixture, payload.clone()).await;
        assert_status!(ack, StatusCode::OK);
    }

    let ledger = fixture
        .get(&format!("/api/v1/ops/tickets/{}/transactions", id))
        .await;
    assert_eq!(ledger.body["transactions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_webhook_bad_signature_rejected() {
    let fixture = TestFixture::new();
    let ticket = fixture.open_ticket(None).await;
    let id = ticket["id"].as_str().unwrap();

    let payload = fixtures::payment_succeeded_event("pi_forged", 1500, id, "500", "1000");
    let header = fixtures::sign_webhook("whsec_wrong", &payload);
    let response = fixture
        .post_raw(
            "/api/v1/webhooks/stripe",
            payload.clone(),
            &[("Stripe-Signature", header.as_str())],
        )
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);

    let unsigned = fixture
        .post_raw("/api/v1/webhooks/stripe", payload, &[])
        .await;
    assert_status!(unsigned, StatusCode::BAD_REQUEST);

    let ticket = fixture.store.get(id).unwrap().unwrap();
    assert!(!ticket.is_paid());
}

#[tokio::test]
async fn test_webhook_other_events_acknowledged() {
    let fixture = TestFixture::new();

    let payload = serde_json::to_vec(&json!({
        "id": "evt_refund",
        "type": "charge.refunded",
        "data": { "object": { "id": "ch_1" } }
    }))
    .unwrap();
    let ack = deliver(&fixture, payload).await;
    assert_status!(ack, StatusCode::OK);
    assert_eq!(ack.body["received"], true);

    // Unknown ticket: acknowledged so the provider stops retrying
    let orphan = fixtures::payment_succeeded_event("pi_orphan", 500, "gone", "500", "0");
    let ack = deliver(&fixture, orphan).await;
    assert_status!(ack, StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_malformed_body() {
    let fixture = TestFixture::new();

    let response = deliver(&fixture, b"not json at all".to_vec()).await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_loosely_typed_intent_acknowledged() {
    let fixture = TestFixture::new();
    let ticket = fixture.open_ticket(Some(guest_pays(500))).await;
    let id = ticket["id"].as_str().unwrap();

    let no_amount = serde_json::to_vec(&json!({
        "id": "evt_partial",
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": "pi_partial", "metadata": { "ticketId": id } } }
    }))
    .unwrap();
    let ack = deliver(&fixture, no_amount).await;
    assert_status!(ack, StatusCode::OK);
    assert!(fixture.store.list_transactions(id).unwrap().is_empty());

    let numeric = serde_json::to_vec(&json!({
        "id": "evt_numeric",
        "type": "payment_intent.succeeded",
        "data": { "object": {
            "id": "pi_numeric",
            "amount": 1500,
            "metadata": { "ticketId": id, "baseRate": 500, "tipAmount": 1000 }
        } }
    }))
    .unwrap();
    let ack = deliver(&fixture, numeric).await;
    assert_status!(ack, StatusCode::OK);

    let transactions = fixture.store.list_transactions(id).unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].tip_amount, 1000);
    assert!(fixture.store.get(id).unwrap().unwrap().is_paid());
}
