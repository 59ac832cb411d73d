// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface for the Tidings pipeline: webhook handshake and receipt,
//! the direct send API, and the health endpoint.

pub mod handlers;
pub mod server;

pub use server::{build_router, start_server, GatewayState, ServerConfig};

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use tempfile::tempdir;
    use tidings_core::{run_with_tenant, WorkspaceId, INCOMING_QUEUE, OUTGOING_QUEUE};
    use tidings_pipeline::WebhookIngress;
    use tidings_resilience::RetryPolicy;
    use tidings_storage::models::Workspace;
    use tidings_storage::queries::{conversations, queue, workspaces};
    use tidings_storage::Database;
    use tower::ServiceExt;

    use super::*;

    const APP_SECRET: &str = "test_secret";
    const VERIFY_TOKEN: &str = "test_verify_token";

    fn sign(body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(APP_SECRET.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    async fn setup() -> (axum::Router, Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("gateway.db").to_str().unwrap())
            .await
            .unwrap();
        workspaces::insert_workspace(
            &db,
            &Workspace {
                id: "W1".to_string(),
                name: "Acme".to_string(),
                phone_number_id: "111222333".to_string(),
                owner_id: "owner-1".to_string(),
                created_at: String::new(),
            },
        )
        .await
        .unwrap();

        let ingress = WebhookIngress::new(
            db.clone(),
            Duration::from_secs(5),
            RetryPolicy::linear(3, Duration::from_millis(1)),
            3,
        );
        let router = build_router(GatewayState {
            db: db.clone(),
            ingress,
            app_secret: APP_SECRET.to_string(),
            verify_token: VERIFY_TOKEN.to_string(),
            max_delivery_attempts: 3,
        });
        (router, db, dir)
    }

    fn message_body() -> Vec<u8> {
        serde_json::json!({
            "entry": [{"changes": [{"value": {
                "metadata": {"phone_number_id": "111222333"},
                "messages": [{
                    "from": "1555",
                    "id": "wamid.1",
                    "timestamp": "1709123456",
                    "type": "text",
                    "text": {"body": "hi"}
                }]
            }}]}]
        })
        .to_string()
        .into_bytes()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn handshake_echoes_challenge_for_valid_token() {
        let (router, db, _dir) = setup().await;
        let response = router
            .oneshot(
                Request::get(format!(
                    "/webhook?hub.mode=subscribe&hub.verify_token={VERIFY_TOKEN}&hub.challenge=c123"
                ))
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"c123");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn handshake_rejects_wrong_token() {
        let (router, db, _dir) = setup().await;
        let response = router
            .oneshot(
                Request::get("/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=c")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn signed_webhook_is_accepted_and_queued() {
        let (router, db, _dir) = setup().await;
        let body = message_body();
        let response = router
            .oneshot(
                Request::post("/webhook")
                    .header("x-hub-signature-256", sign(&body))
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["success"], true);

        let entry = queue::dequeue(&db, INCOMING_QUEUE).await.unwrap().unwrap();
        assert!(entry.payload.contains("wamid.1"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn tampered_body_is_rejected() {
        let (router, db, _dir) = setup().await;
        let mut body = message_body();
        let header = sign(&body);
        body[0] ^= 1;
        let response = router
            .oneshot(
                Request::post("/webhook")
                    .header("x-hub-signature-256", header)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(queue::dequeue(&db, INCOMING_QUEUE).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn missing_signature_is_rejected() {
        let (router, db, _dir) = setup().await;
        let response = router
            .oneshot(
                Request::post("/webhook")
                    .body(Body::from(message_body()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_phone_number_is_forbidden() {
        let (router, db, _dir) = setup().await;
        let body = serde_json::json!({
            "entry": [{"changes": [{"value": {
                "metadata": {"phone_number_id": "999"},
                "messages": [{"from": "1555", "id": "wamid.x", "type": "text", "text": {"body": "hi"}}]
            }}]}]
        })
        .to_string()
        .into_bytes();
        let response = router
            .oneshot(
                Request::post("/webhook")
                    .header("x-hub-signature-256", sign(&body))
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn status_callback_is_reconciled_inline() {
        let (router, db, _dir) = setup().await;
        let body = serde_json::json!({
            "entry": [{"changes": [{"value": {
                "metadata": {"phone_number_id": "111222333"},
                "statuses": [{
                    "id": "wamid.ext",
                    "status": "delivered",
                    "timestamp": "1709123500",
                    "recipient_id": "1555"
                }]
            }}]}]
        })
        .to_string()
        .into_bytes();
        let response = router
            .oneshot(
                Request::post("/webhook")
                    .header("x-hub-signature-256", sign(&body))
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        // Reconciled synchronously, nothing queued.
        assert!(queue::dequeue(&db, INCOMING_QUEUE).await.unwrap().is_none());
        let synthetic = tidings_storage::queries::outbound::get_by_provider_id(&db, "wamid.ext")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(synthetic.workspace_id, "W1");
        assert_eq!(synthetic.status, "delivered");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn send_request_is_enqueued() {
        let (router, db, _dir) = setup().await;
        let response = router
            .oneshot(
                Request::post("/messaging/send")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "workspace_id": "W1",
                            "to": "1555",
                            "type": "text",
                            "text": {"body": "hello"}
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["success"], true);

        let entry = queue::dequeue(&db, OUTGOING_QUEUE).await.unwrap().unwrap();
        let request: tidings_core::SendRequest = serde_json::from_str(&entry.payload).unwrap();
        assert_eq!(request.to, "1555");
        assert_eq!(request.workspace_id, Some(WorkspaceId::from("W1")));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn health_endpoint_is_public() {
        let (router, db, _dir) = setup().await;
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn ignored_envelope_still_acknowledges() {
        let (router, db, _dir) = setup().await;
        let body = br#"{"entry":[]}"#.to_vec();
        let response = router
            .oneshot(
                Request::post("/webhook")
                    .header("x-hub-signature-256", sign(&body))
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn replayed_webhook_keeps_counters_stable() {
        let (router, db, _dir) = setup().await;
        let body = message_body();
        for _ in 0..2 {
            let response = router
                .clone()
                .oneshot(
                    Request::post("/webhook")
                        .header("x-hub-signature-256", sign(&body))
                        .body(Body::from(body.clone()))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        // Drain and process both deliveries through the inbound consumer.
        while let Some(entry) = queue::dequeue(&db, INCOMING_QUEUE).await.unwrap() {
            let event: tidings_core::QueueEnvelope =
                serde_json::from_str(&entry.payload).unwrap();
            tidings_pipeline::inbound::process_incoming(&db, event).await.unwrap();
            queue::ack(&db, entry.id).await.unwrap();
        }

        let conv = run_with_tenant(
            WorkspaceId::from("W1"),
            conversations::get(&db, "111222333", "1555"),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(conv.unread_count, 1);
        db.close().await.unwrap();
    }
}
