use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use handoff_router::config::{
    ChannelConfig, ConversationConfig, LoggingConfig, PbxConfig, QueuesConfig, ServerConfig,
    Settings,
};
use handoff_router::services::ConversationState;
use handoff_router::{build_router, AppState};

const USER: &str = "595981111222";

fn settings(pbx: &MockServer, graph: &MockServer) -> Settings {
    Settings {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        channel: ChannelConfig {
            verify_token: "verify-me".into(),
            access_token: "wa-token".into(),
            phone_number_id: "1098".into(),
            graph_base_url: graph.uri(),
            app_secret: None,
            timeout_seconds: 2,
        },
        pbx: PbxConfig {
            base_url: pbx.uri(),
            username: "api".into(),
            password: "secret".into(),
            user_type: "visitor".into(),
            token_safety_margin_seconds: 60,
            timeout_seconds: 2,
        },
        queues: QueuesConfig {
            branch_a_default: 6300,
            branch_a_post_sale: 6301,
            branch_b_default: 6400,
            branch_b_post_sale: 6401,
        },
        conversation: ConversationConfig {
            idle_ttl_seconds: 3600,
            sweep_interval_seconds: 60,
            max_tracked_users: 100,
        },
        logging: LoggingConfig {
            level: "info".into(),
            json: false,
        },
    }
}

fn message_payload(text: &str) -> String {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "WABA",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {"phone_number_id": "1098"},
                    "contacts": [{"wa_id": USER, "profile": {"name": "Cliente"}}],
                    "messages": [{
                        "from": USER,
                        "id": "wamid.1",
                        "type": "text",
                        "text": {"body": text}
                    }]
                }
            }]
        }]
    })
    .to_string()
}

async fn post_message(app: &Router, text: &str) -> StatusCode {
    app.clone()
        .oneshot(
            Request::post("/webhook")
                .header("content-type", "application/json")
                .body(Body::from(message_payload(text)))
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

async fn mount_graph(graph: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/1098/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messages": [{"id": "wamid.out"}]})))
        .mount(graph)
        .await;
}

async fn mount_token(pbx: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/openapi/v1.0/get_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errcode": 0,
            "errmsg": "SUCCESS",
            "access_token": "tok-1",
            "access_token_expire_time": 1800
        })))
        .expect(expected_calls)
        .mount(pbx)
        .await;
}

/// Escalations run in the background; wait until `endpoint` has been hit
async fn wait_for_request(server: &MockServer, endpoint: &str) {
    for _ in 0..200 {
        let seen = server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .any(|req| req.url.path() == endpoint);
        if seen {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} was never called", endpoint);
}

async fn sent_bodies(graph: &MockServer) -> Vec<String> {
    graph
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|req| serde_json::from_slice::<Value>(&req.body).ok())
        .filter_map(|body| body["text"]["body"].as_str().map(String::from))
        .collect()
}

#[tokio::test]
async fn verification_handshake_status_codes() {
    let pbx = MockServer::start().await;
    let graph = MockServer::start().await;
    let app = build_router(AppState::from_settings(&settings(&pbx, &graph)));

    let ok = app
        .clone()
        .oneshot(
            Request::get("/webhook?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=4242")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body = to_bytes(ok.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"4242");

    let forbidden = app
        .clone()
        .oneshot(
            Request::get("/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=4242")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let missing = app
        .oneshot(Request::get("/webhook").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forwarded_request_is_transferred_to_branch_queue() {
    let pbx = MockServer::start().await;
    let graph = MockServer::start().await;
    mount_graph(&graph).await;
    mount_token(&pbx, 1).await;

    Mock::given(method("GET"))
        .and(path("/openapi/v1.0/message_session/list"))
        .and(query_param("user_id", USER))
        .and(query_param("access_token", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errcode": 0,
            "list": [{"id": 501, "user_id": USER}]
        })))
        .expect(1)
        .mount(&pbx)
        .await;

    Mock::given(method("POST"))
        .and(path("/openapi/v1.0/message_session/transfer"))
        .and(body_partial_json(json!({
            "session_id": 501,
            "destination_type": "queue",
            "destination_id": 6300
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
        .expect(1)
        .mount(&pbx)
        .await;

    let state = AppState::from_settings(&settings(&pbx, &graph));
    let store = state.store.clone();
    let app = build_router(state);

    for text in ["hola", "1", "9"] {
        assert_eq!(post_message(&app, text).await, StatusCode::OK);
    }

    assert_eq!(store.get(USER).await, ConversationState::Done);
    wait_for_request(&pbx, "/openapi/v1.0/message_session/transfer").await;

    let replies = sent_bodies(&graph).await;
    assert_eq!(replies.len(), 3);
    assert!(replies[0].contains("Bienvenido"));
    assert!(replies[1].starts_with("Sucursal Asunción"));
    assert!(replies[2].contains("Solicitud enviada"));
}

#[tokio::test]
async fn missing_pbx_session_still_delivers_reply() {
    let pbx = MockServer::start().await;
    let graph = MockServer::start().await;
    mount_graph(&graph).await;
    mount_token(&pbx, 1).await;

    Mock::given(method("GET"))
        .and(path("/openapi/v1.0/message_session/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0, "list": []})))
        .expect(1)
        .mount(&pbx)
        .await;

    Mock::given(method("POST"))
        .and(path("/openapi/v1.0/message_session/transfer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
        .expect(0)
        .mount(&pbx)
        .await;

    let state = AppState::from_settings(&settings(&pbx, &graph));
    let store = state.store.clone();
    let app = build_router(state);

    for text in ["hola", "2", "2", "1"] {
        assert_eq!(post_message(&app, text).await, StatusCode::OK);
    }
    wait_for_request(&pbx, "/openapi/v1.0/message_session/list").await;

    assert_eq!(store.get(USER).await, ConversationState::Done);
    let replies = sent_bodies(&graph).await;
    assert_eq!(
        replies.last().map(String::as_str),
        Some("✅ Solicitud enviada a Post Venta CDE.")
    );
}

#[tokio::test]
async fn pbx_outage_does_not_block_reply() {
    let pbx = MockServer::start().await;
    let graph = MockServer::start().await;
    mount_graph(&graph).await;

    Mock::given(method("POST"))
        .and(path("/openapi/v1.0/get_token"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&pbx)
        .await;

    let state = AppState::from_settings(&settings(&pbx, &graph));
    let app = build_router(state);

    for text in ["hola", "1", "3"] {
        assert_eq!(post_message(&app, text).await, StatusCode::OK);
    }
    assert_eq!(sent_bodies(&graph).await.len(), 3);
}

#[tokio::test]
async fn reply_goes_out_while_pbx_is_still_answering() {
    let pbx = MockServer::start().await;
    let graph = MockServer::start().await;
    mount_graph(&graph).await;

    Mock::given(method("POST"))
        .and(path("/openapi/v1.0/get_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "errcode": 0,
                    "access_token": "tok-1",
                    "access_token_expire_time": 1800
                }))
                .set_delay(Duration::from_millis(1900)),
        )
        .mount(&pbx)
        .await;

    let state = AppState::from_settings(&settings(&pbx, &graph));
    state.store.set(USER, ConversationState::MenuBranchA).await;
    let app = build_router(state);

    let status = tokio::time::timeout(Duration::from_secs(1), post_message(&app, "9"))
        .await
        .expect("reply held back by the PBX");
    assert_eq!(status, StatusCode::OK);

    let replies = sent_bodies(&graph).await;
    assert_eq!(
        replies,
        vec!["✅ Solicitud enviada. Te derivamos al sector correspondiente.".to_string()]
    );
    let session_lookups = pbx
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|req| req.url.path() == "/openapi/v1.0/message_session/list")
        .count();
    assert_eq!(session_lookups, 0);
}

#[tokio::test]
async fn status_callback_is_acknowledged_without_reply() {
    let pbx = MockServer::start().await;
    let graph = MockServer::start().await;
    let state = AppState::from_settings(&settings(&pbx, &graph));
    let store = state.store.clone();
    let app = build_router(state);

    let payload = json!({
        "object": "whatsapp_business_account",
        "entry": [{"changes": [{"value": {"statuses": [{"id": "wamid.1", "status": "delivered"}]}}]}]
    });
    let response = app
        .oneshot(
            Request::post("/webhook")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.is_empty());
    assert!(graph.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn health_reports_tracked_conversations() {
    let pbx = MockServer::start().await;
    let graph = MockServer::start().await;
    mount_graph(&graph).await;
    let app = build_router(AppState::from_settings(&settings(&pbx, &graph)));

    post_message(&app, "hola").await;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["tracked_conversations"], 1);
    assert_eq!(body["conversations_by_state"]["branch_selection"], 1);
}
