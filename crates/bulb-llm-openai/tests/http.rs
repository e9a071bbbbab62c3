use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::post;
use bulb_llm::{ChatRequest, Error, Message};
use bulb_llm_openai::{ChatConfig, client};

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}/chat")
}

fn config(endpoint: String) -> ChatConfig {
    ChatConfig {
        endpoint,
        auth_token: Some("test-token".into()),
    }
}

fn request() -> ChatRequest {
    ChatRequest::from_history(&[Message::user("make a button")])
}

async fn streaming_chat(headers: HeaderMap, Json(body): Json<serde_json::Value>) -> impl IntoResponse {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth != "Bearer test-token" {
        return (StatusCode::UNAUTHORIZED, r#"{"error":"bad token"}"#.to_string()).into_response();
    }
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "make a button");
    assert!(body["images"].is_null());

    let mut sse = String::new();
    for part in ["Sure! ", "```tsx\n", "<Button/>\n", "```"] {
        sse.push_str(&format!(
            "data: {}\n\n",
            serde_json::json!({ "choices": [{ "delta": { "content": part } }] })
        ));
    }
    sse.push_str("data: [DONE]\n\n");
    ([(header::CONTENT_TYPE, "text/event-stream")], sse).into_response()
}

#[tokio::test]
async fn streams_text_from_the_endpoint() {
    let endpoint = spawn_server(Router::new().route("/chat", post(streaming_chat))).await;
    let model = client(config(endpoint));

    let text = model.stream_chat(request()).into_text().await.expect("stream");
    assert_eq!(text, "Sure! ```tsx\n<Button/>\n```");
}

#[tokio::test]
async fn status_codes_become_distinct_errors() {
    let router = Router::new()
        .route(
            "/chat",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, r#"{"error":"Rate limits exceeded"}"#) }),
        )
        .route(
            "/quota",
            post(|| async { (StatusCode::PAYMENT_REQUIRED, r#"{"error":"Payment required"}"#) }),
        )
        .route(
            "/broken",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "plain failure") }),
        );
    let chat = spawn_server(router).await;
    let base = chat.trim_end_matches("/chat").to_string();

    let err = client(config(chat)).stream_chat(request()).into_text().await;
    assert!(matches!(err, Err(Error::RateLimited(ref m)) if m == "Rate limits exceeded"), "{err:?}");

    let err = client(config(format!("{base}/quota")))
        .stream_chat(request())
        .into_text()
        .await;
    assert!(matches!(err, Err(Error::QuotaExceeded(ref m)) if m == "Payment required"), "{err:?}");

    let err = client(config(format!("{base}/broken")))
        .stream_chat(request())
        .into_text()
        .await;
    assert!(
        matches!(err, Err(Error::Api { status: 500, ref message }) if message == "plain failure"),
        "{err:?}"
    );
}

#[tokio::test]
async fn bad_or_missing_token_is_an_auth_error() {
    let endpoint = spawn_server(Router::new().route("/chat", post(streaming_chat))).await;

    let mut cfg = config(endpoint.clone());
    cfg.auth_token = Some("stale".into());
    let err = client(cfg).stream_chat(request()).into_text().await;
    assert!(matches!(err, Err(Error::Unauthorized(ref m)) if m == "bad token"), "{err:?}");

    let mut cfg = config(endpoint);
    cfg.auth_token = None;
    let err = client(cfg).stream_chat(request()).into_text().await;
    assert!(matches!(err, Err(Error::Unauthorized(_))), "{err:?}");
}
