use crate::provider::gemini::*;
use crate::provider::{ContentPart, InlineImage, ModelProvider, ProviderFactory};
use crate::Error;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// What the stub saw: path, API key header, JSON body
type Seen = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

/// Minimal generateContent stand-in answering every request with `reply`
async fn start_stub(status: StatusCode, reply: Value) -> (SocketAddr, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind stub");
    let addr = listener.local_addr().expect("No local address");
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));

    let log = seen.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let log = log.clone();
            let reply = reply.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let log = log.clone();
                    let reply = reply.clone();
                    async move {
                        let path = req.uri().path().to_string();
                        let key = req
                            .headers()
                            .get("x-goog-api-key")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        let bytes = req
                            .into_body()
                            .collect()
                            .await
                            .map(|b| b.to_bytes())
                            .unwrap_or_default();
                        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
                        log.lock().expect("Failed to lock").push((path, key, body));

                        let mut response = Response::new(Full::new(Bytes::from(reply.to_string())));
                        *response.status_mut() = status;
                        Ok::<_, Infallible>(response)
                    }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    (addr, seen)
}

fn stub_provider(addr: SocketAddr) -> GeminiProvider {
    GeminiProvider::with_client(reqwest::Client::new(), format!("http://{}/v1beta/", addr), "AIzaTEST1234567890")
}

#[test]
fn test_converse_request_shape() {
    let request = converse_request("persona", "Привет");
    assert_eq!(
        serde_json::to_value(&request).expect("Failed to serialize"),
        json!({
            "systemInstruction": {"parts": [{"text": "persona"}]},
            "contents": [{"role": "user", "parts": [{"text": "Привет"}]}]
        })
    );
}

#[test]
fn test_describe_image_request_puts_image_first() {
    let request = describe_image_request("persona", &InlineImage::jpeg("QUJD"), "оцени");
    let value = serde_json::to_value(&request).expect("Failed to serialize");
    assert_eq!(
        value["contents"][0]["parts"],
        json!([
            {"inlineData": {"mimeType": "image/jpeg", "data": "QUJD"}},
            {"text": "оцени"}
        ])
    );
}

#[test]
fn test_generate_image_request_shape() {
    let request = generate_image_request("Лёха на льду", "1:1");
    assert_eq!(
        serde_json::to_value(&request).expect("Failed to serialize"),
        json!({
            "contents": [{"role": "user", "parts": [{"text": "Лёха на льду"}]}],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"],
                "imageConfig": {"aspectRatio": "1:1"}
            }
        })
    );
}

#[test]
fn test_response_helpers() {
    let response: GenerateContentResponse = serde_json::from_value(json!({
        "candidates": [
            {"content": {"parts": [
                {"text": "Слышь, "},
                {"inlineData": {"mimeType": "image/png", "data": "iVBOR"}},
                {"text": "Лёх"}
            ]}},
            {"content": {"parts": [{"text": "второй кандидат"}]}}
        ]
    }))
    .expect("Failed to decode");

    assert_eq!(response.text(), "Слышь, Лёх");
    assert_eq!(
        response.parts(),
        vec![
            ContentPart::Text("Слышь, ".to_string()),
            ContentPart::InlineData(InlineImage {
                mime_type: "image/png".to_string(),
                data: "iVBOR".to_string(),
            }),
            ContentPart::Text("Лёх".to_string()),
        ]
    );

    let empty: GenerateContentResponse = serde_json::from_value(json!({})).expect("Failed to decode");
    assert_eq!(empty.text(), "");
    assert!(empty.parts().is_empty());

    let blocked: GenerateContentResponse =
        serde_json::from_value(json!({"candidates": [{"finishReason": "SAFETY"}]})).expect("Failed to decode");
    assert!(blocked.parts().is_empty());
}

#[test]
fn test_mask_key() {
    assert_eq!(mask_key("AIzaSyExample1234"), "AIza***1234");
    assert_eq!(mask_key("short"), "***");
}

#[test]
fn test_endpoint() {
    let provider = GeminiProvider::new("key");
    assert_eq!(
        provider.endpoint(TEXT_MODEL),
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-lite:generateContent"
    );
    let custom = GeminiProvider::with_client(reqwest::Client::new(), "http://localhost:1/", "key")
        .with_image_model("custom-image");
    assert_eq!(
        custom.endpoint("custom-image"),
        "http://localhost:1/models/custom-image:generateContent"
    );
}

#[tokio::test]
async fn test_converse_against_stub() {
    let (addr, seen) = start_stub(
        StatusCode::OK,
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "Чё по деньгам?"}]}}]}),
    )
    .await;

    let text = stub_provider(addr)
        .converse("persona", "Привет")
        .await
        .expect("Converse should succeed");
    assert_eq!(text, "Чё по деньгам?");

    let seen = seen.lock().expect("Failed to lock");
    assert_eq!(seen.len(), 1);
    let (path, key, body) = &seen[0];
    assert_eq!(path, "/v1beta/models/gemini-2.5-flash-lite:generateContent");
    assert_eq!(key.as_deref(), Some("AIzaTEST1234567890"));
    assert_eq!(body["contents"][0]["parts"][0]["text"], json!("Привет"));
}

#[tokio::test]
async fn test_generate_image_against_stub() {
    let (addr, seen) = start_stub(
        StatusCode::OK,
        json!({"candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "iVBOR"}}]}}]}),
    )
    .await;

    let parts = stub_provider(addr)
        .generate_image("Лёха", "1:1")
        .await
        .expect("Generation should succeed");
    assert!(matches!(parts.as_slice(), [ContentPart::InlineData(img)] if img.data == "iVBOR"));

    let seen = seen.lock().expect("Failed to lock");
    assert_eq!(seen[0].0, "/v1beta/models/gemini-2.5-flash-image:generateContent");
}

#[tokio::test]
async fn test_error_status_is_provider_error() {
    let (addr, _) = start_stub(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"code": 429, "message": "quota"}}),
    )
    .await;

    let err = stub_provider(addr)
        .converse("persona", "Привет")
        .await
        .expect_err("Expected provider error");
    assert!(matches!(err, Error::Provider(_)));
}

#[tokio::test]
async fn test_factory_binds_key() {
    let (addr, seen) = start_stub(
        StatusCode::OK,
        json!({"candidates": [{"content": {"parts": [{"text": "ок"}]}}]}),
    )
    .await;

    let factory = GeminiFactory::new(format!("http://{}/v1beta", addr));
    let provider = factory.create("AIzaFACTORY-KEY-0001");
    provider.converse("persona", "тест").await.expect("Converse should succeed");

    let seen = seen.lock().expect("Failed to lock");
    assert_eq!(seen[0].1.as_deref(), Some("AIzaFACTORY-KEY-0001"));
}
