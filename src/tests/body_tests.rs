use crate::body::*;
use crate::protocol::ErrorCode;
use bytes::Bytes;
use http_body_util::{Empty, Full};
use hyper::body::{Body, Frame};
use serde_json::json;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

/// Body that yields fixed chunks and counts how often it was polled
struct ChunkedBody {
    chunks: VecDeque<Bytes>,
    polled: Arc<AtomicUsize>,
    fail_at_end: bool,
}

impl ChunkedBody {
    fn new(chunks: &[&str]) -> (Self, Arc<AtomicUsize>) {
        let polled = Arc::new(AtomicUsize::new(0));
        let body = Self {
            chunks: chunks.iter().map(|c| Bytes::from(c.to_string())).collect(),
            polled: polled.clone(),
            fail_at_end: false,
        };
        (body, polled)
    }
}

impl Body for ChunkedBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
        self.polled.fetch_add(1, Ordering::SeqCst);
        match self.chunks.pop_front() {
            Some(chunk) => Poll::Ready(Some(Ok(Frame::data(chunk)))),
            None if self.fail_at_end => Poll::Ready(Some(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "peer went away",
            )))),
            None => Poll::Ready(None),
        }
    }
}

#[test]
fn test_parses_json_body() {
    let body = Full::new(Bytes::from(r#"{"action":"quote","payload":{}}"#));
    let value = tokio_test::block_on(read_json_body(body, MAX_BODY_BYTES)).expect("Failed to read body");
    assert_eq!(value, json!({"action": "quote", "payload": {}}));
}

#[test]
fn test_empty_body_is_empty_object() {
    let value = tokio_test::block_on(read_json_body(Empty::<Bytes>::new(), MAX_BODY_BYTES))
        .expect("Failed to read empty body");
    assert_eq!(value, json!({}));
}

#[test]
fn test_whitespace_body_is_bad_json() {
    let body = Full::new(Bytes::from("   "));
    let err = tokio_test::block_on(read_json_body(body, MAX_BODY_BYTES)).expect_err("Expected BAD_JSON");
    assert_eq!(err.code(), ErrorCode::BadJson);
}

#[test]
fn test_invalid_json_is_bad_json() {
    let body = Full::new(Bytes::from("{not json"));
    let err = tokio_test::block_on(read_json_body(body, MAX_BODY_BYTES)).expect_err("Expected BAD_JSON");
    assert!(matches!(err, BodyError::BadJson(_)));
    assert_eq!(err.code(), ErrorCode::BadJson);
}

#[test]
fn test_invalid_utf8_is_bad_json() {
    let body = Full::new(Bytes::from_static(&[0x7b, 0xff, 0xfe, 0x7d]));
    let err = tokio_test::block_on(read_json_body(body, MAX_BODY_BYTES)).expect_err("Expected BAD_JSON");
    assert_eq!(err.code(), ErrorCode::BadJson);
}

#[test]
fn test_chunks_are_joined_before_parsing() {
    let (body, _) = ChunkedBody::new(&[r#"{"act"#, r#"ion":"ch"#, r#"at"}"#]);
    let value = tokio_test::block_on(read_json_body(body, MAX_BODY_BYTES)).expect("Failed to read chunked body");
    assert_eq!(value, json!({"action": "chat"}));
}

#[test]
fn test_body_at_limit_is_accepted() {
    let (body, _) = ChunkedBody::new(&["[1,", "2]"]);
    let value = tokio_test::block_on(read_json_body(body, 5)).expect("Body at the limit should pass");
    assert_eq!(value, json!([1, 2]));
}

#[test]
fn test_oversize_body_stops_reading() {
    let (body, polled) = ChunkedBody::new(&["1234", "5678", "9012", "3456"]);
    let err = tokio_test::block_on(read_json_body(body, 6)).expect_err("Expected PAYLOAD_TOO_LARGE");

    assert!(matches!(err, BodyError::TooLarge { limit: 6 }));
    assert_eq!(err.code(), ErrorCode::PayloadTooLarge);
    // The second chunk crosses the limit; nothing after it is pulled
    assert_eq!(polled.load(Ordering::SeqCst), 2);
}

#[test]
fn test_oversize_check_precedes_json_validity() {
    let body = Full::new(Bytes::from("x".repeat(64)));
    let err = tokio_test::block_on(read_json_body(body, 16)).expect_err("Expected PAYLOAD_TOO_LARGE");
    assert_eq!(err.code(), ErrorCode::PayloadTooLarge);
}

#[test]
fn test_read_failure_maps_to_bad_json() {
    let (mut body, _) = ChunkedBody::new(&["{"]);
    body.fail_at_end = true;
    let err = tokio_test::block_on(read_json_body(body, MAX_BODY_BYTES)).expect_err("Expected read failure");
    assert!(matches!(err, BodyError::Read(_)));
    assert_eq!(err.code(), ErrorCode::BadJson);
}
