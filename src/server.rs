//! HTTP gateway module
//!
//! This module serves the JSON gateway the terminal client talks to:
//! - `POST /api/gemini` - action envelope in, response envelope out
//! - `GET /health` - liveness probe
//!
//! Request flow on the gateway path: method check, credential check, bounded
//! body read, action decode, dispatch. Every failure is terminal and maps to
//! one [`ErrorCode`] with its HTTP status.

use crate::body::read_json_body;
use crate::config::{CredentialSource, ServerConfig};
use crate::dispatcher::Dispatcher;
use crate::protocol::{Action, ApiResponse, ErrorCode};
use crate::provider::ProviderFactory;
use crate::resilience::RetryPolicy;
use crate::{Error, Result};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Path prefix of the gateway endpoint
pub const API_PATH: &str = "/api/gemini";

/// Request handler shared by every connection
pub struct Gateway {
    credentials: CredentialSource,
    factory: Arc<dyn ProviderFactory>,
    retry: RetryPolicy,
    max_body_bytes: usize,
}

impl Gateway {
    /// Gateway built from server configuration
    pub fn new(config: &ServerConfig, factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            credentials: config.credentials.clone(),
            factory,
            retry: config.retry,
            max_body_bytes: config.max_body_bytes,
        }
    }

    /// Route one request
    pub async fn handle<B>(&self, req: Request<B>) -> std::result::Result<Response<Full<Bytes>>, Infallible>
    where
        B: Body<Data = Bytes>,
        B::Error: Display,
    {
        let path = req.uri().path();
        if path.starts_with(API_PATH) {
            debug!("Received {} {}", req.method(), path);
            let envelope = self.handle_api(req).await;
            return Ok(envelope_response(&envelope));
        }

        match (req.method(), path) {
            (&Method::GET, "/health") => {
                debug!("Received GET /health request");
                Ok(text_response(StatusCode::OK, "ok"))
            }
            _ => {
                debug!("Received unsupported request: {} {}", req.method(), path);
                Ok(text_response(StatusCode::NOT_FOUND, "Not Found"))
            }
        }
    }

    async fn handle_api<B>(&self, req: Request<B>) -> ApiResponse
    where
        B: Body<Data = Bytes>,
        B::Error: Display,
    {
        if req.method() != Method::POST {
            return ApiResponse::failure(ErrorCode::MethodNotAllowed);
        }

        let Some(api_key) = self.credentials.resolve() else {
            warn!("Provider credential is not configured");
            return ApiResponse::failure(ErrorCode::ApiKeyMissing);
        };

        let body = match read_json_body(req.into_body(), self.max_body_bytes).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Rejected request body: {}", e);
                return ApiResponse::failure(e.code());
            }
        };

        let action = match Action::from_envelope(&body) {
            Ok(action) => action,
            Err(code) => {
                warn!("Rejected envelope: {}", code);
                return ApiResponse::failure(code);
            }
        };

        let dispatcher = Dispatcher::with_policy(self.factory.create(&api_key), self.retry);
        match dispatcher.dispatch(&action).await {
            Ok(data) => ApiResponse::success(data),
            Err(code) => ApiResponse::failure(code),
        }
    }
}

fn envelope_response(envelope: &ApiResponse) -> Response<Full<Bytes>> {
    let status = envelope.error.map(|code| code.status()).unwrap_or(StatusCode::OK);
    match serde_json::to_vec(envelope) {
        Ok(json) => {
            let mut response = Response::new(Full::new(Bytes::from(json)));
            *response.status_mut() = status;
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            );
            response
        }
        Err(e) => {
            error!("Failed to serialize response envelope: {}", e);
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR")
        }
    }
}

fn text_response(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(text.as_bytes())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

/// Listening gateway server
pub struct ApiServer {
    config: ServerConfig,
    gateway: Arc<Gateway>,
    local_addr: Option<SocketAddr>,
    accept_task: Option<JoinHandle<()>>,
}

impl ApiServer {
    /// Create a server; nothing is bound until [`ApiServer::start`]
    pub fn new(config: ServerConfig, factory: Arc<dyn ProviderFactory>) -> Self {
        let gateway = Arc::new(Gateway::new(&config, factory));
        Self {
            config,
            gateway,
            local_addr: None,
            accept_task: None,
        }
    }

    /// Bind the listener and start accepting connections in the background
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let addr = self.config.bind_addr;
        info!("Starting gateway on {}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Transport(format!("Failed to bind to {}: {}", addr, e)))?;

        // Port 0 binds resolve to a real port here
        let actual_addr = listener
            .local_addr()
            .map_err(|e| Error::Transport(format!("Failed to get local address: {}", e)))?;
        self.local_addr = Some(actual_addr);

        let gateway = self.gateway.clone();
        self.accept_task = Some(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, remote_addr)) => {
                        debug!("Accepted connection from {}", remote_addr);

                        let io = TokioIo::new(stream);
                        let gateway = gateway.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let gateway = gateway.clone();
                                async move { gateway.handle(req).await }
                            });

                            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                error!("Error serving connection: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            }
        }));

        info!("Gateway listening on http://{}{}", actual_addr, API_PATH);
        Ok(actual_addr)
    }

    /// Stop accepting new connections
    pub fn stop(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
            info!("Gateway stopped");
        }
    }

    /// The bound address, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// The shared request handler
    pub fn gateway(&self) -> Arc<Gateway> {
        self.gateway.clone()
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.stop();
    }
}
