//! HTTP gateway abstraction.
//!
//! Defines the transport interface the SDK depends on. Every request
//! carries an explicit timeout from the caller's configuration; there is no
//! infinite wait anywhere in the stack.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Transport-layer failures.
///
/// These cover only the cases where no HTTP response was obtained; a
/// response with a non-2xx status is returned to the caller as data, since
/// status-code interpretation is the caller's business.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request exceeded its configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The URL could not be parsed or used to build a request.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Connection, TLS, or other transport failure.
    #[error("network error: {0}")]
    Network(String),
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns true for 2xx status codes.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as JSON, or `None` if it does not parse as `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// A response whose body is consumed in bounded chunks.
pub struct StreamedResponse {
    /// HTTP status code.
    pub status: u16,
    /// Content length from the response headers, if the server sent one.
    pub content_length: Option<u64>,
    /// The body stream. Only meaningful for success statuses.
    pub stream: Box<dyn ByteStream>,
}

/// Chunked access to a response body.
#[async_trait]
pub trait ByteStream: Send {
    /// Returns the next chunk of the body, or `None` once exhausted.
    ///
    /// Each read is bounded by the request's configured timeout, so a
    /// stalled transfer surfaces as [`GatewayError::Timeout`] rather than
    /// hanging the download loop.
    async fn next_chunk(&mut self) -> GatewayResult<Option<Vec<u8>>>;
}

/// The HTTP capability injected into SDK components.
///
/// Implementations must be safe to share across threads; components hold
/// them behind `Arc` and issue requests from worker tasks.
#[async_trait]
pub trait HttpGateway: Send + Sync {
    /// POSTs a JSON body and buffers the response.
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> GatewayResult<HttpResponse>;

    /// GETs a URL and buffers the response.
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> GatewayResult<HttpResponse>;

    /// GETs a URL for chunked consumption of a potentially large body.
    ///
    /// The timeout bounds the wait for response headers and each
    /// subsequent chunk read, not the whole transfer; a multi-gigabyte
    /// sample pack must not be forced through a 30-second window.
    async fn get_stream(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> GatewayResult<StreamedResponse>;
}

/// Default gateway implementation over `reqwest` with rustls.
pub struct ReqwestGateway {
    client: reqwest::Client,
}

impl ReqwestGateway {
    /// Builds the gateway and its connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    fn apply_headers(
        mut request: reqwest::RequestBuilder,
        headers: &[(String, String)],
    ) -> reqwest::RequestBuilder {
        for (name, value) in headers {
            request = request.header(name, value);
        }
        request
    }
}

fn map_reqwest_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else if err.is_builder() {
        GatewayError::InvalidUrl(err.to_string())
    } else {
        GatewayError::Network(err.to_string())
    }
}

struct ReqwestByteStream {
    response: reqwest::Response,
    read_timeout: Duration,
}

#[async_trait]
impl ByteStream for ReqwestByteStream {
    async fn next_chunk(&mut self) -> GatewayResult<Option<Vec<u8>>> {
        match tokio::time::timeout(self.read_timeout, self.response.chunk()).await {
            Err(_) => Err(GatewayError::Timeout),
            Ok(Err(e)) => Err(map_reqwest_error(e)),
            Ok(Ok(chunk)) => Ok(chunk.map(|bytes| bytes.to_vec())),
        }
    }
}

#[async_trait]
impl HttpGateway for ReqwestGateway {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> GatewayResult<HttpResponse> {
        let request = Self::apply_headers(self.client.post(url), headers)
            .timeout(timeout)
            .json(body);

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }

    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> GatewayResult<HttpResponse> {
        let request = Self::apply_headers(self.client.get(url), headers).timeout(timeout);

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }

    async fn get_stream(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> GatewayResult<StreamedResponse> {
        let request = Self::apply_headers(self.client.get(url), headers);

        let response = match tokio::time::timeout(timeout, request.send()).await {
            Err(_) => return Err(GatewayError::Timeout),
            Ok(Err(e)) => return Err(map_reqwest_error(e)),
            Ok(Ok(response)) => response,
        };

        Ok(StreamedResponse {
            status: response.status().as_u16(),
            content_length: response.content_length(),
            stream: Box::new(ReqwestByteStream {
                response,
                read_timeout: timeout,
            }),
        })
    }
}
