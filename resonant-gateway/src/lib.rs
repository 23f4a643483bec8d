//! Transport and execution substrate for the Resonant SDK.
//!
//! This crate holds the three capabilities the activation and asset crates
//! share:
//!
//! - [`HttpGateway`]: the injected HTTP capability. SDK components never own
//!   an HTTP stack; they hold an `Arc<dyn HttpGateway>` supplied at
//!   construction. [`ReqwestGateway`] is the default implementation.
//! - [`TaskRunner`]: background execution for the `*_async` operation
//!   variants, expressed as a scheduled unit of work plus a completion
//!   callback over a small dedicated runtime.
//! - [`DebugLog`]: a per-instance, opt-in append-only diagnostic file sink.

mod debug_log;
mod http;
mod runner;

pub use debug_log::DebugLog;
pub use http::{
    ByteStream, GatewayError, GatewayResult, HttpGateway, HttpResponse, ReqwestGateway,
    StreamedResponse,
};
pub use runner::TaskRunner;
