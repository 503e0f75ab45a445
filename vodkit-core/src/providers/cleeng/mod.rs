//! Commerce-first provider backed by the Cleeng MediaStore REST API.
//!
//! The three services share one [`CleengClient`], which owns the
//! credentials and the transport.

mod account;
mod checkout;
mod client;
mod http;
mod subscription;
mod transport;

pub use account::CleengAccountService;
pub use checkout::CleengCheckoutService;
pub use client::{AUTH_PERSIST_KEY, CleengClient};
pub use http::HttpCleengTransport;
pub use subscription::CleengSubscriptionService;
pub use transport::{
    CleengRequest, CleengTransport, HttpMethod, PRODUCTION_BASE_URL,
    SANDBOX_BASE_URL,
};

#[cfg(test)]
pub(crate) use transport::MockCleengTransport;
