//! Webhook normalization for JSCP.
//!
//! Turns a raw provider webhook (body bytes, signature header, shared
//! secret) into a [`jscp_core::NormalizedEvent`]:
//! authenticate, decode, classify, extract.

pub mod classify;
pub mod error;
pub mod normalize;
pub mod signature;

pub use classify::{ACTOR_CHAIN, classify, extract, resolve_actor};
pub use error::{WebhookError, WebhookResult};
pub use normalize::{from_payload, normalize};
pub use signature::{SIGNATURE_HEADER, SIGNATURE_PREFIX, sign, verify_signature};
