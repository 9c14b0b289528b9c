//! Webhook delivery glue.
//!
//! Payload types for the release event and verification of delivery
//! signatures. Routing and transport belong to whatever front door feeds
//! deliveries into the binary; this module only understands the bytes.

mod event;
mod signature;

pub use event::{EventRepository, Release, ReleaseEvent, RELEASE_EVENT};
pub use signature::{
    compute_signature, verify_signature, SignatureError, SignatureResult, SIGNATURE_HEADER,
};
