/// Webhook delivery and verification for the messaging channel
pub mod messaging;

pub use messaging::{
    InboundEvent, InboundPayload, MessagingClient, PushMessage, PushRequest, SignatureVerifier,
    SIGNATURE_HEADER,
};
