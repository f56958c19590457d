use crate::errors::ServiceError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the base64 HMAC-SHA256 of an inbound webhook body
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Body of an outbound push
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushRequest {
    pub to: String,
    pub messages: Vec<PushMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: String,
}

impl PushMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            message_type: "text".to_string(),
            text: text.into(),
        }
    }
}

/// Inbound webhook envelope
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct InboundPayload {
    #[serde(default)]
    pub events: Vec<InboundEvent>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InboundEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub message: Option<InboundMessage>,
    #[serde(default)]
    pub source: Option<InboundSource>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InboundSource {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

impl InboundEvent {
    /// Text of a `message` event carrying a text message.
    pub fn text(&self) -> Option<&str> {
        if self.event_type != "message" {
            return None;
        }
        self.message
            .as_ref()
            .filter(|m| m.message_type == "text")
            .and_then(|m| m.text.as_deref())
    }

    pub fn sender(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.user_id.as_deref())
    }
}

/// HMAC signer/verifier keyed by the channel secret
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, body: &[u8]) -> Result<HmacSha256, ServiceError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| ServiceError::InternalError(format!("invalid HMAC key: {}", e)))?;
        mac.update(body);
        Ok(mac)
    }

    /// Base64 signature for `body`
    pub fn sign(&self, body: &[u8]) -> Result<String, ServiceError> {
        let mac = self.mac(body)?;
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Constant-time check of a base64 signature against `body`.
    pub fn verify(&self, body: &[u8], signature: &str) -> Result<(), ServiceError> {
        let expected = STANDARD
            .decode(signature.trim())
            .map_err(|_| ServiceError::Unauthorized("malformed signature".to_string()))?;
        self.mac(body)?
            .verify_slice(&expected)
            .map_err(|_| ServiceError::Unauthorized("signature mismatch".to_string()))
    }
}

/// Push client for the messaging channel
#[derive(Clone)]
pub struct MessagingClient {
    client: reqwest::Client,
    push_url: String,
    access_token: String,
    recipient: String,
    max_retries: u32,
    base_backoff: Duration,
}

impl MessagingClient {
    pub fn new(
        push_url: impl Into<String>,
        access_token: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            push_url: push_url.into(),
            access_token: access_token.into(),
            recipient: recipient.into(),
            max_retries: 3,
            base_backoff: Duration::from_secs(1),
        })
    }

    /// Build a client from configuration; `None` when push is not configured.
    pub fn from_config(cfg: &crate::config::AppConfig) -> Result<Option<Self>, ServiceError> {
        if !cfg.messaging_push_enabled() {
            return Ok(None);
        }
        match (
            &cfg.messaging_push_url,
            &cfg.messaging_access_token,
            &cfg.messaging_recipient,
        ) {
            (Some(url), Some(token), Some(to)) => Self::new(url, token, to).map(Some),
            _ => Ok(None),
        }
    }

    pub fn with_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Push a text message, retrying with exponential backoff.
    #[instrument(skip(self, text))]
    pub async fn push_text(&self, text: &str) -> Result<(), ServiceError> {
        let body = PushRequest {
            to: self.recipient.clone(),
            messages: vec![PushMessage::text(text)],
        };

        for attempt in 1..=self.max_retries {
            let request = self
                .client
                .post(&self.push_url)
                .bearer_auth(&self.access_token)
                .json(&body);

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    info!("Message pushed to {}", self.push_url);
                    crate::metrics::record_notification_push("delivered");
                    return Ok(());
                }
                Ok(response) => {
                    warn!(
                        "Message push failed with status: {} (attempt {}/{})",
                        response.status(),
                        attempt,
                        self.max_retries
                    );
                }
                Err(e) => {
                    warn!(
                        "Message push error: {} (attempt {}/{})",
                        e, attempt, self.max_retries
                    );
                }
            }

            if attempt < self.max_retries {
                let backoff = self.base_backoff * 2_u32.pow(attempt - 1);
                tokio::time::sleep(backoff).await;
            }
        }

        error!("Message push failed after {} attempts", self.max_retries);
        crate::metrics::record_notification_push("failed");
        Err(ServiceError::ExternalServiceError(format!(
            "Failed to push message after {} attempts",
            self.max_retries
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_request_serializes_to_channel_format() {
        let body = PushRequest {
            to: "U123".into(),
            messages: vec![PushMessage::text("Stock low")],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"to": "U123", "messages": [{"type": "text", "text": "Stock low"}]})
        );
    }

    #[test]
    fn signature_round_trip_and_tamper_detection() {
        let verifier = SignatureVerifier::new("channel-secret");
        let body = br#"{"events":[]}"#;
        let sig = verifier.sign(body).unwrap();

        assert!(verifier.verify(body, &sig).is_ok());
        assert!(verifier.verify(br#"{"events":[1]}"#, &sig).is_err());
        assert!(verifier.verify(body, "not base64!").is_err());
        assert!(SignatureVerifier::new("other").verify(body, &sig).is_err());
    }

    #[test]
    fn inbound_text_only_for_text_messages() {
        let payload: InboundPayload = serde_json::from_str(
            r#"{"events":[
                {"type":"message","message":{"type":"text","text":"hello"},"source":{"userId":"U1"}},
                {"type":"message","message":{"type":"sticker"}},
                {"type":"follow"}
            ]}"#,
        )
        .unwrap();

        let texts: Vec<_> = payload.events.iter().filter_map(|e| e.text()).collect();
        assert_eq!(texts, vec!["hello"]);
        assert_eq!(payload.events[0].sender(), Some("U1"));
    }
}
