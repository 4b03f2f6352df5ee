//! Relay wire protocol. Inbound frames carry a `{type, payload}` envelope;
//! outbound chat fan-out is the raw message text, so only the `join`
//! acknowledgment is structured.

use serde::{Deserialize, Serialize};

/// Envelope a client sends, tagged by `type` with a `payload` object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientEnvelope {
    #[serde(rename = "join")]
    Join {
        #[serde(rename = "roomId")]
        room_id: String,
    },

    #[serde(rename = "chat")]
    Chat { message: String },
}

/// Structured frames the relay sends back. Chat payloads are not wrapped in
/// these; they go out verbatim.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "joined")]
    Joined {
        #[serde(rename = "roomId")]
        room_id: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parse one inbound text frame. Anything that is not a well-formed
/// `join`/`chat` envelope is a [`ProtocolError`].
pub fn parse_envelope(text: &str) -> Result<ClientEnvelope, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}
