use crate::stream::{Media, Metadata, StreamConfig};

/// Wire discriminator carried in every frame's `event` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Start,
    Ack,
    MediaInput,
    MediaOutput,
    Dtmf,
    Custom,
    Clear,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Start => "start",
            MessageType::Ack => "ack",
            MessageType::MediaInput => "media_input",
            MessageType::MediaOutput => "media_output",
            MessageType::Dtmf => "dtmf",
            MessageType::Custom => "custom",
            MessageType::Clear => "clear",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "start" => MessageType::Start,
            "ack" => MessageType::Ack,
            "media_input" => MessageType::MediaInput,
            "media_output" => MessageType::MediaOutput,
            "dtmf" => MessageType::Dtmf,
            "custom" => MessageType::Custom,
            "clear" => MessageType::Clear,
            _ => return None,
        })
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opens a stream: carries the negotiated input format and caller metadata.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StartMessage {
    pub stream_id: String,
    pub config: StreamConfig,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Server confirmation of a start message, echoing the negotiated config.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AckMessage {
    pub stream_id: String,
    pub config: StreamConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaInputMessage {
    pub stream_id: String,
    pub media: Media,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaOutputMessage {
    pub stream_id: String,
    pub media: Media,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DtmfMessage {
    pub stream_id: String,
    pub dtmf: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CustomMessage {
    pub stream_id: String,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClearMessage {
    pub stream_id: String,
}

/// One frame of the agent stream protocol, tagged by its `event` field.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "event")]
pub enum Message {
    #[serde(rename = "start")]
    Start(StartMessage),
    #[serde(rename = "ack")]
    Ack(AckMessage),
    #[serde(rename = "media_input")]
    MediaInput(MediaInputMessage),
    #[serde(rename = "media_output")]
    MediaOutput(MediaOutputMessage),
    #[serde(rename = "dtmf")]
    Dtmf(DtmfMessage),
    #[serde(rename = "custom")]
    Custom(CustomMessage),
    #[serde(rename = "clear")]
    Clear(ClearMessage),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Start(_) => MessageType::Start,
            Message::Ack(_) => MessageType::Ack,
            Message::MediaInput(_) => MessageType::MediaInput,
            Message::MediaOutput(_) => MessageType::MediaOutput,
            Message::Dtmf(_) => MessageType::Dtmf,
            Message::Custom(_) => MessageType::Custom,
            Message::Clear(_) => MessageType::Clear,
        }
    }

    pub fn stream_id(&self) -> &str {
        match self {
            Message::Start(m) => &m.stream_id,
            Message::Ack(m) => &m.stream_id,
            Message::MediaInput(m) => &m.stream_id,
            Message::MediaOutput(m) => &m.stream_id,
            Message::Dtmf(m) => &m.stream_id,
            Message::Custom(m) => &m.stream_id,
            Message::Clear(m) => &m.stream_id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown message type: {0:?}")]
    UnknownMessageType(String),
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decodes one text frame into a [`Message`].
///
/// The envelope's `event` tag is examined first so an unrecognized tag is
/// reported as [`DecodeError::UnknownMessageType`] rather than a generic
/// parse failure; a recognized tag with a payload that does not match the
/// variant's shape fails with [`DecodeError::Malformed`].
pub fn decode(data: &str) -> Result<Message, DecodeError> {
    #[derive(serde::Deserialize)]
    struct Envelope {
        #[serde(default)]
        event: String,
    }

    let envelope: Envelope = serde_json::from_str(data)?;
    if MessageType::from_tag(&envelope.event).is_none() {
        return Err(DecodeError::UnknownMessageType(envelope.event));
    }

    Ok(serde_json::from_str(data)?)
}

/// Serializes a [`Message`] to its wire form, `event` tag included.
pub fn encode(message: &Message) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}
