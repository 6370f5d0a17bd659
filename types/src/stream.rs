/// Audio encoding negotiated for the client-to-agent stream. Fixed at
/// handshake time and immutable for the lifetime of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InputFormat {
    #[serde(rename = "mulaw_8000")]
    Mulaw8000,
    #[serde(rename = "pcm_16000")]
    Pcm16000,
    #[serde(rename = "pcm_24000")]
    Pcm24000,
    #[serde(rename = "pcm_44100")]
    Pcm44100,
}

impl InputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::Mulaw8000 => "mulaw_8000",
            InputFormat::Pcm16000 => "pcm_16000",
            InputFormat::Pcm24000 => "pcm_24000",
            InputFormat::Pcm44100 => "pcm_44100",
        }
    }

    pub fn sample_rate(&self) -> u32 {
        match self {
            InputFormat::Mulaw8000 => 8_000,
            InputFormat::Pcm16000 => 16_000,
            InputFormat::Pcm24000 => 24_000,
            InputFormat::Pcm44100 => 44_100,
        }
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StreamConfig {
    pub input_format: InputFormat,
}

/// Base64-encoded audio carried by media messages.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Media {
    pub payload: String,
}

/// Free-form key/value metadata attached to start and custom messages.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_format_wire_names() {
        for (format, name) in [
            (InputFormat::Mulaw8000, "\"mulaw_8000\""),
            (InputFormat::Pcm16000, "\"pcm_16000\""),
            (InputFormat::Pcm24000, "\"pcm_24000\""),
            (InputFormat::Pcm44100, "\"pcm_44100\""),
        ] {
            assert_eq!(serde_json::to_string(&format).unwrap(), name);
            let parsed: InputFormat = serde_json::from_str(name).unwrap();
            assert_eq!(parsed, format);
        }
    }

    #[test]
    fn input_format_sample_rates() {
        assert_eq!(InputFormat::Mulaw8000.sample_rate(), 8_000);
        assert_eq!(InputFormat::Pcm16000.sample_rate(), 16_000);
        assert_eq!(InputFormat::Pcm24000.sample_rate(), 24_000);
        assert_eq!(InputFormat::Pcm44100.sample_rate(), 44_100);
    }
}
