//! Mapping from a requested MIME type to an encoder implementation

use std::fmt;

use super::descriptor::MimeDescriptor;

/// Encoder implementations a session can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncoderKind {
    /// Signed 16-bit PCM in a RIFF/WAVE container
    Wave,
    /// Opus in a WebM container
    WebmOpus,
    /// Opus in an Ogg container
    #[default]
    OggOpus,
}

impl EncoderKind {
    /// Choose the encoder for a descriptor. Unknown and empty subtypes fall
    /// back to Ogg/Opus.
    pub fn select(descriptor: &MimeDescriptor) -> Self {
        match descriptor.subtype() {
            "wave" | "wav" => Self::Wave,
            "webm" => Self::WebmOpus,
            _ => Self::OggOpus,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wave => "wave",
            Self::WebmOpus => "webm-opus",
            Self::OggOpus => "ogg-opus",
        }
    }

    /// File extension for recordings produced by this encoder
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Wave => "wav",
            Self::WebmOpus => "webm",
            Self::OggOpus => "ogg",
        }
    }
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of negotiating a requested MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedMime {
    pub kind: EncoderKind,
    /// MIME type reported for the session and attached to every chunk
    pub mime_type: String,
}

/// Negotiate a requested MIME type.
///
/// Ogg and WebM requests report the bare `audio/ogg` / `audio/webm` type;
/// wave requests keep the exact string the caller asked for. Returns `None`
/// when the type is unsupported.
pub fn negotiate(requested: &str) -> Option<NegotiatedMime> {
    let descriptor = MimeDescriptor::parse(requested).ok()?;
    if !descriptor.is_supported() {
        return None;
    }

    let kind = EncoderKind::select(&descriptor);
    let mime_type = match kind {
        EncoderKind::Wave => requested.to_string(),
        EncoderKind::WebmOpus => "audio/webm".to_string(),
        EncoderKind::OggOpus => "audio/ogg".to_string(),
    };

    Some(NegotiatedMime { kind, mime_type })
}
