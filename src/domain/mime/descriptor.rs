//! MIME descriptor parsing and support checks

use std::fmt;
use std::str::FromStr;

use crate::domain::error::MimeParseError;

/// Subtypes an encoder exists for
pub const SUPPORTED_SUBTYPES: &[&str] = &["ogg", "webm", "wave", "wav"];

/// Parsed `type/subtype[;codecs=codec]` descriptor.
///
/// The empty descriptor has empty `type` and `subtype` and no codec; it stands
/// for "platform default".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MimeDescriptor {
    media_type: String,
    subtype: String,
    codec: Option<String>,
}

impl MimeDescriptor {
    /// Parse a descriptor string.
    ///
    /// Grammar: `word "/" word [";" whitespace* "codecs=" word]`, where a word
    /// is `[A-Za-z0-9_]+`.
    pub fn parse(input: &str) -> Result<Self, MimeParseError> {
        if input.is_empty() {
            return Ok(Self::default());
        }
        let err = || MimeParseError {
            input: input.to_string(),
        };

        let (essence, params) = match input.split_once(';') {
            Some((essence, params)) => (essence, Some(params)),
            None => (input, None),
        };
        let (media_type, subtype) = essence.split_once('/').ok_or_else(err)?;
        if !is_word(media_type) || !is_word(subtype) {
            return Err(err());
        }

        let codec = match params {
            None => None,
            Some(params) => {
                let codec = params
                    .trim_start()
                    .strip_prefix("codecs=")
                    .ok_or_else(err)?;
                if !is_word(codec) {
                    return Err(err());
                }
                Some(codec.to_string())
            }
        };

        Ok(Self {
            media_type: media_type.to_string(),
            subtype: subtype.to_string(),
            codec,
        })
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub fn codec(&self) -> Option<&str> {
        self.codec.as_deref()
    }

    /// True for the "platform default" descriptor
    pub fn is_empty(&self) -> bool {
        self.media_type.is_empty() && self.subtype.is_empty() && self.codec.is_none()
    }

    /// Whether a recorder can be created for this descriptor
    pub fn is_supported(&self) -> bool {
        if self.is_empty() {
            return true;
        }
        if self.media_type != "audio" || !SUPPORTED_SUBTYPES.contains(&self.subtype.as_str()) {
            return false;
        }
        match self.subtype.as_str() {
            "ogg" | "webm" => matches!(self.codec(), None | Some("opus")),
            // Wave is always signed 16-bit PCM, no codec parameter allowed
            _ => self.codec.is_none(),
        }
    }
}

impl FromStr for MimeDescriptor {
    type Err = MimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MimeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(f, "{}/{}", self.media_type, self.subtype)?;
        if let Some(codec) = &self.codec {
            write!(f, ";codecs={}", codec)?;
        }
        Ok(())
    }
}

/// Check a MIME type string; unparsable strings are unsupported
pub fn is_type_supported(mime_type: &str) -> bool {
    MimeDescriptor::parse(mime_type)
        .map(|descriptor| descriptor.is_supported())
        .unwrap_or(false)
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
