//! Encoded chunk value object

/// Encoded bytes handed to observers, tagged with the session MIME type.
/// `is_final` marks the chunk that ends a recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChunk {
    data: Vec<u8>,
    mime_type: String,
    is_final: bool,
}

impl EncodedChunk {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, is_final: bool) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            is_final,
        }
    }

    /// Concatenate the buffers of one encoder response into a chunk
    pub fn from_buffers(buffers: Vec<Vec<u8>>, mime_type: impl Into<String>, is_final: bool) -> Self {
        Self::new(buffers.concat(), mime_type, is_final)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get human-readable size
    pub fn human_readable_size(&self) -> String {
        format_size(self.size_bytes())
    }
}

/// Format a byte count as B, KB or MB
pub fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
