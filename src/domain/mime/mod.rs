//! MIME negotiation module

mod descriptor;
mod negotiation;

pub use descriptor::{is_type_supported, MimeDescriptor, SUPPORTED_SUBTYPES};
pub use negotiation::{negotiate, EncoderKind, NegotiatedMime};
