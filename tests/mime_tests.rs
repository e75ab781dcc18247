//! MIME support checks through the public API

use media_recorder::domain::mime::{negotiate, EncoderKind, MimeDescriptor};
use media_recorder::is_type_supported;

const SUPPORTED: &[&str] = &[
    "",
    "audio/ogg",
    "audio/ogg;codecs=opus",
    "audio/ogg; codecs=opus",
    "audio/webm",
    "audio/webm;codecs=opus",
    "audio/wav",
    "audio/wave",
];

const UNSUPPORTED: &[&str] = &[
    "audio/ogg;codecs=vorbis",
    "audio/webm;codecs=vp8",
    "audio/wav;codecs=pcm",
    "audio/mp4",
    "video/webm",
    "audio",
    "audio/",
    "/ogg",
    "audio/ogg;opus",
    "audio/ogg;codecs=",
    "audio/ogg;codecs=opus;rate=48000",
];

#[test]
fn support_table() {
    for mime in SUPPORTED {
        assert!(is_type_supported(mime), "{:?} should be supported", mime);
    }
    for mime in UNSUPPORTED {
        assert!(!is_type_supported(mime), "{:?} should not be supported", mime);
    }
}

#[test]
fn support_is_stable_after_reserialization() {
    for mime in SUPPORTED.iter().chain(UNSUPPORTED) {
        let Ok(descriptor) = MimeDescriptor::parse(mime) else {
            continue;
        };
        let reparsed: MimeDescriptor = descriptor.to_string().parse().unwrap();
        assert_eq!(reparsed.is_supported(), descriptor.is_supported(), "{:?}", mime);
        assert_eq!(reparsed.is_supported(), is_type_supported(mime), "{:?}", mime);
    }
}

#[test]
fn negotiation_maps_subtypes_to_encoders() {
    let cases = [
        ("", EncoderKind::OggOpus, "audio/ogg"),
        ("audio/ogg; codecs=opus", EncoderKind::OggOpus, "audio/ogg"),
        ("audio/webm;codecs=opus", EncoderKind::WebmOpus, "audio/webm"),
        ("audio/wav", EncoderKind::Wave, "audio/wav"),
        ("audio/wave", EncoderKind::Wave, "audio/wave"),
    ];
    for (requested, kind, reported) in cases {
        let negotiated = negotiate(requested).unwrap();
        assert_eq!(negotiated.kind, kind, "{:?}", requested);
        assert_eq!(negotiated.mime_type, reported, "{:?}", requested);
    }
    assert!(negotiate("audio/ogg;codecs=vorbis").is_none());
}
