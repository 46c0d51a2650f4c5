use std::path::PathBuf;

/// Where a piece of audio comes from: a file on disk or bytes already in
/// memory (the interactive front end hands us the latter).
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    Path(PathBuf),
    Bytes {
        bytes: Vec<u8>,
        mime_type: Option<String>,
    },
}

impl AudioSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        AudioSource::Path(path.into())
    }

    pub fn from_bytes(bytes: Vec<u8>, mime_type: Option<String>) -> Self {
        AudioSource::Bytes { bytes, mime_type }
    }

    /// True when there is plainly nothing to send: an empty path or an empty
    /// byte buffer. Catching this up front keeps the request off the wire.
    pub fn is_empty(&self) -> bool {
        match self {
            AudioSource::Path(path) => path.as_os_str().is_empty(),
            AudioSource::Bytes { bytes, .. } => bytes.is_empty(),
        }
    }
}

/// A fully-read audio input ready to embed in a request body.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedAudio {
    /// Base64 of the entire byte content.
    pub data: String,
    pub mime_type: String,
}

/// One comparison: a trusted reference recording and the candidate TTS
/// generation to judge against it. Built fresh per invocation.
#[derive(Debug, Clone)]
pub struct ComparisonRequest {
    pub reference: AudioSource,
    pub candidate: AudioSource,
    pub character_description: String,
    pub reference_script: Option<String>,
}

impl ComparisonRequest {
    pub fn new(reference: AudioSource, candidate: AudioSource) -> Self {
        Self {
            reference,
            candidate,
            character_description: String::new(),
            reference_script: None,
        }
    }

    pub fn with_character_description(mut self, description: impl Into<String>) -> Self {
        self.character_description = description.into();
        self
    }

    pub fn with_reference_script(mut self, script: impl Into<String>) -> Self {
        self.reference_script = Some(script.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sources_are_detected() {
        assert!(AudioSource::from_path("").is_empty());
        assert!(AudioSource::from_bytes(Vec::new(), None).is_empty());
        assert!(!AudioSource::from_path("/tmp/ref.wav").is_empty());
        assert!(!AudioSource::from_bytes(vec![0u8; 4], None).is_empty());
    }

    #[test]
    fn request_builder_carries_context_fields() {
        let request = ComparisonRequest::new(
            AudioSource::from_path("/tmp/ref.wav"),
            AudioSource::from_path("/tmp/take.wav"),
        )
        .with_character_description("gravelly sea captain")
        .with_reference_script("Hoist the mainsail.");

        assert_eq!(request.character_description, "gravelly sea captain");
        assert_eq!(request.reference_script.as_deref(), Some("Hoist the mainsail."));
    }
}
