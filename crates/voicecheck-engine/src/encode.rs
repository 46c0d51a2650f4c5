use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use voicecheck_contracts::error::Result;
use voicecheck_contracts::request::{AudioSource, EncodedAudio};

/// Used when a source declares no MIME type at all. The remote endpoint
/// needs a concrete audio type, not a wildcard.
pub const DEFAULT_AUDIO_MIME: &str = "audio/mpeg";

/// Reads the entire input and base64-encodes it for inline embedding in a
/// request body. Inputs are short clips, so there is no streaming path. An
/// unreadable file surfaces as an I/O failure and is never retried.
pub fn encode_audio(source: &AudioSource) -> Result<EncodedAudio> {
    let (bytes, declared) = match source {
        AudioSource::Path(path) => (fs::read(path)?, mime_for_path(path).map(str::to_string)),
        AudioSource::Bytes { bytes, mime_type } => (bytes.clone(), mime_type.clone()),
    };
    Ok(EncodedAudio {
        data: BASE64.encode(bytes),
        mime_type: declared
            .filter(|mime| !mime.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AUDIO_MIME.to_string()),
    })
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "wav" => Some("audio/wav"),
        "mp3" => Some("audio/mpeg"),
        "ogg" | "oga" => Some("audio/ogg"),
        "flac" => Some("audio/flac"),
        "m4a" | "mp4" => Some("audio/mp4"),
        "aac" => Some("audio/aac"),
        "webm" => Some("audio/webm"),
        _ => None,
    }
}
