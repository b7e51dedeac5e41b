//! Decoding of base64-in-JSON recording uploads.
//!
//! Browsers submit recordings as a JSON body carrying a data URI; this
//! module turns that body into a [`Waveform`]. Transport is the caller's
//! concern.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;

use crate::audio::{parse_wav_bytes, Waveform};
use crate::InputError;

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    #[serde(rename = "recordingAsBase64")]
    pub recording_as_base64: String,
}

/// Decode a full JSON upload body into a waveform.
pub fn decode_upload_json(body: &str) -> Result<Waveform, InputError> {
    let request: UploadRequest = serde_json::from_str(body)?;
    decode_data_uri(&request.recording_as_base64)
}

/// Decode a `data:...;base64,<payload>` URI carrying WAV bytes.
pub fn decode_data_uri(uri: &str) -> Result<Waveform, InputError> {
    let (_, payload) = uri
        .split_once("base64,")
        .ok_or(InputError::MissingBase64Marker)?;
    let bytes = STANDARD.decode(payload.trim())?;
    let waveform = parse_wav_bytes(&bytes)?;
    if waveform.is_empty() {
        return Err(InputError::EmptyRecording);
    }
    Ok(waveform)
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    use super::{decode_data_uri, decode_upload_json};
    use crate::audio::test_support::wav_bytes;
    use crate::InputError;

    fn data_uri(pcm: &[i16]) -> String {
        let encoded = STANDARD.encode(wav_bytes(48_000, pcm));
        format!("data:audio/wav;base64,{encoded}")
    }

    #[test]
    fn decodes_a_wav_upload_body() {
        let body = format!(
            r#"{{"recordingAsBase64": "{}"}}"#,
            data_uri(&[0, 1000, -1000, 500])
        );
        let waveform = decode_upload_json(&body).expect("decode upload");
        assert_eq!(waveform.sample_rate_hz, 48_000);
        assert_eq!(waveform.len(), 4);
    }

    #[test]
    fn missing_marker_is_rejected() {
        assert!(matches!(
            decode_data_uri("data:audio/wav;hex,00ff"),
            Err(InputError::MissingBase64Marker)
        ));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        assert!(matches!(
            decode_data_uri("data:audio/wav;base64,@@not-base64@@"),
            Err(InputError::Base64(_))
        ));
    }

    #[test]
    fn non_wav_payload_is_rejected() {
        let encoded = STANDARD.encode(b"just some text, definitely not RIFF data padding...");
        let uri = format!("data:audio/wav;base64,{encoded}");
        assert!(matches!(decode_data_uri(&uri), Err(InputError::Wav(_))));
    }

    #[test]
    fn missing_field_is_a_json_error() {
        assert!(matches!(
            decode_upload_json(r#"{"somethingElse": 1}"#),
            Err(InputError::Json(_))
        ));
    }
}
