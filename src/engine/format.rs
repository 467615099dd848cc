//! Audio container detection and PCM descriptors.
//!
//! Containers are identified by their leading magic bytes. A caller-supplied
//! format hint that disagrees with the sniffed container is a wrong-format
//! error; no hint means the sniffed container is trusted.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AudioError, Result};

/// Bytes read from the head of a file for sniffing
const SNIFF_LEN: usize = 12;

/// Audio container formats the engine recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioFormat {
    Wav,
    Vorbis,
    Mpeg,
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioFormat::Wav => write!(f, "WAV"),
            AudioFormat::Vorbis => write!(f, "Ogg Vorbis"),
            AudioFormat::Mpeg => write!(f, "MPEG audio"),
        }
    }
}

impl AudioFormat {
    /// Identify a container from its first bytes
    pub fn sniff(head: &[u8]) -> Option<AudioFormat> {
        if head.len() >= 12 && &head[0..4] == b"RIFF" && &head[8..12] == b"WAVE" {
            return Some(AudioFormat::Wav);
        }
        if head.starts_with(b"OggS") {
            return Some(AudioFormat::Vorbis);
        }
        if head.starts_with(b"ID3") || head.starts_with(b"TAG") || head.starts_with(b"APETAGEX") {
            return Some(AudioFormat::Mpeg);
        }
        // 11-bit frame sync
        if head.len() >= 2 && head[0] == 0xFF && (head[1] & 0xE0) == 0xE0 {
            return Some(AudioFormat::Mpeg);
        }
        None
    }
}

/// Detect the container format of a file on disk
pub fn detect_format(path: impl AsRef<Path>) -> Result<AudioFormat> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AudioError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let mut head = Vec::with_capacity(SNIFF_LEN);
    File::open(path)?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)?;

    AudioFormat::sniff(&head).ok_or_else(|| AudioError::UnsupportedFormat {
        format: format!("unrecognized container in {}", path.display()),
    })
}

/// Detect a file's format and check it against an optional hint
pub fn resolve_format(path: impl AsRef<Path>, hint: Option<AudioFormat>) -> Result<AudioFormat> {
    let detected = detect_format(path)?;
    match hint {
        Some(expected) if expected != detected => Err(AudioError::WrongFormat {
            expected: expected.to_string(),
            detected: detected.to_string(),
        }),
        _ => Ok(detected),
    }
}

/// Layout of raw PCM data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PcmFormat {
    /// Sample rate in Hz
    pub frequency: u32,
    /// Bits per sample (8 or 16)
    pub bit_depth: u16,
    /// Interleaved channel count
    pub channel_count: u16,
}

impl PcmFormat {
    pub fn new(frequency: u32, bit_depth: u16, channel_count: u16) -> Self {
        Self {
            frequency,
            bit_depth,
            channel_count,
        }
    }

    /// Bytes per interleaved frame
    pub fn frame_size(&self) -> usize {
        usize::from(self.bit_depth / 8) * usize::from(self.channel_count)
    }
}

impl fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {}-bit, {} channel(s)",
            self.frequency, self.bit_depth, self.channel_count
        )
    }
}

/// A fully decoded PCM payload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pcm {
    pub format: PcmFormat,
    pub data: Vec<u8>,
}

impl Pcm {
    pub fn new(format: PcmFormat, data: Vec<u8>) -> Self {
        Self { format, data }
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_sniff_containers() {
        assert_eq!(
            AudioFormat::sniff(b"RIFF\x24\x00\x00\x00WAVEfmt "),
            Some(AudioFormat::Wav)
        );
        assert_eq!(AudioFormat::sniff(b"OggS\x00\x02"), Some(AudioFormat::Vorbis));
        assert_eq!(AudioFormat::sniff(b"ID3\x04\x00"), Some(AudioFormat::Mpeg));
        assert_eq!(AudioFormat::sniff(&[0xFF, 0xFB, 0x90, 0x00]), Some(AudioFormat::Mpeg));
        assert_eq!(AudioFormat::sniff(b"RIFF\x24\x00\x00\x00AVI "), None);
        assert_eq!(AudioFormat::sniff(b""), None);
    }

    #[test]
    fn test_detect_missing_file() {
        let err = detect_format("/nonexistent/audio.wav").unwrap_err();
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
    }

    #[test]
    fn test_detect_unknown_container() {
        let file = file_with(b"plain text, not audio");
        let err = detect_format(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    }

    #[test]
    fn test_hint_mismatch_is_wrong_format() {
        let file = file_with(b"OggS\x00\x02\x00\x00\x00\x00\x00\x00");
        let err = resolve_format(file.path(), Some(AudioFormat::Wav)).unwrap_err();
        assert_eq!(err.error_code(), "WRONG_FORMAT");
        assert_eq!(
            resolve_format(file.path(), Some(AudioFormat::Vorbis)).unwrap(),
            AudioFormat::Vorbis
        );
        assert_eq!(resolve_format(file.path(), None).unwrap(), AudioFormat::Vorbis);
    }

    #[test]
    fn test_frame_size() {
        assert_eq!(PcmFormat::new(44100, 16, 2).frame_size(), 4);
        assert_eq!(PcmFormat::new(8000, 8, 1).frame_size(), 1);
    }
}
