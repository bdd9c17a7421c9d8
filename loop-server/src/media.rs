//! Audio upload storage.
//!
//! Uploads go through the `MediaStore` trait. The bundled implementation
//! writes files under a local directory that the HTTP layer also serves at
//! `/media`. Only mp3 and wav are accepted.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("unsupported audio format: {0} (expected mp3 or wav)")]
    Unsupported(String),

    #[error("upload is empty")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    /// Pick the format from the file extension, falling back to the content type.
    pub fn detect(filename: &str, content_type: Option<&str>) -> Result<Self, MediaError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        if let Some(ext) = extension {
            return match ext.as_str() {
                "mp3" => Ok(Self::Mp3),
                "wav" | "wave" => Ok(Self::Wav),
                _ => Err(MediaError::Unsupported(ext)),
            };
        }

        let mime = content_type
            .and_then(|c| c.split(';').next())
            .map(|c| c.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match mime.as_str() {
            "audio/mpeg" | "audio/mp3" => Ok(Self::Mp3),
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Ok(Self::Wav),
            "" => Err(MediaError::Unsupported("unknown".to_owned())),
            other => Err(MediaError::Unsupported(other.to_owned())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }
}

/// Incoming upload
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Where an upload ended up
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMedia {
    pub url: String,
    pub format: AudioFormat,
    /// Seconds; only known for WAV
    pub duration: Option<f64>,
    pub size: usize,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn store(&self, upload: Upload) -> Result<StoredMedia, MediaError>;
}

/// Files on local disk, addressed as `{public_base}/{uuid}.{ext}`
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    public_base: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn store(&self, upload: Upload) -> Result<StoredMedia, MediaError> {
        let format = AudioFormat::detect(&upload.filename, upload.content_type.as_deref())?;
        if upload.bytes.is_empty() {
            return Err(MediaError::Empty);
        }

        let file_name = format!("{}.{}", Uuid::new_v4(), format.extension());
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&file_name), &upload.bytes).await?;

        let duration = match format {
            AudioFormat::Wav => wav_duration(&upload.bytes),
            AudioFormat::Mp3 => None,
        };

        tracing::info!(
            file = %file_name,
            bytes = upload.bytes.len(),
            original = %upload.filename,
            "stored upload"
        );

        Ok(StoredMedia {
            url: format!("{}/{}", self.public_base.trim_end_matches('/'), file_name),
            format,
            duration,
            size: upload.bytes.len(),
        })
    }
}

/// Length in seconds from a WAV header, `None` if the header is unreadable.
pub fn wav_duration(bytes: &[u8]) -> Option<f64> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).ok()?;
    let sample_rate = reader.spec().sample_rate;
    if sample_rate == 0 {
        return None;
    }
    Some(reader.duration() as f64 / sample_rate as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(seconds: u32, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut buf = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec).unwrap();
            for _ in 0..(seconds * sample_rate) {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        buf
    }

    #[test]
    fn detects_by_extension_then_mime() {
        assert_eq!(AudioFormat::detect("beat.MP3", None).unwrap(), AudioFormat::Mp3);
        assert_eq!(AudioFormat::detect("take.wav", Some("audio/mpeg")).unwrap(), AudioFormat::Wav);
        assert_eq!(
            AudioFormat::detect("blob", Some("audio/x-wav; codec=1")).unwrap(),
            AudioFormat::Wav
        );
        assert!(matches!(
            AudioFormat::detect("song.ogg", Some("audio/mpeg")),
            Err(MediaError::Unsupported(ext)) if ext == "ogg"
        ));
        assert!(AudioFormat::detect("blob", None).is_err());
    }

    #[test]
    fn wav_duration_from_header() {
        let bytes = wav_bytes(2, 8_000);
        let duration = wav_duration(&bytes).unwrap();
        assert!((duration - 2.0).abs() < 1e-9);

        assert!(wav_duration(b"not a wav").is_none());
    }

    #[tokio::test]
    async fn local_store_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().join("uploads"), "http://localhost:5005/media/");

        let stored = store
            .store(Upload {
                filename: "loop.wav".to_owned(),
                content_type: None,
                bytes: Bytes::from(wav_bytes(1, 8_000)),
            })
            .await
            .unwrap();

        assert!(stored.url.starts_with("http://localhost:5005/media/"));
        assert!(stored.url.ends_with(".wav"));
        assert!(!stored.url.contains("//media//"));
        assert_eq!(stored.format, AudioFormat::Wav);
        assert!(stored.duration.is_some());

        let file_name = stored.url.rsplit('/').next().unwrap();
        let on_disk = std::fs::read(dir.path().join("uploads").join(file_name)).unwrap();
        assert_eq!(on_disk.len(), stored.size);
    }

    #[tokio::test]
    async fn local_store_rejects_empty_and_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path(), "/media");

        let empty = store
            .store(Upload {
                filename: "x.mp3".to_owned(),
                content_type: None,
                bytes: Bytes::new(),
            })
            .await;
        assert!(matches!(empty, Err(MediaError::Empty)));

        let flac = store
            .store(Upload {
                filename: "x.flac".to_owned(),
                content_type: None,
                bytes: Bytes::from_static(b"fLaC"),
            })
            .await;
        assert!(matches!(flac, Err(MediaError::Unsupported(_))));
    }
}
