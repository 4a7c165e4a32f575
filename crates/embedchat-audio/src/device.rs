//! Capture device and audio transport abstractions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::RecordingError;

/// One encoded buffer delivered by the capture device.
pub type AudioChunk = Vec<u8>;

// =============================================================================
// Traits
// =============================================================================

/// Microphone access capability.
///
/// Acquisition is asynchronous and externally fallible: the user may deny
/// permission or the device may be missing. There is no cancellation; only
/// the outcome is observed.
#[async_trait]
pub trait Microphone: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn CaptureStream>, RecordingError>;
}

/// A live capture stream holding the microphone.
pub trait CaptureStream: Send {
    /// Stop every device track and return the chunks the encoder flushes on
    /// stop. Called at most once per stream.
    fn release(&mut self) -> Vec<AudioChunk>;
}

/// Destination for recorded audio.
///
/// What happens to the audio afterwards (transcription, storage) is the
/// sink's business; the recorder only waits for acceptance or refusal.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn deliver(&self, payload: AudioPayload) -> Result<(), RecordingError>;
}

// =============================================================================
// Defaults
// =============================================================================

/// Microphone used when the host provides none: every request is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMicrophone;

#[async_trait]
impl Microphone for NoMicrophone {
    async fn acquire(&self) -> Result<Box<dyn CaptureStream>, RecordingError> {
        Err(RecordingError::CaptureUnavailable(
            "no capture device configured".to_string(),
        ))
    }
}

/// Sink used when the host provides none: logs the payload and accepts it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAudioSink;

#[async_trait]
impl AudioSink for LoggingAudioSink {
    async fn deliver(&self, payload: AudioPayload) -> Result<(), RecordingError> {
        tracing::info!(
            payload_id = %payload.id,
            chunks = payload.chunks.len(),
            bytes = payload.byte_len(),
            "Recording accepted without an audio backend"
        );
        Ok(())
    }
}

// =============================================================================
// Payload
// =============================================================================

/// Value copy of a finished recording handed to an [`AudioSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPayload {
    pub id: Uuid,
    pub chunks: Vec<AudioChunk>,
    pub recorded_at: DateTime<Utc>,
}

impl AudioPayload {
    pub fn new(chunks: Vec<AudioChunk>) -> Self {
        Self {
            id: Uuid::new_v4(),
            chunks,
            recorded_at: Utc::now(),
        }
    }

    /// Total number of encoded bytes across all chunks.
    pub fn byte_len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }
}

// =============================================================================
// DeviceLease
// =============================================================================

/// Exclusive hold on the microphone for the duration of a recording.
///
/// Releasing is mandatory on every exit path: explicit stop, reset, and
/// teardown call [`DeviceLease::release`]; anything else is caught by `Drop`.
pub struct DeviceLease {
    stream: Option<Box<dyn CaptureStream>>,
}

impl DeviceLease {
    pub fn new(stream: Box<dyn CaptureStream>) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    /// Release the device, returning any chunks flushed on stop.
    pub fn release(&mut self) -> Vec<AudioChunk> {
        match self.stream.take() {
            Some(mut stream) => stream.release(),
            None => Vec::new(),
        }
    }

    pub fn is_held(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        if self.is_held() {
            let discarded = self.release();
            tracing::debug!(
                discarded_chunks = discarded.len(),
                "Device lease dropped while held, microphone released"
            );
        }
    }
}

impl std::fmt::Debug for DeviceLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLease")
            .field("held", &self.is_held())
            .finish()
    }
}
