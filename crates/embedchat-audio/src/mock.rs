//! Mock capture device and audio sink for running the widget without
//! microphone hardware or an audio backend.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::device::{AudioChunk, AudioPayload, AudioSink, CaptureStream, Microphone};
use crate::error::RecordingError;

// =============================================================================
// MockMicrophone
// =============================================================================

/// Mock microphone.
///
/// Grants or denies access depending on `granted`, and tracks whether a
/// stream currently holds the device so tests can assert it is released.
#[derive(Debug, Clone)]
pub struct MockMicrophone {
    granted: Arc<AtomicBool>,
    held: Arc<AtomicBool>,
    acquisitions: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    flush_on_stop: Option<AudioChunk>,
    gate: Option<Arc<Notify>>,
}

impl Default for MockMicrophone {
    fn default() -> Self {
        Self::granting()
    }
}

impl MockMicrophone {
    /// A microphone whose permission prompt is always accepted.
    pub fn granting() -> Self {
        Self {
            granted: Arc::new(AtomicBool::new(true)),
            held: Arc::new(AtomicBool::new(false)),
            acquisitions: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
            flush_on_stop: None,
            gate: None,
        }
    }

    /// A microphone whose permission prompt is always refused.
    pub fn denying() -> Self {
        let mic = Self::granting();
        mic.granted.store(false, Ordering::SeqCst);
        mic
    }

    /// Emit `chunk` when the stream is stopped, like an encoder flushing.
    pub fn with_flush(mut self, chunk: AudioChunk) -> Self {
        self.flush_on_stop = Some(chunk);
        self
    }

    /// Hold every acquisition until `gate` is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }

    /// Whether a capture stream currently holds the device.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Microphone for MockMicrophone {
    async fn acquire(&self) -> Result<Box<dyn CaptureStream>, RecordingError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        if !self.granted.load(Ordering::SeqCst) {
            return Err(RecordingError::CaptureUnavailable(
                "Permission denied".to_string(),
            ));
        }
        self.held.store(true, Ordering::SeqCst);
        tracing::info!("Mock microphone acquired");
        Ok(Box::new(MockCaptureStream {
            held: Arc::clone(&self.held),
            releases: Arc::clone(&self.releases),
            flush_on_stop: self.flush_on_stop.clone(),
        }))
    }
}

/// Stream handed out by [`MockMicrophone`].
#[derive(Debug)]
pub struct MockCaptureStream {
    held: Arc<AtomicBool>,
    releases: Arc<AtomicUsize>,
    flush_on_stop: Option<AudioChunk>,
}

impl CaptureStream for MockCaptureStream {
    fn release(&mut self) -> Vec<AudioChunk> {
        self.held.store(false, Ordering::SeqCst);
        self.releases.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Mock microphone released");
        self.flush_on_stop.take().into_iter().collect()
    }
}

// =============================================================================
// MockAudioSink
// =============================================================================

/// Mock audio sink recording every payload it accepts.
#[derive(Debug, Clone, Default)]
pub struct MockAudioSink {
    delivered: Arc<Mutex<Vec<AudioPayload>>>,
    failing: Arc<AtomicBool>,
    gate: Option<Arc<Notify>>,
}

impl MockAudioSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that refuses every payload.
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.failing.store(true, Ordering::SeqCst);
        sink
    }

    /// Hold every delivery until `gate` is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<AudioPayload> {
        self.delivered
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AudioSink for MockAudioSink {
    async fn deliver(&self, payload: AudioPayload) -> Result<(), RecordingError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RecordingError::Delivery(
                "mock sink refused payload".to_string(),
            ));
        }
        let mut delivered = self
            .delivered
            .lock()
            .map_err(|_| RecordingError::Poisoned)?;
        delivered.push(payload);
        Ok(())
    }
}
