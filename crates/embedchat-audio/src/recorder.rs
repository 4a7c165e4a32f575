//! Recording controller owning the microphone-capture lifecycle.
//!
//! Enforces the capture state machine:
//! - Idle -> Recording (microphone granted)
//! - Recording -> Stopped (capture halted, device released)
//! - Stopped -> Recording (new take, previous chunks discarded)
//! - Stopped -> Processing (buffered audio handed to the sink)
//! - Processing -> Idle (sink accepted) or Processing -> Stopped (sink refused)
//! - any -> Idle (reset)
//!
//! Acquisition and delivery are the only suspension points. Each captures a
//! generation number before awaiting; a reset or teardown in the meantime
//! bumps it, and the late completion is dropped.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use embedchat_core::events::{EventBus, WidgetEvent};
use embedchat_core::types::{Completion, RecordingStatus};

use crate::device::{AudioChunk, AudioPayload, AudioSink, DeviceLease, Microphone};
use crate::error::RecordingError;

pub const STATUS_IDLE: &str = "Click the microphone to start";
pub const STATUS_RECORDING: &str = "Listening...";
pub const STATUS_STOPPED: &str = "Recording stopped. Click send to process.";
pub const STATUS_PROCESSING: &str = "Processing your message...";
pub const STATUS_SENT: &str = "Message sent! Recording new message...";
pub const STATUS_DENIED: &str = "Microphone access denied";
pub const STATUS_NOTHING_TO_SEND: &str = "Please record audio first";
pub const STATUS_SEND_FAILED: &str = "Could not send your recording. Please try again.";

#[derive(Debug, Default)]
struct RecorderInner {
    status: RecordingStatus,
    chunks: Vec<AudioChunk>,
    lease: Option<DeviceLease>,
    acquiring: bool,
    generation: u64,
    /// Overrides the per-status text until the next transition.
    notice: Option<&'static str>,
    torn_down: bool,
}

impl RecorderInner {
    fn transition(
        &mut self,
        target: RecordingStatus,
        events: &EventBus,
    ) -> Result<(), RecordingError> {
        if self.status == target {
            return Ok(());
        }
        if !self.status.can_transition_to(&target) {
            return Err(RecordingError::InvalidTransition(format!(
                "{} -> {}",
                self.status, target
            )));
        }
        tracing::debug!("Recording state: {} -> {}", self.status, target);
        let from = self.status;
        self.status = target;
        self.notice = None;
        events.publish(WidgetEvent::RecordingStatusChanged {
            widget_id: events.widget_id(),
            from,
            to: target,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Release the device if held, keeping whatever it flushes.
    fn release_device(&mut self) {
        if let Some(mut lease) = self.lease.take() {
            let flushed = lease.release();
            self.chunks.extend(flushed);
        }
    }

    fn ensure_alive(&self) -> Result<(), RecordingError> {
        if self.torn_down {
            Err(RecordingError::TornDown)
        } else {
            Ok(())
        }
    }
}

/// Suspension point an [`InFlightGuard`] watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InFlight {
    Acquisition,
    Delivery,
}

/// Undoes the in-flight marker when an acquisition or delivery future is
/// dropped before it completes. A reset in the meantime bumps the
/// generation, and the guard then leaves the state alone.
struct InFlightGuard<'a> {
    controller: &'a RecordingController,
    kind: InFlight,
    generation: u64,
    armed: bool,
}

impl<'a> InFlightGuard<'a> {
    fn new(controller: &'a RecordingController, kind: InFlight, generation: u64) -> Self {
        Self {
            controller,
            kind,
            generation,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(mut inner) = self.controller.lock() else {
            return;
        };
        if inner.generation != self.generation || inner.torn_down {
            return;
        }
        match self.kind {
            InFlight::Acquisition => {
                inner.acquiring = false;
                tracing::debug!("Microphone request dropped before an answer");
            }
            InFlight::Delivery => {
                if inner.status != RecordingStatus::Processing {
                    return;
                }
                // Chunks were only copied into the payload, so they are intact
                match inner.transition(RecordingStatus::Stopped, &self.controller.events) {
                    Ok(()) => tracing::debug!(
                        chunks = inner.chunks.len(),
                        "Dispatch dropped before delivery finished, recording kept"
                    ),
                    Err(e) => tracing::warn!(error = %e, "Could not recover from dropped dispatch"),
                }
            }
        }
    }
}

/// Owns the single recording session of one widget.
///
/// The buffered audio never leaves the controller except as a value copy
/// inside the [`AudioPayload`] handed to the sink.
pub struct RecordingController {
    microphone: Arc<dyn Microphone>,
    sink: Arc<dyn AudioSink>,
    events: EventBus,
    inner: Mutex<RecorderInner>,
}

impl std::fmt::Debug for RecordingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingController")
            .field("inner", &self.inner)
            .finish()
    }
}

impl RecordingController {
    pub fn new(microphone: Arc<dyn Microphone>, sink: Arc<dyn AudioSink>, events: EventBus) -> Self {
        Self {
            microphone,
            sink,
            events,
            inner: Mutex::new(RecorderInner::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, RecorderInner>, RecordingError> {
        self.inner.lock().map_err(|_| RecordingError::Poisoned)
    }

    /// Current capture state.
    pub fn status(&self) -> Result<RecordingStatus, RecordingError> {
        Ok(self.lock()?.status)
    }

    /// Text the voice screen shows under the microphone button.
    pub fn status_text(&self) -> Result<String, RecordingError> {
        let inner = self.lock()?;
        let text = inner.notice.unwrap_or(match inner.status {
            RecordingStatus::Idle => STATUS_IDLE,
            RecordingStatus::Recording => STATUS_RECORDING,
            RecordingStatus::Stopped => STATUS_STOPPED,
            RecordingStatus::Processing => STATUS_PROCESSING,
        });
        Ok(text.to_string())
    }

    /// Number of buffered chunks.
    pub fn chunk_count(&self) -> Result<usize, RecordingError> {
        Ok(self.lock()?.chunks.len())
    }

    /// Whether a microphone request is awaiting the user's answer.
    pub fn is_acquiring(&self) -> Result<bool, RecordingError> {
        Ok(self.lock()?.acquiring)
    }

    /// Whether the microphone is currently held.
    pub fn holds_device(&self) -> Result<bool, RecordingError> {
        Ok(self
            .lock()?
            .lease
            .as_ref()
            .is_some_and(DeviceLease::is_held))
    }

    /// Request the microphone and start buffering.
    ///
    /// A no-op while already recording, acquiring, or sending. On denial the
    /// controller stays where it was and the status text reports it.
    pub async fn start_capture(&self) -> Result<Completion, RecordingError> {
        let generation = {
            let mut inner = self.lock()?;
            inner.ensure_alive()?;
            match inner.status {
                RecordingStatus::Recording | RecordingStatus::Processing => {
                    tracing::debug!(status = %inner.status, "start_capture ignored");
                    return Ok(Completion::Ignored);
                }
                RecordingStatus::Idle | RecordingStatus::Stopped => {}
            }
            if inner.acquiring {
                tracing::debug!("start_capture ignored, acquisition already pending");
                return Ok(Completion::Ignored);
            }
            inner.acquiring = true;
            inner.generation
        };

        let mut guard = InFlightGuard::new(self, InFlight::Acquisition, generation);
        let acquired = self.microphone.acquire().await;

        let mut inner = self.lock()?;
        guard.disarm();
        if inner.generation != generation || inner.torn_down {
            if let Ok(stream) = acquired {
                DeviceLease::new(stream).release();
            }
            tracing::debug!("Microphone acquisition completed after reset, discarded");
            return Ok(Completion::Ignored);
        }
        inner.acquiring = false;

        match acquired {
            Ok(stream) => {
                inner.chunks.clear();
                inner.lease = Some(DeviceLease::new(stream));
                inner.transition(RecordingStatus::Recording, &self.events)?;
                tracing::info!("Recording started");
                Ok(Completion::Applied)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Microphone unavailable");
                inner.notice = Some(STATUS_DENIED);
                Err(match e {
                    RecordingError::CaptureUnavailable(msg) => {
                        RecordingError::CaptureUnavailable(msg)
                    }
                    other => RecordingError::CaptureUnavailable(other.to_string()),
                })
            }
        }
    }

    /// Append a chunk delivered by the capture device.
    ///
    /// Returns `false` when the chunk arrived outside a recording and was
    /// dropped.
    pub fn push_chunk(&self, chunk: AudioChunk) -> Result<bool, RecordingError> {
        let mut inner = self.lock()?;
        if inner.status != RecordingStatus::Recording {
            tracing::trace!(status = %inner.status, "Chunk dropped outside recording");
            return Ok(false);
        }
        inner.chunks.push(chunk);
        Ok(true)
    }

    /// Halt capture and release the device. A no-op unless recording.
    pub fn stop_capture(&self) -> Result<(), RecordingError> {
        let mut inner = self.lock()?;
        if inner.status != RecordingStatus::Recording {
            return Ok(());
        }
        inner.release_device();
        inner.transition(RecordingStatus::Stopped, &self.events)?;
        tracing::info!(chunks = inner.chunks.len(), "Recording stopped");
        Ok(())
    }

    /// Microphone button: start when not recording, stop when recording.
    pub async fn toggle(&self) -> Result<Completion, RecordingError> {
        if self.status()? == RecordingStatus::Recording {
            self.stop_capture()?;
            Ok(Completion::Applied)
        } else {
            self.start_capture().await
        }
    }

    /// Return to `Idle` with nothing buffered, from any state.
    ///
    /// Pending acquisitions and deliveries are orphaned; their completions
    /// are ignored.
    pub fn reset(&self) -> Result<(), RecordingError> {
        let mut inner = self.lock()?;
        inner.release_device();
        inner.chunks.clear();
        inner.acquiring = false;
        inner.generation += 1;
        inner.transition(RecordingStatus::Idle, &self.events)?;
        inner.notice = None;
        tracing::debug!("Recorder reset");
        Ok(())
    }

    /// Hand the buffered recording to the sink.
    ///
    /// Valid only from `Stopped` with at least one chunk. Not re-entrant:
    /// a second call while the first is outstanding fails with
    /// `DispatchInFlight`.
    pub async fn dispatch(&self) -> Result<Completion, RecordingError> {
        let (generation, payload) = {
            let mut inner = self.lock()?;
            inner.ensure_alive()?;
            if inner.status == RecordingStatus::Processing {
                return Err(RecordingError::DispatchInFlight);
            }
            if inner.status != RecordingStatus::Stopped || inner.chunks.is_empty() {
                inner.notice = Some(STATUS_NOTHING_TO_SEND);
                return Err(RecordingError::NothingToSend);
            }
            let payload = AudioPayload::new(inner.chunks.clone());
            inner.transition(RecordingStatus::Processing, &self.events)?;
            (inner.generation, payload)
        };

        let payload_id = payload.id;
        tracing::info!(
            payload_id = %payload_id,
            chunks = payload.chunks.len(),
            bytes = payload.byte_len(),
            "Dispatching recording"
        );
        let mut guard = InFlightGuard::new(self, InFlight::Delivery, generation);
        let delivered = self.sink.deliver(payload).await;

        let mut inner = self.lock()?;
        guard.disarm();
        if inner.generation != generation || inner.torn_down {
            tracing::debug!(payload_id = %payload_id, "Dispatch completed after reset, ignored");
            return Ok(Completion::Ignored);
        }

        match delivered {
            Ok(()) => {
                inner.chunks.clear();
                inner.transition(RecordingStatus::Idle, &self.events)?;
                inner.notice = Some(STATUS_SENT);
                tracing::info!(payload_id = %payload_id, "Recording delivered");
                Ok(Completion::Applied)
            }
            Err(e) => {
                tracing::warn!(payload_id = %payload_id, error = %e, "Recording delivery failed");
                inner.transition(RecordingStatus::Stopped, &self.events)?;
                inner.notice = Some(STATUS_SEND_FAILED);
                Err(e)
            }
        }
    }

    /// Release everything and refuse further work.
    pub fn teardown(&self) -> Result<(), RecordingError> {
        self.reset()?;
        let mut inner = self.lock()?;
        inner.torn_down = true;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
