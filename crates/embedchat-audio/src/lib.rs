//! Embedchat audio crate - microphone capture lifecycle for the voice screen.
//!
//! Provides trait-based abstractions for the microphone and the audio
//! transport, the [`RecordingController`] that owns the capture state
//! machine, and mock implementations for running without real hardware.

pub mod device;
pub mod error;
pub mod mock;
pub mod recorder;

pub use device::{
    AudioChunk, AudioPayload, AudioSink, CaptureStream, DeviceLease, LoggingAudioSink, Microphone,
    NoMicrophone,
};
pub use error::RecordingError;
pub use mock::{MockAudioSink, MockCaptureStream, MockMicrophone};
pub use recorder::RecordingController;
