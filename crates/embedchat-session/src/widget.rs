//! One embedded widget instance: session, conversation, and recorder wired
//! to a shared event bus behind a single command interface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::broadcast;

use embedchat_audio::{
    AudioChunk, AudioSink, LoggingAudioSink, Microphone, NoMicrophone, RecordingController,
};
use embedchat_chat::{ChatTransport, ConversationManager, HttpTransport};
use embedchat_core::config::WidgetConfig;
use embedchat_core::error::{Result, WidgetError};
use embedchat_core::events::{EventBus, WidgetEvent};
use embedchat_core::types::{Completion, RecordingStatus, Screen, WidgetId, WidgetVariant};

use crate::action::WidgetAction;
use crate::error::SessionError;
use crate::snapshot::WidgetSnapshot;
use crate::state::SessionMachine;

// =============================================================================
// Builder
// =============================================================================

/// Assembles a [`Widget`] from a configuration and optional collaborators.
///
/// Anything not supplied falls back to the production default: an HTTP
/// transport to `apiEndpoint`, no microphone, and a sink that only logs.
pub struct WidgetBuilder {
    config: WidgetConfig,
    transport: Option<Arc<dyn ChatTransport>>,
    microphone: Option<Arc<dyn Microphone>>,
    sink: Option<Arc<dyn AudioSink>>,
}

impl WidgetBuilder {
    pub fn new(config: WidgetConfig) -> Self {
        Self {
            config,
            transport: None,
            microphone: None,
            sink: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn microphone(mut self, microphone: Arc<dyn Microphone>) -> Self {
        self.microphone = Some(microphone);
        self
    }

    pub fn audio_sink(mut self, sink: Arc<dyn AudioSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validate the configuration and mount the widget.
    pub fn build(self) -> Result<Widget> {
        self.config.validate()?;

        let transport: Arc<dyn ChatTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::from_config(&self.config)?),
        };
        let microphone = self
            .microphone
            .unwrap_or_else(|| Arc::new(NoMicrophone) as Arc<dyn Microphone>);
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(LoggingAudioSink) as Arc<dyn AudioSink>);

        let id = WidgetId::new();
        let events = EventBus::new(id);
        let config = Arc::new(self.config);

        let widget = Widget {
            id,
            session: Mutex::new(SessionMachine::new(config.variant, events.clone())),
            conversation: ConversationManager::new(transport, events.clone()),
            recorder: RecordingController::new(microphone, sink, events.clone()),
            alive: AtomicBool::new(true),
            events,
            config,
        };

        // The classic variant has no chooser; mounting is the entry action.
        if widget.config.variant == WidgetVariant::Classic {
            let welcome = widget.config.welcome_message.trim();
            if !welcome.is_empty() {
                widget.conversation.add_system_message(welcome)?;
            }
        }

        tracing::info!(
            widget_id = %id,
            variant = ?widget.config.variant,
            endpoint = %widget.config.api_endpoint,
            "Widget mounted"
        );
        Ok(widget)
    }
}

// =============================================================================
// Widget
// =============================================================================

/// A mounted chat widget.
///
/// Each instance owns its own state; several may live on one page without
/// sharing anything.
pub struct Widget {
    id: WidgetId,
    config: Arc<WidgetConfig>,
    events: EventBus,
    session: Mutex<SessionMachine>,
    conversation: ConversationManager,
    recorder: RecordingController,
    alive: AtomicBool,
}

impl std::fmt::Debug for Widget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .field("conversation", &self.conversation)
            .field("recorder", &self.recorder)
            .finish()
    }
}

impl Widget {
    /// Mount a widget from the page's options object with default
    /// collaborators, installing the log subscriber on first use.
    pub fn mount(options: serde_json::Value) -> Result<Self> {
        let config = WidgetConfig::from_options(options)?;
        embedchat_core::logging::init(&config.log_level);
        WidgetBuilder::new(config).build()
    }

    pub fn builder(config: WidgetConfig) -> WidgetBuilder {
        WidgetBuilder::new(config)
    }

    pub fn id(&self) -> WidgetId {
        self.id
    }

    pub fn config(&self) -> &Arc<WidgetConfig> {
        &self.config
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.subscribe()
    }

    pub fn conversation(&self) -> &ConversationManager {
        &self.conversation
    }

    pub fn recorder(&self) -> &RecordingController {
        &self.recorder
    }

    /// Apply one user action.
    ///
    /// Synchronous actions complete before this returns. A message send or a
    /// microphone request suspends; other actions may be handled meanwhile.
    /// `Completion::Ignored` means the action had nothing to do, or its
    /// outcome arrived after the state it belonged to was gone.
    pub async fn handle(&self, action: WidgetAction) -> Result<Completion> {
        self.ensure_alive()?;
        tracing::debug!(
            widget_id = %self.id,
            action = action.name(),
            suspends = action.is_async(),
            "Handling action"
        );

        match action {
            WidgetAction::ToggleWidget => {
                self.session()?.toggle_widget();
                Ok(Completion::Applied)
            }
            WidgetAction::CloseWidget => Ok(completion(self.session()?.close())),
            WidgetAction::HoverTrigger => Ok(completion(self.session()?.hover(true))),
            WidgetAction::UnhoverTrigger => Ok(completion(self.session()?.hover(false))),
            WidgetAction::ToggleFullscreen => {
                let mut session = self.session()?;
                let was_open = session.state().is_open;
                session.toggle_fullscreen();
                Ok(completion(was_open))
            }
            WidgetAction::SelectConnectMode(mode) => {
                self.session()?.select_connect_mode(mode)?;
                Ok(Completion::Applied)
            }
            WidgetAction::EnterGuestMode => {
                let welcome = self.session()?.enter_guest_mode()?;
                self.conversation.add_system_message(welcome)?;
                Ok(Completion::Applied)
            }
            WidgetAction::SubmitIdentity(input) => {
                let welcome = self.session()?.submit_identity(&input)?;
                self.conversation.add_system_message(&welcome)?;
                Ok(Completion::Applied)
            }
            WidgetAction::SendMessage(text) => {
                self.require_screen("send a message", Screen::Chat)?;
                Ok(self.conversation.send_user_message(&text).await?)
            }
            WidgetAction::DismissNotice => {
                self.conversation.dismiss_notice()?;
                Ok(Completion::Applied)
            }
            WidgetAction::ToggleRecording => {
                if self.recorder.status()? != RecordingStatus::Recording {
                    self.require_screen("start recording", Screen::Voice)?;
                }
                Ok(self.recorder.toggle().await?)
            }
            WidgetAction::StartRecording => {
                self.require_screen("start recording", Screen::Voice)?;
                Ok(self.recorder.start_capture().await?)
            }
            WidgetAction::StopRecording => {
                self.recorder.stop_capture()?;
                Ok(Completion::Applied)
            }
            WidgetAction::ResetRecording => {
                self.recorder.reset()?;
                Ok(Completion::Applied)
            }
            WidgetAction::SendRecording => {
                self.require_screen("send a recording", Screen::Voice)?;
                Ok(self.recorder.dispatch().await?)
            }
            WidgetAction::AudioChunk(chunk) => Ok(completion(self.on_audio_chunk(chunk)?)),
        }
    }

    /// Feed one encoded buffer from the capture device. Returns whether it
    /// was buffered; chunks arriving outside a recording are dropped.
    pub fn on_audio_chunk(&self, chunk: AudioChunk) -> Result<bool> {
        self.ensure_alive()?;
        Ok(self.recorder.push_chunk(chunk)?)
    }

    /// Owned copy of everything the presentation layer renders.
    pub fn snapshot(&self) -> Result<WidgetSnapshot> {
        let (session, validation_message) = {
            let session = self.session()?;
            (
                session.state().clone(),
                session.feedback().map(str::to_string),
            )
        };
        Ok(WidgetSnapshot {
            widget_id: self.id,
            bot_name: self.config.bot_name.clone(),
            full_bot_name: self.config.full_bot_name.clone(),
            position: self.config.position,
            theme: self.config.theme.clone(),
            session,
            history: self.conversation.history()?,
            busy: self.conversation.is_busy()?,
            notice: self.conversation.notice()?,
            validation_message,
            recording_status: self.recorder.status()?,
            recording_status_text: self.recorder.status_text()?,
            alive: self.is_alive(),
        })
    }

    /// Unmount: release the microphone, abandon any outstanding exchange,
    /// and refuse every later action. Idempotent.
    pub fn teardown(&self) -> Result<()> {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.recorder.teardown()?;
        self.conversation.teardown()?;
        self.session()?.close();
        self.events.publish(WidgetEvent::TornDown {
            widget_id: self.id,
            timestamp: Utc::now(),
        });
        tracing::info!(widget_id = %self.id, "Widget torn down");
        Ok(())
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(WidgetError::TornDown)
        }
    }

    fn session(&self) -> Result<MutexGuard<'_, SessionMachine>> {
        self.session
            .lock()
            .map_err(|_| WidgetError::from(SessionError::Poisoned))
    }

    fn require_screen(&self, action: &'static str, screen: Screen) -> Result<()> {
        let session = self.session()?;
        let state = session.state();
        if state.is_open && state.active_screen == screen {
            Ok(())
        } else {
            Err(SessionError::invalid(action, state.is_open, state.active_screen).into())
        }
    }
}

impl Drop for Widget {
    fn drop(&mut self) {
        if self.is_alive() {
            if let Err(e) = self.teardown() {
                tracing::warn!(widget_id = %self.id, error = %e, "Teardown on drop failed");
            }
        }
    }
}

fn completion(changed: bool) -> Completion {
    if changed {
        Completion::Applied
    } else {
        Completion::Ignored
    }
}

// =============================================================================
// Tests
// =============================================================================
