//! Session state machine: visibility, fullscreen, active screen, identity.
//!
//! States are `Closed` and `Open.<screen>`, each open state carrying an
//! orthogonal fullscreen bit. Screens follow a one-directional funnel:
//! Connect -> {Voice | Text}, Text -> Chat (guest or phone entry).
//! Every transition here is synchronous.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use embedchat_core::events::{EventBus, WidgetEvent};
use embedchat_core::types::{ConnectMode, Screen, WidgetVariant};

use crate::error::SessionError;

pub const PHONE_FEEDBACK: &str = "Please enter a valid 10-digit mobile number";
pub const GUEST_WELCOME: &str =
    "Welcome! You're in guest mode. Some features may be limited. How can I help you today?";

/// Welcome text after a phone number is accepted.
pub fn identity_welcome(phone: &PhoneNumber) -> String {
    format!(
        "Welcome! A verification code has been sent to {}. You now have full access! How can I assist you?",
        phone
    )
}

// =============================================================================
// PhoneNumber
// =============================================================================

/// A mobile number of exactly ten ASCII digits.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub const DIGITS: usize = 10;

    /// Parse user input, ignoring surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, SessionError> {
        let trimmed = input.trim();
        if trimmed.len() == Self::DIGITS && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(SessionError::Validation(PHONE_FEEDBACK.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// SessionState
// =============================================================================

/// Presentation-facing session flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub is_open: bool,
    pub is_fullscreen: bool,
    pub active_screen: Screen,
    pub is_authenticated: bool,
    pub identity: Option<PhoneNumber>,
    /// Hover tooltip next to the closed trigger.
    pub tooltip_visible: bool,
}

impl SessionState {
    fn initial(variant: WidgetVariant) -> Self {
        Self {
            is_open: false,
            is_fullscreen: false,
            active_screen: match variant {
                WidgetVariant::ModeChooser => Screen::Connect,
                WidgetVariant::Classic => Screen::Chat,
            },
            is_authenticated: false,
            identity: None,
            tooltip_visible: false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_open {
            return write!(f, "Closed");
        }
        write!(f, "Open.{}", self.active_screen)?;
        if self.is_fullscreen {
            write!(f, " (fullscreen)")?;
        }
        Ok(())
    }
}

// =============================================================================
// SessionMachine
// =============================================================================

/// Owns a widget's [`SessionState`] and validates every transition.
#[derive(Debug)]
pub struct SessionMachine {
    state: SessionState,
    /// Inline feedback under the phone field, cleared on the next success.
    feedback: Option<String>,
    events: EventBus,
}

impl SessionMachine {
    pub fn new(variant: WidgetVariant, events: EventBus) -> Self {
        Self {
            state: SessionState::initial(variant),
            feedback: None,
            events,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    /// Open to the last screen shown, or close.
    pub fn toggle_widget(&mut self) {
        if self.state.is_open {
            self.close();
        } else {
            self.state.is_open = true;
            self.set_tooltip(false);
            tracing::debug!(screen = %self.state.active_screen, "Widget opened");
            self.publish_visibility();
        }
    }

    /// Close the widget, dropping fullscreen first. Returns `false` when it
    /// was already closed.
    pub fn close(&mut self) -> bool {
        if !self.state.is_open {
            return false;
        }
        if self.state.is_fullscreen {
            self.toggle_fullscreen();
        }
        self.state.is_open = false;
        tracing::debug!("Widget closed");
        self.publish_visibility();
        true
    }

    /// Flip fullscreen. Ignored while closed; returns the resulting bit.
    pub fn toggle_fullscreen(&mut self) -> bool {
        if !self.state.is_open {
            tracing::debug!("Fullscreen toggle ignored while closed");
            return false;
        }
        self.state.is_fullscreen = !self.state.is_fullscreen;
        self.events.publish(WidgetEvent::FullscreenChanged {
            widget_id: self.events.widget_id(),
            fullscreen: self.state.is_fullscreen,
            timestamp: Utc::now(),
        });
        self.state.is_fullscreen
    }

    /// Pointer entered or left the trigger. Ignored while open.
    pub fn hover(&mut self, hovering: bool) -> bool {
        if self.state.is_open {
            return false;
        }
        self.set_tooltip(hovering)
    }

    /// Leave the connect chooser for the voice or text pane.
    pub fn select_connect_mode(&mut self, mode: ConnectMode) -> Result<(), SessionError> {
        self.require_open("select a connect mode")?;
        self.move_to(mode.screen(), "select a connect mode")
    }

    /// Continue without identity. Returns the welcome text to append.
    pub fn enter_guest_mode(&mut self) -> Result<&'static str, SessionError> {
        self.require_open("enter guest mode")?;
        self.move_to(Screen::Chat, "enter guest mode")?;
        self.state.is_authenticated = false;
        self.feedback = None;
        tracing::info!("Entered guest mode");
        Ok(GUEST_WELCOME)
    }

    /// Continue with a phone number. On a malformed number nothing changes
    /// except the inline feedback. Returns the welcome text to append.
    pub fn submit_identity(&mut self, input: &str) -> Result<String, SessionError> {
        self.require_open("submit identity")?;
        if !self.state.active_screen.can_transition_to(&Screen::Chat) {
            return Err(SessionError::invalid(
                "submit identity",
                self.state.is_open,
                self.state.active_screen,
            ));
        }
        let phone = match PhoneNumber::parse(input) {
            Ok(phone) => phone,
            Err(e) => {
                tracing::debug!("Phone number rejected");
                self.feedback = Some(PHONE_FEEDBACK.to_string());
                return Err(e);
            }
        };

        self.move_to(Screen::Chat, "submit identity")?;
        self.state.is_authenticated = true;
        self.feedback = None;
        let welcome = identity_welcome(&phone);
        self.state.identity = Some(phone);
        tracing::info!("Identity accepted");
        Ok(welcome)
    }

    fn require_open(&self, action: &'static str) -> Result<(), SessionError> {
        if self.state.is_open {
            Ok(())
        } else {
            Err(SessionError::invalid(action, false, self.state.active_screen))
        }
    }

    fn move_to(&mut self, target: Screen, action: &'static str) -> Result<(), SessionError> {
        let from = self.state.active_screen;
        if !from.can_transition_to(&target) {
            return Err(SessionError::invalid(action, self.state.is_open, from));
        }
        tracing::debug!("Session screen: {} -> {}", from, target);
        self.state.active_screen = target;
        self.events.publish(WidgetEvent::ScreenChanged {
            widget_id: self.events.widget_id(),
            from,
            to: target,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn set_tooltip(&mut self, visible: bool) -> bool {
        if self.state.tooltip_visible == visible {
            return false;
        }
        self.state.tooltip_visible = visible;
        self.events.publish(WidgetEvent::TooltipChanged {
            widget_id: self.events.widget_id(),
            visible,
            timestamp: Utc::now(),
        });
        true
    }

    fn publish_visibility(&self) {
        self.events.publish(WidgetEvent::VisibilityChanged {
            widget_id: self.events.widget_id(),
            open: self.state.is_open,
            timestamp: Utc::now(),
        });
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use embedchat_core::types::WidgetId;

    fn machine() -> SessionMachine {
        SessionMachine::new(WidgetVariant::ModeChooser, EventBus::new(WidgetId::new()))
    }

    fn on_text_screen() -> SessionMachine {
        let mut sm = machine();
        sm.toggle_widget();
        sm.select_connect_mode(ConnectMode::Text).unwrap();
        sm
    }

    #[test]
    fn test_initial_state() {
        let sm = machine();
        let state = sm.state();
        assert!(!state.is_open);
        assert!(!state.is_fullscreen);
        assert_eq!(state.active_screen, Screen::Connect);
        assert!(!state.is_authenticated);
        assert!(state.identity.is_none());
        assert_eq!(state.to_string(), "Closed");
    }

    #[test]
    fn test_classic_variant_starts_on_chat() {
        let sm = SessionMachine::new(WidgetVariant::Classic, EventBus::new(WidgetId::new()));
        assert_eq!(sm.state().active_screen, Screen::Chat);
        assert!(!sm.state().is_open);
    }

    #[test]
    fn test_toggle_keeps_last_screen() {
        let mut sm = on_text_screen();
        sm.toggle_widget();
        assert!(!sm.state().is_open);
        sm.toggle_widget();
        assert!(sm.state().is_open);
        assert_eq!(sm.state().active_screen, Screen::Text);
        assert_eq!(sm.state().to_string(), "Open.Text");
    }

    #[test]
    fn test_opening_clears_tooltip() {
        let mut sm = machine();
        assert!(sm.hover(true));
        assert!(sm.state().tooltip_visible);
        sm.toggle_widget();
        assert!(!sm.state().tooltip_visible);
        // Hover is ignored while open
        assert!(!sm.hover(true));
        assert!(!sm.state().tooltip_visible);
    }

    #[test]
    fn test_unhover_hides_tooltip() {
        let mut sm = machine();
        sm.hover(true);
        assert!(sm.hover(false));
        assert!(!sm.state().tooltip_visible);
    }

    #[test]
    fn test_close_while_fullscreen_drops_fullscreen() {
        let mut sm = machine();
        sm.toggle_widget();
        assert!(sm.toggle_fullscreen());
        assert_eq!(sm.state().to_string(), "Open.Connect (fullscreen)");

        sm.toggle_widget();
        assert!(!sm.state().is_open);
        assert!(!sm.state().is_fullscreen);
    }

    #[test]
    fn test_close_button() {
        let mut sm = machine();
        assert!(!sm.close());
        sm.toggle_widget();
        sm.toggle_fullscreen();
        assert!(sm.close());
        assert!(!sm.state().is_open);
        assert!(!sm.state().is_fullscreen);
    }

    #[test]
    fn test_fullscreen_ignored_while_closed() {
        let mut sm = machine();
        assert!(!sm.toggle_fullscreen());
        assert!(!sm.state().is_fullscreen);
    }

    #[test]
    fn test_fullscreen_does_not_touch_screen() {
        let mut sm = on_text_screen();
        sm.toggle_fullscreen();
        assert_eq!(sm.state().active_screen, Screen::Text);
        sm.toggle_fullscreen();
        assert!(!sm.state().is_fullscreen);
        assert_eq!(sm.state().active_screen, Screen::Text);
    }

    #[test]
    fn test_fullscreen_only_while_open_for_any_sequence() {
        // Exhaustively drive all sequences of three ops up to length 6.
        #[derive(Clone, Copy)]
        enum Op {
            Toggle,
            Fullscreen,
            Close,
        }
        let ops = [Op::Toggle, Op::Fullscreen, Op::Close];
        for len in 1..=6u32 {
            for code in 0..3usize.pow(len) {
                let mut sm = machine();
                let mut c = code;
                for _ in 0..len {
                    match ops[c % 3] {
                        Op::Toggle => sm.toggle_widget(),
                        Op::Fullscreen => {
                            sm.toggle_fullscreen();
                        }
                        Op::Close => {
                            sm.close();
                        }
                    }
                    c /= 3;
                    let s = sm.state();
                    assert!(!s.is_fullscreen || s.is_open);
                }
            }
        }
    }

    #[test]
    fn test_select_connect_mode() {
        let mut sm = machine();
        sm.toggle_widget();
        sm.select_connect_mode(ConnectMode::Voice).unwrap();
        assert_eq!(sm.state().active_screen, Screen::Voice);

        // One-directional funnel
        assert!(sm.select_connect_mode(ConnectMode::Text).is_err());
        assert_eq!(sm.state().active_screen, Screen::Voice);
    }

    #[test]
    fn test_select_connect_mode_requires_open() {
        let mut sm = machine();
        let err = sm.select_connect_mode(ConnectMode::Text).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { .. }));
        assert_eq!(sm.state().active_screen, Screen::Connect);
    }

    #[test]
    fn test_enter_guest_mode() {
        let mut sm = on_text_screen();
        let welcome = sm.enter_guest_mode().unwrap();
        assert!(welcome.contains("guest"));
        assert_eq!(sm.state().active_screen, Screen::Chat);
        assert!(!sm.state().is_authenticated);
    }

    #[test]
    fn test_enter_guest_mode_from_connect_fails() {
        let mut sm = machine();
        sm.toggle_widget();
        assert!(sm.enter_guest_mode().is_err());
        assert_eq!(sm.state().active_screen, Screen::Connect);
    }

    #[test]
    fn test_submit_identity_valid() {
        let mut sm = on_text_screen();
        let welcome = sm.submit_identity("5551234567").unwrap();
        assert!(welcome.contains("5551234567"));
        let state = sm.state();
        assert!(state.is_authenticated);
        assert_eq!(state.identity.as_ref().unwrap().as_str(), "5551234567");
        assert_eq!(state.active_screen, Screen::Chat);
        assert!(sm.feedback().is_none());
    }

    #[test]
    fn test_submit_identity_trims_input() {
        let mut sm = on_text_screen();
        sm.submit_identity("  5551234567 ").unwrap();
        assert_eq!(sm.state().identity.as_ref().unwrap().as_str(), "5551234567");
    }

    #[test]
    fn test_submit_identity_invalid_leaves_state() {
        for bad in ["123", "", "555123456", "55512345678", "555-123-456", "55512345a7", "５５５１２３４５６７"] {
            let mut sm = on_text_screen();
            let before = sm.state().clone();
            let err = sm.submit_identity(bad).unwrap_err();
            assert!(matches!(err, SessionError::Validation(_)), "input {:?}", bad);
            assert_eq!(sm.state(), &before);
            assert_eq!(sm.feedback(), Some(PHONE_FEEDBACK));
        }
    }

    #[test]
    fn test_feedback_cleared_after_success() {
        let mut sm = on_text_screen();
        let _ = sm.submit_identity("12");
        assert!(sm.feedback().is_some());
        sm.submit_identity("0123456789").unwrap();
        assert!(sm.feedback().is_none());
    }

    #[test]
    fn test_submit_identity_outside_text_screen() {
        let mut sm = machine();
        sm.toggle_widget();
        let err = sm.submit_identity("5551234567").unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { .. }));
        assert!(!sm.state().is_authenticated);
    }

    #[test]
    fn test_phone_number_parse() {
        assert!(PhoneNumber::parse("0000000000").is_ok());
        assert!(PhoneNumber::parse("123").is_err());
        assert_eq!(
            PhoneNumber::parse("9876543210").unwrap().to_string(),
            "9876543210"
        );
    }

    #[test]
    fn test_events_for_funnel() {
        let events = EventBus::new(WidgetId::new());
        let mut rx = events.subscribe();
        let mut sm = SessionMachine::new(WidgetVariant::ModeChooser, events);

        sm.toggle_widget();
        sm.select_connect_mode(ConnectMode::Text).unwrap();

        assert!(matches!(
            rx.try_recv().unwrap(),
            WidgetEvent::VisibilityChanged { open: true, .. }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            WidgetEvent::ScreenChanged {
                from: Screen::Connect,
                to: Screen::Text,
                ..
            }
        ));
    }
}
