use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::domain::form::SubmitError;
use crate::domain::{Field, FormState, Greeting, GreetingFilter, Submission};
use crate::infrastructure::runtime::RuntimeEvent;

/// What keyboard input currently goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Field(Field),
    Submit,
}

impl Focus {
    pub const ORDER: [Focus; 4] = [
        Focus::Field(Field::Name),
        Focus::Field(Field::Age),
        Focus::Field(Field::Address),
        Focus::Submit,
    ];

    fn position(&self) -> usize {
        Self::ORDER
            .iter()
            .position(|candidate| candidate == self)
            .unwrap_or(0)
    }

    pub fn next(&self) -> Focus {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn prev(&self) -> Focus {
        let len = Self::ORDER.len();
        Self::ORDER[(self.position() + len - 1) % len]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
    pub since: Instant,
}

/// Connection state of the greeting listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerStatus {
    Connecting,
    Listening { node_kind: String },
    Reconnecting { attempt: u32, delay: Duration },
    Stopped,
}

impl ListenerStatus {
    pub fn label(&self) -> String {
        match self {
            ListenerStatus::Connecting => "connecting…".to_string(),
            ListenerStatus::Listening { node_kind, .. } => format!("listening ({node_kind})"),
            ListenerStatus::Reconnecting { attempt, delay } => {
                format!("retry #{attempt} in {:.1}s", delay.as_secs_f64())
            }
            ListenerStatus::Stopped => "stopped".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct App {
    pub form: FormState,
    pub focus: Focus,
    /// Latest decoded greeting, `"<text> on Block #<n>"`, or empty
    pub latest_greeting: String,
    pub greeting_count: u64,
    pub last_greeting_at: Option<DateTime<Local>>,
    pub last_submission: Option<Submission>,
    pub listener: ListenerStatus,
    pub rpc_endpoint: String,
    pub filter: GreetingFilter,
    pub head_block: Option<u64>,
    pub status: Option<StatusMessage>,
    pub help_open: bool,
    pub should_quit: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            form: FormState::new(),
            focus: Focus::Field(Field::Name),
            latest_greeting: String::new(),
            greeting_count: 0,
            last_greeting_at: None,
            last_submission: None,
            listener: ListenerStatus::Connecting,
            rpc_endpoint: "http://localhost:8545".to_string(),
            filter: GreetingFilter::default(),
            head_block: None,
            status: None,
            help_open: false,
            should_quit: false,
        }
    }

    pub fn set_status(&mut self, text: impl Into<String>, level: StatusLevel) {
        self.status = Some(StatusMessage {
            text: text.into(),
            level,
            since: Instant::now(),
        });
    }

    pub fn status_text(&self) -> Option<(&str, StatusLevel)> {
        self.status
            .as_ref()
            .map(|status| (status.text.as_str(), status.level))
    }

    pub fn on_tick(&mut self) {
        if let Some(status) = self.status.as_ref() {
            // errors stay until something replaces them
            if status.level != StatusLevel::Error && status.since.elapsed() > Duration::from_secs(4)
            {
                self.status = None;
            }
        }
    }

    pub fn focused_field(&self) -> Option<Field> {
        match self.focus {
            Focus::Field(field) => Some(field),
            Focus::Submit => None,
        }
    }

    /// Move focus, blurring the field being left
    pub fn set_focus(&mut self, focus: Focus) {
        if let Focus::Field(field) = self.focus {
            if focus != self.focus {
                self.form.blur(field);
            }
        }
        self.focus = focus;
    }

    pub fn focus_next(&mut self) {
        self.set_focus(self.focus.next());
    }

    pub fn focus_prev(&mut self) {
        self.set_focus(self.focus.prev());
    }

    pub fn input_char(&mut self, c: char) {
        if let Some(field) = self.focused_field() {
            self.form.push_char(field, c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.focused_field() {
            self.form.pop_char(field);
        }
    }

    /// Enter: advance through the fields, submit on the button
    pub fn activate(&mut self) {
        match self.focus {
            Focus::Field(_) => self.focus_next(),
            Focus::Submit => self.submit(),
        }
    }

    pub fn submit(&mut self) {
        match self.form.submit() {
            Ok(submission) => {
                let compact = serde_json::to_string(&submission.values)
                    .unwrap_or_else(|_| submission.json.replace('\n', " "));
                self.set_status(format!("Submitted {compact}"), StatusLevel::Info);
                self.last_submission = Some(submission);
            }
            Err(SubmitError::Invalid(errors)) => {
                if let Some(field) = errors.fields().next() {
                    self.focus = Focus::Field(field);
                }
                self.set_status(
                    format!(
                        "Fix {} field(s) before submitting (attempt {})",
                        errors.len(),
                        self.form.submit_count()
                    ),
                    StatusLevel::Warn,
                );
            }
            Err(err @ SubmitError::Encode(_)) => {
                self.set_status(err.to_string(), StatusLevel::Error);
            }
        }
    }

    pub fn apply_runtime_event(&mut self, event: RuntimeEvent) {
        match event {
            RuntimeEvent::Connected {
                endpoint,
                node_kind,
                head,
            } => self.apply_connected(endpoint, node_kind, head),
            RuntimeEvent::Greeting(greeting) => self.apply_greeting(greeting),
            RuntimeEvent::DecodeFailed { message } => self.apply_decode_failure(message),
            RuntimeEvent::Reconnecting { attempt, delay } => {
                self.listener = ListenerStatus::Reconnecting { attempt, delay };
            }
            RuntimeEvent::Error { message } => self.apply_rpc_error(message),
        }
    }

    pub fn apply_connected(&mut self, endpoint: String, node_kind: String, head: u64) {
        self.rpc_endpoint = endpoint;
        self.head_block = Some(head);
        self.listener = ListenerStatus::Listening { node_kind };
        self.set_status("Connected", StatusLevel::Info);
    }

    /// Last write wins; no ordering beyond arrival order
    pub fn apply_greeting(&mut self, greeting: Greeting) {
        self.head_block = Some(
            self.head_block
                .map_or(greeting.block_number, |head| head.max(greeting.block_number)),
        );
        self.latest_greeting = greeting.to_string();
        self.greeting_count += 1;
        self.last_greeting_at = Some(Local::now());
    }

    pub fn apply_decode_failure(&mut self, message: String) {
        self.set_status(format!("Undecodable greeting: {message}"), StatusLevel::Warn);
    }

    pub fn apply_rpc_error(&mut self, message: String) {
        self.set_status(message, StatusLevel::Error);
    }

    pub fn mark_stopped(&mut self) {
        self.listener = ListenerStatus::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::form::FieldError;

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            app.input_char(c);
        }
    }

    fn greeting(text: &str, block_number: u64) -> Greeting {
        Greeting {
            text: text.to_string(),
            block_number,
        }
    }

    #[test]
    fn test_focus_cycles() {
        assert_eq!(Focus::Field(Field::Name).next(), Focus::Field(Field::Age));
        assert_eq!(Focus::Submit.next(), Focus::Field(Field::Name));
        assert_eq!(Focus::Field(Field::Name).prev(), Focus::Submit);
    }

    #[test]
    fn test_leaving_a_field_touches_it() {
        let mut app = App::new();
        type_str(&mut app, "A");
        assert!(app.form.visible_error(Field::Name).is_none());

        app.focus_next();
        assert_eq!(app.focus, Focus::Field(Field::Age));
        assert_eq!(
            app.form.visible_error(Field::Name),
            Some(&FieldError::TooShort(Field::Name))
        );
        assert!(!app.form.is_touched(Field::Age));
    }

    #[test]
    fn test_typing_on_submit_is_ignored() {
        let mut app = App::new();
        app.set_focus(Focus::Submit);
        type_str(&mut app, "xyz");
        app.backspace();
        for field in Field::ALL {
            assert_eq!(app.form.value(field), "");
        }
    }

    #[test]
    fn test_enter_walks_fields_then_submits() {
        let mut app = App::new();
        type_str(&mut app, "Alice Smith");
        app.activate();
        type_str(&mut app, "30");
        app.activate();
        type_str(&mut app, "221B Baker Street, London");
        app.activate();
        assert_eq!(app.focus, Focus::Submit);
        assert!(app.form.is_valid());

        app.activate();
        let submission = app.last_submission.as_ref().unwrap();
        assert_eq!(submission.values.name, "Alice Smith");
        assert_eq!(app.status_text().unwrap().1, StatusLevel::Info);
        assert_eq!(
            app.status_text().unwrap().0,
            r#"Submitted {"name":"Alice Smith","age":30,"address":"221B Baker Street, London"}"#
        );
    }

    #[test]
    fn test_blocked_submit_focuses_first_error() {
        let mut app = App::new();
        type_str(&mut app, "Alice Smith");
        app.set_focus(Focus::Submit);
        app.submit();

        assert!(app.last_submission.is_none());
        assert_eq!(app.focus, Focus::Field(Field::Age));
        assert_eq!(
            app.status_text(),
            Some(("Fix 2 field(s) before submitting (attempt 1)", StatusLevel::Warn))
        );
        assert_eq!(app.form.visible_error(Field::Address), Some(&FieldError::Required));
    }

    #[test]
    fn test_greeting_replaces_display() {
        let mut app = App::new();
        assert!(app.latest_greeting.is_empty());

        app.apply_runtime_event(RuntimeEvent::Greeting(greeting("hello", 42)));
        assert_eq!(app.latest_greeting, "hello on Block #42");

        app.apply_runtime_event(RuntimeEvent::Greeting(greeting("world", 40)));
        assert_eq!(app.latest_greeting, "world on Block #40");
        assert_eq!(app.greeting_count, 2);
        assert_eq!(app.head_block, Some(42));
    }

    #[test]
    fn test_decode_failure_keeps_display() {
        let mut app = App::new();
        app.apply_greeting(greeting("hello", 42));
        app.apply_runtime_event(RuntimeEvent::DecodeFailed {
            message: "invalid bytes32 string: no null terminator".into(),
        });
        assert_eq!(app.latest_greeting, "hello on Block #42");
        assert_eq!(app.status_text().unwrap().1, StatusLevel::Warn);
    }

    #[test]
    fn test_listener_status_transitions() {
        let mut app = App::new();
        assert_eq!(app.listener, ListenerStatus::Connecting);

        app.apply_runtime_event(RuntimeEvent::Error {
            message: "connection refused".into(),
        });
        app.apply_runtime_event(RuntimeEvent::Reconnecting {
            attempt: 1,
            delay: Duration::from_millis(500),
        });
        assert_eq!(app.listener.label(), "retry #1 in 0.5s");
        assert_eq!(app.status_text(), Some(("connection refused", StatusLevel::Error)));

        app.apply_runtime_event(RuntimeEvent::Connected {
            endpoint: "http://localhost:8545".into(),
            node_kind: "anvil".into(),
            head: 7,
        });
        assert_eq!(app.listener.label(), "listening (anvil)");
        assert_eq!(app.head_block, Some(7));
    }

    #[test]
    fn test_error_status_survives_ticks() {
        let mut app = App::new();
        app.apply_rpc_error("boom".into());
        if let Some(status) = app.status.as_mut() {
            status.since = Instant::now() - Duration::from_secs(5);
        }
        app.on_tick();
        assert!(app.status.is_some());

        app.set_status("hi", StatusLevel::Info);
        if let Some(status) = app.status.as_mut() {
            status.since = Instant::now() - Duration::from_secs(5);
        }
        app.on_tick();
        assert!(app.status.is_none());
    }
}
