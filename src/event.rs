//! Localized event reporting.
//!
//! Every diagnostic the server produces is an [`Event`]: an identifier, a
//! severity, and a message catalog keyed by language tag whose templates use
//! `%1…%N` positional placeholders. Events that abort an API call travel to
//! the caller inside [`crate::ServerError`]; per-request anomalies are handed
//! to the [`EventSink`] configured on the server.

use std::fmt;

use tracing::{error, warn};

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Message catalog for one event: language tag → template text.
///
/// Catalogs are static data; templates reference their arguments as `%1`,
/// `%2`, … in the order the arguments were attached.
#[derive(Debug, Clone, Copy)]
pub struct EventMsg {
    entries: &'static [(&'static str, &'static str)],
}

impl EventMsg {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    /// Raw template for a language tag.
    pub fn get(&self, language: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(tag, _)| *tag == language)
            .map(|(_, template)| *template)
    }

    /// Language tags in catalog order.
    pub fn languages(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(tag, _)| *tag)
    }
}

/// Source location attached to an event. Capture with [`crate::loc!`].
#[derive(Debug, Clone, Copy)]
pub struct Location {
    pub file: &'static str,
    pub line: u32,
}

/// Capture the current source location for [`Event::at`].
#[macro_export]
macro_rules! loc {
    () => {
        $crate::event::Location {
            file: file!(),
            line: line!(),
        }
    };
}

/// A structured, localized diagnostic.
///
/// Built with the fluent methods and then either raised to the caller (via
/// [`crate::ServerError`]) or reported to an [`EventSink`].
#[derive(Debug, Clone)]
pub struct Event {
    id: &'static str,
    component: &'static str,
    severity: Severity,
    msg: EventMsg,
    args: Vec<String>,
    location: Option<Location>,
    dumps: Vec<String>,
}

impl Event {
    pub fn new(component: &'static str, id: &'static str, severity: Severity, msg: EventMsg) -> Self {
        Self {
            id,
            component,
            severity,
            msg,
            args: Vec::new(),
            location: None,
            dumps: Vec::new(),
        }
    }

    /// Attach the next positional argument.
    pub fn arg(mut self, arg: impl fmt::Display) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Attach the source location the event originates from.
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach an auxiliary dump (ordered, free-form).
    pub fn dump(mut self, dump: impl Into<String>) -> Self {
        self.dumps.push(dump.into());
        self
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn dumps(&self) -> &[String] {
        &self.dumps
    }

    /// Resolved message for one language tag.
    pub fn message(&self, language: &str) -> Option<String> {
        self.msg
            .get(language)
            .map(|template| substitute(template, &self.args))
    }

    /// Resolved messages for every language in the catalog, in catalog
    /// order. Substitution is applied to each entry in lockstep.
    pub fn messages(&self) -> Vec<(&'static str, String)> {
        self.msg
            .languages()
            .map(|tag| (tag, self.message(tag).unwrap_or_default()))
            .collect()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolved = self
            .message("en-US")
            .or_else(|| self.msg.languages().next().and_then(|tag| self.message(tag)));
        match resolved {
            Some(message) => write!(f, "{}::{}: {}", self.component, self.id, message),
            None => write!(f, "{}::{}", self.component, self.id),
        }
    }
}

impl std::error::Error for Event {}

/// Replace `%1…%N` with the positional arguments. Higher indices are
/// substituted first so `%1` cannot swallow the prefix of `%10`.
fn substitute(template: &str, args: &[String]) -> String {
    let mut out = template.to_string();
    for (index, arg) in args.iter().enumerate().rev() {
        out = out.replace(&format!("%{}", index + 1), arg);
    }
    out
}

/// Receiver for events the server logs instead of raising.
pub trait EventSink: Send + Sync {
    fn report(&self, event: &Event);
}

/// Default sink: forwards events to `tracing` at a level matching the
/// severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn report(&self, event: &Event) {
        let message = event
            .message("en-US")
            .unwrap_or_else(|| event.to_string());
        let file = event.location().map(|l| l.file).unwrap_or("");
        let line = event.location().map(|l| l.line).unwrap_or(0);
        match event.severity() {
            Severity::Warning => warn!(
                id = event.id(),
                component = event.component(),
                file,
                line,
                "{message}"
            ),
            Severity::Error => error!(
                id = event.id(),
                component = event.component(),
                file,
                line,
                "{message}"
            ),
        }
    }
}
