//! AT command model shared by the context manager and its transports.
//!
//! Commands are plain values so they can be logged, compared in tests and
//! rendered to the wire form in one place. Responses keep only the information
//! lines of an exchange; the final result code is turned into `Ok`/`Err` by the
//! transport.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::error::AtError;

/// A session shared between the context manager and anything else talking to the
/// same modem. Holding the guard is what keeps command/response exchanges from
/// interleaving.
pub type SharedSession<S> = Arc<Mutex<S>>;

pub fn shared<S>(session: S) -> SharedSession<S> {
    Arc::new(Mutex::new(session))
}

pub(crate) fn lock<S>(session: &Mutex<S>) -> MutexGuard<'_, S> {
    // A panic while holding the lock cannot leave a half-sent command behind: every
    // exchange is completed (or failed) inside `send`.
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Blocking request/response access to a modem.
pub trait AtSession {
    /// Sends `command` and waits for its final result code.
    ///
    /// Returns the information lines on `OK`. Error result codes, timeouts and
    /// transport failures are reported as [`AtError`].
    fn send(&mut self, command: &AtCommand) -> Result<Response, AtError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `AT<name>?`
    Read,
    /// `AT<name>=<args>`
    Set,
    /// `AT<name>`
    Execute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AtArg {
    Int(i64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtCommand {
    name: String,
    kind: CommandKind,
    args: Vec<AtArg>,
}

impl AtCommand {
    pub fn read(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Read)
    }

    pub fn set(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Set)
    }

    pub fn execute(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Execute)
    }

    fn new(name: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            name: name.into(),
            kind,
            args: Vec::new(),
        }
    }

    pub fn int(mut self, value: impl Into<i64>) -> Self {
        self.args.push(AtArg::Int(value.into()));
        self
    }

    pub fn string(mut self, value: impl Into<String>) -> Self {
        self.args.push(AtArg::Str(value.into()));
        self
    }

    /// Appends a string argument only when present. Only meaningful for trailing
    /// parameters, a missing value in the middle would shift the ones after it.
    pub fn opt_string(self, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.string(value),
            None => self,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }
}

impl fmt::Display for AtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AT{}", self.name)?;
        match self.kind {
            CommandKind::Read => return f.write_str("?"),
            CommandKind::Set => f.write_str("=")?,
            CommandKind::Execute if self.args.is_empty() => return Ok(()),
            CommandKind::Execute => {}
        }
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match arg {
                AtArg::Int(value) => write!(f, "{value}")?,
                AtArg::Str(value) => write!(f, "\"{value}\"")?,
            }
        }

        Ok(())
    }
}

/// Information lines of a successfully completed exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    lines: Vec<String>,
}

impl Response {
    pub fn new<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Iterates over the lines starting with `prefix` (e.g. `+CGDCONT:`), with the
    /// prefix already consumed.
    pub fn info<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = InfoLine<'a>> + 'a {
        self.lines
            .iter()
            .filter_map(move |line| line.trim().strip_prefix(prefix))
            .map(InfoLine::new)
    }
}

/// Sequential reader over the comma separated parameters of one information line.
#[derive(Debug, Clone)]
pub struct InfoLine<'a> {
    rest: Option<&'a str>,
}

impl<'a> InfoLine<'a> {
    pub fn new(params: &'a str) -> Self {
        Self { rest: Some(params) }
    }

    /// Next parameter as an integer. `None` when the line is exhausted or the
    /// parameter is not a number; the parameter is consumed either way.
    pub fn read_int(&mut self) -> Option<i64> {
        self.next_field()?.parse().ok()
    }

    /// Next parameter as a string, unquoted and truncated to `max_len` characters.
    /// Empty when the line is exhausted.
    pub fn read_string(&mut self, max_len: usize) -> String {
        self.next_field()
            .map(|field| field.chars().take(max_len).collect())
            .unwrap_or_default()
    }

    fn next_field(&mut self) -> Option<&'a str> {
        let rest = self.rest?.trim_start();
        if let Some(quoted) = rest.strip_prefix('"') {
            let Some(end) = quoted.find('"') else {
                self.rest = None;
                return Some(quoted);
            };
            let after = &quoted[end + 1..];
            self.rest = after.find(',').map(|comma| &after[comma + 1..]);
            return Some(&quoted[..end]);
        }

        match rest.find(',') {
            Some(comma) => {
                self.rest = Some(&rest[comma + 1..]);
                Some(rest[..comma].trim_end())
            }
            None => {
                self.rest = None;
                Some(rest.trim_end())
            }
        }
    }
}
