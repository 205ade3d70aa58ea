//! Line oriented [`AtSession`] over a serial port.

use std::{
    io::{self, Read, Write},
    thread,
    time::{Duration, Instant},
};

use serialport::SerialPort;
use tracing::{debug, trace};

use crate::{
    at::{AtCommand, AtSession, Response},
    error::AtError,
};

/// How long a single read may block before the deadline is checked again.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct SerialAtSession<P = Box<dyn SerialPort>> {
    port: P,
    timeout: Duration,
    pending: Vec<u8>,
}

impl SerialAtSession {
    /// Opens `path` and waits up to `timeout` for the final result code of each
    /// command.
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self, AtError> {
        let port = serialport::new(path, baud_rate)
            .timeout(POLL_INTERVAL)
            .open()?;
        debug!(path, baud_rate, "opened modem serial port");

        Ok(Self::new(port, timeout))
    }
}

impl<P: Read + Write> SerialAtSession<P> {
    pub fn new(port: P, timeout: Duration) -> Self {
        Self {
            port,
            timeout,
            pending: Vec::new(),
        }
    }

    fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=end).collect();

        Some(String::from_utf8_lossy(&raw).trim().to_owned())
    }
}

impl<P: Read + Write> AtSession for SerialAtSession<P> {
    fn send(&mut self, command: &AtCommand) -> Result<Response, AtError> {
        // Arguments may carry credentials, only the name is logged.
        debug!(command = command.name(), kind = ?command.kind(), "sending AT command");
        let wire = command.to_string();
        self.pending.clear();
        self.port.write_all(format!("{wire}\r\n").as_bytes())?;
        self.port.flush()?;

        let deadline = Instant::now() + self.timeout;
        let mut lines = Vec::new();
        let mut buf = [0u8; 256];
        loop {
            while let Some(line) = self.next_line() {
                if line.is_empty() || line == wire {
                    continue;
                }
                if let Some(result) = final_result(&line) {
                    trace!(
                        command = command.name(),
                        lines = lines.len(),
                        %line,
                        "final result"
                    );
                    return result.map(|()| Response::new(lines));
                }
                lines.push(line);
            }

            if Instant::now() >= deadline {
                return Err(AtError::Timeout(self.timeout));
            }
            match self.port.read(&mut buf) {
                Ok(0) => thread::sleep(POLL_INTERVAL),
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// `None` for anything that is not a final result code.
fn final_result(line: &str) -> Option<Result<(), AtError>> {
    let code = |rest: &str| {
        rest.trim()
            .parse::<u16>()
            .map_err(|_| AtError::Malformed(line.to_owned()))
    };

    if line == "OK" {
        Some(Ok(()))
    } else if line == "ERROR" {
        Some(Err(AtError::Error))
    } else if let Some(rest) = line.strip_prefix("+CME ERROR:") {
        Some(Err(code(rest).map_or_else(|err| err, AtError::Cme)))
    } else if let Some(rest) = line.strip_prefix("+CMS ERROR:") {
        Some(Err(code(rest).map_or_else(|err| err, AtError::Cms)))
    } else {
        None
    }
}
