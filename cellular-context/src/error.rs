use std::{io, time::Duration};
use thiserror::Error;

/// Errors surfaced by the PDP context manager and its collaborators.
#[derive(Error, Debug)]
pub enum Error {
    #[error("operation not supported by the modem")]
    Unsupported,

    #[error("modem rejected the user authentication")]
    AuthFailure,

    #[error("device error: no usable PDP context (last tried cid {cid:?})")]
    NoContext { cid: Option<u32> },

    #[error("SIM asks for a PIN but none was configured")]
    SimPinRequired,

    #[error("SIM is in unexpected state `{0}`")]
    SimState(String),

    #[error("modem did not register to the network after {attempts} attempts")]
    NotRegistered { attempts: u32 },

    #[error(transparent)]
    At(#[from] AtError),
}

/// Errors coming from the AT command transport.
#[derive(Error, Debug)]
pub enum AtError {
    #[error("modem answered ERROR")]
    Error,

    #[error("modem answered +CME ERROR: {0}")]
    Cme(u16),

    #[error("modem answered +CMS ERROR: {0}")]
    Cms(u16),

    #[error("no final result code within {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("serial port i/o failed")]
    Io(#[from] io::Error),

    #[error("failed to open serial port")]
    Open(#[from] serialport::Error),
}
