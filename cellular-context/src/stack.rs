//! Seam towards the modem's internal IP socket stack.
//!
//! The stack itself lives elsewhere; the context manager only decides when one may
//! be handed out and with which parameters it is built.

use std::sync::Arc;

use secrecy::SecretString;

use crate::{
    error::Error,
    pdp::{ContextId, PdpType},
};

pub trait SocketStack: Send + Sync {
    /// Brings the stack up on the modem. A stack that fails here is discarded.
    fn socket_stack_init(&mut self) -> Result<(), Error>;
}

/// Everything a stack needs to bind to the negotiated context.
#[derive(Debug, Clone)]
pub struct StackParams {
    pub apn: Option<String>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub cid: ContextId,
    pub ip_stack: PdpType,
}

/// Builds stacks for a context manager. Implementations typically capture the same
/// [`SharedSession`](crate::at::SharedSession) the manager uses.
pub trait StackFactory: Send {
    fn create(&self, params: StackParams) -> Box<dyn SocketStack>;
}

impl<F> StackFactory for F
where
    F: Fn(StackParams) -> Box<dyn SocketStack> + Send,
{
    fn create(&self, params: StackParams) -> Box<dyn SocketStack> {
        self(params)
    }
}

/// Shared handle to an initialized stack.
pub type StackHandle = Arc<dyn SocketStack>;
