//! PDP context management for Cinterion cellular modems.
//!
//! [`CinterionContext`] drives an [`AtSession`](at::AtSession) through the
//! connect sequence: device readiness, context discovery or creation, user
//! authentication, radio access technology and finally context activation.

pub mod at;
pub mod base;
pub mod context;
pub mod device;
pub mod error;
pub mod pdp;
pub mod serial;
pub mod settings;
#[cfg(not(feature = "ppp"))]
pub mod stack;

pub use context::{CinterionContext, ContextOptions};
pub use error::{AtError, Error};
