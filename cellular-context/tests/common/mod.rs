#![allow(dead_code)]

use mockall::mock;
use orb_cellular_context::{
    at::{self, AtCommand, AtSession, Response, SharedSession},
    base::{BaseContext, DataCall, Readiness},
    device::PropertyTable,
    pdp::PdpContext,
    AtError, CinterionContext, ContextOptions, Error,
};
use secrecy::SecretString;

/// Modem that reports a fixed `+CGDCONT?` list, answers `OK` to everything else
/// and `ERROR` to commands starting with one of the `failing` prefixes.
#[derive(Debug, Default)]
pub struct ScriptedModem {
    contexts: Vec<String>,
    failing: Vec<String>,
    pub sent: Vec<String>,
}

impl ScriptedModem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(mut self, cid: u32, pdp_type: &str, apn: &str) -> Self {
        self.contexts
            .push(format!(r#"+CGDCONT: {cid},"{pdp_type}","{apn}","0.0.0.0",0,0"#));
        self
    }

    /// Adds a raw `+CGDCONT:` line.
    pub fn line(mut self, line: &str) -> Self {
        self.contexts.push(line.to_owned());
        self
    }

    pub fn failing(mut self, prefix: &str) -> Self {
        self.failing.push(prefix.to_owned());
        self
    }
}

impl AtSession for ScriptedModem {
    fn send(&mut self, command: &AtCommand) -> Result<Response, AtError> {
        let wire = command.to_string();
        self.sent.push(wire.clone());

        if self.failing.iter().any(|prefix| wire.starts_with(prefix)) {
            Err(AtError::Error)
        } else if wire == "AT+CGDCONT?" {
            Ok(Response::new(self.contexts.iter().cloned()))
        } else {
            Ok(Response::default())
        }
    }
}

mock! {
    pub Session {}
    impl AtSession for Session {
        fn send(&mut self, command: &AtCommand) -> Result<Response, AtError>;
    }
}

mock! {
    pub Base {}
    impl BaseContext for Base {
        fn set_device_ready(
            &mut self,
            sim_pin: Option<SecretString>,
        ) -> Result<Readiness, Error>;
        fn connect(&mut self, context: &PdpContext) -> Result<DataCall, Error>;
    }
}

/// Base whose readiness and activation always succeed.
pub fn ready_base() -> MockBase {
    let mut base = MockBase::new();
    base.expect_set_device_ready()
        .returning(|_| Ok(Readiness::AlreadyReady));
    base.expect_connect().returning(|_| Ok(DataCall::default()));
    base
}

pub type Manager<S> = CinterionContext<S, PropertyTable, MockBase>;

pub fn manager(
    modem: ScriptedModem,
    device: PropertyTable,
    base: MockBase,
    options: ContextOptions,
) -> (SharedSession<ScriptedModem>, Manager<ScriptedModem>) {
    let session = at::shared(modem);
    let context = CinterionContext::new(session.clone(), device, base, options);
    (session, context)
}

pub fn sent(session: &SharedSession<ScriptedModem>) -> Vec<String> {
    session
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .sent
        .clone()
}

pub fn secret(value: &str) -> Option<SecretString> {
    Some(SecretString::new(value.to_owned()))
}
