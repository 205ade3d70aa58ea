//! Generic (vendor independent) part of bringing a cellular data call up.

use std::{thread, time::Duration};

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::{
    at::{lock, AtCommand, AtSession, SharedSession},
    error::Error,
    pdp::{PdpContext, PdpType},
};

/// Outcome of a successful readiness request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The device had to be brought up (SIM unlocked, registration awaited).
    Ready,
    /// Nothing had to be done.
    AlreadyReady,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataCall {
    /// The data goes over the control plane (CIoT optimisation) instead of an IP
    /// bearer.
    pub control_plane: bool,
    /// The context was already active before `connect`.
    pub already_active: bool,
}

/// Steps of the connect sequence that are not specific to a modem vendor.
pub trait BaseContext {
    /// Unlocks the SIM and waits until the modem is attached to the network.
    fn set_device_ready(
        &mut self,
        sim_pin: Option<SecretString>,
    ) -> Result<Readiness, Error>;

    /// Activates the data call on an already defined and configured context.
    fn connect(&mut self, context: &PdpContext) -> Result<DataCall, Error>;
}

/// How long to wait for network registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            attempts: 30,
            interval: Duration::from_secs(2),
        }
    }
}

/// 3GPP TS 27.007 implementation of [`BaseContext`] over a shared AT session.
pub struct AtBaseContext<S> {
    at: SharedSession<S>,
    registration: RegistrationPolicy,
}

impl<S: AtSession> AtBaseContext<S> {
    pub fn new(at: SharedSession<S>, registration: RegistrationPolicy) -> Self {
        Self { at, registration }
    }

    /// Returns whether the SIM was already unlocked.
    fn unlock_sim(&self, sim_pin: Option<SecretString>) -> Result<bool, Error> {
        let mut at = lock(&self.at);
        let response = at.send(&AtCommand::read("+CPIN"))?;
        let state = response
            .info("+CPIN:")
            .next()
            .map(|mut line| line.read_string(16))
            .unwrap_or_default();

        match state.as_str() {
            "READY" => Ok(true),
            "SIM PIN" => {
                let pin = sim_pin.ok_or(Error::SimPinRequired)?;
                at.send(&AtCommand::set("+CPIN").string(pin.expose_secret().as_str()))?;
                info!("SIM unlocked");
                Ok(false)
            }
            other => Err(Error::SimState(other.to_owned())),
        }
    }

    fn is_registered(&self) -> Result<bool, Error> {
        let response = lock(&self.at).send(&AtCommand::read("+CEREG"))?;
        let stat = response.info("+CEREG:").next().and_then(|mut line| {
            let _mode = line.read_int();
            line.read_int()
        });
        debug!(?stat, "EPS registration status");

        // 1: registered home network, 5: registered roaming
        Ok(matches!(stat, Some(1) | Some(5)))
    }

    /// Returns the number of polls it took to see the modem registered.
    fn wait_registration(&self) -> Result<u32, Error> {
        let RegistrationPolicy { attempts, interval } = self.registration;
        for attempt in 1..=attempts {
            if self.is_registered()? {
                return Ok(attempt);
            }
            if attempt < attempts {
                thread::sleep(interval);
            }
        }
        warn!(attempts, "modem did not register");

        Err(Error::NotRegistered { attempts })
    }
}

impl<S: AtSession> BaseContext for AtBaseContext<S> {
    fn set_device_ready(
        &mut self,
        sim_pin: Option<SecretString>,
    ) -> Result<Readiness, Error> {
        let sim_was_ready = self.unlock_sim(sim_pin)?;
        let polls = self.wait_registration()?;

        if sim_was_ready && polls == 1 {
            Ok(Readiness::AlreadyReady)
        } else {
            Ok(Readiness::Ready)
        }
    }

    fn connect(&mut self, context: &PdpContext) -> Result<DataCall, Error> {
        let cid = i64::from(context.cid.get());
        let mut at = lock(&self.at);
        let response = at.send(&AtCommand::read("+CGACT"))?;
        let already_active = response.info("+CGACT:").any(|mut line| {
            let line_cid = line.read_int();
            let state = line.read_int();
            line_cid == Some(cid) && state == Some(1)
        });

        if already_active {
            debug!(cid, "PDP context already active");
        } else {
            at.send(&AtCommand::set("+CGACT").int(1).int(cid))?;
            info!(cid, pdp_type = %context.pdp_type, "PDP context activated");
        }

        Ok(DataCall {
            control_plane: context.pdp_type == PdpType::NonIp,
            already_active,
        })
    }
}
