//! PDP context handling for Cinterion (ex Gemalto) modems.
//!
//! The manager picks a context the modem already knows about (`+CGDCONT?`), or
//! defines a new one, then sets up authentication and the radio access technology
//! before handing the activation over to the [`BaseContext`].

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, warn};

#[cfg(not(feature = "ppp"))]
use crate::stack::{StackFactory, StackHandle, StackParams};
use crate::{
    at::{lock, AtCommand, AtSession, SharedSession},
    base::{BaseContext, DataCall},
    device::{CellularDevice, Property},
    error::Error,
    pdp::{
        AuthenticationType, ContextId, PdpContext, PdpType, RadioAccessTechnology,
        MAX_ACCESSPOINT_NAME_LENGTH, MAX_PDP_TYPE_LENGTH,
    },
};

/// LTE band 20 (800 MHz), the usual NB-IoT band in Europe.
pub const DEFAULT_BAND: u32 = 0x0008_0000;

/// Connection preferences that do not change between `connect` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    pub authentication: AuthenticationType,
    pub rat: RadioAccessTechnology,
    pub band: u32,
    /// Ask for the control plane (CIoT) data path.
    pub control_plane: bool,
    /// Ask for a non-IP context.
    pub non_ip: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            authentication: AuthenticationType::default(),
            rat: RadioAccessTechnology::default(),
            band: DEFAULT_BAND,
            control_plane: false,
            non_ip: false,
        }
    }
}

pub struct CinterionContext<S, D, B> {
    at: SharedSession<S>,
    device: D,
    base: B,

    apn: Option<String>,
    username: Option<String>,
    password: Option<SecretString>,
    sim_pin: Option<SecretString>,
    auth_type: AuthenticationType,
    rat: RadioAccessTechnology,
    band: u32,
    cp_req: bool,
    nonip_req: bool,
    cp_in_use: bool,

    cid: Option<ContextId>,
    pdp_type: Option<PdpType>,
    /// Highest cid of the wanted APN seen by the last discovery.
    max_cid: u32,
    /// APN of the selected context, kept when the caller did not configure one.
    found_apn: Option<String>,

    #[cfg(not(feature = "ppp"))]
    stack_factory: Option<Box<dyn StackFactory>>,
    #[cfg(not(feature = "ppp"))]
    stack: Option<StackHandle>,
}

impl<S, D, B> CinterionContext<S, D, B>
where
    S: AtSession,
    D: CellularDevice,
    B: BaseContext,
{
    pub fn new(
        at: SharedSession<S>,
        device: D,
        base: B,
        options: ContextOptions,
    ) -> Self {
        Self {
            at,
            device,
            base,
            apn: None,
            username: None,
            password: None,
            sim_pin: None,
            auth_type: options.authentication,
            rat: options.rat,
            band: options.band,
            cp_req: options.control_plane,
            nonip_req: options.non_ip,
            cp_in_use: false,
            cid: None,
            pdp_type: None,
            max_cid: 0,
            found_apn: None,
            #[cfg(not(feature = "ppp"))]
            stack_factory: None,
            #[cfg(not(feature = "ppp"))]
            stack: None,
        }
    }

    /// Lets [`get_stack`](Self::get_stack) hand out socket stacks built by `factory`.
    #[cfg(not(feature = "ppp"))]
    pub fn with_stack_factory(mut self, factory: impl StackFactory + 'static) -> Self {
        self.stack_factory = Some(Box::new(factory));
        self
    }

    /// Brings the data connection up.
    ///
    /// Empty strings are treated like absent values. Every step aborts the
    /// sequence on failure and its error is returned as is, except that a context
    /// that can be neither found nor created is reported as [`Error::NoContext`].
    pub fn connect(
        &mut self,
        sim_pin: Option<SecretString>,
        apn: Option<&str>,
        username: Option<&str>,
        password: Option<SecretString>,
    ) -> Result<DataCall, Error> {
        self.sim_pin = non_empty_secret(sim_pin);
        self.set_credentials(apn, username, password);
        self.cp_in_use = false;
        #[cfg(not(feature = "ppp"))]
        {
            self.stack = None;
        }
        info!(apn = ?self.apn, rat = %self.rat, "connecting");

        let readiness = self
            .base
            .set_device_ready(self.sim_pin.clone())
            .inspect_err(|err| error!(%err, "failed to set the device ready"))?;
        debug!(?readiness, "device ready");

        let found = self
            .find_context()
            .inspect_err(|err| error!(%err, "failed to list PDP contexts"))?;
        if !found {
            let cid = next_cid(self.max_cid);
            if !self.set_new_context(cid) {
                error!(%cid, "no PDP context found and none could be created");
                return Err(Error::NoContext {
                    cid: Some(cid.get()),
                });
            }
        }

        self.do_user_authentication()
            .inspect_err(|err| error!(%err, "failure during user authentication"))?;

        self.enable_access_technology()
            .inspect_err(|err| error!(%err, "failure enabling access technology"))?;

        let context = self.context().ok_or(Error::NoContext { cid: None })?;
        let call = self.base.connect(&context)?;
        self.cp_in_use = call.control_plane;
        info!(
            cid = %context.cid,
            pdp_type = %context.pdp_type,
            control_plane = call.control_plane,
            "connected"
        );

        Ok(call)
    }

    /// APN filter and credentials used by discovery, creation and authentication.
    /// Empty strings are treated like absent values.
    pub fn set_credentials(
        &mut self,
        apn: Option<&str>,
        username: Option<&str>,
        password: Option<SecretString>,
    ) {
        self.apn = non_empty(apn);
        self.username = non_empty(username);
        self.password = non_empty_secret(password);
        self.found_apn = None;
    }

    /// Looks for a usable context among the ones defined in the modem and
    /// defines a new one if there is none. Returns whether a context is selected.
    ///
    /// Nothing is defined when the modem cannot list its contexts, an existing
    /// definition could be overwritten otherwise.
    pub fn get_context(&mut self) -> bool {
        self.find_context().unwrap_or_else(|err| {
            warn!(%err, "failed to list PDP contexts");
            false
        })
    }

    fn find_context(&mut self) -> Result<bool, Error> {
        let at = Arc::clone(&self.at);
        let mut session = lock(&at);
        self.discover(&mut *session)
    }

    fn discover(&mut self, at: &mut S) -> Result<bool, Error> {
        self.cid = None;
        self.pdp_type = None;
        self.max_cid = 0;

        let response = at.send(&AtCommand::read("+CGDCONT"))?;

        let mut cid_max = 0;
        let mut selected = None;
        for mut line in response.info("+CGDCONT:") {
            let Some(cid) = line.read_int().and_then(|cid| u32::try_from(cid).ok())
            else {
                continue;
            };
            cid_max = cid_max.max(cid);

            let pdp_type = line.read_string(MAX_PDP_TYPE_LENGTH);
            if pdp_type.is_empty() {
                cid_max = 0;
                continue;
            }
            let apn = line.read_string(MAX_ACCESSPOINT_NAME_LENGTH);
            // the next cid only follows contexts of the wanted APN
            if self.apn.as_deref().is_some_and(|wanted| wanted != apn) {
                cid_max = 0;
                continue;
            }

            let Some(pdp_type) = PdpType::from_modem_str(&pdp_type) else {
                debug!(cid, %pdp_type, "ignoring unknown PDP type");
                continue;
            };
            debug!(cid, %apn, %pdp_type, "APN matched");
            if self.accepts(pdp_type) {
                selected = Some((ContextId(cid), pdp_type, apn));
            }
        }
        self.max_cid = cid_max;

        match selected {
            Some((cid, pdp_type, apn)) => {
                self.cid = Some(cid);
                self.pdp_type = Some(pdp_type);
                if self.apn.is_none() && !apn.is_empty() {
                    self.found_apn = Some(apn);
                }
            }
            None => {
                if !self.create_context(at, next_cid(cid_max)) {
                    return Ok(false);
                }
            }
        }
        info!(cid = ?self.cid.map(ContextId::get), "found PDP context");

        Ok(true)
    }

    /// Exact type support, or dual stack on a device with both IP stacks as long as
    /// non-IP was not asked for.
    fn accepts(&self, pdp_type: PdpType) -> bool {
        self.device.property(pdp_type.property())
            || (pdp_type == PdpType::Ipv4v6
                && self.device.property(Property::Ipv4PdpType)
                && self.device.property(Property::Ipv6PdpType)
                && !self.nonip_req)
    }

    /// Defines context `cid` in the modem with the best PDP type the device
    /// supports. Returns whether the modem accepted it.
    pub fn set_new_context(&mut self, cid: ContextId) -> bool {
        let at = Arc::clone(&self.at);
        let mut session = lock(&at);
        self.create_context(&mut *session, cid)
    }

    fn create_context(&mut self, at: &mut S, cid: ContextId) -> bool {
        let Some(pdp_type) = self.new_context_type() else {
            error!(%cid, "device supports no PDP type");
            return false;
        };

        let command = AtCommand::set("+CGDCONT")
            .int(cid.get())
            .string(pdp_type.as_modem_str())
            .opt_string(self.apn.as_deref());
        match at.send(&command) {
            Ok(_) => {
                self.cid = Some(cid);
                self.pdp_type = Some(pdp_type);
                info!(%cid, %pdp_type, apn = ?self.apn, "new PDP context created");
                true
            }
            Err(err) => {
                error!(%cid, %pdp_type, %err, "failed to create PDP context");
                false
            }
        }
    }

    fn new_context_type(&self) -> Option<PdpType> {
        let has = |property| self.device.property(property);

        if self.nonip_req && self.cp_req && has(Property::NonIpPdpType) {
            Some(PdpType::NonIp)
        } else if has(Property::Ipv4v6PdpType)
            || (has(Property::Ipv4PdpType) && has(Property::Ipv6PdpType))
        {
            Some(PdpType::Ipv4v6)
        } else if has(Property::Ipv6PdpType) {
            Some(PdpType::Ipv6)
        } else if has(Property::Ipv4PdpType) {
            Some(PdpType::Ipv4)
        } else {
            None
        }
    }

    /// Sends the credentials with `^SGAUTH` when both a username and a password
    /// are set; a no-op otherwise.
    pub fn do_user_authentication(&mut self) -> Result<(), Error> {
        let (Some(username), Some(password)) =
            (self.username.as_deref(), self.password.as_ref())
        else {
            info!("no username or password, skipping authentication");
            return Ok(());
        };
        if !self.device.property(Property::AtAuthentication) {
            return Err(Error::Unsupported);
        }
        let cid = self.cid.ok_or(Error::NoContext { cid: None })?;

        let command = AtCommand::set("^SGAUTH")
            .int(cid.get())
            .int(self.auth_type.value())
            .string(username)
            .string(password.expose_secret().as_str());
        lock(&self.at).send(&command).map_err(|err| {
            warn!(%cid, %err, "^SGAUTH rejected");
            Error::AuthFailure
        })?;
        debug!(%cid, auth_type = ?self.auth_type, "user authenticated");

        Ok(())
    }

    /// Configures the band mask of the selected technology, selects it and enables
    /// the TCP URCs. Stops at the first command the modem rejects.
    pub fn enable_access_technology(&mut self) -> Result<(), Error> {
        let mut at = lock(&self.at);

        if let Some(key) = self.rat.band_key() {
            at.send(
                &AtCommand::set("^SCFG")
                    .string(key)
                    .string(format!("{:08X}", self.band)),
            )?;
        }
        at.send(&AtCommand::set("^SXRAT").int(self.rat.value()))?;
        at.send(&AtCommand::set("^SCFG").string("Tcp/withURCs").string("on"))?;
        debug!(
            rat = %self.rat,
            band = format_args!("{:08X}", self.band),
            "access technology enabled"
        );

        Ok(())
    }

    /// Socket stack bound to the selected context, built on first use.
    ///
    /// Non-IP and control plane connections carry no sockets, and a stack whose
    /// initialization fails is dropped, so both yield `None`.
    #[cfg(not(feature = "ppp"))]
    pub fn get_stack(&mut self) -> Option<StackHandle> {
        if self.pdp_type == Some(PdpType::NonIp) || self.cp_in_use {
            error!("no socket stack for a non-IP context, use the control plane instead");
            return None;
        }
        if let Some(stack) = &self.stack {
            return Some(Arc::clone(stack));
        }

        let factory = self.stack_factory.as_ref()?;
        let (Some(cid), Some(ip_stack)) = (self.cid, self.pdp_type) else {
            warn!("no PDP context selected, cannot build a socket stack");
            return None;
        };
        let mut stack = factory.create(StackParams {
            apn: self.apn().map(str::to_owned),
            username: self.username.clone(),
            password: self.password.clone(),
            cid,
            ip_stack,
        });
        if let Err(err) = stack.socket_stack_init() {
            error!(%err, "socket stack initialization failed");
            return None;
        }
        let stack = StackHandle::from(stack);
        self.stack = Some(Arc::clone(&stack));

        Some(stack)
    }

    /// The selected context, if any.
    pub fn context(&self) -> Option<PdpContext> {
        Some(PdpContext {
            cid: self.cid?,
            pdp_type: self.pdp_type?,
            apn: self.apn().map(str::to_owned),
        })
    }

    /// Configured APN, or the one of the selected context when none was configured.
    pub fn apn(&self) -> Option<&str> {
        self.apn.as_deref().or(self.found_apn.as_deref())
    }

    pub fn cid(&self) -> Option<ContextId> {
        self.cid
    }

    pub fn pdp_type(&self) -> Option<PdpType> {
        self.pdp_type
    }

    pub fn set_access_technology(&mut self, rat: RadioAccessTechnology, band: u32) {
        self.rat = rat;
        self.band = band;
    }

    pub fn set_authentication_type(&mut self, auth_type: AuthenticationType) {
        self.auth_type = auth_type;
    }
}

fn next_cid(max: u32) -> ContextId {
    ContextId(max.saturating_add(1))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|value| !value.is_empty()).map(str::to_owned)
}

fn non_empty_secret(value: Option<SecretString>) -> Option<SecretString> {
    value.filter(|value| !value.expose_secret().is_empty())
}
