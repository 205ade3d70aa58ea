#![cfg(not(feature = "ppp"))]

mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use common::{manager, ready_base, MockBase, ScriptedModem};
use orb_cellular_context::{
    base::{DataCall, Readiness},
    device::{Property, PropertyTable},
    pdp::{ContextId, PdpType},
    stack::{SocketStack, StackParams},
    ContextOptions, Error,
};
use test_log::test;

struct FakeStack {
    init_ok: bool,
}

impl SocketStack for FakeStack {
    fn socket_stack_init(&mut self) -> Result<(), Error> {
        if self.init_ok {
            Ok(())
        } else {
            Err(Error::Unsupported)
        }
    }
}

/// Factory that counts the stacks it builds and remembers the last parameters.
#[derive(Clone, Default)]
struct Recorder {
    built: Arc<AtomicUsize>,
    params: Arc<Mutex<Option<StackParams>>>,
}

impl Recorder {
    fn factory(
        &self,
        init_ok: bool,
    ) -> impl Fn(StackParams) -> Box<dyn SocketStack> + Send + use<> {
        let recorder = self.clone();
        move |params: StackParams| -> Box<dyn SocketStack> {
            recorder.built.fetch_add(1, Ordering::SeqCst);
            *recorder.params.lock().unwrap() = Some(params);
            Box::new(FakeStack { init_ok })
        }
    }

    fn built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }
}

#[test]
fn stack_is_built_once_and_cached() {
    let recorder = Recorder::default();
    let (_session, ctx) = manager(
        ScriptedModem::new().context(2, "IP", "internet"),
        PropertyTable::default(),
        ready_base(),
        ContextOptions::default(),
    );
    let mut ctx = ctx.with_stack_factory(recorder.factory(true));
    ctx.set_credentials(None, Some("u"), None);
    assert!(ctx.get_context());

    let first = ctx.get_stack().unwrap();
    let second = ctx.get_stack().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(recorder.built(), 1);
    let params = recorder.params.lock().unwrap().clone().unwrap();
    assert_eq!(params.cid, ContextId(2));
    assert_eq!(params.ip_stack, PdpType::Ipv4);
    assert_eq!(params.apn.as_deref(), Some("internet"));
    assert_eq!(params.username.as_deref(), Some("u"));
    assert!(params.password.is_none());
}

#[test]
fn failed_initialization_is_not_cached() {
    let recorder = Recorder::default();
    let (_session, ctx) = manager(
        ScriptedModem::new().context(1, "IP", "internet"),
        PropertyTable::default(),
        ready_base(),
        ContextOptions::default(),
    );
    let mut ctx = ctx.with_stack_factory(recorder.factory(false));
    assert!(ctx.get_context());

    assert!(ctx.get_stack().is_none());
    assert!(ctx.get_stack().is_none());
    assert_eq!(recorder.built(), 2);
}

#[test]
fn non_ip_context_has_no_stack() {
    let recorder = Recorder::default();
    let (_session, ctx) = manager(
        ScriptedModem::new().context(1, "Non-IP", "nb"),
        PropertyTable::default().with(Property::NonIpPdpType),
        ready_base(),
        ContextOptions::default(),
    );
    let mut ctx = ctx.with_stack_factory(recorder.factory(true));
    assert!(ctx.get_context());
    assert_eq!(ctx.pdp_type(), Some(PdpType::NonIp));

    assert!(ctx.get_stack().is_none());
    assert_eq!(recorder.built(), 0);
}

#[test]
fn control_plane_connection_has_no_stack() {
    let recorder = Recorder::default();
    let mut base = MockBase::new();
    base.expect_set_device_ready()
        .returning(|_| Ok(Readiness::AlreadyReady));
    base.expect_connect().returning(|_| {
        Ok(DataCall {
            control_plane: true,
            already_active: false,
        })
    });
    let (_session, ctx) = manager(
        ScriptedModem::new().context(1, "IP", "internet"),
        PropertyTable::default(),
        base,
        ContextOptions::default(),
    );
    let mut ctx = ctx.with_stack_factory(recorder.factory(true));

    ctx.connect(None, Some("internet"), None, None).unwrap();

    assert!(ctx.get_stack().is_none());
    assert_eq!(recorder.built(), 0);
}

#[test]
fn no_stack_without_factory() {
    let (_session, mut ctx) = manager(
        ScriptedModem::new().context(1, "IP", "internet"),
        PropertyTable::default(),
        ready_base(),
        ContextOptions::default(),
    );
    assert!(ctx.get_context());

    assert!(ctx.get_stack().is_none());
}
