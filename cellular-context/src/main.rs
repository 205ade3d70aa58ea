use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

use orb_cellular_context::{
    at,
    base::AtBaseContext,
    serial::SerialAtSession,
    settings::{Args, Settings, ENV_PREFIX},
    CinterionContext,
};

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let settings = Settings::get(&args, &args.config, ENV_PREFIX)
        .wrap_err("failed reading settings")?;
    debug!(?settings, "settings loaded");

    let device = settings.device.to_string_lossy();
    info!(%device, "opening modem");
    let session = SerialAtSession::open(
        &device,
        settings.baud_rate,
        settings.command_timeout,
    )
    .wrap_err_with(|| format!("failed to open modem at {device}"))?;
    let session = at::shared(session);

    let base = AtBaseContext::new(session.clone(), settings.registration());
    let mut context = CinterionContext::new(
        session,
        settings.properties.clone(),
        base,
        settings.context_options(),
    );

    let call = context
        .connect(
            settings.sim_pin.clone(),
            settings.apn.as_deref(),
            settings.username.as_deref(),
            settings.password.clone(),
        )
        .wrap_err("failed to connect")?;

    let Some(pdp) = context.context() else {
        color_eyre::eyre::bail!("connected without a selected PDP context");
    };
    println!(
        "cid={} pdp_type={} apn={} control_plane={}",
        pdp.cid,
        pdp.pdp_type,
        pdp.apn.as_deref().unwrap_or("<subscription default>"),
        call.control_plane,
    );

    Ok(())
}
