// NOTE: env vars set in one test are visible to the others, so every test uses its
// own prefix.

use std::time::Duration;

use clap::Parser as _;
use figment::Jail;
use secrecy::ExposeSecret as _;

use crate::{
    device::{Property, PropertyTable},
    pdp::{AuthenticationType, RadioAccessTechnology},
    settings::{Args, Settings},
};

const CFG_FILE_CONTENTS: &str = r#"
    device = "/config/ttyACM3"
    apn = "config.apn"
    username = "config-user"
    password = "config-password"
    authentication = "pap"
    rat = "catm1"
    band = 0x00000010
    command_timeout = 1500
    properties = ["ipv4-pdp-type", "ipv6-pdp-type"]
"#;

fn make_args(args: &str) -> Result<Args, clap::Error> {
    Args::try_parse_from(str::split_ascii_whitespace(args))
}

#[test]
fn defaults_without_config_file() {
    Jail::expect_with(|_jail| {
        let args = make_args("orb-cellular-context").unwrap();
        let settings = Settings::get(&args, "missing.toml", "ORB_CELLULAR_T0_")?;

        assert_eq!(settings.device.as_os_str(), "/dev/ttyACM0");
        assert_eq!(settings.baud_rate, 115_200);
        assert_eq!(settings.command_timeout, Duration::from_secs(5));
        assert_eq!(settings.apn, None);
        assert!(settings.password.is_none());
        assert_eq!(settings.authentication, AuthenticationType::Chap);
        assert_eq!(settings.rat, RadioAccessTechnology::CatNb);
        assert_eq!(settings.band, 0x0008_0000);
        assert!(!settings.control_plane);
        assert_eq!(settings.properties, PropertyTable::default());
        assert_eq!(settings.registration().attempts, 30);

        Ok(())
    });
}

#[test]
fn config_file_is_read() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", CFG_FILE_CONTENTS)?;
        let args = make_args("orb-cellular-context").unwrap();
        let settings = Settings::get(&args, "config.toml", "ORB_CELLULAR_T1_")?;

        assert_eq!(settings.device.as_os_str(), "/config/ttyACM3");
        assert_eq!(settings.apn.as_deref(), Some("config.apn"));
        assert_eq!(settings.username.as_deref(), Some("config-user"));
        assert_eq!(
            settings.password.as_ref().map(|p| p.expose_secret().as_str()),
            Some("config-password")
        );
        assert_eq!(settings.command_timeout, Duration::from_millis(1500));

        let options = settings.context_options();
        assert_eq!(options.authentication, AuthenticationType::Pap);
        assert_eq!(options.rat, RadioAccessTechnology::CatM1);
        assert_eq!(options.band, 0x10);
        assert_eq!(
            settings.properties,
            PropertyTable::new([Property::Ipv4PdpType, Property::Ipv6PdpType])
        );

        Ok(())
    });
}

#[test]
fn env_vars_override_config_file() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", CFG_FILE_CONTENTS)?;
        jail.set_env("ORB_CELLULAR_T2_APN", "env.apn");
        jail.set_env("ORB_CELLULAR_T2_PASSWORD", "env-password");
        jail.set_env("ORB_CELLULAR_T2_RAT", "catnb");
        jail.set_env("ORB_CELLULAR_T2_REGISTRATION_INTERVAL", "250");
        let args = make_args("orb-cellular-context").unwrap();
        let settings = Settings::get(&args, "config.toml", "ORB_CELLULAR_T2_")?;

        assert_eq!(settings.apn.as_deref(), Some("env.apn"));
        assert_eq!(
            settings.password.as_ref().map(|p| p.expose_secret().as_str()),
            Some("env-password")
        );
        assert_eq!(settings.rat, RadioAccessTechnology::CatNb);
        assert_eq!(settings.registration_interval, Duration::from_millis(250));
        assert_eq!(settings.username.as_deref(), Some("config-user"));

        Ok(())
    });
}

#[test]
fn cli_args_override_config_file_and_env_vars() {
    const CLI_ARGS: &str = r#"
    orb-cellular-context
        --device /args/ttyUSB0
        --apn args.apn
        --authentication none
        --rat 3
        --band 0x80
        --control-plane
        --non-ip
        --registration-attempts 5
    "#;

    Jail::expect_with(|jail| {
        jail.create_file("config.toml", CFG_FILE_CONTENTS)?;
        jail.set_env("ORB_CELLULAR_T3_APN", "env.apn");
        jail.set_env("ORB_CELLULAR_T3_CONTROL_PLANE", "false");
        let args = make_args(CLI_ARGS).unwrap();
        let settings = Settings::get(&args, "config.toml", "ORB_CELLULAR_T3_")?;

        assert_eq!(settings.device.as_os_str(), "/args/ttyUSB0");
        assert_eq!(settings.apn.as_deref(), Some("args.apn"));
        assert_eq!(settings.authentication, AuthenticationType::None);
        assert_eq!(settings.rat, RadioAccessTechnology::Other(3));
        assert_eq!(settings.band, 0x80);
        assert!(settings.control_plane);
        assert!(settings.non_ip);
        assert_eq!(settings.registration().attempts, 5);

        Ok(())
    });
}

#[test]
fn unset_flags_leave_config_file_values() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "control_plane = true\nnon_ip = true\n")?;
        let args = make_args("orb-cellular-context").unwrap();
        let settings = Settings::get(&args, "config.toml", "ORB_CELLULAR_T4_")?;

        assert!(settings.control_plane);
        assert!(settings.non_ip);

        Ok(())
    });
}

#[test]
fn numeric_rat_of_named_technology_is_normalized() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "rat = 7\n")?;
        let args = make_args("orb-cellular-context").unwrap();
        let settings = Settings::get(&args, "config.toml", "ORB_CELLULAR_T5_")?;

        assert_eq!(settings.rat, RadioAccessTechnology::CatM1);
        assert_eq!(settings.rat.band_key(), Some("Radio/Band/CatM"));

        jail.set_env("ORB_CELLULAR_T5_RAT", "8");
        let settings = Settings::get(&args, "config.toml", "ORB_CELLULAR_T5_")?;

        assert_eq!(settings.rat, RadioAccessTechnology::CatNb);

        Ok(())
    });
}
