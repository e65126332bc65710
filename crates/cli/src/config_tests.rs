// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn parse(args: &[&str]) -> anyhow::Result<Config> {
    Ok(Config::try_parse_from(args)?)
}

#[test]
fn download_defaults() -> anyhow::Result<()> {
    let config = parse(&["doorbot", "--email", "a@b.c", "--password", "pw", "download"])?;
    match config.command {
        Command::Download { limit, out, concurrency } => {
            assert_eq!(limit, None);
            assert_eq!(out, PathBuf::from("downloads"));
            assert_eq!(concurrency, 10);
        }
        other => anyhow::bail!("unexpected command {other:?}"),
    }
    Ok(())
}

#[test]
fn global_flags_follow_subcommand() -> anyhow::Result<()> {
    let config = parse(&["doorbot", "--email", "a@b.c", "--password", "pw", "dings", "--log-format", "json"])?;
    assert_eq!(config.log_format, "json");
    assert!(config.validate().is_ok());
    Ok(())
}

#[test]
fn alarm_mode_parses_aliases_and_bypass() -> anyhow::Result<()> {
    let config = parse(&[
        "doorbot", "--refresh-token", "rt", "alarm-mode", "--location", "loc", "--zid", "panel",
        "--mode", "home", "--bypass", "z1", "--bypass", "z2",
    ])?;
    match config.command {
        Command::AlarmMode { location, zid, mode, bypass } => {
            assert_eq!(location, "loc");
            assert_eq!(zid, "panel");
            assert_eq!(mode, AlarmMode::Some);
            assert_eq!(bypass, vec!["z1".to_owned(), "z2".to_owned()]);
        }
        other => anyhow::bail!("unexpected command {other:?}"),
    }
    Ok(())
}

#[yare::parameterized(
    bad_mode        = { &["doorbot", "--refresh-token", "rt", "alarm-mode", "--location", "l", "--zid", "z", "--mode", "party"] },
    zero_concurrency = { &["doorbot", "--refresh-token", "rt", "download", "--concurrency", "0"] },
    no_command      = { &["doorbot", "--refresh-token", "rt"] },
)]
fn rejects_bad_args(args: &[&str]) {
    assert!(parse(args).is_err());
}

#[yare::parameterized(
    no_credentials = { &["doorbot", "devices"] },
    bad_log_format = { &["doorbot", "--refresh-token", "rt", "--log-format", "xml", "devices"] },
)]
fn validate_rejects(args: &[&str]) {
    let config = parse(args).expect("parses");
    assert!(config.validate().is_err());
}
