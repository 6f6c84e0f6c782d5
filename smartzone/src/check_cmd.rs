use std::env;

use anyhow::{bail, Context, Result};
use smartzone::report::{render_failure, render_report};
use smartzone::session::{ReplaySession, SessionTransport, SshAuth, SshOptions, SshSession};
use smartzone::settings::Settings;
use smartzone::validate::{run_check as run_validation, CheckOptions, ValidationReport};
use tracing::info;

use crate::cli::{CheckArgs, OutputFormat};
use crate::generate_cmd::load_intent;

pub fn run_check(args: CheckArgs) -> Result<()> {
    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let (intent, target) = load_intent(&args.intent)?;

    let mut session: Box<dyn SessionTransport> = match (&args.replay, &args.switch) {
        (Some(path), _) => Box::new(
            ReplaySession::from_transcript(path, settings.session.continuation_markers.clone())
                .with_context(|| format!("failed to open replay {}", path.display()))?,
        ),
        (None, Some(host)) => {
            let username = resolve_username(args.username.as_deref())
                .context("no login user: pass --username or set MDS_USERNAME")?;
            let env_password = env::var("MDS_PASSWORD").ok();
            let auth = SshAuth::resolve(
                args.password.as_deref(),
                env_password.as_deref(),
                args.use_keys,
                args.key_file.clone(),
            );
            info!(%host, user = %username, "using {} authentication", auth.method());
            let mut options = SshOptions::new(host, username, auth, &settings.ssh);
            if let Some(port) = args.port {
                options.port = port;
            }
            Box::new(
                SshSession::connect(&options, &settings.session)
                    .with_context(|| format!("failed to connect to {host}"))?,
            )
        }
        (None, None) => bail!("either --switch or --replay is required"),
    };

    info!(%target, fabric = intent.fabric(), "starting check");
    let options = CheckOptions {
        limits: settings.limits.clone(),
        continuation: settings.session.continuation,
    };

    match run_validation(&mut session, &intent, &target, &options) {
        Ok(report) => {
            print_report(&report, args.format)?;
            if !report.is_clean() {
                bail!("check failed: {} violations", report.violation_count());
            }
            Ok(())
        }
        Err(failure) => {
            print_report(&failure.partial, args.format)?;
            eprintln!("{}", render_failure(&failure));
            Err(failure).context("check did not complete")
        }
    }
}

fn print_report(report: &ValidationReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", render_report(report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

/// `--username`, then `MDS_USERNAME`, then the OS user.
fn resolve_username(explicit: Option<&str>) -> Option<String> {
    if let Some(user) = explicit {
        return Some(user.to_string());
    }
    ["MDS_USERNAME", "USER", "USERNAME"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}
