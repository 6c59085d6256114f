//! Command-line driver for the CoWIN slot acquisition engine.
//!
//! Wires the platform client, the OTP source, and the operator profile into
//! one run of the acquisition loop, then maps the engine's verdict to a
//! process exit code.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cowin::{ClientConfig, CowinClient};
use dialoguer::{Confirm, Input};
use otp_services::{KvdbRelay, OtpSource, RelayConfig};
use slot_scan::{
    AcquisitionEngine, EngineError, PreflightGuard, PreflightOutcome, Session, TokenManager,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod collect;
mod display;
mod otp;
mod profile;

/// Automated vaccination slot booking against the CoWIN platform.
#[derive(Parser)]
#[command(name = "vaccine-bot", version, about)]
struct Cli {
    /// Reuse a pre-issued bearer token instead of running the OTP exchange
    #[arg(long)]
    token: Option<String>,

    /// Registered 10-digit mobile number
    #[arg(long)]
    mobile: Option<String>,

    /// kvdb.io bucket polled for relayed OTP messages
    #[arg(long, env = "KVDB_BUCKET")]
    kvdb_bucket: Option<String>,

    /// Path of the saved run profile
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Accept defaults instead of prompting
    #[arg(long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    display::beep(1);
    info!("starting vaccine-bot");

    let mobile = match cli.mobile.clone() {
        Some(mobile) => mobile,
        None => prompt_mobile()?,
    };
    profile::validate_mobile(&mobile)
        .map_err(|_| anyhow::anyhow!("mobile number must be exactly 10 digits"))?;

    let client = Arc::new(CowinClient::new(ClientConfig::default())?);
    let otp_source = resolve_otp_source(&cli, &mobile)?;

    let tokens = TokenManager::new(client.clone(), otp_source.clone(), mobile.clone());
    let session = match &cli.token {
        Some(token) => {
            Session::from_token(token.clone()).context("the supplied token is not usable")?
        }
        None => tokens.acquire().await,
    };

    let path = cli
        .profile
        .clone()
        .unwrap_or_else(|| profile::default_path(&mobile));
    let run_profile = if path.exists() {
        let saved = profile::load(&path)?;
        display::profile_summary(&saved);
        let reuse = cli.yes
            || Confirm::new()
                .with_prompt(format!("Reuse the profile saved at {}?", path.display()))
                .default(true)
                .interact()?;
        if reuse {
            saved
        } else {
            let fresh = collect::collect_profile(&client, &session).await?;
            profile::save(&path, &fresh)?;
            fresh
        }
    } else {
        let fresh = collect::collect_profile(&client, &session).await?;
        profile::save(&path, &fresh)?;
        info!("profile saved to {}", path.display());
        fresh
    };

    // Refuse to book over an appointment the operator may not know about
    let guard = PreflightGuard::new(client.clone());
    match guard.check(&session, &run_profile.beneficiaries).await {
        Ok(PreflightOutcome::Clear) => {}
        Ok(PreflightOutcome::Unverified(cause)) => {
            warn!(
                "existing appointments could not be verified ({}); duplicate bookings cannot be ruled out",
                cause
            );
            if !cli.yes {
                let proceed = Confirm::new()
                    .with_prompt("Continue anyway?")
                    .default(true)
                    .interact()?;
                if !proceed {
                    bail!("aborted by operator");
                }
            }
        }
        Err(EngineError::Precondition(active)) => {
            display::beep(3);
            display::appointments_table(&active);
            eprintln!("These appointments are active. Cancel them manually before re-running.");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    }

    let engine = AcquisitionEngine::new(
        client,
        otp_source,
        mobile,
        run_profile.criteria.clone(),
        run_profile.beneficiaries.clone(),
    )?;

    match engine.run(Some(session)).await {
        Ok(confirmation) => {
            display::beep(2);
            println!("Appointment booked. Confirmation number: {}", confirmation);
            Ok(())
        }
        Err(EngineError::CaptchaRequired) => {
            display::beep(3);
            eprintln!(
                "The platform demanded a captcha this bot cannot solve. Book manually through the portal."
            );
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// Pick the OTP source for the run; a missing relay bucket is only
/// recoverable when a human is present to type codes in.
fn resolve_otp_source(cli: &Cli, mobile: &str) -> Result<Arc<dyn OtpSource>> {
    if let Some(bucket) = &cli.kvdb_bucket {
        let relay = KvdbRelay::new(RelayConfig::for_bucket(bucket.clone()))?;
        println!(
            "Make sure the forwarder app on your phone writes incoming SMS to: {}",
            relay.entry_url(mobile)
        );
        return Ok(Arc::new(relay));
    }

    if cli.yes {
        bail!(
            "an OTP relay bucket is mandatory in non-interactive mode; set --kvdb-bucket or KVDB_BUCKET"
        );
    }

    let manual = Confirm::new()
        .with_prompt("No relay bucket configured. Enter OTPs manually at the terminal?")
        .default(true)
        .interact()?;
    if manual {
        Ok(Arc::new(otp::ManualOtp))
    } else {
        bail!("a private kvdb.io bucket is required for automated OTP retrieval; see the README")
    }
}

fn prompt_mobile() -> Result<String> {
    let mobile: String = Input::new()
        .with_prompt("Registered mobile number")
        .interact_text()?;
    Ok(mobile.trim().to_string())
}
