//! Signify CLI — `signify` command.
//!
//! Generates passcodes, shows the controller identifier a passcode derives,
//! and drives a controller against its remote agent.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use signify_core::client::DEFAULT_URL;
use signify_core::crypto::random::random_passcode;
use signify_core::{ClientConfig, Codec, Connection, Controller, ReqwestTransport, Tier};

// ── CLI structure ─────────────────────────────────────────────────────────────

/// Signify CLI — control a KERI identifier from the edge.
#[derive(Parser, Debug)]
#[command(
    name = "signify",
    about = "Signify CLI",
    version,
    long_about = "signify: edge signing client for KERI agents\n\nKeys are derived from a passcode and never leave this machine;\nthe agent only ever sees signatures and sealed key material."
)]
struct Cli {
    /// Agent admin URL
    #[arg(long, global = true, env = "SIGNIFY_URL", default_value = DEFAULT_URL)]
    url: String,

    /// Passcode (at least 21 characters)
    #[arg(long, global = true, env = "SIGNIFY_PASSCODE", hide_env_values = true)]
    passcode: Option<String>,

    /// Key stretching tier (low, med, high)
    #[arg(long, global = true, env = "SIGNIFY_TIER", default_value = "low")]
    tier: String,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "SIGNIFY_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a random passcode
    Passcode,

    /// Show the controller identifier derived from the passcode
    Aid,

    /// Show the agent's state for this controller
    State,

    /// Connect to the agent, approving its delegation if needed
    Connect,

    /// Rotate the controller to keys derived from a new passcode
    Rotate {
        /// The new passcode
        #[arg(long, env = "SIGNIFY_NEW_PASSCODE", hide_env_values = true)]
        new_passcode: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let verbose = cli.verbose;

    let result = match &cli.command {
        Commands::Passcode => cmd_passcode(),
        Commands::Aid => cmd_aid(&cli, verbose),
        Commands::State => cmd_state(&cli, verbose).await,
        Commands::Connect => cmd_connect(&cli, verbose).await,
        Commands::Rotate { new_passcode } => cmd_rotate(&cli, new_passcode, verbose).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn tier(cli: &Cli) -> Result<Tier> {
    cli.tier
        .parse()
        .with_context(|| format!("invalid tier '{}'", cli.tier))
}

fn controller(cli: &Cli) -> Result<Controller> {
    let passcode = cli
        .passcode
        .as_deref()
        .ok_or_else(|| anyhow!("a passcode is required (--passcode or SIGNIFY_PASSCODE)"))?;
    Controller::new(&Codec::standard(), passcode, tier(cli)?).context("failed to derive controller")
}

fn connection(cli: &Cli) -> Result<Connection> {
    let config = ClientConfig::new(cli.url.as_str(), tier(cli)?);
    log::debug!("using agent at {}", config.url);
    Ok(Connection::new(
        config,
        controller(cli)?,
        Arc::new(ReqwestTransport::with_timeout(Duration::from_secs(cli.timeout))),
    ))
}

// ── Command implementations ───────────────────────────────────────────────────

/// `signify passcode`
fn cmd_passcode() -> Result<()> {
    println!("{}", random_passcode()?);
    Ok(())
}

/// `signify aid`
fn cmd_aid(cli: &Cli, verbose: bool) -> Result<()> {
    let ctrl = controller(cli)?;
    println!("Controller {}", ctrl.pre());
    println!("  Key:  {}", ctrl.signer().verfer().qb64());
    println!("  Next: {}", ctrl.state().next_digests.join(", "));
    if verbose {
        println!("  Tier: {}", ctrl.tier());
        println!("  Inception: {}", ctrl.serder().text());
    }
    Ok(())
}

/// `signify state`
async fn cmd_state(cli: &Cli, verbose: bool) -> Result<()> {
    let conn = connection(cli)?;
    let state = conn.state().await.context("failed to fetch agent state")?;

    println!("Controller {}", conn.pre());
    match &state.agent {
        Some(agent) => {
            println!("  Agent:     {}", agent.i);
            println!("  Agent sn:  {}", agent.s);
            println!("  Delegator: {}", agent.di.as_deref().unwrap_or("-"));
        }
        None => println!("  Agent:     none"),
    }
    if let Some(ctrl) = &state.controller {
        println!("  Controller sn: {}", ctrl.state.s);
    }
    println!("  ridx: {}  pidx: {}", state.ridx, state.pidx);
    if verbose {
        if let Some(agent) = &state.agent {
            println!("{}", serde_json::to_string_pretty(agent)?);
        }
    }
    Ok(())
}

/// `signify connect`
async fn cmd_connect(cli: &Cli, _verbose: bool) -> Result<()> {
    let conn = connection(cli)?;
    conn.connect().await.context("failed to connect to agent")?;
    let agent = conn
        .agent()
        .await
        .ok_or_else(|| anyhow!("connected without an agent"))?;

    println!("Connected controller {}", conn.pre());
    println!("  Agent: {}", agent.pre);
    println!("  Controller sn: {}", conn.controller().lock().await.state().sn);
    Ok(())
}

/// `signify rotate --new-passcode NEW`
async fn cmd_rotate(cli: &Cli, new_passcode: &str, verbose: bool) -> Result<()> {
    let conn = connection(cli)?;
    conn.connect().await.context("failed to connect to agent")?;
    conn.rotate(new_passcode, &[])
        .await
        .context("agent did not accept the rotation")?;

    let ctrl = conn.controller().lock().await;
    println!("Rotated controller {}", ctrl.pre());
    println!("  Sequence: {}", ctrl.state().sn);
    println!("  Key:      {}", ctrl.signer().verfer().qb64());
    if verbose {
        println!("  Event:    {}", ctrl.serder().said());
    }
    Ok(())
}
