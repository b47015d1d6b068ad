//! CLI for `Callboard`: per-user call duration chart kept in a remote table.
//!
//! ```bash
//! cb show --email you@example.com --url https://proj.example.co --key KEY
//! cb edit --email you@example.com Mon=10 Wed=5 --adopt
//! cb --config callboard.toml edit --email you@example.com Tue=60 --keep
//! cb gen-config
//! ```

mod config;

use std::{
  io::{BufRead, IsTerminal, Write},
  path::PathBuf,
  sync::Arc
};

use anyhow::Context;
use callboard_core::{
  ConflictResolver, ControllerView, DecisionPort, FetchOutcome, FixedDecision, Identity,
  SaveOutcome, SeriesModel, Session, SessionEventHandler, Settled, series::parse_duration
};
use callboard_store::RestStore;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::{CliConfig, EXAMPLE, Overrides};

/// `Callboard`: weekday call duration chart synced per user.
#[derive(Parser)]
#[command(name = "cb", version, about)]
struct Cli {
  /// Verbose output (repeatable: -v, -vv).
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  verbose: u8,

  /// TOML configuration file.
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Command.
  #[command(subcommand)]
  command: Commands
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
  /// Load and print the chart for a user.
  Show {
    /// User email.
    #[arg(long)]
    email: String,
    #[command(flatten)]
    store: StoreArgs
  },

  /// Load, apply edits like `Mon=10`, and save.
  Edit {
    /// User email.
    #[arg(long)]
    email: String,
    /// Edits as `Label=value`.
    #[arg(required = true)]
    edits: Vec<String>,
    /// Use stored data without asking.
    #[arg(long, conflicts_with = "keep")]
    adopt: bool,
    /// Keep the default chart without asking (also allows saving after a failed load).
    #[arg(long)]
    keep: bool,
    #[command(flatten)]
    store: StoreArgs
  },

  /// Print an example configuration.
  GenConfig
}

/// Store flags (override the config file).
#[derive(Args)]
struct StoreArgs {
  /// Base URL of the table API.
  #[arg(long, env = "CALLBOARD_URL")]
  url: Option<String>,
  /// API key.
  #[arg(long, env = "CALLBOARD_API_KEY", hide_env_values = true)]
  key: Option<String>,
  /// Table name.
  #[arg(long)]
  table: Option<String>
}

impl From<StoreArgs> for Overrides {
  fn from(a: StoreArgs) -> Self {
    Self {
      url: a.url,
      key: a.key,
      table: a.table
    }
  }
}

fn init_tracing(verbose: u8, configured: &str) {
  let filter = match verbose {
    0 => configured,
    1 => "debug",
    _ => "trace"
  };

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter))
    )
    .with_writer(std::io::stderr)
    .compact()
    .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  let cfg = CliConfig::load(cli.config.as_deref())?;
  init_tracing(cli.verbose, &cfg.logging.level);

  match cli.command {
    Commands::Show { email, store } => cmd_show(cfg.with_overrides(store.into()), &email).await,
    Commands::Edit {
      email,
      edits,
      adopt,
      keep,
      store
    } => {
      let decision: Arc<dyn DecisionPort> = if adopt {
        Arc::new(FixedDecision(true))
      } else if keep {
        Arc::new(FixedDecision(false))
      } else {
        Arc::new(TerminalPrompt)
      };
      cmd_edit(cfg.with_overrides(store.into()), &email, &edits, decision, keep).await
    }
    Commands::GenConfig => cmd_gen_config()
  }
}

/// Build a session over the REST store.
fn open_session(cfg: &CliConfig, decision: Arc<dyn DecisionPort>) -> anyhow::Result<Session<RestStore>> {
  let store = RestStore::new(cfg.store.clone()).context("cannot set up the store")?;
  Ok(
    Session::new(Arc::new(store), Arc::new(TerminalNotices), cfg.session.clone())
      .with_resolver(ConflictResolver::new(decision))
  )
}

/// Submit the identity and wait for the load to settle.
///
/// Returns `false` when the stored chart could not be read.
async fn load(session: &mut Session<RestStore>, email: &str) -> anyhow::Result<bool> {
  session
    .submit_identity(email)
    .with_context(|| format!("cannot use '{email}'"))?;

  match session.settle().await {
    Some(Settled::Fetch(FetchOutcome::RecordFound(_))) => debug!("stored record handled"),
    Some(Settled::Fetch(FetchOutcome::NotFound)) => info!("no stored chart, starting from default"),
    Some(Settled::Fetch(FetchOutcome::Failed(e))) => {
      debug!(error = %e, "continuing with default");
      return Ok(false);
    }
    other => debug!(?other, "unexpected settle result")
  }
  Ok(true)
}

/// Command show.
async fn cmd_show(cfg: CliConfig, email: &str) -> anyhow::Result<()> {
  let mut session = open_session(&cfg, Arc::new(TerminalPrompt))?;
  load(&mut session, email).await?;
  print_view(&session.view());
  Ok(())
}

/// Command edit.
async fn cmd_edit(
  cfg: CliConfig,
  email: &str,
  edits: &[String],
  decision: Arc<dyn DecisionPort>,
  keep: bool
) -> anyhow::Result<()> {
  let parsed = edits
    .iter()
    .map(|e| {
      e.split_once('=')
        .ok_or_else(|| anyhow::anyhow!("edit '{e}' must look like Mon=10"))
    })
    .collect::<anyhow::Result<Vec<_>>>()?;

  let mut session = open_session(&cfg, decision)?;
  if !load(&mut session, email).await? && !keep {
    anyhow::bail!(
      "could not load the stored chart for {email}; \
       pass --keep to overwrite it with the default chart plus your edits"
    );
  }

  for (label, raw) in parsed {
    session
      .edit_field(label, raw)
      .with_context(|| format!("cannot edit '{label}'"))?;
    if parse_duration(raw).is_none() {
      eprintln!("notice: '{raw}' is not a valid duration, {label} stays unchanged");
    }
  }

  session.commit().context("cannot save")?;
  match session.settle().await {
    Some(Settled::Save(SaveOutcome::Saved(series))) => {
      println!("saved for {email}");
      print_series(&series);
      Ok(())
    }
    Some(Settled::Save(SaveOutcome::Failed(e))) => anyhow::bail!("save failed: {e}"),
    other => anyhow::bail!("save did not complete: {other:?}")
  }
}

/// Command gen-config.
#[allow(clippy::unnecessary_wraps)]
fn cmd_gen_config() -> anyhow::Result<()> {
  println!("{EXAMPLE}");
  Ok(())
}

fn print_view(view: &ControllerView) {
  if let Some(identity) = &view.identity {
    println!("chart for {identity}");
  }
  print_series(&view.series);
}

fn print_series(series: &SeriesModel) {
  for p in series.points() {
    println!("  {:<4}{}", p.day.label(), p.duration);
  }
}

/// Prints store notices to stderr.
struct TerminalNotices;

impl SessionEventHandler for TerminalNotices {
  fn on_save_failed(&self, identity: &Identity, message: &str) {
    eprintln!("notice: could not save for {identity}: {message}");
  }

  fn on_error(&self, message: &str) {
    eprintln!("notice: {message}");
  }
}

/// Asks on the terminal; cannot ask when stdin is not a terminal.
struct TerminalPrompt;

impl DecisionPort for TerminalPrompt {
  fn confirm_adopt(&self, identity: &Identity, remote: &SeriesModel) -> Option<bool> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
      return None;
    }

    let mut err = std::io::stderr();
    write!(err, "saved chart found for {identity}: {remote}\nuse it? [y/N] ").ok()?;
    err.flush().ok()?;

    let mut answer = String::new();
    stdin.lock().read_line(&mut answer).ok()?;
    Some(matches!(answer.trim(), "y" | "Y" | "yes"))
  }
}
