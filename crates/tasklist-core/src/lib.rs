pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod error;
pub mod notify;
pub mod prompt;
pub mod render;
pub mod shell;
pub mod store;
pub mod task;
pub mod view;

use std::ffi::OsString;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::cli::CliCommand;
use crate::commands::{
  Outcome,
  Session
};

pub const EXIT_REJECTED: u8 = 2;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<ExitCode> {
  let pre = cli::preprocess_args(&raw_args);
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting tasklist"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let storage =
    datastore::DataStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open datastore at \
         {}",
        data_dir.display()
      )
    })?;

  let sort = cfg.initial_sort()?;
  let confirm = cfg
    .get_bool("confirm")?
    .unwrap_or(true);
  let mut session = Session::open(
    storage,
    sort,
    cfg.calendar(),
    confirm
  )?;
  let mut renderer =
    render::Renderer::new(&cfg)?;
  let mut prompter =
    prompt::LinePrompter::stdio();

  let command = cli
    .command
    .unwrap_or(CliCommand::Shell)
    .into_command(sort);

  let code = match command {
    | None => {
      shell::run_shell(
        &mut session,
        &mut renderer,
        &mut prompter,
        Utc::now
      )?;
      ExitCode::SUCCESS
    }
    | Some(command) => {
      let outcome = session.execute(
        command,
        &mut renderer,
        &mut prompter,
        Utc::now()
      )?;
      ExitCode::from(exit_status(&outcome))
    }
  };

  info!("done");
  Ok(code)
}

fn exit_status(outcome: &Outcome) -> u8 {
  match outcome {
    | Outcome::Rejected(_) => EXIT_REJECTED,
    | Outcome::Applied
    | Outcome::Unchanged
    | Outcome::Cancelled => 0
  }
}
