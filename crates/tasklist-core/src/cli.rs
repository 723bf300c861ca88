use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{
  ArgAction,
  Parser,
  Subcommand
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::Command;
use crate::view::{
  SortDirection,
  SortKey,
  SortState,
  StatusFilter
};

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
  pub cleaned_args: Vec<OsString>,
  pub rc_overrides: Vec<(String, String)>
}

#[derive(Debug, Clone)]
pub struct KeyVal {
  pub key:   String,
  pub value: String
}

impl std::str::FromStr for KeyVal {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let (k, v) =
      s.split_once('=').ok_or_else(|| {
        anyhow!(
          "expected KEY=VALUE, got: {s}"
        )
      })?;
    Ok(Self {
      key:   k.trim().to_string(),
      value: v.trim().to_string()
    })
  }
}

#[derive(Parser, Debug, Clone)]
#[command(
  name = "tasklist",
  version,
  about = "A local task list with due dates",
  disable_help_subcommand = true
)]
pub struct GlobalCli {
  #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
  pub verbose: u8,

  #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
  pub quiet: u8,

  #[arg(
    long = "rc",
    value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
    action = ArgAction::Append,
    global = true
  )]
  pub rc_overrides: Vec<KeyVal>,

  #[arg(long = "config", global = true)]
  pub config: Option<PathBuf>,

  #[arg(long = "data", global = true)]
  pub data: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Option<CliCommand>
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
  /// Add a task due on DATE (YYYY-MM-DD).
  Add {
    due:  String,
    #[arg(required = true, num_args = 1..)]
    name: Vec<String>
  },

  /// Change a pending task's name and due
  /// date. Omitted values are asked for.
  Edit {
    target: String,
    #[arg(long)]
    name:   Option<String>,
    #[arg(long)]
    due:    Option<String>
  },

  /// Toggle a task between pending and
  /// completed.
  #[command(alias = "toggle", alias = "complete")]
  Done { target: String },

  #[command(alias = "rm")]
  Delete { target: String },

  /// Delete every task.
  Clear {
    #[arg(short = 'y', long = "yes")]
    yes: bool
  },

  List {
    #[arg(
      long,
      value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<StatusFilter>())
    )]
    filter: Option<StatusFilter>,

    #[arg(
      long,
      value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<SortKey>())
    )]
    sort: Option<SortKey>,

    #[arg(long)]
    desc: bool
  },

  /// Interactive session (the default).
  Shell
}

impl CliCommand {
  pub fn into_command(
    self,
    default_sort: SortState
  ) -> Option<Command> {
    let command = match self {
      | Self::Add { due, name } => {
        Command::Add {
          name:     name.join(" "),
          due_date: due
        }
      }
      | Self::Edit { target, name, due } => {
        Command::Edit {
          target,
          name,
          due_date: due
        }
      }
      | Self::Done { target } => {
        Command::ToggleComplete { target }
      }
      | Self::Delete { target } => {
        Command::Delete { target }
      }
      | Self::Clear { yes } => {
        Command::DeleteAll {
          assume_yes: yes
        }
      }
      | Self::List { filter, sort, desc } => {
        let sort = if sort.is_some() || desc {
          Some(SortState::new(
            sort.unwrap_or(default_sort.key),
            if desc {
              SortDirection::Desc
            } else {
              SortDirection::Asc
            }
          ))
        } else {
          None
        };
        Command::List { filter, sort }
      }
      | Self::Shell => return None
    };
    Some(command)
  }
}

pub fn init_tracing(
  verbose: u8,
  quiet: u8
) -> anyhow::Result<()> {
  let default_level = if quiet >= 2 {
    "error"
  } else if quiet == 1 {
    "warn"
  } else if verbose >= 3 {
    "trace"
  } else if verbose == 2 {
    "debug"
  } else if verbose == 1 {
    "info"
  } else {
    "warn"
  };

  let env_filter =
    EnvFilter::try_from_default_env()
      .or_else(|_| {
        EnvFilter::try_new(default_level)
      })
      .map_err(|e| {
        anyhow!(
          "invalid RUST_LOG / log \
           filter: {e}"
        )
      })?;

  let init_result =
    tracing_subscriber::fmt()
      .with_env_filter(env_filter)
      .with_writer(std::io::stderr)
      .with_target(true)
      .with_level(true)
      .with_ansi(
        std::io::stderr().is_terminal()
      )
      .try_init();

  if let Err(err) = init_result {
    debug!(error = %err, "tracing subscriber already set, continuing");
  }

  Ok(())
}

#[tracing::instrument(skip_all)]
pub fn preprocess_args(
  raw: &[OsString]
) -> PreprocessedArgs {
  let mut cleaned =
    Vec::with_capacity(raw.len());
  let mut overrides = Vec::new();

  let mut iter = raw.iter().cloned();
  if let Some(bin) = iter.next() {
    cleaned.push(bin);
  }

  for arg in iter {
    let s = arg.to_string_lossy();
    if let Some(rest) = s.strip_prefix("rc.")
    {
      let parsed = rest
        .split_once('=')
        .or_else(|| rest.split_once(':'));

      if let Some((k, v)) = parsed {
        debug!(key = %k, value = %v, "captured positional rc override");
        overrides.push((
          format!("rc.{k}"),
          v.to_string()
        ));
        continue;
      }
    }

    cleaned.push(arg);
  }

  PreprocessedArgs {
    cleaned_args: cleaned,
    rc_overrides: overrides
  }
}
