use std::io::{
  BufRead,
  Write
};

use anyhow::anyhow;
use chrono::{
  DateTime,
  Utc
};
use tracing::{
  debug,
  info
};

use crate::commands::{
  Command,
  Session,
  Surface
};
use crate::datastore::SlotStorage;
use crate::notify::Notice;
use crate::prompt::LinePrompter;
use crate::view::{
  SortKey,
  StatusFilter
};

const PROMPT: &str = "tasklist> ";

pub const HELP: &str = "\
commands:
  add <YYYY-MM-DD> <name...>        add a task
  edit <task> [<date> [<name...>]]  edit a pending task
  done <task>                       toggle completed
  delete <task>                     delete a task
  clear                             delete every task
  filter [all|pending|completed]    cycle or set the filter
  sort <name|due|completed>         sort by column; again to reverse
  list                              show tasks
  help                              this text
  quit                              leave
<task> is a row number or a task id.";

pub fn known_command_names()
-> Vec<&'static str> {
  vec![
    "add", "edit", "done", "toggle",
    "delete", "rm", "clear", "filter",
    "sort", "list", "ls", "help", "quit",
    "exit",
  ]
}

pub fn expand_command_abbrev<'a>(
  token: &'a str,
  known: &[&'a str]
) -> Option<&'a str> {
  if known.contains(&token) {
    return Some(token);
  }

  let mut matches =
    known.iter().copied().filter(
      |name| name.starts_with(token)
    );
  let first = matches.next()?;
  if matches.next().is_some() {
    None
  } else {
    Some(first)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellLine {
  Run(Command),
  Help,
  Quit,
  Blank
}

pub fn parse_line(
  line: &str
) -> anyhow::Result<ShellLine> {
  let mut words = line.split_whitespace();
  let Some(head) = words.next() else {
    return Ok(ShellLine::Blank);
  };
  let rest: Vec<&str> = words.collect();

  let known = known_command_names();
  let lowered = head.to_ascii_lowercase();
  let command = expand_command_abbrev(
    &lowered, &known
  )
  .ok_or_else(|| {
    anyhow!(
      "unknown or ambiguous command: \
       {head} (try 'help')"
    )
  })?;

  let target = || {
    rest.first().map(|t| t.to_string()).ok_or_else(
      || anyhow!("{command} needs a task")
    )
  };

  let parsed = match command {
    | "add" => {
      let due_date = rest
        .first()
        .map(|d| d.to_string())
        .unwrap_or_default();
      ShellLine::Run(Command::Add {
        name: rest
          .get(1..)
          .unwrap_or_default()
          .join(" "),
        due_date
      })
    }
    | "edit" => {
      let target = target()?;
      let due_date =
        rest.get(1).map(|d| d.to_string());
      let name = rest
        .get(2..)
        .filter(|words| !words.is_empty())
        .map(|words| words.join(" "));
      ShellLine::Run(Command::Edit {
        target,
        name,
        due_date
      })
    }
    | "done" | "toggle" => {
      ShellLine::Run(
        Command::ToggleComplete {
          target: target()?
        }
      )
    }
    | "delete" | "rm" => {
      ShellLine::Run(Command::Delete {
        target: target()?
      })
    }
    | "clear" => {
      ShellLine::Run(Command::DeleteAll {
        assume_yes: false
      })
    }
    | "filter" => {
      match rest.first() {
        | Some(raw) => ShellLine::Run(
          Command::SetFilter(
            raw.parse::<StatusFilter>()?
          )
        ),
        | None => {
          ShellLine::Run(Command::CycleFilter)
        }
      }
    }
    | "sort" => {
      let key = rest
        .first()
        .ok_or_else(|| {
          anyhow!(
            "sort needs a column: name, \
             due or completed"
          )
        })?
        .parse::<SortKey>()?;
      ShellLine::Run(Command::Sort(key))
    }
    | "list" | "ls" => {
      ShellLine::Run(Command::List {
        filter: None,
        sort:   None
      })
    }
    | "help" => ShellLine::Help,
    | "quit" | "exit" => ShellLine::Quit,
    | other => {
      return Err(anyhow!(
        "unhandled command: {other}"
      ));
    }
  };

  Ok(parsed)
}

#[tracing::instrument(skip_all)]
pub fn run_shell<S, R, W, C>(
  session: &mut Session<S>,
  surface: &mut dyn Surface,
  prompter: &mut LinePrompter<R, W>,
  clock: C
) -> anyhow::Result<()>
where
  S: SlotStorage,
  R: BufRead,
  W: Write,
  C: Fn() -> DateTime<Utc>
{
  info!("starting shell");
  session.execute(
    Command::List {
      filter: None,
      sort:   None
    },
    surface,
    prompter,
    clock()
  )?;

  while let Some(line) =
    prompter.read_line(PROMPT)?
  {
    let parsed = match parse_line(&line) {
      | Ok(parsed) => parsed,
      | Err(err) => {
        surface.notify(Notice::warning(
          err.to_string()
        ));
        continue;
      }
    };

    match parsed {
      | ShellLine::Blank => continue,
      | ShellLine::Help => {
        surface.notify(Notice::info(HELP));
      }
      | ShellLine::Quit => break,
      | ShellLine::Run(command) => {
        let outcome = session.execute(
          command, surface, prompter,
          clock()
        )?;
        debug!(?outcome, "shell command done");
      }
    }
  }

  info!("shell finished");
  Ok(())
}
