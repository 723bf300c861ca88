use chrono::{
  DateTime,
  Utc
};
use tracing::{
  debug,
  info,
  instrument,
  warn
};

use crate::datastore::SlotStorage;
use crate::datetime::{
  Calendar,
  format_due_date
};
use crate::error::ValidationError;
use crate::notify::{
  Notice,
  Notifier
};
use crate::prompt::Prompter;
use crate::store::{
  EditOutcome,
  TaskStore
};
use crate::task::TaskId;
use crate::view::{
  SortKey,
  SortState,
  StatusFilter,
  ViewRow
};

const DUE_DATE_HINT: &str =
  "Enter the due date as YYYY-MM-DD, \
   today or later.";

pub trait Surface: Notifier {
  fn show_rows(
    &mut self,
    rows: &[ViewRow],
    filter: StatusFilter,
    sort: SortState
  ) -> anyhow::Result<()>;
}

impl Surface for crate::render::Renderer {
  fn show_rows(
    &mut self,
    rows: &[ViewRow],
    filter: StatusFilter,
    sort: SortState
  ) -> anyhow::Result<()> {
    self.print_rows(rows, filter, sort)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Add {
    name:     String,
    due_date: String
  },
  Edit {
    target:   String,
    name:     Option<String>,
    due_date: Option<String>
  },
  ToggleComplete {
    target: String
  },
  Delete {
    target: String
  },
  DeleteAll {
    assume_yes: bool
  },
  CycleFilter,
  SetFilter(StatusFilter),
  Sort(SortKey),
  List {
    filter: Option<StatusFilter>,
    sort:   Option<SortState>
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Applied,
  Unchanged,
  Cancelled,
  Rejected(ValidationError)
}

pub struct Session<S> {
  store:    TaskStore,
  storage:  S,
  calendar: Calendar,
  confirm:  bool
}

impl<S: SlotStorage> Session<S> {
  #[instrument(skip(storage))]
  pub fn open(
    storage: S,
    sort: SortState,
    calendar: Calendar,
    confirm: bool
  ) -> anyhow::Result<Self> {
    let store =
      TaskStore::load(&storage, sort)?;
    Ok(Self {
      store,
      storage,
      calendar,
      confirm
    })
  }

  pub fn store(&self) -> &TaskStore {
    &self.store
  }

  #[instrument(skip(self, surface, prompter, now))]
  pub fn execute(
    &mut self,
    command: Command,
    surface: &mut dyn Surface,
    prompter: &mut dyn Prompter,
    now: DateTime<Utc>
  ) -> anyhow::Result<Outcome> {
    let outcome = match command {
      | Command::Add { name, due_date } => {
        self.add(
          &name, &due_date, surface, now
        )?
      }
      | Command::Edit {
        target,
        name,
        due_date
      } => {
        self.edit(
          &target,
          name,
          due_date,
          surface,
          prompter,
          now
        )?
      }
      | Command::ToggleComplete {
        target
      } => {
        self.toggle_complete(
          &target, surface, now
        )?
      }
      | Command::Delete { target } => {
        self.delete(&target, surface, now)?
      }
      | Command::DeleteAll {
        assume_yes
      } => {
        self.delete_all(
          assume_yes, surface, prompter, now
        )?
      }
      | Command::CycleFilter => {
        let filter =
          self.store.cycle_filter();
        debug!(%filter, "filter cycled");
        self.render(surface, now)?;
        Outcome::Applied
      }
      | Command::SetFilter(filter) => {
        self.store.set_filter(filter);
        self.render(surface, now)?;
        Outcome::Applied
      }
      | Command::Sort(key) => {
        let sort =
          self.store.select_sort(key);
        debug!(key = %sort.key, direction = %sort.direction, "sort selected");
        self.render(surface, now)?;
        Outcome::Applied
      }
      | Command::List { filter, sort } => {
        if let Some(filter) = filter {
          self.store.set_filter(filter);
        }
        if let Some(sort) = sort {
          self.store.set_sort(sort);
        }
        self.render(surface, now)?;
        Outcome::Unchanged
      }
    };

    if let Outcome::Rejected(err) = &outcome
    {
      warn!(error = %err, "command rejected");
      surface.notify(Notice::from(err));
      if err.is_due_date_error() {
        surface.notify(Notice::info(
          DUE_DATE_HINT
        ));
      }
    }
    Ok(outcome)
  }

  fn add(
    &mut self,
    name: &str,
    due_date: &str,
    surface: &mut dyn Surface,
    now: DateTime<Utc>
  ) -> anyhow::Result<Outcome> {
    info!("command add");
    let today = self.calendar.date_of(now);
    if let Err(err) =
      self.store.add(name, due_date, today, now)
    {
      return Ok(Outcome::Rejected(err));
    }

    self.commit(surface, now)?;
    surface.notify(Notice::success(
      "Task added."
    ));
    Ok(Outcome::Applied)
  }

  fn edit(
    &mut self,
    target: &str,
    name: Option<String>,
    due_date: Option<String>,
    surface: &mut dyn Surface,
    prompter: &mut dyn Prompter,
    now: DateTime<Utc>
  ) -> anyhow::Result<Outcome> {
    info!("command edit");
    let today = self.calendar.date_of(now);
    let Some(task) = self
      .resolve(target)
      .and_then(|id| self.store.get(&id))
      .cloned()
    else {
      return Ok(Outcome::Rejected(
        ValidationError::TaskNotFound(
          TaskId::new(target.trim())
        )
      ));
    };

    // Completed tasks never reach the
    // dialog.
    if task.completed {
      return Ok(Outcome::Rejected(
        ValidationError::EditOnCompletedTask
      ));
    }

    let name = match name {
      | Some(name) => name,
      | None => {
        prompter.ask("Name", &task.name)?
      }
    };
    let due_date = match due_date {
      | Some(due) => due,
      | None => {
        prompter.ask(
          "Due date",
          &format_due_date(task.due_date)
        )?
      }
    };

    match self.store.edit(
      &task.id, &name, &due_date, today
    ) {
      | Ok(EditOutcome::Updated) => {
        self.commit(surface, now)?;
        surface.notify(Notice::success(
          "Task updated."
        ));
        Ok(Outcome::Applied)
      }
      | Ok(EditOutcome::Unchanged) => {
        surface.notify(Notice::info(
          "No changes saved."
        ));
        Ok(Outcome::Unchanged)
      }
      | Err(err) => Ok(Outcome::Rejected(err))
    }
  }

  fn toggle_complete(
    &mut self,
    target: &str,
    surface: &mut dyn Surface,
    now: DateTime<Utc>
  ) -> anyhow::Result<Outcome> {
    info!("command toggle");
    let id = match self.resolve(target) {
      | Some(id) => id,
      | None => {
        return Ok(Outcome::Rejected(
          ValidationError::TaskNotFound(
            TaskId::new(target.trim())
          )
        ));
      }
    };

    let completed =
      match self.store.toggle_complete(&id) {
        | Ok(completed) => completed,
        | Err(err) => {
          return Ok(Outcome::Rejected(err));
        }
      };

    self.commit(surface, now)?;
    surface.notify(Notice::success(
      if completed {
        "Task marked as completed."
      } else {
        "Task marked as pending."
      }
    ));
    Ok(Outcome::Applied)
  }

  fn delete(
    &mut self,
    target: &str,
    surface: &mut dyn Surface,
    now: DateTime<Utc>
  ) -> anyhow::Result<Outcome> {
    info!("command delete");
    let removed = self
      .resolve(target)
      .and_then(|id| self.store.delete(&id));

    if removed.is_none() {
      debug!(requested = %target, "nothing to delete");
      surface.notify(Notice::info(
        "No matching task."
      ));
      return Ok(Outcome::Unchanged);
    }

    self.commit(surface, now)?;
    surface.notify(Notice::success(
      "Task deleted."
    ));
    Ok(Outcome::Applied)
  }

  fn delete_all(
    &mut self,
    assume_yes: bool,
    surface: &mut dyn Surface,
    prompter: &mut dyn Prompter,
    now: DateTime<Utc>
  ) -> anyhow::Result<Outcome> {
    info!("command delete-all");
    if self.store.is_empty() {
      surface.notify(Notice::info(
        "No tasks to delete."
      ));
      return Ok(Outcome::Unchanged);
    }

    if self.confirm && !assume_yes {
      let question = format!(
        "Delete all {} task(s)?",
        self.store.len()
      );
      if !prompter.confirm(&question)? {
        surface.notify(Notice::info(
          "Cancelled."
        ));
        return Ok(Outcome::Cancelled);
      }
    }

    self.store.delete_all();
    self.commit(surface, now)?;
    surface.notify(Notice::success(
      "All tasks deleted."
    ));
    Ok(Outcome::Applied)
  }

  fn resolve(
    &self,
    target: &str
  ) -> Option<TaskId> {
    self.store.resolve_target(target)
  }

  fn render(
    &self,
    surface: &mut dyn Surface,
    now: DateTime<Utc>
  ) -> anyhow::Result<()> {
    let today = self.calendar.date_of(now);
    surface.show_rows(
      &self.store.rows(today),
      self.store.filter(),
      self.store.sort()
    )
  }

  fn commit(
    &mut self,
    surface: &mut dyn Surface,
    now: DateTime<Utc>
  ) -> anyhow::Result<()> {
    self.render(surface, now)?;
    self.store.save(&mut self.storage)
  }
}
