use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDate;

use crate::datetime::format_due_date;
use crate::task::{
  Task,
  TaskId
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum StatusFilter {
  #[default]
  All,
  Pending,
  Completed
}

impl StatusFilter {
  #[must_use]
  pub fn next(self) -> Self {
    match self {
      | Self::All => Self::Pending,
      | Self::Pending => Self::Completed,
      | Self::Completed => Self::All
    }
  }

  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Pending => !task.completed,
      | Self::Completed => task.completed
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Self::All => "FILTER",
      | Self::Pending => {
        "FILTER (Pending)"
      }
      | Self::Completed => {
        "FILTER (Completed)"
      }
    }
  }

  pub fn empty_message(
    self
  ) -> &'static str {
    match self {
      | Self::All => "No task found",
      | Self::Pending => {
        "No pending task found"
      }
      | Self::Completed => {
        "No completed task found"
      }
    }
  }
}

impl fmt::Display for StatusFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(match self {
      | Self::All => "ALL",
      | Self::Pending => "PENDING",
      | Self::Completed => "COMPLETED"
    })
  }
}

impl FromStr for StatusFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(Self::All),
      | "pending" => Ok(Self::Pending),
      | "completed" | "done" => {
        Ok(Self::Completed)
      }
      | other => {
        Err(anyhow!(
          "unknown filter: {other}"
        ))
      }
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum SortKey {
  Name,
  #[default]
  DueDate,
  Completed
}

impl SortKey {
  pub const ALL: [SortKey; 3] = [
    SortKey::Name,
    SortKey::DueDate,
    SortKey::Completed
  ];

  pub fn header(self) -> &'static str {
    match self {
      | Self::Name => "Name",
      | Self::DueDate => "Due",
      | Self::Completed => "Status"
    }
  }

  fn compare(
    self,
    a: &Task,
    b: &Task
  ) -> Ordering {
    match self {
      | Self::Name => {
        a.name
          .to_lowercase()
          .cmp(&b.name.to_lowercase())
      }
      | Self::DueDate => {
        a.due_date.cmp(&b.due_date)
      }
      | Self::Completed => {
        u8::from(a.completed)
          .cmp(&u8::from(b.completed))
      }
    }
  }
}

impl fmt::Display for SortKey {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(match self {
      | Self::Name => "name",
      | Self::DueDate => "dueDate",
      | Self::Completed => "completed"
    })
  }
}

impl FromStr for SortKey {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "name" => Ok(Self::Name),
      | "due" | "duedate" | "due-date"
      | "due_date" => Ok(Self::DueDate),
      | "completed" | "status" => {
        Ok(Self::Completed)
      }
      | other => {
        Err(anyhow!(
          "unknown sort key: {other}"
        ))
      }
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum SortDirection {
  #[default]
  Asc,
  Desc
}

impl SortDirection {
  #[must_use]
  pub fn flipped(self) -> Self {
    match self {
      | Self::Asc => Self::Desc,
      | Self::Desc => Self::Asc
    }
  }

  fn apply(
    self,
    ordering: Ordering
  ) -> Ordering {
    match self {
      | Self::Asc => ordering,
      | Self::Desc => ordering.reverse()
    }
  }
}

impl fmt::Display for SortDirection {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(match self {
      | Self::Asc => "asc",
      | Self::Desc => "desc"
    })
  }
}

impl FromStr for SortDirection {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "asc" => Ok(Self::Asc),
      | "desc" => Ok(Self::Desc),
      | other => {
        Err(anyhow!(
          "unknown sort direction: \
           {other}"
        ))
      }
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub struct SortState {
  pub key:       SortKey,
  pub direction: SortDirection
}

impl SortState {
  pub fn new(
    key: SortKey,
    direction: SortDirection
  ) -> Self {
    Self { key, direction }
  }

  pub fn select(&mut self, key: SortKey) {
    if self.key == key {
      self.direction =
        self.direction.flipped();
    } else {
      self.key = key;
      self.direction = SortDirection::Asc;
    }
  }

  pub fn compare(
    &self,
    a: &Task,
    b: &Task
  ) -> Ordering {
    self
      .direction
      .apply(self.key.compare(a, b))
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum RowStatus {
  Pending,
  Overdue,
  Completed
}

impl RowStatus {
  pub fn label(self) -> &'static str {
    match self {
      | Self::Pending => "Pending",
      | Self::Overdue => "OVERDUE",
      | Self::Completed => "Completed"
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
  pub position:       usize,
  pub id:             TaskId,
  pub name:           String,
  pub due_date:       NaiveDate,
  pub status:         RowStatus,
  pub overdue:        bool,
  pub edit_enabled:   bool,
  pub complete_label: &'static str
}

impl TaskRow {
  fn from_task(
    position: usize,
    task: &Task,
    today: NaiveDate
  ) -> Self {
    let overdue = task.is_overdue(today);
    let status = if task.completed {
      RowStatus::Completed
    } else if overdue {
      RowStatus::Overdue
    } else {
      RowStatus::Pending
    };

    Self {
      position,
      id: task.id.clone(),
      name: task.name.clone(),
      due_date: task.due_date,
      status,
      overdue,
      edit_enabled: !task.completed,
      complete_label: if task.completed {
        "Undo"
      } else {
        "Complete"
      }
    }
  }

  pub fn due_label(&self) -> String {
    format_due_date(self.due_date)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewRow {
  Task(TaskRow),
  Empty { message: &'static str }
}

pub fn visible_tasks<'a>(
  tasks: &'a [Task],
  filter: StatusFilter,
  sort: SortState
) -> Vec<&'a Task> {
  let mut shown: Vec<&Task> = tasks
    .iter()
    .filter(|task| filter.matches(task))
    .collect();
  shown.sort_by(|a, b| sort.compare(a, b));
  shown
}

#[tracing::instrument(skip(tasks))]
pub fn derive_rows(
  tasks: &[Task],
  filter: StatusFilter,
  sort: SortState,
  today: NaiveDate
) -> Vec<ViewRow> {
  let shown =
    visible_tasks(tasks, filter, sort);
  tracing::debug!(
    total = tasks.len(),
    shown = shown.len(),
    "derived view"
  );

  if shown.is_empty() {
    return vec![ViewRow::Empty {
      message: filter.empty_message()
    }];
  }

  shown
    .into_iter()
    .enumerate()
    .map(|(idx, task)| {
      ViewRow::Task(TaskRow::from_task(
        idx + 1,
        task,
        today
      ))
    })
    .collect()
}
