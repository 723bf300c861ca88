use thiserror::Error;

use crate::task::TaskId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("Task name must not be empty.")]
  EmptyName,

  #[error("Due date must not be empty.")]
  EmptyDueDate,

  #[error(
    "Due date must not be in the past."
  )]
  PastDueDate,

  #[error(
    "Due date must use YYYY-MM-DD, got \
     '{0}'."
  )]
  MalformedDueDate(String),

  #[error(
    "Completed tasks cannot be edited."
  )]
  EditOnCompletedTask,

  #[error("No task with id {0}.")]
  TaskNotFound(TaskId)
}

impl ValidationError {
  pub fn is_due_date_error(&self) -> bool {
    matches!(
      self,
      Self::EmptyDueDate
        | Self::PastDueDate
        | Self::MalformedDueDate(_)
    )
  }
}
