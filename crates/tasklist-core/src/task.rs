use std::fmt;

use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};

use crate::datetime::{
  due_date_serde,
  ensure_not_past,
  parse_due_date
};
use crate::error::ValidationError;

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
  pub fn new(raw: impl Into<String>) -> Self {
    Self(raw.into())
  }

  pub fn generate<'a, I>(
    now: DateTime<Utc>,
    existing: I
  ) -> Self
  where
    I: IntoIterator<Item = &'a TaskId>
  {
    let candidate = now
      .timestamp_millis()
      .max(0) as u64;
    let largest = existing
      .into_iter()
      .filter_map(|id| {
        id.as_str().parse::<u64>().ok()
      })
      .max();

    // Never reuse or undercut an existing
    // numeric id, even with a clock that
    // went backwards.
    let id = match largest {
      | Some(max) if candidate <= max => {
        max.saturating_add(1)
      }
      | _ => candidate
    };

    Self(id.to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TaskId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct Task {
  pub id:        TaskId,
  pub name:      String,
  #[serde(
    rename = "dueDate",
    with = "due_date_serde"
  )]
  pub due_date:  NaiveDate,
  #[serde(default)]
  pub completed: bool
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
  pub name:     String,
  pub due_date: NaiveDate
}

impl TaskFields {
  // Checks run in the order users see
  // them reported: name, then an empty
  // date, then its shape, then the past.
  pub fn validate(
    name: &str,
    due_date: &str,
    today: NaiveDate
  ) -> Result<Self, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
      return Err(
        ValidationError::EmptyName
      );
    }

    let due_date =
      parse_due_date(due_date)?;
    ensure_not_past(due_date, today)?;

    Ok(Self {
      name: name.to_string(),
      due_date
    })
  }
}

impl Task {
  pub fn new(
    id: TaskId,
    fields: TaskFields
  ) -> Self {
    Self {
      id,
      name: fields.name,
      due_date: fields.due_date,
      completed: false
    }
  }

  pub fn is_overdue(
    &self,
    today: NaiveDate
  ) -> bool {
    !self.completed && self.due_date < today
  }

  pub fn matches_fields(
    &self,
    fields: &TaskFields
  ) -> bool {
    self.name == fields.name
      && self.due_date == fields.due_date
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    Task,
    TaskFields,
    TaskId
  };
  use crate::error::ValidationError;

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 17)
      .expect("valid date")
  }

  #[test]
  fn validation_reports_name_first() {
    assert_eq!(
      TaskFields::validate(
        "  ", "", today()
      ),
      Err(ValidationError::EmptyName)
    );
    assert_eq!(
      TaskFields::validate(
        "Buy milk", "", today()
      ),
      Err(ValidationError::EmptyDueDate)
    );
    assert_eq!(
      TaskFields::validate(
        "Buy milk",
        "2026-02-16",
        today()
      ),
      Err(ValidationError::PastDueDate)
    );
  }

  #[test]
  fn validation_trims_name() {
    let fields = TaskFields::validate(
      "  Buy milk ",
      "2026-02-18",
      today()
    )
    .expect("valid fields");
    assert_eq!(fields.name, "Buy milk");
  }

  #[test]
  fn generated_ids_skip_taken_values() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 17, 12, 0, 0
      )
      .single()
      .expect("valid now");
    let first =
      TaskId::generate(now, []);
    let second =
      TaskId::generate(now, [&first]);
    assert_eq!(
      first.as_str(),
      now.timestamp_millis().to_string()
    );
    assert_ne!(first, second);
  }

  #[test]
  fn generated_ids_stay_above_existing() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 17, 12, 0, 0
      )
      .single()
      .expect("valid now");
    let ms = now.timestamp_millis() as u64;
    let existing = [
      TaskId::new(ms.to_string()),
      TaskId::new((ms + 2).to_string())
    ];
    let next =
      TaskId::generate(now, &existing);
    let value: u64 = next
      .as_str()
      .parse()
      .expect("numeric id");
    assert!(value > ms + 2);

    let ahead = [TaskId::new(
      (ms + 10_000).to_string()
    )];
    let after_skew =
      TaskId::generate(now, &ahead);
    assert_eq!(
      after_skew.as_str(),
      (ms + 10_001).to_string()
    );
  }

  #[test]
  fn serializes_with_stored_field_names()
  {
    let fields = TaskFields::validate(
      "Buy milk",
      "2026-02-18",
      today()
    )
    .expect("valid fields");
    let task =
      Task::new(TaskId::new("1"), fields);
    let json = serde_json::to_value(&task)
      .expect("serialize task");
    assert_eq!(
      json,
      serde_json::json!({
        "id": "1",
        "name": "Buy milk",
        "dueDate": "2026-02-18",
        "completed": false
      })
    );
  }

  #[test]
  fn overdue_only_when_pending_and_past() {
    let fields = TaskFields {
      name:     "Old".to_string(),
      due_date: NaiveDate::from_ymd_opt(
        2026, 2, 1
      )
      .expect("valid date")
    };
    let mut task =
      Task::new(TaskId::new("1"), fields);
    assert!(task.is_overdue(today()));
    task.completed = true;
    assert!(!task.is_overdue(today()));
  }
}
