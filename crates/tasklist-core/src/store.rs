use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use serde::Serialize;
use serde_json::Value;
use tracing::{
  debug,
  info,
  instrument
};

use crate::datastore::SlotStorage;
use crate::error::ValidationError;
use crate::task::{
  Task,
  TaskFields,
  TaskId
};
use crate::view::{
  SortKey,
  SortState,
  StatusFilter,
  ViewRow,
  derive_rows,
  visible_tasks
};

pub const TASKS_SLOT: &str = "todoTasks";
pub const FORMAT_VERSION: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
  Updated,
  Unchanged
}

#[derive(Serialize)]
struct Envelope<'a> {
  version: u64,
  tasks:   &'a [Task]
}

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
  tasks:  Vec<Task>,
  filter: StatusFilter,
  sort:   SortState
}

impl TaskStore {
  pub fn with_tasks(
    tasks: Vec<Task>,
    sort: SortState
  ) -> Self {
    Self {
      tasks,
      filter: StatusFilter::All,
      sort
    }
  }

  #[instrument(skip(storage))]
  pub fn load<S>(
    storage: &S,
    sort: SortState
  ) -> anyhow::Result<Self>
  where
    S: SlotStorage + ?Sized
  {
    let tasks = match storage
      .get_item(TASKS_SLOT)?
    {
      | Some(raw) => {
        decode_tasks(&raw).with_context(
          || {
            format!(
              "failed to decode slot \
               {TASKS_SLOT}"
            )
          }
        )?
      }
      | None => vec![]
    };

    info!(
      count = tasks.len(),
      "loaded tasks"
    );
    Ok(Self::with_tasks(tasks, sort))
  }

  #[instrument(skip(self, storage), fields(count = self.tasks.len()))]
  pub fn save<S>(
    &self,
    storage: &mut S
  ) -> anyhow::Result<()>
  where
    S: SlotStorage + ?Sized
  {
    let payload = encode_tasks(&self.tasks)?;
    storage.set_item(TASKS_SLOT, &payload)?;
    debug!("saved tasks");
    Ok(())
  }

  #[instrument(skip(self, now))]
  pub fn add(
    &mut self,
    name: &str,
    due_date: &str,
    today: NaiveDate,
    now: DateTime<Utc>
  ) -> Result<&Task, ValidationError> {
    let fields = TaskFields::validate(
      name, due_date, today
    )?;
    let id = TaskId::generate(
      now,
      self.tasks.iter().map(|t| &t.id)
    );

    debug!(id = %id, "task added");
    self.tasks.push(Task::new(id, fields));
    let idx = self.tasks.len() - 1;
    Ok(&self.tasks[idx])
  }

  #[instrument(skip(self))]
  pub fn edit(
    &mut self,
    id: &TaskId,
    name: &str,
    due_date: &str,
    today: NaiveDate
  ) -> Result<EditOutcome, ValidationError>
  {
    let task = self
      .tasks
      .iter_mut()
      .find(|task| task.id == *id)
      .ok_or_else(|| {
        ValidationError::TaskNotFound(
          id.clone()
        )
      })?;

    if task.completed {
      return Err(
        ValidationError::EditOnCompletedTask
      );
    }

    let fields = TaskFields::validate(
      name, due_date, today
    )?;
    if task.matches_fields(&fields) {
      debug!("edit left task unchanged");
      return Ok(EditOutcome::Unchanged);
    }

    task.name = fields.name;
    task.due_date = fields.due_date;
    Ok(EditOutcome::Updated)
  }

  #[instrument(skip(self))]
  pub fn toggle_complete(
    &mut self,
    id: &TaskId
  ) -> Result<bool, ValidationError> {
    let task = self
      .tasks
      .iter_mut()
      .find(|task| task.id == *id)
      .ok_or_else(|| {
        ValidationError::TaskNotFound(
          id.clone()
        )
      })?;
    task.completed = !task.completed;
    Ok(task.completed)
  }

  #[instrument(skip(self))]
  pub fn delete(
    &mut self,
    id: &TaskId
  ) -> Option<Task> {
    let idx = self
      .tasks
      .iter()
      .position(|task| task.id == *id)?;
    Some(self.tasks.remove(idx))
  }

  #[instrument(skip(self))]
  pub fn delete_all(&mut self) -> usize {
    let removed = self.tasks.len();
    self.tasks.clear();
    self.filter = StatusFilter::All;
    info!(removed, "deleted all tasks");
    removed
  }

  pub fn cycle_filter(
    &mut self
  ) -> StatusFilter {
    self.filter = self.filter.next();
    self.filter
  }

  pub fn set_filter(
    &mut self,
    filter: StatusFilter
  ) {
    self.filter = filter;
  }

  pub fn select_sort(
    &mut self,
    key: SortKey
  ) -> SortState {
    self.sort.select(key);
    self.sort
  }

  pub fn set_sort(
    &mut self,
    sort: SortState
  ) {
    self.sort = sort;
  }

  pub fn filter(&self) -> StatusFilter {
    self.filter
  }

  pub fn sort(&self) -> SortState {
    self.sort
  }

  pub fn tasks(&self) -> &[Task] {
    &self.tasks
  }

  pub fn get(
    &self,
    id: &TaskId
  ) -> Option<&Task> {
    self.tasks.iter().find(|t| t.id == *id)
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  pub fn rows(
    &self,
    today: NaiveDate
  ) -> Vec<ViewRow> {
    derive_rows(
      &self.tasks,
      self.filter,
      self.sort,
      today
    )
  }

  /// A full task id, or a 1-based position
  /// in the list as currently displayed.
  pub fn resolve_target(
    &self,
    target: &str
  ) -> Option<TaskId> {
    let target = target.trim();
    if let Some(task) = self
      .tasks
      .iter()
      .find(|t| t.id.as_str() == target)
    {
      return Some(task.id.clone());
    }

    let position =
      target.parse::<usize>().ok()?;
    let shown = visible_tasks(
      &self.tasks,
      self.filter,
      self.sort
    );
    position
      .checked_sub(1)
      .and_then(|idx| shown.get(idx))
      .map(|task| task.id.clone())
  }
}

fn encode_tasks(
  tasks: &[Task]
) -> anyhow::Result<String> {
  serde_json::to_string(&Envelope {
    version: FORMAT_VERSION,
    tasks
  })
  .context("failed to encode tasks")
}

fn decode_tasks(
  raw: &str
) -> anyhow::Result<Vec<Task>> {
  if raw.trim().is_empty() {
    return Ok(vec![]);
  }

  let value: Value =
    serde_json::from_str(raw)?;
  let tasks = match value {
    | Value::Array(items) => {
      debug!("decoding unversioned task list");
      Value::Array(items)
    }
    | Value::Object(mut map) => {
      let version = map
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| {
          anyhow!(
            "task envelope has no \
             version"
          )
        })?;
      if version > FORMAT_VERSION {
        return Err(anyhow!(
          "task format version \
           {version} is newer than \
           supported version \
           {FORMAT_VERSION}"
        ));
      }
      map.remove("tasks").ok_or_else(|| {
        anyhow!(
          "task envelope has no tasks"
        )
      })?
    }
    | other => {
      return Err(anyhow!(
        "unexpected task payload: \
         {other}"
      ));
    }
  };

  Ok(serde_json::from_value(tasks)?)
}

#[cfg(test)]
mod tests {
  use chrono::{
    Duration,
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    EditOutcome,
    TASKS_SLOT,
    TaskStore
  };
  use crate::datastore::{
    MemoryStore,
    SlotStorage
  };
  use crate::datetime::format_due_date;
  use crate::error::ValidationError;
  use crate::task::TaskId;
  use crate::view::{
    SortState,
    StatusFilter,
    visible_tasks
  };

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 17)
      .expect("valid date")
  }

  fn tomorrow() -> String {
    format_due_date(
      today() + Duration::days(1)
    )
  }

  fn now() -> chrono::DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2026, 2, 17, 12, 0, 0
      )
      .single()
      .expect("valid now")
  }

  fn store_with(
    names: &[&str]
  ) -> TaskStore {
    let mut store = TaskStore::default();
    for name in names {
      store
        .add(name, &tomorrow(), today(), now())
        .expect("add task");
    }
    store
  }

  fn first_id(store: &TaskStore) -> TaskId {
    store.tasks()[0].id.clone()
  }

  #[test]
  fn invalid_adds_leave_store_unchanged() {
    let mut store = store_with(&["keep"]);
    assert_eq!(
      store
        .add("", &tomorrow(), today(), now())
        .err(),
      Some(ValidationError::EmptyName)
    );
    assert_eq!(
      store
        .add("x", "", today(), now())
        .err(),
      Some(ValidationError::EmptyDueDate)
    );
    assert_eq!(
      store
        .add(
          "x",
          "2026-02-16",
          today(),
          now()
        )
        .err(),
      Some(ValidationError::PastDueDate)
    );
    assert_eq!(store.len(), 1);
  }

  #[test]
  fn valid_add_appends_pending_task() {
    let mut store = store_with(&[]);
    let task = store
      .add(
        "Buy milk",
        &tomorrow(),
        today(),
        now()
      )
      .expect("add task")
      .clone();
    assert_eq!(store.len(), 1);
    assert!(!task.completed);
    assert_eq!(task.name, "Buy milk");
  }

  #[test]
  fn same_millisecond_adds_get_distinct_ids()
  {
    let store = store_with(&["a", "b"]);
    assert_ne!(
      store.tasks()[0].id,
      store.tasks()[1].id
    );
  }

  #[test]
  fn toggle_twice_restores_flag() {
    let mut store = store_with(&["a"]);
    let id = first_id(&store);
    assert_eq!(
      store.toggle_complete(&id),
      Ok(true)
    );
    assert_eq!(
      store.toggle_complete(&id),
      Ok(false)
    );
    assert_eq!(
      store.toggle_complete(&TaskId::new(
        "missing"
      )),
      Err(ValidationError::TaskNotFound(
        TaskId::new("missing")
      ))
    );
  }

  #[test]
  fn completed_tasks_reject_edits() {
    let mut store = store_with(&["a"]);
    let id = first_id(&store);
    store
      .toggle_complete(&id)
      .expect("toggle");
    assert_eq!(
      store.edit(
        &id,
        "renamed",
        &tomorrow(),
        today()
      ),
      Err(
        ValidationError::EditOnCompletedTask
      )
    );
    assert_eq!(store.tasks()[0].name, "a");
  }

  #[test]
  fn pending_edit_updates_both_fields() {
    let mut store = store_with(&["a"]);
    let id = first_id(&store);
    assert_eq!(
      store.edit(
        &id,
        "renamed",
        "2026-03-01",
        today()
      ),
      Ok(EditOutcome::Updated)
    );
    let task =
      store.get(&id).expect("task exists");
    assert_eq!(task.name, "renamed");
    assert_eq!(
      format_due_date(task.due_date),
      "2026-03-01"
    );
    assert!(!task.completed);
  }

  #[test]
  fn unchanged_edit_is_reported() {
    let mut store = store_with(&["a"]);
    let id = first_id(&store);
    assert_eq!(
      store.edit(
        &id,
        " a ",
        &tomorrow(),
        today()
      ),
      Ok(EditOutcome::Unchanged)
    );
  }

  #[test]
  fn invalid_edit_keeps_old_values() {
    let mut store = store_with(&["a"]);
    let id = first_id(&store);
    assert_eq!(
      store.edit(
        &id,
        "renamed",
        "2026-02-01",
        today()
      ),
      Err(ValidationError::PastDueDate)
    );
    assert_eq!(store.tasks()[0].name, "a");
  }

  #[test]
  fn delete_is_noop_for_unknown_ids() {
    let mut store = store_with(&["a", "b"]);
    assert!(
      store
        .delete(&TaskId::new("missing"))
        .is_none()
    );
    let id = first_id(&store);
    assert_eq!(
      store
        .delete(&id)
        .map(|task| task.name),
      Some("a".to_string())
    );
    assert_eq!(store.len(), 1);
  }

  #[test]
  fn delete_all_resets_filter() {
    let mut store = store_with(&["a", "b"]);
    store.cycle_filter();
    assert_eq!(
      store.filter(),
      StatusFilter::Pending
    );
    assert_eq!(store.delete_all(), 2);
    assert!(store.is_empty());
    assert_eq!(
      store.filter(),
      StatusFilter::All
    );
  }

  #[test]
  fn filters_sum_to_total() {
    let mut store =
      store_with(&["a", "b", "c"]);
    let id = first_id(&store);
    store
      .toggle_complete(&id)
      .expect("toggle");

    let mut counts = vec![];
    for _ in 0..3 {
      let filter = store.cycle_filter();
      counts.push((
        filter,
        visible_tasks(
          store.tasks(),
          filter,
          store.sort()
        )
        .len()
      ));
    }
    assert_eq!(
      counts,
      vec![
        (StatusFilter::Pending, 2),
        (StatusFilter::Completed, 1),
        (StatusFilter::All, 3)
      ]
    );
  }

  #[test]
  fn save_then_load_round_trips() {
    let mut store =
      store_with(&["a", "b", "c"]);
    let id = first_id(&store);
    store
      .toggle_complete(&id)
      .expect("toggle");

    let mut slots = MemoryStore::new();
    store.save(&mut slots).expect("save");
    let loaded = TaskStore::load(
      &slots,
      SortState::default()
    )
    .expect("load");
    assert_eq!(loaded.tasks(), store.tasks());
  }

  #[test]
  fn loads_unversioned_arrays() {
    let mut slots = MemoryStore::new();
    slots
      .set_item(
        TASKS_SLOT,
        r#"[{"id":"1700000000000","name":"Old","dueDate":"2023-11-14","completed":true}]"#
      )
      .expect("seed slot");
    let loaded = TaskStore::load(
      &slots,
      SortState::default()
    )
    .expect("load");
    assert_eq!(loaded.len(), 1);
    assert!(loaded.tasks()[0].completed);
  }

  #[test]
  fn rejects_newer_format_versions() {
    let mut slots = MemoryStore::new();
    slots
      .set_item(
        TASKS_SLOT,
        r#"{"version":99,"tasks":[]}"#
      )
      .expect("seed slot");
    assert!(
      TaskStore::load(
        &slots,
        SortState::default()
      )
      .is_err()
    );
  }

  #[test]
  fn rejects_envelopes_without_tasks() {
    let mut slots = MemoryStore::new();
    slots
      .set_item(TASKS_SLOT, r#"{"version":1}"#)
      .expect("seed slot");
    let err = TaskStore::load(
      &slots,
      SortState::default()
    )
    .expect_err("missing tasks key");
    assert!(
      format!("{err:#}").contains("no tasks")
    );
  }

  #[test]
  fn missing_slot_loads_empty() {
    let slots = MemoryStore::new();
    let loaded = TaskStore::load(
      &slots,
      SortState::default()
    )
    .expect("load");
    assert!(loaded.is_empty());
  }

  #[test]
  fn resolves_ids_and_positions() {
    let mut store = TaskStore::default();
    store
      .add("late", "2026-03-02", today(), now())
      .expect("add");
    store
      .add("early", "2026-03-01", today(), now())
      .expect("add");

    let late = first_id(&store);
    assert_eq!(
      store.resolve_target(late.as_str()),
      Some(late.clone())
    );
    assert_eq!(
      store
        .resolve_target("1")
        .and_then(|id| store.get(&id).cloned())
        .map(|task| task.name),
      Some("early".to_string())
    );
    assert_eq!(
      store.resolve_target("3"),
      None
    );
    assert_eq!(
      store.resolve_target("0"),
      None
    );
  }
}
