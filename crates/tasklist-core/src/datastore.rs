use std::collections::BTreeMap;
use std::fs;
use std::io::{
  ErrorKind,
  Write
};
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tempfile::NamedTempFile;
use tracing::{
  debug,
  info
};

pub trait SlotStorage {
  fn get_item(
    &self,
    key: &str
  ) -> anyhow::Result<Option<String>>;

  fn set_item(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct DataStore {
  pub data_dir: PathBuf
}

impl DataStore {
  #[tracing::instrument(skip(data_dir))]
  pub fn open(
    data_dir: &Path
  ) -> anyhow::Result<Self> {
    let data_dir = data_dir.to_path_buf();
    fs::create_dir_all(&data_dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          data_dir.display()
        )
      })?;

    info!(
      data_dir = %data_dir.display(),
      "opened datastore"
    );

    Ok(Self { data_dir })
  }

  pub fn slot_path(
    &self,
    key: &str
  ) -> anyhow::Result<PathBuf> {
    validate_key(key)?;
    Ok(
      self
        .data_dir
        .join(format!("{key}.json"))
    )
  }
}

impl SlotStorage for DataStore {
  #[tracing::instrument(skip(self))]
  fn get_item(
    &self,
    key: &str
  ) -> anyhow::Result<Option<String>> {
    let path = self.slot_path(key)?;
    match fs::read_to_string(&path) {
      | Ok(raw) => {
        debug!(
          file = %path.display(),
          bytes = raw.len(),
          "read slot"
        );
        Ok(Some(raw))
      }
      | Err(err)
        if err.kind()
          == ErrorKind::NotFound =>
      {
        debug!(file = %path.display(), "slot not present");
        Ok(None)
      }
      | Err(err) => {
        Err(err).with_context(|| {
          format!(
            "failed reading {}",
            path.display()
          )
        })
      }
    }
  }

  #[tracing::instrument(skip(
    self, value
  ))]
  fn set_item(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    let path = self.slot_path(key)?;
    write_atomic(&path, value)
      .with_context(|| {
        format!(
          "failed to save slot {key}"
        )
      })
  }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  slots: BTreeMap<String, String>
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl SlotStorage for MemoryStore {
  fn get_item(
    &self,
    key: &str
  ) -> anyhow::Result<Option<String>> {
    Ok(self.slots.get(key).cloned())
  }

  fn set_item(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    self
      .slots
      .insert(key.to_string(), value.to_string());
    Ok(())
  }
}

fn validate_key(
  key: &str
) -> anyhow::Result<()> {
  let usable = !key.is_empty()
    && key.chars().all(|ch| {
      ch.is_ascii_alphanumeric()
        || ch == '-'
        || ch == '_'
    });
  if usable {
    Ok(())
  } else {
    Err(anyhow!(
      "invalid storage key: {key:?}"
    ))
  }
}

#[tracing::instrument(skip(path, payload))]
fn write_atomic(
  path: &Path,
  payload: &str
) -> anyhow::Result<()> {
  debug!(file = %path.display(), bytes = payload.len(), "saving slot atomically");

  let dir = path
    .parent()
    .unwrap_or_else(|| Path::new("."));
  let mut temp =
    NamedTempFile::new_in(dir)?;
  temp.write_all(payload.as_bytes())?;
  temp.flush()?;

  temp.persist(path).map_err(|err| {
    anyhow!(
      "failed to persist {}: {}",
      path.display(),
      err
    )
  })?;

  Ok(())
}
