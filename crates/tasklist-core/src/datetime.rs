use std::sync::OnceLock;

use chrono::{
  DateTime,
  Local,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

use crate::error::ValidationError;

pub const DUE_DATE_FORMAT: &str =
  "%Y-%m-%d";
pub const TIMEZONE_ENV_VAR: &str =
  "TASKLIST_TIMEZONE";

#[derive(Debug, Clone, Copy, Default)]
pub struct Calendar {
  zone: Option<Tz>
}

impl Calendar {
  pub fn local() -> Self {
    Self { zone: None }
  }

  pub fn in_zone(zone: Tz) -> Self {
    Self { zone: Some(zone) }
  }

  pub fn resolve(
    configured: Option<&str>
  ) -> Self {
    if let Ok(raw) =
      std::env::var(TIMEZONE_ENV_VAR)
      && let Some(tz) = parse_timezone(
        &raw,
        TIMEZONE_ENV_VAR
      )
    {
      return Self::in_zone(tz);
    }

    if let Some(raw) = configured
      && let Some(tz) =
        parse_timezone(raw, "config")
    {
      return Self::in_zone(tz);
    }

    Self::local()
  }

  #[must_use]
  pub fn date_of(
    &self,
    now: DateTime<Utc>
  ) -> NaiveDate {
    match self.zone {
      | Some(tz) => {
        now.with_timezone(&tz).date_naive()
      }
      | None => {
        now.with_timezone(&Local)
          .date_naive()
      }
    }
  }

  #[must_use]
  pub fn today(&self) -> NaiveDate {
    self.date_of(Utc::now())
  }
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

fn due_date_shape() -> Option<&'static Regex>
{
  static SHAPE: OnceLock<Option<Regex>> =
    OnceLock::new();
  SHAPE
    .get_or_init(|| {
      Regex::new(r"^\d{4}-\d{2}-\d{2}$")
        .map_err(|err| {
          tracing::error!(
            error = %err,
            "due date pattern failed to compile"
          );
        })
        .ok()
    })
    .as_ref()
}

// Fixed width only: `2025-1-3` is rejected
// so string order matches date order.
#[tracing::instrument(level = "trace")]
pub fn parse_due_date(
  input: &str
) -> Result<NaiveDate, ValidationError> {
  let token = input.trim();
  if token.is_empty() {
    return Err(
      ValidationError::EmptyDueDate
    );
  }

  let shaped = due_date_shape()
    .is_some_and(|re| re.is_match(token));
  if !shaped {
    return Err(
      ValidationError::MalformedDueDate(
        token.to_string()
      )
    );
  }

  NaiveDate::parse_from_str(
    token,
    DUE_DATE_FORMAT
  )
  .map_err(|_| {
    ValidationError::MalformedDueDate(
      token.to_string()
    )
  })
}

pub fn ensure_not_past(
  due: NaiveDate,
  today: NaiveDate
) -> Result<(), ValidationError> {
  if due < today {
    Err(ValidationError::PastDueDate)
  } else {
    Ok(())
  }
}

#[must_use]
pub fn format_due_date(
  date: NaiveDate
) -> String {
  date.format(DUE_DATE_FORMAT).to_string()
}

pub mod due_date_serde {
  use chrono::NaiveDate;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    date: &NaiveDate,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &super::format_due_date(*date)
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<NaiveDate, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    super::parse_due_date(&raw)
      .map_err(serde::de::Error::custom)
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
    Calendar,
    due_date_shape,
    ensure_not_past,
    format_due_date,
    parse_due_date
  };
  use crate::error::ValidationError;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn parses_fixed_width_dates() {
    assert_eq!(
      parse_due_date(" 2025-01-03 "),
      Ok(date(2025, 1, 3))
    );
    assert_eq!(
      format_due_date(date(2025, 1, 3)),
      "2025-01-03"
    );
  }

  #[test]
  fn shape_check_is_anchored() {
    let shape = due_date_shape()
      .expect("due date pattern compiles");
    assert!(shape.is_match("2025-01-03"));
    assert!(!shape.is_match("x2025-01-03"));
    assert_eq!(
      parse_due_date("2025-01-03T00:00"),
      Err(
        ValidationError::MalformedDueDate(
          "2025-01-03T00:00".to_string()
        )
      )
    );
  }

  #[test]
  fn rejects_empty_and_short_forms() {
    assert_eq!(
      parse_due_date("   "),
      Err(ValidationError::EmptyDueDate)
    );
    assert!(matches!(
      parse_due_date("2025-1-3"),
      Err(
        ValidationError::MalformedDueDate(
          _
        )
      )
    ));
    assert!(matches!(
      parse_due_date("2025-02-30"),
      Err(
        ValidationError::MalformedDueDate(
          _
        )
      )
    ));
  }

  #[test]
  fn today_is_not_past() {
    let today = date(2026, 2, 17);
    assert!(
      ensure_not_past(today, today).is_ok()
    );
    assert_eq!(
      ensure_not_past(
        date(2026, 2, 16),
        today
      ),
      Err(ValidationError::PastDueDate)
    );
  }

  #[test]
  fn zoned_calendar_uses_zone_date() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 2, 17, 3, 0, 0
      )
      .single()
      .expect("valid now");
    let calendar = Calendar::in_zone(
      chrono_tz::America::Mexico_City
    );
    assert_eq!(
      calendar.date_of(now),
      date(2026, 2, 16)
    );
  }
}
