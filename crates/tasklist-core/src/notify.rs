use std::fmt;

use crate::error::ValidationError;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum NoticeLevel {
  Info,
  Success,
  Warning
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub level:   NoticeLevel,
  pub message: String
}

impl Notice {
  pub fn info(
    message: impl Into<String>
  ) -> Self {
    Self {
      level:   NoticeLevel::Info,
      message: message.into()
    }
  }

  pub fn success(
    message: impl Into<String>
  ) -> Self {
    Self {
      level:   NoticeLevel::Success,
      message: message.into()
    }
  }

  pub fn warning(
    message: impl Into<String>
  ) -> Self {
    Self {
      level:   NoticeLevel::Warning,
      message: message.into()
    }
  }
}

impl From<&ValidationError> for Notice {
  fn from(err: &ValidationError) -> Self {
    Self::warning(err.to_string())
  }
}

impl fmt::Display for Notice {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(&self.message)
  }
}

pub trait Notifier {
  fn notify(&mut self, notice: Notice);
}

#[derive(Debug, Clone, Default)]
pub struct NoticeLog {
  pub notices: Vec<Notice>
}

impl Notifier for NoticeLog {
  fn notify(&mut self, notice: Notice) {
    self.notices.push(notice);
  }
}
