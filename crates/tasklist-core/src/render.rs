use std::io::{
  self,
  IsTerminal,
  Write
};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::notify::{
  Notice,
  NoticeLevel,
  Notifier
};
use crate::view::{
  RowStatus,
  SortDirection,
  SortKey,
  SortState,
  StatusFilter,
  TaskRow,
  ViewRow
};

#[derive(Debug, Clone)]
pub struct Renderer {
  color: bool
}

impl Renderer {
  pub fn new(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let color = cfg
      .get_bool("color")?
      .unwrap_or(true);
    if color && !io::stdout().is_terminal()
    {
      return Ok(Self::plain());
    }
    Ok(Self { color })
  }

  pub fn plain() -> Self {
    Self { color: false }
  }

  #[tracing::instrument(skip(self, rows))]
  pub fn print_rows(
    &mut self,
    rows: &[ViewRow],
    filter: StatusFilter,
    sort: SortState
  ) -> anyhow::Result<()> {
    let out = io::stdout().lock();
    self.write_rows(out, rows, filter, sort)
  }

  pub fn write_rows<W: Write>(
    &self,
    mut writer: W,
    rows: &[ViewRow],
    filter: StatusFilter,
    sort: SortState
  ) -> anyhow::Result<()> {
    writeln!(
      writer,
      "[{}]  sorted by {} {}",
      filter.label(),
      sort.key.header(),
      sort.direction
    )?;

    let mut headers =
      vec!["#".to_string()];
    headers.extend(
      SortKey::ALL
        .iter()
        .map(|key| header_label(*key, sort))
    );
    headers.push("Actions".to_string());

    let mut table_rows =
      Vec::with_capacity(rows.len());
    let mut notes = vec![];
    for row in rows {
      match row {
        | ViewRow::Task(task) => {
          table_rows.push(self.cells(task));
        }
        | ViewRow::Empty { message } => {
          notes.push(*message);
        }
      }
    }

    write_table(
      &mut writer,
      headers,
      table_rows
    )?;
    for note in notes {
      writeln!(writer, "{note}")?;
    }
    Ok(())
  }

  fn cells(
    &self,
    row: &TaskRow
  ) -> Vec<String> {
    let style = match row.status {
      | RowStatus::Completed => Some("2;9"),
      | RowStatus::Overdue => Some("31"),
      | RowStatus::Pending => None
    };
    let styled = |text: &str| match style {
      | Some(code) => self.paint(text, code),
      | None => text.to_string()
    };

    let edit = if row.edit_enabled {
      "Edit".to_string()
    } else {
      self.paint("-", "2")
    };
    let actions = format!(
      "{edit} {} Delete",
      row.complete_label
    );

    vec![
      self.paint(
        &row.position.to_string(),
        "33"
      ),
      styled(&row.name),
      styled(&row.due_label()),
      match row.status {
        | RowStatus::Overdue => {
          self.paint(row.status.label(), "1;31")
        }
        | _ => row.status.label().to_string()
      },
      actions,
    ]
  }

  fn paint(
    &self,
    text: &str,
    code: &str
  ) -> String {
    if !self.color {
      return text.to_string();
    }
    format!("\x1b[{code}m{text}\x1b[0m")
  }
}

impl Notifier for Renderer {
  fn notify(&mut self, notice: Notice) {
    let text = match notice.level {
      | NoticeLevel::Info => {
        notice.message.clone()
      }
      | NoticeLevel::Success => {
        self.paint(&notice.message, "32")
      }
      | NoticeLevel::Warning => {
        self.paint(&notice.message, "33")
      }
    };
    println!("{text}");
  }
}

fn header_label(
  key: SortKey,
  sort: SortState
) -> String {
  if key != sort.key {
    return key.header().to_string();
  }
  let marker = match sort.direction {
    | SortDirection::Asc => "^",
    | SortDirection::Desc => "v"
  };
  format!("{} {marker}", key.header())
}

fn write_table<W: Write>(
  mut writer: W,
  headers: Vec<String>,
  rows: Vec<Vec<String>>
) -> anyhow::Result<()> {
  let column_count = headers.len();
  let mut widths = vec![0usize; column_count];

  for (idx, header) in
    headers.iter().enumerate()
  {
    widths[idx] = widths[idx].max(
      UnicodeWidthStr::width(
        header.as_str()
      )
    );
  }

  for row in &rows {
    if row.len() != column_count {
      return Err(anyhow!(
        "row has {} cells, expected {}",
        row.len(),
        column_count
      ));
    }
    for (idx, cell) in
      row.iter().enumerate()
    {
      widths[idx] = widths[idx].max(
        UnicodeWidthStr::width(
          strip_ansi(cell).as_str()
        )
      );
    }
  }

  for idx in 0..column_count {
    write!(
      writer,
      "{:width$} ",
      headers[idx],
      width = widths[idx]
    )?;
  }
  writeln!(writer)?;

  for width in &widths {
    write!(
      writer,
      "{:-<width$} ",
      "",
      width = *width
    )?;
  }
  writeln!(writer)?;

  for row in rows {
    for (idx, cell) in
      row.iter().enumerate()
    {
      let visible_width =
        UnicodeWidthStr::width(
          strip_ansi(cell).as_str()
        );
      let padding = widths[idx]
        .saturating_sub(visible_width);
      write!(
        writer,
        "{}{} ",
        cell,
        " ".repeat(padding)
      )?;
    }
    writeln!(writer)?;
  }

  Ok(())
}

fn strip_ansi(s: &str) -> String {
  let mut out =
    String::with_capacity(s.len());
  let mut escaped = false;

  for ch in s.chars() {
    if escaped {
      if ch == 'm' {
        escaped = false;
      }
      continue;
    }

    if ch == '\x1b' {
      escaped = true;
      continue;
    }

    out.push(ch);
  }

  out
}
