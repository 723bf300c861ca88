use std::io::{
  self,
  BufRead,
  Write
};

use anyhow::Context;

pub trait Prompter {
  fn confirm(
    &mut self,
    question: &str
  ) -> anyhow::Result<bool>;

  fn ask(
    &mut self,
    label: &str,
    current: &str
  ) -> anyhow::Result<String>;
}

// The shell reads its command lines
// through the same reader, so stdin is
// only ever locked once.
pub struct LinePrompter<R, W> {
  reader: R,
  writer: W
}

impl LinePrompter<io::StdinLock<'static>, io::Stderr> {
  pub fn stdio() -> Self {
    Self::new(io::stdin().lock(), io::stderr())
  }
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
  pub fn new(reader: R, writer: W) -> Self {
    Self { reader, writer }
  }

  pub fn read_line(
    &mut self,
    prompt: &str
  ) -> anyhow::Result<Option<String>> {
    write!(self.writer, "{prompt}")?;
    self.writer.flush()?;

    let mut line = String::new();
    let read = self
      .reader
      .read_line(&mut line)
      .context("failed to read input")?;
    if read == 0 {
      return Ok(None);
    }
    Ok(Some(
      line
        .trim_end_matches(['\r', '\n'])
        .to_string()
    ))
  }

  pub fn into_parts(self) -> (R, W) {
    (self.reader, self.writer)
  }
}

impl<R: BufRead, W: Write> Prompter
  for LinePrompter<R, W>
{
  fn confirm(
    &mut self,
    question: &str
  ) -> anyhow::Result<bool> {
    let answer = self
      .read_line(&format!("{question} [y/N] "))?
      .unwrap_or_default();
    Ok(matches!(
      answer
        .trim()
        .to_ascii_lowercase()
        .as_str(),
      "y" | "yes"
    ))
  }

  fn ask(
    &mut self,
    label: &str,
    current: &str
  ) -> anyhow::Result<String> {
    let answer = self
      .read_line(&format!("{label} [{current}]: "))?
      .unwrap_or_default();
    if answer.trim().is_empty() {
      Ok(current.to_string())
    } else {
      Ok(answer)
    }
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::{
    LinePrompter,
    Prompter
  };

  #[test]
  fn confirm_defaults_to_no() {
    let mut prompter = LinePrompter::new(
      Cursor::new("\nYES\nnope\n"),
      Vec::new()
    );
    assert!(
      !prompter.confirm("Sure?").expect("read")
    );
    assert!(
      prompter.confirm("Sure?").expect("read")
    );
    assert!(
      !prompter.confirm("Sure?").expect("read")
    );
    assert!(
      !prompter.confirm("Sure?").expect("eof")
    );
  }

  #[test]
  fn ask_keeps_current_on_blank() {
    let mut prompter = LinePrompter::new(
      Cursor::new("\nNew name\r\n"),
      Vec::new()
    );
    assert_eq!(
      prompter
        .ask("Name", "Old name")
        .expect("read"),
      "Old name"
    );
    assert_eq!(
      prompter
        .ask("Name", "Old name")
        .expect("read"),
      "New name"
    );

    let (_, written) = prompter.into_parts();
    assert_eq!(
      String::from_utf8(written)
        .expect("utf8"),
      "Name [Old name]: Name [Old name]: "
    );
  }
}
