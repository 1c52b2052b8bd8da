//! What a dashboard command produces.
//!
//! Handlers return [`Output`] values instead of printing, so the same
//! handler can drive the shell and be inspected in tests.

use std::io::{self, Write};

/// Output from a dashboard command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Nothing to show.
    None,
    /// Neutral status message.
    Info(String),
    /// The command did what was asked.
    Success(String),
    /// The command was refused or had nothing to act on.
    Warning(String),
    /// The command failed.
    Error(String),
    /// Preformatted text such as a rendered table or chart.
    Text(String),
    /// Leave the dashboard.
    Quit,
    /// Several outputs, shown in order.
    Multiple(Vec<Output>),
}

impl Output {
    /// Creates an info message.
    pub fn info(msg: impl Into<String>) -> Self {
        Self::Info(msg.into())
    }

    /// Creates a success message.
    pub fn success(msg: impl Into<String>) -> Self {
        Self::Success(msg.into())
    }

    /// Creates a warning message.
    pub fn warning(msg: impl Into<String>) -> Self {
        Self::Warning(msg.into())
    }

    /// Creates an error message.
    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }

    /// Creates preformatted text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Returns true if this output, or any nested one, asks to quit.
    pub fn is_quit(&self) -> bool {
        match self {
            Self::Quit => true,
            Self::Multiple(outputs) => outputs.iter().any(Output::is_quit),
            _ => false,
        }
    }

    /// Returns true if this output, or any nested one, is an error.
    pub fn is_error(&self) -> bool {
        match self {
            Self::Error(_) => true,
            Self::Multiple(outputs) => outputs.iter().any(Output::is_error),
            _ => false,
        }
    }

    /// Concatenates all messages and text, without prefixes.
    pub fn plain_text(&self) -> String {
        let mut buffer = Vec::new();
        // Writing to a Vec cannot fail
        let _ = self.write_plain(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Writes the output for the terminal.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            Self::None | Self::Quit => Ok(()),
            Self::Info(msg) => writeln!(out, "{msg}"),
            Self::Success(msg) => writeln!(out, "✅ {msg}"),
            Self::Warning(msg) => writeln!(out, "⚠️  {msg}"),
            Self::Error(msg) => writeln!(out, "❌ {msg}"),
            Self::Text(text) => write!(out, "{text}"),
            Self::Multiple(outputs) => outputs.iter().try_for_each(|o| o.write_to(out)),
        }
    }

    fn write_plain<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            Self::None | Self::Quit => Ok(()),
            Self::Info(msg) | Self::Success(msg) | Self::Warning(msg) | Self::Error(msg) => {
                writeln!(out, "{msg}")
            }
            Self::Text(text) => write!(out, "{text}"),
            Self::Multiple(outputs) => outputs.iter().try_for_each(|o| o.write_plain(out)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_to_prefixes() {
        let output = Output::Multiple(vec![
            Output::success("loaded"),
            Output::text("a\nb\n"),
            Output::error("boom"),
        ]);
        let mut buffer = Vec::new();
        output.write_to(&mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "✅ loaded\na\nb\n❌ boom\n");
        assert_eq!(output.plain_text(), "loaded\na\nb\nboom\n");
    }

    #[test]
    fn test_nested_flags() {
        let output = Output::Multiple(vec![Output::info("bye"), Output::Quit]);
        assert!(output.is_quit());
        assert!(!output.is_error());
        assert!(Output::error("x").is_error());
        assert!(!Output::None.is_quit());
    }
}
