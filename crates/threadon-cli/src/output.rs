//! Colored terminal output for CLI commands.
//!
//! Uses `termcolor` for cross-platform colored terminal output.
//! Respects the `NO_COLOR` environment variable and the `--color` flag.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// One-line error report: `error: ` followed by the whole context chain
pub fn format_error(err: &anyhow::Error) -> String {
    format!("error: {:#}", err)
}

/// Styled output writer for the terminal
pub struct StyledOutput {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl StyledOutput {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }

    fn write_with(&mut self, text: &str, spec: &ColorSpec) {
        let _ = self.stdout.set_color(spec);
        let _ = write!(self.stdout, "{}", text);
        let _ = self.stdout.reset();
    }

    /// Write text with a foreground color, optionally bold
    pub fn write_styled(&mut self, text: &str, color: Option<Color>, bold: bool) {
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        self.write_with(text, &spec);
    }

    /// Green bold text.
    pub fn success(&mut self, text: &str) {
        self.write_styled(text, Some(Color::Green), true);
    }

    /// Red bold text.
    pub fn error(&mut self, text: &str) {
        self.write_styled(text, Some(Color::Red), true);
    }

    /// Yellow bold text.
    pub fn warning(&mut self, text: &str) {
        self.write_styled(text, Some(Color::Yellow), true);
    }

    /// Cyan text.
    pub fn info(&mut self, text: &str) {
        self.write_styled(text, Some(Color::Cyan), false);
    }

    /// Bold text in the default color.
    pub fn bold(&mut self, text: &str) {
        self.write_styled(text, None, true);
    }

    pub fn plain(&mut self, text: &str) {
        let _ = write!(self.stdout, "{}", text);
    }

    pub fn newline(&mut self) {
        let _ = writeln!(self.stdout);
    }

    pub fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    /// Section heading followed by a newline
    pub fn heading(&mut self, text: &str) {
        self.bold(text);
        self.newline();
    }

    /// Indented `label  value` row, label padded to a fixed width
    pub fn field(&mut self, label: &str, value: impl std::fmt::Display) {
        self.plain(&format!("  {:<16}", label));
        self.info(&value.to_string());
        self.newline();
    }

    /// " PASS " badge (green background, white text).
    pub fn pass_badge(&mut self) {
        let mut spec = ColorSpec::new();
        spec.set_bg(Some(Color::Green))
            .set_fg(Some(Color::White))
            .set_bold(true);
        self.write_with(" PASS ", &spec);
    }

    /// " FAIL " badge (red background, white text).
    pub fn fail_badge(&mut self) {
        let mut spec = ColorSpec::new();
        spec.set_bg(Some(Color::Red))
            .set_fg(Some(Color::White))
            .set_bold(true);
        self.write_with(" FAIL ", &spec);
    }

    /// Write an error message to stderr.
    pub fn stderr_error(&mut self, text: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Red)).set_bold(true);
        let _ = self.stderr.set_color(&spec);
        let _ = writeln!(self.stderr, "{}", text);
        let _ = self.stderr.reset();
    }
}
