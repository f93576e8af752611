//! Terminal rendering of lifecycle events.

use console::Style;
use std::io::Write;

use crate::events::{EventSink, LifecycleEvent};

/// Styles used by the console renderer.
///
/// `console` drops the styling by itself when colors are disabled.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Style for success messages (green).
    pub success: Style,
    /// Style for error messages (red bold).
    pub error: Style,
    /// Style for stage headings (magenta).
    pub info: Style,
    /// Style for progress lines (dim).
    pub dim: Style,
    /// Style for version numbers (bold).
    pub highlight: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

impl Theme {
    /// Create the default theme.
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            error: Style::new().red().bold(),
            info: Style::new().magenta(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
        }
    }
}

/// Renders each event as one styled line.
pub struct ConsoleSink<W: Write> {
    out: W,
    theme: Theme,
}

impl<W: Write> ConsoleSink<W> {
    /// Render to `out` with the default theme.
    pub fn new(out: W) -> Self {
        Self {
            out,
            theme: Theme::new(),
        }
    }

    /// Render with a custom theme.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    fn render(&self, event: &LifecycleEvent) -> String {
        match event {
            LifecycleEvent::Checking | LifecycleEvent::Extracting | LifecycleEvent::Installing => {
                format!("{} {}", self.theme.info.apply_to("›"), event)
            }
            LifecycleEvent::Found { version } => format!(
                "{} Found new version {}",
                self.theme.info.apply_to("›"),
                self.theme.highlight.apply_to(version)
            ),
            LifecycleEvent::Downloading { .. } => {
                format!("  {}", self.theme.dim.apply_to(event))
            }
            LifecycleEvent::UpToDate => {
                format!("{} {}", self.theme.success.apply_to("✓"), event)
            }
            LifecycleEvent::Error { .. } => {
                format!("{} {}", self.theme.error.apply_to("✗"), event)
            }
        }
    }
}

impl<W: Write> EventSink for ConsoleSink<W> {
    fn emit(&mut self, event: LifecycleEvent) {
        let line = self.render(&event);
        if let Err(e) = writeln!(self.out, "{}", line) {
            tracing::debug!("Could not write event to console: {}", e);
        }
    }
}

/// Writes each event as a single JSON object per line.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    /// Write to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: LifecycleEvent) {
        let written = serde_json::to_string(&event)
            .map_err(std::io::Error::other)
            .and_then(|line| writeln!(self.out, "{}", line));
        if let Err(e) = written {
            tracing::debug!("Could not write event as JSON: {}", e);
        }
    }
}
