//! Output multiplexer types.

/// Which output stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// One captured line, tagged with the owning process's display label.
///
/// Produced by reader tasks, consumed once by the printer. Lines from a
/// single stream stay in order; the interleaving across processes is
/// whatever the queue saw first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub tag: String,
    pub text: String,
}

impl OutputLine {
    pub fn render(&self) -> String {
        format!("[{}] {}", self.tag, self.text)
    }
}
