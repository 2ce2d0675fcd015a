use serde::Serialize;
use thiserror::Error;

/// A directive line that cannot be merged into generated configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid directive {line:?}: {reason}")]
pub struct InvalidDirective {
    pub line: String,
    pub reason: &'static str,
}

/// Ordered directive lines contributed by a hook. Possibly empty.
///
/// Lines are checked on insertion, so a fragment handed to the host never
/// carries an embedded line break.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Fragment {
    lines: Vec<String>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, line: impl Into<String>) -> Result<Self, InvalidDirective> {
        self.push_line(line)?;
        Ok(self)
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> Result<(), InvalidDirective> {
        let line = line.into();
        if line.contains(['\n', '\r']) {
            return Err(InvalidDirective {
                line,
                reason: "directive lines must not contain line breaks",
            });
        }
        self.lines.push(line);
        Ok(())
    }

    pub fn append(&mut self, other: Fragment) {
        self.lines.extend(other.lines);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Renders the fragment as newline-terminated text.
    pub fn render(&self) -> String {
        self.lines.iter().fold(String::new(), |mut out, line| {
            out.push_str(line);
            out.push('\n');
            out
        })
    }
}

impl TryFrom<Vec<String>> for Fragment {
    type Error = InvalidDirective;

    fn try_from(lines: Vec<String>) -> Result<Self, Self::Error> {
        lines
            .into_iter()
            .try_fold(Fragment::new(), |fragment, line| fragment.push(line))
    }
}
