mod sink;

pub use codespan_reporting::diagnostic::LabelStyle;
pub use codespan_reporting::diagnostic::Severity;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, NoColor, StandardStream};

use crate::source::{SourceFileId, SourceFileSet, Span, Spanned};

pub use sink::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub style: LabelStyle,
    pub span: Span,
    pub message: String,
    pub file: Option<SourceFileId>,
}

impl Label {
    pub fn new<O, M>(style: LabelStyle, span: &impl Spanned, message: O) -> Self
    where
        O: Into<Option<M>>,
        M: Into<String>,
    {
        let message = message.into();
        let message = message.map(|x| x.into());
        Self {
            style,
            span: span.span(),
            message: message.unwrap_or_default(),
            file: None,
        }
    }

    pub fn primary<O, M>(span: &impl Spanned, message: O) -> Self
    where
        O: Into<Option<M>>,
        M: Into<String>,
    {
        Self::new(LabelStyle::Primary, span, message)
    }

    pub fn secondary<O, M>(span: &impl Spanned, message: O) -> Self
    where
        O: Into<Option<M>>,
        M: Into<String>,
    {
        Self::new(LabelStyle::Secondary, span, message)
    }

    pub fn in_file(mut self, file: SourceFileId) -> Self {
        self.file = Some(file);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementSuggestion {
    pub span: Span,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub text: String,
    pub suggestion: Option<ReplacementSuggestion>,
}

impl From<String> for Note {
    fn from(text: String) -> Self {
        Self {
            text,
            suggestion: None,
        }
    }
}

impl From<(String, ReplacementSuggestion)> for Note {
    fn from((text, suggestion): (String, ReplacementSuggestion)) -> Self {
        Self {
            text,
            suggestion: Some(suggestion),
        }
    }
}

impl From<&str> for Note {
    fn from(text: &str) -> Self {
        Self::from(text.to_string())
    }
}

impl From<(&str, ReplacementSuggestion)> for Note {
    fn from((text, suggestion): (&str, ReplacementSuggestion)) -> Self {
        Self::from((text.to_string(), suggestion))
    }
}

/// A message produced by the compiler about a source file.
///
/// Diagnostics are plain data. Once emitted into a [`DiagnosticSink`] they are never modified,
/// only inspected (for their [`code`](Diagnostic::code)) and rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<String>,
    pub message: String,
    pub source_file: SourceFileId,
    pub labels: Vec<Label>,
    pub notes: Vec<Note>,
}

impl Diagnostic {
    pub fn new(severity: Severity, source_file: SourceFileId, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            source_file,
            labels: vec![],
            notes: vec![],
        }
    }

    pub fn bug(file: SourceFileId, error: impl ToString) -> Self {
        Self::new(Severity::Bug, file, error.to_string())
    }

    pub fn error(file: SourceFileId, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, file, message)
    }

    pub fn warning(file: SourceFileId, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, file, message)
    }

    pub fn note(file: SourceFileId, message: impl Into<String>) -> Self {
        Self::new(Severity::Note, file, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_note(mut self, note: impl Into<Note>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Returns whether the diagnostic prevents compilation from succeeding.
    pub fn is_error(&self) -> bool {
        self.severity >= Severity::Error
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }

    /// The span of the first primary label, if there is one.
    pub fn primary_span(&self) -> Option<Span> {
        self.labels
            .iter()
            .find(|label| label.style == LabelStyle::Primary)
            .map(|label| label.span)
    }

    pub fn emit_to_stderr(&self, files: &SourceFileSet) -> Result<(), codespan_reporting::files::Error> {
        term::emit(
            &mut StandardStream::stderr(ColorChoice::Auto),
            &term::Config::default(),
            files,
            &self.to_codespan(),
        )
    }

    /// Renders the diagnostic the same way [`emit_to_stderr`](Self::emit_to_stderr) would, but
    /// without colors and into a string.
    pub fn render(&self, files: &SourceFileSet) -> String {
        let mut buffer = NoColor::new(Vec::new());
        match term::emit(
            &mut buffer,
            &term::Config::default(),
            files,
            &self.to_codespan(),
        ) {
            Ok(()) => String::from_utf8_lossy(&buffer.into_inner()).into_owned(),
            // Spans that fall outside their file still deserve a readable message.
            Err(_) => format!("{}: {}\n", severity_name(self.severity), self.message),
        }
    }

    pub fn to_codespan(&self) -> codespan_reporting::diagnostic::Diagnostic<SourceFileId> {
        codespan_reporting::diagnostic::Diagnostic {
            severity: self.severity,
            code: self.code.clone(),
            message: self.message.clone(),
            labels: self
                .labels
                .iter()
                .map(|label| codespan_reporting::diagnostic::Label {
                    style: label.style,
                    file_id: label.file.unwrap_or(self.source_file),
                    range: label.span.to_range(),
                    message: label.message.clone(),
                })
                .collect(),
            notes: self
                .notes
                .iter()
                .map(|note| {
                    if let Some(sug) = &note.suggestion {
                        format!("{}: `{}`", note.text, sug.replacement)
                    } else {
                        note.text.clone()
                    }
                })
                .collect(),
        }
    }
}

fn severity_name(severity: Severity) -> &'static str {
    match severity {
        Severity::Bug => "bug",
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Note => "note",
        Severity::Help => "help",
    }
}

/// Renders all diagnostics one after another, in the order given.
pub fn render_all<'d>(
    files: &SourceFileSet,
    diagnostics: impl IntoIterator<Item = &'d Diagnostic>,
) -> String {
    diagnostics
        .into_iter()
        .map(|diagnostic| diagnostic.render(files))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::source::SourceFile;

    use super::*;

    #[test]
    fn rendered_text_carries_code_message_and_source() {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("fragment.snip", "return y + 1;"));
        let diagnostic = Diagnostic::error(file, "the name `y` does not exist in the current context")
            .with_code("E0103")
            .with_label(Label::primary(&Span::new(7, 8), ""));

        let text = diagnostic.render(&files);
        assert!(text.contains("error[E0103]"));
        assert!(text.contains("the name `y` does not exist"));
        assert!(text.contains("fragment.snip"));
        assert_eq!(diagnostic.primary_span(), Some(Span::new(7, 8)));
    }

    #[test]
    fn out_of_bounds_labels_still_render() {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("empty.snip", ""));
        let diagnostic =
            Diagnostic::error(file, "broken").with_label(Label::primary(&Span::new(10, 20), ""));
        assert!(diagnostic.render(&files).contains("broken"));
    }
}
