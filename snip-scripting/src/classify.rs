use snip_analysis::codes;
use snip_foundation::{errors::Diagnostic, source::Span};
use tracing::{trace, warn};

/// A name the compiler could not find, recovered from an unresolved name diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedName {
    pub name: String,
    pub span: Span,
}

/// Diagnostics of one compile pass, sorted by what the pipeline does with them.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Errors about names that a resolver may be able to supply.
    pub unresolved: Vec<(UnresolvedName, Diagnostic)>,
    /// Everything else, warnings included. Any of these left after the final compile fails it.
    pub other: Vec<Diagnostic>,
}

impl Classification {
    /// Returns whether the pass reported anything at all.
    pub fn has_diagnostics(&self) -> bool {
        !self.unresolved.is_empty() || !self.other.is_empty()
    }

    pub fn unresolved_names(&self) -> impl Iterator<Item = &UnresolvedName> {
        self.unresolved.iter().map(|(name, _)| name)
    }

    /// All diagnostics, unresolved names first.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.unresolved
            .into_iter()
            .map(|(_, diagnostic)| diagnostic)
            .chain(self.other)
            .collect()
    }
}

/// Partitions diagnostics reported against `source`.
pub fn classify(diagnostics: Vec<Diagnostic>, source: &str) -> Classification {
    let mut classification = Classification::default();
    for diagnostic in diagnostics {
        if !diagnostic.is_error() {
            warn!("{}", diagnostic.message);
        }
        let unresolved = (diagnostic.is_error() && diagnostic.has_code(codes::UNRESOLVED_NAME))
            .then(|| diagnostic.primary_span())
            .flatten()
            .map(|span| UnresolvedName {
                name: span.get_input(source).to_owned(),
                span,
            })
            .filter(|name| !name.name.is_empty());
        match unresolved {
            Some(name) => {
                trace!(name = %name.name, "unresolved name");
                classification.unresolved.push((name, diagnostic));
            }
            None => classification.other.push(diagnostic),
        }
    }
    classification
}

#[cfg(test)]
mod tests {
    use snip_foundation::{
        errors::Label,
        source::{SourceFile, SourceFileSet},
    };

    use super::*;

    #[test]
    fn unresolved_names_are_read_from_the_source() {
        let source = "return count + 1;";
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("fragment.snip", source));
        let span = Span::new(7, 12);

        let diagnostics = vec![
            Diagnostic::error(file, "the name `count` does not exist in the current context")
                .with_code(codes::UNRESOLVED_NAME)
                .with_label(Label::primary(&span, "")),
            Diagnostic::error(file, "mismatched types").with_code(codes::TYPE_MISMATCH),
            Diagnostic::warning(file, "empty statement"),
        ];
        let classification = classify(diagnostics, source);

        assert_eq!(
            classification.unresolved_names().collect::<Vec<_>>(),
            [&UnresolvedName {
                name: "count".into(),
                span
            }]
        );
        assert_eq!(classification.other.len(), 2);
        assert!(classification.has_diagnostics());
    }

    #[test]
    fn warnings_are_passed_through_with_other_diagnostics() {
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("fragment.snip", ";"));
        let classification = classify(vec![Diagnostic::warning(file, "empty statement")], ";");
        assert!(classification.unresolved.is_empty());
        assert!(classification.has_diagnostics());
        assert_eq!(classification.into_diagnostics().len(), 1);
    }

    #[test]
    fn unresolved_name_warnings_are_not_resolved() {
        let source = "count;";
        let mut files = SourceFileSet::new();
        let file = files.add(SourceFile::new("fragment.snip", source));
        let diagnostic = Diagnostic::warning(file, "the name `count` may be misspelled")
            .with_code(codes::UNRESOLVED_NAME)
            .with_label(Label::primary(&Span::new(0, 5), ""));
        let classification = classify(vec![diagnostic], source);
        assert!(classification.unresolved.is_empty());
        assert_eq!(classification.other.len(), 1);
    }
}
