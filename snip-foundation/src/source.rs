use std::{fmt, ops::Range, sync::Arc};

use codespan_reporting::files::Files;

/// Byte range within a single source file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Span of syntax that does not come from any source file, such as declarations injected
    /// into a syntax tree after parsing.
    pub const EMPTY: Self = Self { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn to_range(self) -> Range<usize> {
        Range::from(self)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn join(&self, other: &Span) -> Span {
        if self.is_empty() {
            *other
        } else if other.is_empty() {
            *self
        } else {
            Span {
                start: self.start.min(other.start),
                end: self.end.max(other.end),
            }
        }
    }

    /// Returns whether `other` lies entirely within `self`.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn get_input<'a>(&self, input: &'a str) -> &'a str {
        input.get(self.to_range()).unwrap_or_default()
    }
}

impl From<Span> for Range<usize> {
    fn from(value: Span) -> Self {
        value.start..value.end
    }
}

impl From<Range<usize>> for Span {
    fn from(value: Range<usize>) -> Self {
        Self {
            start: value.start,
            end: value.end,
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&Range::from(*self), f)
    }
}

/// Implemented by all types that have a source code span attached.
pub trait Spanned {
    fn span(&self) -> Span;
}

impl Spanned for Span {
    fn span(&self) -> Span {
        *self
    }
}

impl<S> Spanned for Box<S>
where
    S: Spanned,
{
    fn span(&self) -> Span {
        (**self).span()
    }
}

impl<S> Spanned for Arc<S>
where
    S: Spanned,
{
    fn span(&self) -> Span {
        (**self).span()
    }
}

impl<S> Spanned for Vec<S>
where
    S: Spanned,
{
    fn span(&self) -> Span {
        self.first()
            .zip(self.last())
            .map(|(first, last)| first.span().join(&last.span()))
            .unwrap_or(Span::EMPTY)
    }
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub filename: String,
    pub source: Arc<str>,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(filename: impl Into<String>, source: impl Into<Arc<str>>) -> Self {
        let source = source.into();
        Self {
            filename: filename.into(),
            line_starts: codespan_reporting::files::line_starts(&source).collect(),
            source,
        }
    }

    fn line_start(&self, line_index: usize) -> Result<usize, codespan_reporting::files::Error> {
        use std::cmp::Ordering;

        match line_index.cmp(&self.line_starts.len()) {
            Ordering::Less => Ok(self.line_starts[line_index]),
            Ordering::Equal => Ok(self.source.len()),
            Ordering::Greater => Err(codespan_reporting::files::Error::LineTooLarge {
                given: line_index,
                max: self.line_starts.len() - 1,
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceFileSet {
    pub source_files: Vec<SourceFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceFileId(usize);

impl SourceFileSet {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add(&mut self, file: SourceFile) -> SourceFileId {
        let id = SourceFileId(self.source_files.len());
        self.source_files.push(file);
        id
    }

    pub fn get(&self, id: SourceFileId) -> &SourceFile {
        &self.source_files[id.0]
    }

    pub fn source(&self, id: SourceFileId) -> &str {
        &self.get(id).source
    }

    /// Returns the source text covered by `span` inside the file `id`.
    pub fn span(&self, id: SourceFileId, span: &impl Spanned) -> &str {
        span.span().get_input(self.source(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceFileId, &'_ SourceFile)> {
        self.source_files
            .iter()
            .enumerate()
            .map(|(index, file)| (SourceFileId(index), file))
    }
}

impl<'f> Files<'f> for SourceFileSet {
    type FileId = SourceFileId;
    type Name = &'f str;
    type Source = &'f str;

    fn name(&'f self, id: Self::FileId) -> Result<Self::Name, codespan_reporting::files::Error> {
        self.source_files
            .get(id.0)
            .map(|file| file.filename.as_str())
            .ok_or(codespan_reporting::files::Error::FileMissing)
    }

    fn source(
        &'f self,
        id: Self::FileId,
    ) -> Result<Self::Source, codespan_reporting::files::Error> {
        self.source_files
            .get(id.0)
            .map(|file| &*file.source)
            .ok_or(codespan_reporting::files::Error::FileMissing)
    }

    fn line_index(
        &'f self,
        id: Self::FileId,
        byte_index: usize,
    ) -> Result<usize, codespan_reporting::files::Error> {
        let file = self
            .source_files
            .get(id.0)
            .ok_or(codespan_reporting::files::Error::FileMissing)?;
        Ok(file
            .line_starts
            .binary_search(&byte_index)
            .unwrap_or_else(|next_line| next_line - 1))
    }

    fn line_range(
        &'f self,
        id: Self::FileId,
        line_index: usize,
    ) -> Result<std::ops::Range<usize>, codespan_reporting::files::Error> {
        let file = self
            .source_files
            .get(id.0)
            .ok_or(codespan_reporting::files::Error::FileMissing)?;
        let line_start = file.line_start(line_index)?;
        let next_line_start = file.line_start(line_index + 1)?;
        Ok(line_start..next_line_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joining_with_an_empty_span_keeps_the_other_side() {
        let span = Span::new(4, 9);
        assert_eq!(span.join(&Span::EMPTY), span);
        assert_eq!(Span::EMPTY.join(&span), span);
        assert_eq!(span.join(&Span::new(1, 5)), Span::new(1, 9));
    }

    #[test]
    fn span_text_is_sliced_from_the_right_file() {
        let mut set = SourceFileSet::new();
        let _first = set.add(SourceFile::new("a.snip", "first file"));
        let second = set.add(SourceFile::new("b.snip", "int x = 1;"));
        assert_eq!(set.span(second, &Span::new(4, 5)), "x");
        assert_eq!(set.span(second, &Span::new(40, 50)), "");
    }

    #[test]
    fn line_lookup_follows_line_starts() {
        let mut set = SourceFileSet::new();
        let id = set.add(SourceFile::new("a.snip", "one\ntwo\nthree"));
        assert_eq!(set.line_index(id, 0).unwrap(), 0);
        assert_eq!(set.line_index(id, 5).unwrap(), 1);
        assert_eq!(set.line_range(id, 2).unwrap(), 8..13);
    }
}
