use super::LINE_PREFIX;

/// A logical line inside the scan window.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line<'a> {
    /// 1-based line number.
    pub number: usize,
    /// Byte offset of the first byte of the line.
    pub start: usize,
    /// Byte offset just past the line terminator (or end of content).
    pub end: usize,
    /// Line bytes without the `\n`.
    pub text: &'a [u8],
}

impl Line<'_> {
    /// Whether the trimmed line starts with `// signature|`.
    pub fn is_signature(&self) -> bool {
        self.text.trim_ascii().starts_with(LINE_PREFIX)
    }
}

/// Iterates `\n`-separated lines, stopping after `max_lines`.
pub(crate) struct WindowLines<'a> {
    content: &'a [u8],
    pos: usize,
    seen: usize,
    max_lines: usize,
}

impl<'a> WindowLines<'a> {
    pub fn new(content: &'a [u8], max_lines: usize) -> Self {
        Self {
            content,
            pos: 0,
            seen: 0,
            max_lines,
        }
    }

    /// Offset of the first byte not yet yielded.
    pub fn offset(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for WindowLines<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Line<'a>> {
        if self.pos >= self.content.len() || self.seen >= self.max_lines {
            return None;
        }

        let content: &'a [u8] = self.content;
        let rest = &content[self.pos..];
        let (len, terminator) = match rest.iter().position(|&b| b == b'\n') {
            Some(idx) => (idx, 1),
            None => (rest.len(), 0),
        };

        let start = self.pos;
        self.pos += len + terminator;
        self.seen += 1;

        Some(Line {
            number: self.seen,
            start,
            end: self.pos,
            text: &rest[..len],
        })
    }
}
