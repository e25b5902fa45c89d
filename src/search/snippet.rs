//! Context snippets around the first matching line of a file.
use crate::query::split_terms;
use log::debug;
use regex::{Regex, RegexBuilder};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

enum LineMatcher {
    Regex(Regex),
    Terms(Vec<String>),
}

impl LineMatcher {
    fn new(query_text: &str, use_regex: bool) -> Option<Self> {
        if use_regex {
            if query_text.is_empty() {
                return None;
            }
            let build = |pattern: &str| RegexBuilder::new(pattern).case_insensitive(true).build();
            let regex = build(query_text)
                .or_else(|_| build(&regex::escape(query_text)))
                .ok()?;
            return Some(LineMatcher::Regex(regex));
        }

        let terms: Vec<String> = split_terms(query_text)
            .iter()
            .map(|t| t.to_lowercase())
            .collect();
        (!terms.is_empty()).then_some(LineMatcher::Terms(terms))
    }

    fn is_match(&self, line: &str) -> bool {
        match self {
            LineMatcher::Regex(re) => re.is_match(line),
            LineMatcher::Terms(terms) => {
                let line = line.to_lowercase();
                terms.iter().any(|t| line.contains(t.as_str()))
            }
        }
    }
}

fn format_line(number: usize, line: &str, is_match: bool) -> String {
    let marker = if is_match { '>' } else { ' ' };
    format!("{marker} {number:>4} | {line}")
}

struct Lines<R> {
    reader: R,
    buf: Vec<u8>,
    number: usize,
}

impl<R: BufRead> Iterator for Lines<R> {
    type Item = (usize, String);

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.number += 1;
                let line = String::from_utf8_lossy(&self.buf);
                Some((self.number, line.trim_end_matches(['\n', '\r']).to_string()))
            }
            Err(e) => {
                debug!("Stopped reading for snippet: {e}");
                None
            }
        }
    }
}

/// The first line matching `query_text` with up to `context_lines` lines on
/// each side, numbered from 1. The matching line is marked with `>`.
///
/// Literal queries honour `" or "` alternatives; all matching ignores case.
/// An invalid regex is matched literally. Returns `None` when the file cannot
/// be read or nothing matches.
pub fn content_snippet(
    path: &Path,
    query_text: &str,
    context_lines: usize,
    use_regex: bool,
) -> Option<String> {
    let matcher = LineMatcher::new(query_text, use_regex)?;
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("Cannot open {} for snippet: {e}", path.display());
            return None;
        }
    };

    let mut lines = Lines {
        reader: BufReader::new(file),
        buf: Vec::new(),
        number: 0,
    };
    let mut before: VecDeque<(usize, String)> = VecDeque::with_capacity(context_lines + 1);

    while let Some((number, line)) = lines.next() {
        if matcher.is_match(&line) {
            let mut out: Vec<String> = before
                .iter()
                .map(|(n, l)| format_line(*n, l, false))
                .collect();
            out.push(format_line(number, &line, true));
            out.extend(
                lines
                    .by_ref()
                    .take(context_lines)
                    .map(|(n, l)| format_line(n, &l, false)),
            );
            return Some(out.join("\n"));
        }

        before.push_back((number, line));
        if before.len() > context_lines {
            before.pop_front();
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.py");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_snippet_with_context() {
        let (_dir, path) = write("one\ntwo\nthree SEARCH here\nfour\nfive\n");
        let snippet = content_snippet(&path, "search", 1, false).unwrap();
        assert_eq!(
            snippet,
            "     2 | two\n>    3 | three SEARCH here\n     4 | four"
        );
    }

    #[test]
    fn test_snippet_at_file_edges() {
        let (_dir, path) = write("match first\nsecond\n");
        let snippet = content_snippet(&path, "match", 3, false).unwrap();
        assert_eq!(snippet, ">    1 | match first\n     2 | second");
    }

    #[test]
    fn test_snippet_zero_context() {
        let (_dir, path) = write("a\nb target\nc\n");
        assert_eq!(
            content_snippet(&path, "target", 0, false).unwrap(),
            ">    2 | b target"
        );
    }

    #[test]
    fn test_snippet_or_terms_and_regex() {
        let (_dir, path) = write("# hello world\ndef search(): pass\n");
        let snippet = content_snippet(&path, "missing or def", 0, false).unwrap();
        assert!(snippet.contains("def search()"));
        let snippet = content_snippet(&path, r"def \w+\(\)", 0, true).unwrap();
        assert!(snippet.starts_with(">    2 |"));
        // Unbalanced parenthesis is matched literally.
        assert!(content_snippet(&path, "search(", 0, true).is_some());
    }

    #[test]
    fn test_snippet_not_found() {
        let (dir, path) = write("nothing here\n");
        assert!(content_snippet(&path, "absent", 2, false).is_none());
        assert!(content_snippet(&path, "", 2, false).is_none());
        assert!(content_snippet(&dir.path().join("missing"), "x", 2, false).is_none());
    }
}
