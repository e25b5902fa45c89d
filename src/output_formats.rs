use crate::error::Result;
use crate::search::SearchResult;
use byte_unit::{Byte, UnitType};
use clap::ValueEnum;
use colored::*;
use serde_json::{json, Value};

/// Output format types
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One coloured line per result
    Text,
    /// A single JSON document, written once the search ends
    Json,
    /// One JSON object per line, written as results arrive
    Ndjson,
}

/// Renders results for the terminal or for machines.
pub struct OutputFormatter {
    format: OutputFormat,
    include_snippet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            include_snippet: true,
        }
    }

    pub fn with_snippet(mut self, include: bool) -> Self {
        self.include_snippet = include;
        self
    }

    /// Whether results can be printed as they arrive.
    pub fn is_streaming(&self) -> bool {
        self.format != OutputFormat::Json
    }

    /// One result in a streaming format.
    pub fn format_result(&self, result: &SearchResult) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(self.format_text(result)),
            OutputFormat::Json | OutputFormat::Ndjson => {
                Ok(serde_json::to_string(&self.to_value(result)?)?)
            }
        }
    }

    /// All results as one pretty JSON document.
    pub fn format_json(&self, query: &str, results: &[SearchResult], interrupted: bool) -> Result<String> {
        let results = results
            .iter()
            .map(|r| self.to_value(r))
            .collect::<Result<Vec<_>>>()?;
        let document = json!({
            "query": query,
            "total": results.len(),
            "interrupted": interrupted,
            "results": results,
        });
        Ok(serde_json::to_string_pretty(&document)?)
    }

    fn to_value(&self, result: &SearchResult) -> Result<Value> {
        let mut value = serde_json::to_value(result)?;
        if !self.include_snippet {
            if let Some(object) = value.as_object_mut() {
                object.remove("snippet");
            }
        }
        Ok(value)
    }

    fn format_text(&self, result: &SearchResult) -> String {
        let mut line = format!(
            "{}  {}  {}",
            result.path.display().to_string().bold(),
            human_size(result.size).cyan(),
            result.modified.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
        if self.include_snippet {
            if let Some(snippet) = &result.snippet {
                for snippet_line in snippet.lines() {
                    line.push_str("\n    ");
                    if snippet_line.starts_with('>') {
                        line.push_str(&snippet_line.yellow().to_string());
                    } else {
                        line.push_str(snippet_line);
                    }
                }
            }
        }
        line
    }
}

/// Size with a binary unit, e.g. `2.00 KiB`.
pub fn human_size(bytes: u64) -> String {
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{:.2} {}", adjusted.get_value(), adjusted.get_unit())
}
