//! Machine-readable run results in JSON or JSON Lines.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::pipeline::mover::MoveRecord;
use crate::types::ImageOutcome;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// A single JSON array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// One image's outcome joined with where it was (or would be) moved.
#[derive(Debug, Serialize)]
pub struct OutcomeRecord<'a> {
    #[serde(flatten)]
    pub outcome: &'a ImageOutcome,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<&'a Path>,
}

/// Pair every outcome with its move destination, in outcome order.
pub fn records<'a>(outcomes: &'a [ImageOutcome], moves: &'a [MoveRecord]) -> Vec<OutcomeRecord<'a>> {
    let destinations: HashMap<&PathBuf, &Path> = moves
        .iter()
        .map(|m| (&m.source, m.destination.as_path()))
        .collect();

    outcomes
        .iter()
        .map(|outcome| OutcomeRecord {
            outcome,
            destination: destinations.get(&outcome.path).copied(),
        })
        .collect()
}

/// Serializes run results to a writer.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    /// Write one record per outcome and flush. Returns the record count.
    pub fn write_run(&mut self, outcomes: &[ImageOutcome], moves: &[MoveRecord]) -> io::Result<usize> {
        let records = records(outcomes, moves);
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut self.writer, &records).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
            OutputFormat::JsonLines => {
                for record in &records {
                    serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
                    writeln!(self.writer)?;
                }
            }
        }
        self.writer.flush()?;
        Ok(records.len())
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Classification;

    fn sample() -> (Vec<ImageOutcome>, Vec<MoveRecord>) {
        let outcomes = vec![
            ImageOutcome::new(
                PathBuf::from("/p/a.jpg"),
                Classification::Categorized {
                    category: "ocean".to_string(),
                    confidence: 0.5,
                },
            ),
            ImageOutcome::new(PathBuf::from("/p/b.jpg"), Classification::failed("truncated")),
        ];
        let moves = vec![MoveRecord {
            source: PathBuf::from("/p/a.jpg"),
            destination: PathBuf::from("/p/ocean/a.jpg"),
            category: "ocean".to_string(),
        }];
        (outcomes, moves)
    }

    #[test]
    fn test_write_jsonl() {
        let (outcomes, moves) = sample();
        let mut writer = OutputWriter::new(Vec::new(), OutputFormat::JsonLines);
        assert_eq!(writer.write_run(&outcomes, &moves).unwrap(), 2);

        let output = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["destination"], "/p/ocean/a.jpg");
        assert_eq!(lines[0]["category"], "ocean");
        assert_eq!(lines[1]["status"], "skipped");
        assert!(lines[1].get("destination").is_none());
    }

    #[test]
    fn test_write_json_array() {
        let (outcomes, moves) = sample();
        let mut writer = OutputWriter::new(Vec::new(), OutputFormat::Json);
        writer.write_run(&outcomes, &moves).unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[1]["reason"]["message"], "truncated");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("jsonl"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("NDJSON"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("csv"), None);
    }
}
