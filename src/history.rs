//! Transcript archive and reporting.
//!
//! Every generated monologue is appended to a daily JSONL file
//! (`{dir}/{YYYY-MM-DD}.jsonl`), whether or not its audio played.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Played,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub timestamp: String,
    pub persona_id: String,
    pub persona_name: String,
    pub voice: String,
    pub script: String,
    pub script_latency_ms: i64,
    pub synthesis_latency_ms: Option<i64>,
    pub audio_duration_s: Option<f64>,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}

#[derive(Debug, Clone)]
pub struct TranscriptArchive {
    dir: PathBuf,
}

impl TranscriptArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file(&self, date: &str) -> PathBuf {
        let date_str = if date == "today" {
            Local::now().format("%Y-%m-%d").to_string()
        } else {
            date.to_string()
        };
        self.dir.join(format!("{date_str}.jsonl"))
    }

    /// Append a record to today's file. Failures are logged, never returned.
    pub fn save(&self, record: &TranscriptRecord) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            error!("Failed to create history dir: {e}");
            return;
        }

        let path = self.file("today");
        match fs::OpenOptions::new().create(true).append(true).open(&path) {
            Ok(mut file) => match serde_json::to_string(record) {
                Ok(json) => {
                    if let Err(e) = writeln!(file, "{json}") {
                        error!("Failed to write transcript record: {e}");
                    } else {
                        debug!("Saved transcript record to {}", path.display());
                    }
                }
                Err(e) => error!("Failed to serialize record: {e}"),
            },
            Err(e) => error!("Failed to open history file: {e}"),
        }
    }

    pub fn load(&self, date: &str) -> Vec<TranscriptRecord> {
        let Ok(file) = fs::File::open(self.file(date)) else {
            return Vec::new();
        };

        std::io::BufReader::new(file)
            .lines()
            .map_while(|line| line.ok())
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(&line) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!("Skipping malformed history line: {e}");
                    None
                }
            })
            .collect()
    }

    /// Dates with records, newest first.
    pub fn dates(&self) -> Vec<String> {
        let mut dates: Vec<String> = fs::read_dir(&self.dir)
            .into_iter()
            .flatten()
            .filter_map(|entry| {
                let name = entry.ok()?.file_name().to_string_lossy().to_string();
                name.strip_suffix(".jsonl").map(str::to_string)
            })
            .collect();
        dates.sort_by(|a, b| b.cmp(a));
        dates
    }

    /// Markdown summary of one day's monologues.
    pub fn report(&self, date: &str) -> String {
        let records = self.load(date);
        let display_date = if date == "today" {
            Local::now().format("%Y-%m-%d").to_string()
        } else {
            date.to_string()
        };

        if records.is_empty() {
            return format!("# Persona Studio Report - {display_date}\n\nNo monologues recorded.");
        }

        let played: Vec<&TranscriptRecord> =
            records.iter().filter(|r| r.outcome == Outcome::Played).collect();
        let failed = records.len() - played.len();
        let total_audio: f64 = played.iter().filter_map(|r| r.audio_duration_s).sum();
        let avg_script = average(records.iter().map(|r| r.script_latency_ms));
        let avg_synthesis = average(records.iter().filter_map(|r| r.synthesis_latency_ms));

        let mut lines = vec![
            format!("# Persona Studio Report - {display_date}"),
            String::new(),
            "## Summary".to_string(),
            format!("- **Monologues**: {}", records.len()),
            format!("- **Played**: {}", played.len()),
            format!("- **Failed**: {failed}"),
            format!("- **Total audio**: {total_audio:.1}s"),
            String::new(),
            "## Latency Averages".to_string(),
            format!("- Script: {avg_script:.0}ms"),
            format!("- Synthesis: {avg_synthesis:.0}ms"),
            String::new(),
            "## Log".to_string(),
            String::new(),
            "| Time | Persona | Voice | Outcome | Script |".to_string(),
            "|------|---------|-------|---------|--------|".to_string(),
        ];

        for r in &records {
            let time_str = r.timestamp.get(11..19).unwrap_or(&r.timestamp);
            let outcome = match r.outcome {
                Outcome::Played => "played",
                Outcome::Failed => "failed",
            };
            lines.push(format!(
                "| {time_str} | {} | {} | {outcome} | {} |",
                r.persona_name,
                r.voice,
                truncate(&r.script, 40)
            ));
        }

        lines.join("\n")
    }
}

fn average(values: impl Iterator<Item = i64>) -> f64 {
    let (sum, count) = values.fold((0i64, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let head: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(persona: &str, outcome: Outcome) -> TranscriptRecord {
        TranscriptRecord {
            timestamp: "2026-10-18T09:15:42.120".into(),
            persona_id: persona.to_lowercase(),
            persona_name: persona.into(),
            voice: "Orus".into(),
            script: "[sighs] I understand, let me fix that for you right away.".into(),
            script_latency_ms: 800,
            synthesis_latency_ms: (outcome == Outcome::Played).then_some(1200),
            audio_duration_s: (outcome == Outcome::Played).then_some(3.5),
            outcome,
            error: (outcome == Outcome::Failed).then(|| "no audio data".to_string()),
        }
    }

    #[test]
    fn records_round_trip_through_daily_file() {
        let dir = tempfile::tempdir().unwrap();
        let archive = TranscriptArchive::new(dir.path());
        archive.save(&record("Clara", Outcome::Played));
        archive.save(&record("James", Outcome::Failed));

        let records = archive.load("today");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].persona_name, "Clara");
        assert_eq!(records[1].outcome, Outcome::Failed);
        assert_eq!(archive.dates().len(), 1);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let archive = TranscriptArchive::new(dir.path());
        archive.save(&record("Clara", Outcome::Played));
        let path = archive.file("today");
        let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();

        assert_eq!(archive.load("today").len(), 1);
    }

    #[test]
    fn report_summarizes_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let archive = TranscriptArchive::new(dir.path());
        archive.save(&record("Clara", Outcome::Played));
        archive.save(&record("Maya", Outcome::Played));
        archive.save(&record("James", Outcome::Failed));

        let report = archive.report("today");
        assert!(report.contains("- **Monologues**: 3"));
        assert!(report.contains("- **Played**: 2"));
        assert!(report.contains("- **Failed**: 1"));
        assert!(report.contains("- **Total audio**: 7.0s"));
        assert!(report.contains("| 09:15:42 | Maya | Orus | played |"));
    }

    #[test]
    fn empty_day_reports_nothing_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let archive = TranscriptArchive::new(dir.path());
        assert!(archive.report("2001-01-01").contains("No monologues recorded."));
        assert!(archive.dates().is_empty());
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }
}
