use anyhow::Result;
use chrono::{DateTime, Local, SecondsFormat};
use relay_core::{JobSnapshot, JobView, Phase};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    message: String,
    #[serde(flatten)]
    snapshot: &'a JobSnapshot,
}

/// Renders one line per snapshot. Text mode skips repeats of the same
/// upload decile so a large file does not print a hundred lines.
pub struct Printer {
    format: OutputFormat,
    last_decile: Option<u8>,
}

impl Printer {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            last_decile: None,
        }
    }

    pub fn render(
        &mut self,
        snapshot: &JobSnapshot,
        now: DateTime<Local>,
    ) -> Result<Option<String>> {
        let view = JobView::from(snapshot);
        match self.format {
            OutputFormat::Json => {
                let line = JsonLine {
                    timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, false),
                    message: view.status_message(),
                    snapshot,
                };
                Ok(Some(serde_json::to_string(&line)?))
            }
            OutputFormat::Text => {
                if snapshot.phase == Phase::Uploading {
                    let decile = view.progress_bar().unwrap_or(0) / 10;
                    if self.last_decile == Some(decile) {
                        return Ok(None);
                    }
                    self.last_decile = Some(decile);
                }
                Ok(Some(text_line(&view, snapshot, now)))
            }
        }
    }
}

fn text_line(view: &JobView, snapshot: &JobSnapshot, now: DateTime<Local>) -> String {
    let mut line = format!("[{}] {}", now.format("%H:%M:%S"), view.status_message());
    if let Some(job_id) = &snapshot.job_id {
        if snapshot.phase == Phase::Processing {
            line.push_str(&format!(" (job {})", job_id));
        }
    }
    if let Some(detail) = view.detail() {
        line.push_str(&format!("\n  {}", detail));
    }
    if let Some(video) = &view.primary_output {
        line.push_str(&format!("\n  video: {}", video));
    }
    if let Some(subtitles) = &view.auxiliary_output {
        line.push_str(&format!("\n  subtitles: {}", subtitles));
    }
    line
}
