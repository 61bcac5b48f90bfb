use std::io::Write;

use serde::Serialize;

use crate::analysis::{average, frequency_count, top_k, RankedEntry};
use crate::error::DbResult;
use crate::storage::record::{
    Column, COMMENTS, FILE_SIZE, GENERATION_TIME, GPU_USAGE, LIKES, PLATFORM, PROMPT, SHARES,
};
use crate::storage::table::RowStore;

/// Display width for prompt names in the text report.
const NAME_WIDTH: usize = 50;

/// One metric the report covers: where it lives, how its section reads.
struct Metric {
    column: Column,
    noun: &'static str,
    avg_label: &'static str,
    unit: &'static str,
    avg_unit: &'static str,
    integral: bool,
}

/// Report sections in their fixed order: performance metrics first, then
/// engagement, then the platform frequency table.
const METRICS: [Metric; 6] = [
    Metric {
        column: GPU_USAGE,
        noun: "images by GPU usage",
        avg_label: "Average GPU usage",
        unit: "",
        avg_unit: "",
        integral: false,
    },
    Metric {
        column: FILE_SIZE,
        noun: "images by file size",
        avg_label: "Average file size",
        unit: " KB",
        avg_unit: " KB",
        integral: false,
    },
    Metric {
        column: GENERATION_TIME,
        noun: "images by generation time",
        avg_label: "Average generation time",
        unit: " s",
        avg_unit: " s",
        integral: false,
    },
    Metric {
        column: SHARES,
        noun: "most shared images",
        avg_label: "Average shares",
        unit: " shares",
        avg_unit: "",
        integral: true,
    },
    Metric {
        column: LIKES,
        noun: "most liked images",
        avg_label: "Average likes",
        unit: " likes",
        avg_unit: "",
        integral: true,
    },
    Metric {
        column: COMMENTS,
        noun: "most commented images",
        avg_label: "Average comments",
        unit: " comments",
        avg_unit: "",
        integral: true,
    },
];

#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Entries per top list.
    pub top: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { top: 10 }
    }
}

/// The computed report: every aggregation result, ready for rendering.
#[derive(Debug, Serialize)]
pub struct Report {
    pub sections: Vec<MetricSection>,
    pub platforms: Vec<PlatformCount>,
}

#[derive(Debug, Serialize)]
pub struct MetricSection {
    pub title: String,
    pub metric: &'static str,
    pub top: Vec<RankedEntry>,
    pub average: Option<f64>,
    #[serde(skip)]
    avg_label: &'static str,
    #[serde(skip)]
    unit: &'static str,
    #[serde(skip)]
    avg_unit: &'static str,
    #[serde(skip)]
    integral: bool,
}

#[derive(Debug, Serialize)]
pub struct PlatformCount {
    pub platform: String,
    pub count: u64,
}

/// Run every aggregation in the fixed report order. Each top-K and each
/// average issues its own scan; the store is read-only throughout.
pub fn build_report<S: RowStore>(store: &S, options: &ReportOptions) -> DbResult<Report> {
    let mut sections = Vec::with_capacity(METRICS.len());
    for metric in &METRICS {
        let top = top_k(
            store.scan(&[metric.column, PROMPT])?,
            metric.column,
            PROMPT,
            options.top,
        )?;
        let avg = average(store.scan(&[metric.column])?, metric.column)?;
        sections.push(MetricSection {
            title: format!("Top {} {}", options.top, metric.noun),
            metric: metric.column.name,
            top,
            average: avg,
            avg_label: metric.avg_label,
            unit: metric.unit,
            avg_unit: metric.avg_unit,
            integral: metric.integral,
        });
    }

    let platforms = frequency_count(store.scan(&[PLATFORM])?, PLATFORM)?
        .into_iter()
        .map(|(platform, count)| PlatformCount { platform, count })
        .collect();

    Ok(Report { sections, platforms })
}

impl Report {
    /// Render the deterministic text report. An empty average prints as
    /// 0.00, the defined zero result for a column with no valid cells.
    pub fn render_text<W: Write>(&self, out: &mut W) -> DbResult<()> {
        for section in &self.sections {
            writeln!(out, "=== {} ===", section.title)?;
            for entry in &section.top {
                writeln!(
                    out,
                    "{}: {}{}",
                    truncate_name(&entry.name, NAME_WIDTH),
                    format_value(entry.value, section.integral),
                    section.unit,
                )?;
            }
            writeln!(out)?;
            writeln!(
                out,
                "{}: {:.2}{}",
                section.avg_label,
                section.average.unwrap_or(0.0),
                section.avg_unit,
            )?;
            writeln!(out)?;
        }

        writeln!(out, "=== Most popular platforms ===")?;
        for entry in &self.platforms {
            writeln!(out, "{}: {} images", entry.platform, entry.count)?;
        }
        Ok(())
    }

    /// Render the same report as pretty-printed JSON.
    pub fn to_json(&self) -> DbResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn format_value(value: f64, integral: bool) -> String {
    if integral {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

fn truncate_name(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        let truncated: String = name.chars().take(width).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("short", 50), "short");
        let long = "p".repeat(60);
        let truncated = truncate_name(&long, 50);
        assert_eq!(truncated.len(), 53);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_truncate_name_respects_char_boundaries() {
        let name = "é".repeat(60);
        let truncated = truncate_name(&name, 50);
        assert_eq!(truncated.chars().count(), 53);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(87.456, false), "87.46");
        assert_eq!(format_value(40.0, true), "40");
    }

    #[test]
    fn test_empty_report_renders_zero_averages() {
        let report = Report {
            sections: vec![MetricSection {
                title: "Top 10 images by GPU usage".to_string(),
                metric: "gpu_usage",
                top: Vec::new(),
                average: None,
                avg_label: "Average GPU usage",
                unit: "",
                avg_unit: "",
                integral: false,
            }],
            platforms: Vec::new(),
        };
        let mut out = Vec::new();
        report.render_text(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Average GPU usage: 0.00"));
        assert!(text.contains("=== Most popular platforms ==="));
    }

    #[test]
    fn test_json_rendering_round_trips() {
        let report = Report {
            sections: Vec::new(),
            platforms: vec![PlatformCount {
                platform: "Twitter".to_string(),
                count: 3,
            }],
        };
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["platforms"][0]["platform"], "Twitter");
        assert_eq!(value["platforms"][0]["count"], 3);
    }
}
