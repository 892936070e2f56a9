//! Persisted history document
//!
//! The on-disk layout is the one written by CI benchmark actions and read by
//! the static chart site:
//!
//! ```text
//! window.BENCHMARK_DATA = {
//!   "lastUpdate": 1747618039813,
//!   "repoUrl": "https://github.com/...",
//!   "entries": {
//!     "Benchmark": [ { "commit": {..}, "date": .., "tool": "cargo",
//!                      "benches": [ { "name", "value", "range": "± 64930", "unit" } ] } ]
//!   }
//! }
//! ```
//!
//! Both the JavaScript-wrapped form and bare JSON are accepted. The
//! `"± <number>"` text convention for error margins lives only in this module.

use crate::model::Run;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Assignment prefix of the JavaScript-wrapped document
pub const JS_PREFIX: &str = "window.BENCHMARK_DATA = ";

/// Default partition name used by CI benchmark actions
pub const DEFAULT_SUITE: &str = "Benchmark";

/// Physical encoding of the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Bare JSON object
    Json,
    /// `window.BENCHMARK_DATA = {...}` script consumed by the chart page
    JavaScript,
}

impl DocumentFormat {
    /// Format for a store that does not exist yet, chosen by extension
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("js") => DocumentFormat::JavaScript,
            _ => DocumentFormat::Json,
        }
    }
}

/// Whole document with every partition still in wire form
///
/// Partitions other than the one a store works on are kept as raw JSON so
/// they are written back exactly as they were read. They are shared, so
/// cloning a document does not copy them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub last_update: Option<DateTime<Utc>>,
    pub repo_url: Option<String>,
    pub entries: BTreeMap<String, Arc<serde_json::Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    #[serde(default)]
    last_update: Option<i64>,
    #[serde(default)]
    repo_url: Option<String>,
    #[serde(default)]
    entries: BTreeMap<String, serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentOut<'a> {
    last_update: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    repo_url: Option<&'a str>,
    entries: BTreeMap<&'a str, PartitionOut<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum PartitionOut<'a> {
    Preserved(&'a serde_json::Value),
    Runs(Vec<&'a Run>),
}

/// Parse document text, reporting which encoding it used
pub fn parse_document(text: &str) -> Result<(Document, DocumentFormat), String> {
    let trimmed = text.trim();
    let (body, format) = match trimmed.strip_prefix("window.BENCHMARK_DATA") {
        Some(rest) => {
            let rest = rest
                .trim_start()
                .strip_prefix('=')
                .ok_or_else(|| "expected '=' after window.BENCHMARK_DATA".to_string())?;
            (rest.trim().trim_end_matches(';'), DocumentFormat::JavaScript)
        }
        None => (trimmed, DocumentFormat::Json),
    };

    let raw: RawDocument =
        serde_json::from_str(body).map_err(|e| format!("malformed history document: {}", e))?;

    let last_update = match raw.last_update {
        Some(ms) => Some(
            Utc.timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| format!("lastUpdate {} is out of range", ms))?,
        ),
        None => None,
    };

    Ok((
        Document {
            last_update,
            repo_url: raw.repo_url,
            entries: raw
                .entries
                .into_iter()
                .map(|(name, value)| (name, Arc::new(value)))
                .collect(),
        },
        format,
    ))
}

/// Decode one partition's runs
pub fn parse_runs(value: &serde_json::Value) -> Result<Vec<Run>, String> {
    Vec::<Run>::deserialize(value).map_err(|e| format!("malformed run list: {}", e))
}

/// Render the document with `suite` replaced by `runs`
pub fn render_document<'a>(
    document: &'a Document,
    suite: &'a str,
    runs: impl IntoIterator<Item = &'a Run>,
    format: DocumentFormat,
) -> Result<String, serde_json::Error> {
    let mut entries: BTreeMap<&str, PartitionOut<'_>> = document
        .entries
        .iter()
        .filter(|(name, _)| name.as_str() != suite)
        .map(|(name, value)| (name.as_str(), PartitionOut::Preserved(value.as_ref())))
        .collect();
    let runs: Vec<&Run> = runs.into_iter().collect();
    if !runs.is_empty() {
        entries.insert(suite, PartitionOut::Runs(runs));
    }

    let out = DocumentOut {
        last_update: document
            .last_update
            .unwrap_or_else(Utc::now)
            .timestamp_millis(),
        repo_url: document.repo_url.as_deref(),
        entries,
    };

    let json = serde_json::to_string_pretty(&out)?;
    Ok(match format {
        DocumentFormat::Json => format!("{}\n", json),
        DocumentFormat::JavaScript => format!("{}{}\n", JS_PREFIX, json),
    })
}

/// Parse an error margin written as `"± 64930"`
///
/// Also accepts `"±64930"`, the libtest spelling `"+/- 64,930"`, and
/// thousands separators.
pub fn parse_range(text: &str) -> Result<f64, String> {
    let trimmed = text.trim();
    let payload = trimmed
        .strip_prefix('±')
        .or_else(|| trimmed.strip_prefix("+/-"))
        .ok_or_else(|| format!("range '{}' does not start with '±'", text))?;

    let digits: String = payload
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    let margin: f64 = digits
        .parse()
        .map_err(|_| format!("range '{}' has no numeric payload", text))?;

    if !margin.is_finite() || margin < 0.0 {
        return Err(format!("range '{}' is not a non-negative number", text));
    }
    Ok(margin)
}

/// Render an error margin as `"± <number>"`
pub fn format_range(margin: f64) -> String {
    format!("± {}", margin)
}

/// Serde adapter for `Measurement::error_margin` <-> `range`
pub mod range {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(margin: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_range(*margin))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_range(&text).map_err(D::Error::custom)
    }
}

/// Serde adapter writing whole values as JSON integers
pub mod whole_number {
    use serde::{Deserialize, Deserializer, Serializer};

    // 2^53: largest range where every integer is exact in f64
    const EXACT_LIMIT: f64 = 9_007_199_254_740_992.0;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() && value.fract() == 0.0 && value.abs() <= EXACT_LIMIT {
            serializer.serialize_i64(*value as i64)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        f64::deserialize(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;

    const SAMPLE: &str = r#"window.BENCHMARK_DATA = {
  "lastUpdate": 1747618039813,
  "repoUrl": "https://github.com/age-rs/rune",
  "entries": {
    "Benchmark": [
      {
        "commit": {
          "author": {
            "email": "udoprog@tedro.se",
            "name": "John-John Tedro",
            "username": "udoprog"
          },
          "distinct": true,
          "id": "e4af457a3bb7eb0b088724703ceb56042019dec2",
          "message": "Add correct access token",
          "timestamp": "2020-12-03T12:02:08+01:00",
          "tree_id": "2969c16244064aea9052eb43615560afa812863d",
          "url": "https://github.com/rune-rs/rune/commit/e4af457a3bb7eb0b088724703ceb56042019dec2"
        },
        "date": 1606993507181,
        "tool": "cargo",
        "benches": [
          { "name": "aoc_2020_1a", "value": 292557, "range": "± 64930", "unit": "ns/iter" }
        ]
      }
    ]
  }
}
"#;

    #[test]
    fn test_parse_range_variants() {
        assert_eq!(parse_range("± 64930").unwrap(), 64930.0);
        assert_eq!(parse_range("±12").unwrap(), 12.0);
        assert_eq!(parse_range("+/- 64,930").unwrap(), 64930.0);
        assert_eq!(parse_range("  ± 0.25 ").unwrap(), 0.25);
    }

    #[test]
    fn test_parse_range_rejects_garbage() {
        assert!(parse_range("64930").is_err());
        assert!(parse_range("± ").is_err());
        assert!(parse_range("± abc").is_err());
        assert!(parse_range("± -3").is_err());
        assert!(parse_range("± inf").is_err());
    }

    #[test]
    fn test_format_range() {
        assert_eq!(format_range(64930.0), "± 64930");
        assert_eq!(format_range(0.5), "± 0.5");
    }

    #[test]
    fn test_parse_js_document() {
        let (doc, format) = parse_document(SAMPLE).unwrap();
        assert_eq!(format, DocumentFormat::JavaScript);
        assert_eq!(
            doc.last_update.unwrap().timestamp_millis(),
            1_747_618_039_813
        );
        assert_eq!(doc.repo_url.as_deref(), Some("https://github.com/age-rs/rune"));

        let runs = parse_runs(&doc.entries["Benchmark"]).unwrap();
        assert_eq!(runs.len(), 1);
        let bench = &runs[0].measurements[0];
        assert_eq!(bench.name, "aoc_2020_1a");
        assert_eq!(bench.value, 292_557.0);
        assert_eq!(bench.error_margin, 64_930.0);
        assert_eq!(bench.unit, "ns/iter");
        assert_eq!(runs[0].collected_at.timestamp_millis(), 1_606_993_507_181);
        assert_eq!(runs[0].tool_id, "cargo");
    }

    #[test]
    fn test_parse_bare_json_document() {
        let body = SAMPLE.strip_prefix(JS_PREFIX).unwrap();
        let (_, format) = parse_document(body).unwrap();
        assert_eq!(format, DocumentFormat::Json);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_document("window.BENCHMARK_DATA {}").is_err());
        assert!(parse_document("{ not json").is_err());
    }

    #[test]
    fn test_render_reproduces_wire_conventions() {
        let (doc, format) = parse_document(SAMPLE).unwrap();
        let runs = parse_runs(&doc.entries["Benchmark"]).unwrap();
        let text = render_document(&doc, "Benchmark", &runs, format).unwrap();

        assert!(text.starts_with(JS_PREFIX));
        assert!(text.contains("\"range\": \"± 64930\""));
        assert!(text.contains("\"value\": 292557,"));
        assert!(text.contains("\"date\": 1606993507181"));
        assert!(text.contains("\"timestamp\": \"2020-12-03T12:02:08+01:00\""));
        assert!(text.contains("\"tree_id\": \"2969c16244064aea9052eb43615560afa812863d\""));

        let (reparsed, _) = parse_document(&text).unwrap();
        assert_eq!(parse_runs(&reparsed.entries["Benchmark"]).unwrap(), runs);
    }

    #[test]
    fn test_render_preserves_other_partitions() {
        let mut doc = Document::default();
        doc.entries.insert(
            "Other".to_string(),
            Arc::new(serde_json::json!([{ "anything": "goes" }])),
        );
        let runs = vec![fixtures::run("abc", 1_000, &[("fib_15", 10.5, 1.0)])];

        let text = render_document(&doc, "Benchmark", &runs, DocumentFormat::Json).unwrap();
        let (reparsed, format) = parse_document(&text).unwrap();

        assert_eq!(format, DocumentFormat::Json);
        assert_eq!(reparsed.entries["Other"], doc.entries["Other"]);
        assert!(text.contains("\"value\": 10.5"));
    }

    #[test]
    fn test_format_for_path() {
        assert_eq!(
            DocumentFormat::for_path(Path::new("dev/bench/data.js")),
            DocumentFormat::JavaScript
        );
        assert_eq!(
            DocumentFormat::for_path(Path::new("history.json")),
            DocumentFormat::Json
        );
    }
}
