//! Wire-level debugging via the LOUD_WIRE environment variable.
//!
//! When `LOUD_WIRE` is set to any value, prints raw JSON of API requests and
//! responses to stderr with pretty formatting and colors.
//!
//! ```bash
//! LOUD_WIRE=1 plant-advisor analyze monstera.jpg
//! ```
//!
//! - Green `>>>` for outgoing requests
//! - Red `<<<` for incoming responses
//! - Timestamps and request IDs for correlation
//!
//! Base64 image payloads are truncated to keep output readable.

use colored::Colorize;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Request ID counter for correlating requests with responses
static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Cached check for whether LOUD_WIRE is enabled
static ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if LOUD_WIRE debugging is enabled.
///
/// Cached after the first call, so `LOUD_WIRE` must be set before the first
/// API request.
#[must_use]
pub fn is_enabled() -> bool {
    *ENABLED.get_or_init(|| std::env::var("LOUD_WIRE").is_ok())
}

/// Get the next request ID for correlation.
#[must_use]
pub fn next_request_id() -> usize {
    REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Fields whose values are truncated if too long (base64 payloads).
const TRUNCATE_FIELDS: &[&str] = &["data"];

/// Maximum length before truncation (keep first 100 chars).
const TRUNCATE_THRESHOLD: usize = 100;

/// Truncate long base64-encoded fields in a JSON value, recursively.
fn truncate_long_fields(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if TRUNCATE_FIELDS.contains(&key.as_str()) {
                    if let serde_json::Value::String(s) = val
                        && s.len() > TRUNCATE_THRESHOLD
                        && s.is_char_boundary(TRUNCATE_THRESHOLD)
                    {
                        *s = format!("{}...", &s[..TRUNCATE_THRESHOLD]);
                    }
                } else {
                    truncate_long_fields(val);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr.iter_mut() {
                truncate_long_fields(item);
            }
        }
        _ => {}
    }
}

fn timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

/// Log prefix with timestamp and request ID.
fn prefix(request_id: usize) -> String {
    let ts = timestamp().dimmed();
    format!(
        "{} {} {}",
        "[LOUD_WIRE]".bold(),
        ts,
        format!("[REQ#{}]", request_id).cyan()
    )
}

/// Lines to print for a body: pretty JSON with long fields truncated, or the
/// first `raw_limit` characters of anything that does not parse.
fn render_body(label: &str, body: &str, raw_limit: usize) -> Vec<String> {
    let Ok(mut parsed) = serde_json::from_str::<serde_json::Value>(body) else {
        let truncated: String = body.chars().take(raw_limit).collect();
        let ellipsis = if truncated.len() < body.len() { "..." } else { "" };
        return vec![format!("{label}: {truncated}{ellipsis}")];
    };

    truncate_long_fields(&mut parsed);
    let rendered = colored_json::to_colored_json_auto(&parsed)
        .ok()
        .or_else(|| serde_json::to_string_pretty(&parsed).ok())
        .unwrap_or_default();
    std::iter::once(format!("{label}:"))
        .chain(rendered.lines().map(str::to_string))
        .collect()
}

fn print_json(prefix: &str, label: &str, body: &str, raw_limit: usize) {
    for line in render_body(label, body, raw_limit) {
        eprintln!("{prefix} {line}");
    }
}

/// Log an outgoing HTTP request.
pub fn log_request(request_id: usize, method: &str, url: &str, body: Option<&str>) {
    if !is_enabled() {
        return;
    }

    let prefix = prefix(request_id);
    let direction = ">>>".green().bold();

    eprintln!("{prefix} {direction} {method} {url}");

    if let Some(body) = body {
        print_json(&prefix, &"Body".green().to_string(), body, 500);
    }
}

/// Log an incoming HTTP response status.
pub fn log_response_status(request_id: usize, status: u16) {
    if !is_enabled() {
        return;
    }

    let prefix = prefix(request_id);
    let direction = "<<<".red().bold();
    let status_text = if status < 300 {
        format!("{status} OK").green()
    } else {
        format!("{status} ERROR").red()
    };

    eprintln!("{prefix} {direction} {status_text}");
}

/// Log an incoming HTTP response body.
pub fn log_response_body(request_id: usize, body: &str) {
    if !is_enabled() {
        return;
    }

    let prefix = prefix(request_id);
    print_json(&prefix, &"Response".red().to_string(), body, 1000);
}
