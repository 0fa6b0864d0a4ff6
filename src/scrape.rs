//! Metrics scraper and line parser.
//!
//! ## Matching policy
//! A line matches metric `name` only when it begins with `name` (no leading
//! whitespace), splits on whitespace into exactly two tokens, and the first
//! token is byte-equal to `name`:
//!
//! | Line                       | `name = "foo"` |
//! |----------------------------|----------------|
//! | `foo 42`                   | match, 42.0    |
//! | `foo_bar 1`                | no match       |
//! | `foo{job="x"} 1`           | no match       |
//! | `foo 1 1700000000000`      | no match       |
//! | `# HELP foo help text`     | no match       |
//! | `  foo 42`                 | no match       |
//!
//! The first matching line in document order wins. Labelled series are
//! skipped on purpose; only single-series lookup is supported.

use tracing::debug;

use crate::error::BridgeError;

/// One located metric value.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
}

/// Result of looking a metric up in a scraped document.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    Found(MetricSample),
    /// No line matched.
    NotFound,
    /// A line matched but its value token is not a float.
    MalformedValue { token: String },
}

/// Locate `name` in `document`.
pub fn find_metric(document: &str, name: &str) -> ScrapeOutcome {
    for line in document.lines() {
        // Indented lines never qualify; the name must open the line.
        if !line.starts_with(name) {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let (Some(first), Some(value), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            continue;
        };
        if first != name {
            continue;
        }

        return match parse_value(value) {
            Some(v) => ScrapeOutcome::Found(MetricSample {
                name: name.to_string(),
                value: v,
            }),
            None => ScrapeOutcome::MalformedValue {
                token: value.to_string(),
            },
        };
    }
    ScrapeOutcome::NotFound
}

/// Parse a sample value. Accepts the exposition spellings `+Inf`, `-Inf`
/// and `NaN` alongside plain floats.
fn parse_value(token: &str) -> Option<f64> {
    match token {
        "+Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => token.parse::<f64>().ok(),
    }
}

/// GET the scrape endpoint and return its body as text.
///
/// # Errors
/// - [`BridgeError::Transport`] when the request or the body read fails.
/// - [`BridgeError::Http`] on a non-2xx status.
pub async fn fetch_document(client: &reqwest::Client, url: &str) -> Result<String, BridgeError> {
    let resp = client.get(url).send().await.map_err(|e| BridgeError::Transport {
        url: url.to_string(),
        detail: e.to_string(),
    })?;

    if !resp.status().is_success() {
        return Err(BridgeError::Http {
            status: resp.status().as_u16(),
            url: url.to_string(),
        });
    }

    let body = resp.text().await.map_err(|e| BridgeError::Transport {
        url: url.to_string(),
        detail: format!("failed to read metrics response: {e}"),
    })?;

    debug!(url = %url, bytes = body.len(), "fetched metrics document");
    Ok(body)
}

/// Fetch `url` and look up `name` in one step.
pub async fn scrape_metric(
    client: &reqwest::Client,
    url: &str,
    name: &str,
) -> Result<ScrapeOutcome, BridgeError> {
    let document = fetch_document(client, url).await?;
    Ok(find_metric(&document, name))
}
