//! String heuristics for scraped institution data.
//!
//! Each pass is a small `&str -> _` function; [`clean_name`] chains several
//! regex passes the same way the cleanup pipelines elsewhere do.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// One lakh rupees.
const LAKH: f64 = 100_000.0;

/// Log fragments that leak into scraped URL fields from noisy upstream output.
const LOG_MARKERS: &[&str] = &["dotenv@", "injecting env"];

/// Accepted image extensions, lower-case, with the leading dot.
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Reduce an SEO page title to the institution's bare name.
///
/// `"ABC Institute: Admission 2025 Fees"` → `"ABC Institute"`.
pub fn clean_name(raw: &str) -> String {
    let head = raw.split(':').next().unwrap_or_default();

    let mut name = strip_marketing_keywords(head);
    name = strip_year_tokens(&name);
    name = collapse_whitespace(&name);

    name.trim_matches(|c: char| c.is_whitespace() || matches!(c, '&' | ',' | '-' | '|'))
        .to_string()
}

fn strip_marketing_keywords(s: &str) -> String {
    static KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\b(?:fees|admissions?|rankings?|cutoffs?|placements?|courses)\b")
            .expect("valid regex")
    });

    KEYWORD_RE.replace_all(s, " ").to_string()
}

fn strip_year_tokens(s: &str) -> String {
    static YEAR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\b202\d\b").expect("valid regex"));

    YEAR_RE.replace_all(s, " ").to_string()
}

fn collapse_whitespace(s: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WS_RE.replace_all(s, " ").trim().to_string()
}

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

/// Best-effort fee extraction from a scraped fee field.
///
/// Numbers pass through unchanged; strings go through [`parse_fee_text`];
/// anything else is unknown. `None` means "unknown", never zero.
pub fn parse_fee(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_fee_text(s),
        _ => None,
    }
}

/// Parse a free-text fee such as `"₹1,20,000"`, `"Rs. 85000"` or `"2-4 Lakh"`.
///
/// Ranges resolve to their lower bound; a `lakh` anywhere in the text scales
/// the figure by 100,000.
pub fn parse_fee_text(raw: &str) -> Option<f64> {
    static CURRENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)₹|\binr|\brs\.?|,").expect("valid regex")
    });

    let clean = CURRENCY_RE.replace_all(raw, "").to_lowercase();
    let clean = clean.trim();
    if clean.is_empty() {
        return None;
    }

    let figure = match clean.split_once('-') {
        Some((low, _)) => low,
        None => clean,
    };
    let amount = leading_number(figure.trim())?;

    if clean.contains("lakh") {
        Some(amount * LAKH)
    } else {
        Some(amount)
    }
}

/// The numeric prefix of `s`, like a lenient `parseFloat`.
fn leading_number(s: &str) -> Option<f64> {
    static NUM_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\+?(?:\d+(?:\.\d*)?|\.\d+)").expect("valid regex"));

    NUM_RE
        .find(s)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

// ---------------------------------------------------------------------------
// Image URLs
// ---------------------------------------------------------------------------

/// Gate for hero/gallery URLs: rejects captured log noise and anything that
/// does not end in a known image extension. Not a general URL validator.
pub fn is_valid_image_url(url: &str) -> bool {
    if url.is_empty() || LOG_MARKERS.iter().any(|m| url.contains(m)) {
        return false;
    }

    let lower = url.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

// ---------------------------------------------------------------------------
// Scalar fields
// ---------------------------------------------------------------------------

/// Establishment year from a number or a string such as `"1998"` or `"Estd. 1998"`.
pub fn parse_year(value: &Value) -> Option<i64> {
    static YEAR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\b(1[5-9]\d{2}|20\d{2})\b").expect("valid regex"));

    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                YEAR_RE
                    .captures(s)
                    .and_then(|caps| caps[1].parse::<i64>().ok())
            })
        }
        _ => None,
    }
}

/// Rating from a number or a string such as `"4.2"` or `"4.2/5"`.
pub fn parse_rating(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s.trim()),
        _ => None,
    }
}

/// Review count from a number or a string such as `"(1,234 Reviews)"`.
///
/// Strings keep only their digits. Unparseable input counts as zero.
pub fn parse_review_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => {
            let digits: String = s.chars().filter(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        }
        _ => 0,
    }
}
