use chrono::NaiveDate;

// ── Parsers ───────────────────────────────────────────────────────────────────

fn is_placeholder(s: &str) -> bool {
    s.is_empty() || s == "N/A" || s == "NaN" || s == "—"
}

/// Opportunistic text → number coercion.
/// "1,234.56" → 1234.56 | "12.5%" → 12.5 | "3.4B" → 3.4e9 | "N/A" → None
pub fn to_number(s: &str) -> Option<f64> {
    let s = s.trim().replace(',', "");
    if is_placeholder(&s) || s == "-" {
        return None;
    }
    if let Ok(n) = s.parse::<f64>() {
        return Some(n);
    }
    if let Some(pct) = s.strip_suffix('%') {
        return pct.trim().parse().ok();
    }
    parse_shorthand(&s)
}

/// Numbers with magnitude suffixes.
/// "1.2M" → 1,200,000 | "345K" → 345,000 | "2.1T" → 2.1e12
pub fn parse_shorthand(s: &str) -> Option<f64> {
    let s = s.trim().to_uppercase().replace(',', "");

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('T') {
        (n, 1_000_000_000_000.0)
    } else if let Some(n) = s.strip_suffix('B') {
        (n, 1_000_000_000.0)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1_000_000.0)
    } else if let Some(n) = s.strip_suffix('K') {
        (n, 1_000.0)
    } else {
        return None;
    };

    let num: f64 = num_str.trim().parse().ok()?;
    Some(num * multiplier)
}

/// Numeric OHLCV cell; anything unparsable is NaN.
pub fn parse_price(s: &str) -> f64 {
    s.trim().parse().unwrap_or(f64::NAN)
}

/// Financial-report cell, reported in thousands.
/// "1,234" → 1,234,000 | "(56)" → -56,000 | "-" → NaN
pub fn report_value(s: &str) -> f64 {
    let s = s.trim().replace(',', "");
    if s == "-" || s.is_empty() {
        return f64::NAN;
    }
    let signed = if s.contains('(') {
        format!("-{}", s.replace(['(', ')'], ""))
    } else {
        s
    };
    signed.parse::<f64>().map(|n| n * 1000.0).unwrap_or(f64::NAN)
}

/// Parse dates: "Dec 31, 2014" (report headers) or ISO
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%b %d, %Y") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%b %e, %Y") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%m/%d/%Y") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d %b %Y") {
        return Some(d);
    }

    None
}

/// Collapse runs of whitespace and trim.
pub fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
