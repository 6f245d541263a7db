use crate::set::{MetricSample, MetricSet};

/// Parse exposition text into a [`MetricSet`].
///
/// Blank lines and lines starting with `#` (HELP, TYPE and plain comments)
/// are dropped. Every other line is split at its last space into the
/// metric+labels text and the value.
pub fn parse(text: &str) -> MetricSet {
    let mut set = MetricSet::default();
    for raw in text.split('\n') {
        if let Some(sample) = parse_line(raw) {
            set.push(sample);
        }
    }
    set
}

/// Parse a single exposition line.
///
/// Returns `None` for blank lines, comments and lines without a space.
pub fn parse_line(raw: &str) -> Option<MetricSample> {
    let line = raw.strip_suffix('\r').unwrap_or(raw);
    if line.trim().is_empty() || line.starts_with('#') {
        return None;
    }

    let split = line.rfind(' ')?;
    let metric_text = &line[..split];
    let value_text = &line[split + 1..];

    let name = match metric_text.find('{') {
        Some(brace) => &metric_text[..brace],
        None => metric_text,
    };

    Some(MetricSample {
        name: name.to_string(),
        line: metric_text.to_string(),
        value: parse_value(value_text),
    })
}

fn parse_value(text: &str) -> f64 {
    match text.trim() {
        "+Inf" => f64::INFINITY,
        "-Inf" => f64::NEG_INFINITY,
        other => other.parse::<f64>().unwrap_or(0.0),
    }
}
