//! `${field}` substitution for action properties.
//!
//! `${date}` renders the point's date with the configured strftime pattern.
//! A placeholder followed directly by `%` renders a numeric value as a
//! percentage (`0.4567%` becomes `45.67%`).

use crate::types::{Point, Properties};
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\$\{\s*([A-Za-z0-9_.\-]+)\s*\}(%?)").unwrap())
}

pub fn has_placeholders(template: &str) -> bool {
    placeholder_re().is_match(template)
}

/// Whole numbers drop the `.0`; anything else keeps full precision.
fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

/// Renders one template string against `point`.
pub fn render(template: &str, point: &Point, date_format: &str) -> String {
    placeholder_re()
        .replace_all(template, |caps: &Captures| {
            let field = &caps[1];
            let percent = !caps[2].is_empty();

            if field == "date" {
                let date = point.date.format(date_format).to_string();
                return if percent { format!("{date}%") } else { date };
            }

            match point.field(field) {
                Some(Value::Number(n)) if percent => match n.as_f64() {
                    Some(v) => format!("{:.2}%", v * 100.0),
                    None => format!("{n}%"),
                },
                Some(value) => {
                    let text = format_value(&value);
                    if percent {
                        format!("{text}%")
                    } else {
                        text
                    }
                }
                None => {
                    tracing::debug!(field, "template placeholder has no matching field");
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

fn render_value(value: &Value, point: &Point, date_format: &str) -> Value {
    match value {
        Value::String(s) if has_placeholders(s) => Value::String(render(s, point, date_format)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| render_value(v, point, date_format))
                .collect(),
        ),
        Value::Object(map) => Value::Object(render_properties(map, point, date_format)),
        other => other.clone(),
    }
}

/// Renders every string property, descending into arrays and objects.
pub fn render_properties(props: &Properties, point: &Point, date_format: &str) -> Properties {
    props
        .iter()
        .map(|(k, v)| (k.clone(), render_value(v, point, date_format)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    const FMT: &str = "%-m/%-d/%Y";

    fn point() -> Point {
        Point::new(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap(), 120.0)
            .with_field("value", 0.4567)
            .with_field("city", "Oslo")
    }

    #[test]
    fn date_and_percent() {
        let out = render("${date}: ${value}%", &point(), FMT);
        assert!(out.contains("3/5/2024"));
        assert!(out.contains("45.67"));
        assert_eq!(out, "3/5/2024: 45.67%");
    }

    #[test]
    fn plain_fields() {
        assert_eq!(render("${city} hit ${y}", &point(), FMT), "Oslo hit 120");
        assert_eq!(render("${value}", &point(), FMT), "0.4567");
    }

    #[test]
    fn percent_on_string_is_literal() {
        assert_eq!(render("${city}%", &point(), FMT), "Oslo%");
    }

    #[test]
    fn unknown_field_left_verbatim() {
        assert_eq!(render("x=${missing}", &point(), FMT), "x=${missing}");
    }

    #[test]
    fn custom_date_format() {
        assert_eq!(render("${date}", &point(), "%Y-%m-%d"), "2024-03-05");
    }

    #[test]
    fn properties_render_recursively() {
        let props = json!({
            "text": "${city}: ${value}%",
            "lines": ["${y}", 4],
            "style": {"title": "${date}"},
            "radius": 5
        });
        let out = render_properties(props.as_object().unwrap(), &point(), FMT);
        assert_eq!(out["text"], json!("Oslo: 45.67%"));
        assert_eq!(out["lines"], json!(["120", 4]));
        assert_eq!(out["style"]["title"], json!("3/5/2024"));
        assert_eq!(out["radius"], json!(5));
    }
}
