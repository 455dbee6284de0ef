//! Forgiving field decoders for model-produced JSON.
//!
//! Models routinely emit `"30 minutes"` where a number is expected, or a bare
//! number where a string is expected. These helpers accept both shapes and
//! fall back to an empty value rather than failing the whole artifact.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Leading decimal number of `text`, ignoring surrounding prose.
fn leading_number(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let end = trimmed
        .char_indices()
        .take_while(|(index, ch)| ch.is_ascii_digit() || *ch == '.' || (*index == 0 && *ch == '-'))
        .map(|(index, ch)| index + ch.len_utf8())
        .last()?;
    trimmed[..end].parse().ok()
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => leading_number(text),
        _ => None,
    }
}

fn text_of(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Optional whole minutes from `30`, `30.0`, or `"30 minutes"`.
pub(crate) fn optional_minutes<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_of(&value).map(round_to_i32))
}

#[expect(clippy::cast_possible_truncation, reason = "saturating cast after clamping")]
fn round_to_i32(value: f64) -> i32 {
    value
        .round()
        .clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

/// Whole number defaulting to zero.
pub(crate) fn integer<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_minutes(deserializer)?.unwrap_or(0))
}

/// Optional decimal from a number or numeric-leading string.
pub(crate) fn optional_decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_of(&value))
}

/// Decimal defaulting to zero.
pub(crate) fn decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_decimal(deserializer)?.unwrap_or(0.0))
}

/// Text from a string or scalar; `null` becomes empty.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text_of(value).unwrap_or_default())
}

/// Optional text from a string or scalar; blank strings become `None`.
pub(crate) fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text_of(value).filter(|text| !text.trim().is_empty()))
}

/// List of strings, tolerating a single string or `null`.
pub(crate) fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(text_of)
            .filter(|text| !text.trim().is_empty())
            .collect(),
        other => text_of(other)
            .filter(|text| !text.trim().is_empty())
            .into_iter()
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "optional_minutes")]
        minutes: Option<i32>,
        #[serde(default, deserialize_with = "optional_decimal")]
        amount: Option<f64>,
        #[serde(default, deserialize_with = "string_list")]
        tags: Vec<String>,
        #[serde(default, deserialize_with = "optional_text")]
        label: Option<String>,
    }

    #[rstest]
    #[case(json!(30), Some(30))]
    #[case(json!("30 minutes"), Some(30))]
    #[case(json!(" 45min"), Some(45))]
    #[case(json!(12.6), Some(13))]
    #[case(json!("about an hour"), None)]
    #[case(json!(null), None)]
    fn minutes_accept_numbers_and_prose(#[case] raw: Value, #[case] expected: Option<i32>) {
        let probe: Probe = serde_json::from_value(json!({ "minutes": raw })).expect("decode");
        assert_eq!(probe.minutes, expected);
    }

    #[rstest]
    fn missing_fields_use_defaults() {
        let probe: Probe = serde_json::from_value(json!({})).expect("decode");
        assert!(probe.minutes.is_none());
        assert!(probe.amount.is_none());
        assert!(probe.tags.is_empty());
        assert!(probe.label.is_none());
    }

    #[rstest]
    #[case(json!("2.5"), Some(2.5))]
    #[case(json!("pinch"), None)]
    #[case(json!(-1), Some(-1.0))]
    fn decimals_parse_leading_numbers(#[case] raw: Value, #[case] expected: Option<f64>) {
        let probe: Probe = serde_json::from_value(json!({ "amount": raw })).expect("decode");
        assert_eq!(probe.amount, expected);
    }

    #[rstest]
    fn string_list_accepts_single_string() {
        let probe: Probe = serde_json::from_value(json!({ "tags": "vegan" })).expect("decode");
        assert_eq!(probe.tags, vec!["vegan".to_owned()]);
    }

    #[rstest]
    fn optional_text_renders_numbers() {
        let probe: Probe = serde_json::from_value(json!({ "label": 180 })).expect("decode");
        assert_eq!(probe.label.as_deref(), Some("180"));
    }
}
