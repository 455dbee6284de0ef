//! Extraction and repair of JSON artifacts embedded in model replies.
//!
//! Replies often wrap the object in prose or code fences and use cooking
//! notation that is not JSON. The repair pass rewrites the known cases
//! before decoding; it never calls the model again.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::Error;

/// Fractions the repair pass understands, with the decimals written in
/// their place.
const FRACTIONS: &[(&str, f64)] = &[
    ("1/2", 0.5),
    ("1/3", 0.33),
    ("2/3", 0.67),
    ("1/4", 0.25),
    ("3/4", 0.75),
    ("1/8", 0.125),
    ("3/8", 0.375),
    ("5/8", 0.625),
    ("7/8", 0.875),
];

static FRACTION_RE: OnceLock<Regex> = OnceLock::new();
static TO_TASTE_RE: OnceLock<Regex> = OnceLock::new();

fn fraction_regex() -> &'static Regex {
    FRACTION_RE.get_or_init(|| {
        Regex::new(r#"("(?:amount|quantity)"\s*:\s*)(?:(\d+)\s+)?(\d+)\s*/\s*(\d+)"#)
            .unwrap_or_else(|error| panic!("fraction regex failed to compile: {error}"))
    })
}

fn to_taste_regex() -> &'static Regex {
    TO_TASTE_RE.get_or_init(|| {
        Regex::new(r#"(?i)("amount"\s*:\s*)"\s*(?:[aàá]\s+g[oóô]sto|to\s+taste)\s*""#)
            .unwrap_or_else(|error| panic!("to-taste regex failed to compile: {error}"))
    })
}

/// Substring from the first `{` to the last `}`, if both exist in order.
///
/// # Examples
/// ```
/// use pantry_backend::domain::llm_response::extract_json;
///
/// assert_eq!(extract_json("Sure! {\"a\": 1} Enjoy."), Some("{\"a\": 1}"));
/// assert_eq!(extract_json("no object here"), None);
/// ```
#[must_use]
pub fn extract_json(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

fn fraction_value(numerator: &str, denominator: &str) -> Option<f64> {
    let key = format!("{numerator}/{denominator}");
    FRACTIONS
        .iter()
        .find(|(fraction, _)| *fraction == key)
        .map(|(_, value)| *value)
}

/// Apply the repair pass to a JSON candidate.
///
/// Known fractions and mixed numbers after `"amount"` or `"quantity"` become
/// decimals; `"a gosto"` and `"to taste"` amounts become `null`. Anything
/// else is left untouched, so valid JSON passes through unchanged.
#[must_use]
pub fn repair(candidate: &str) -> String {
    let fractions_fixed = fraction_regex().replace_all(candidate, |captures: &Captures<'_>| {
        let whole_text = &captures[0];
        let (Some(prefix), Some(numerator), Some(denominator)) =
            (captures.get(1), captures.get(3), captures.get(4))
        else {
            return whole_text.to_owned();
        };
        let Some(fraction) = fraction_value(numerator.as_str(), denominator.as_str()) else {
            return whole_text.to_owned();
        };
        let whole = captures
            .get(2)
            .and_then(|whole| whole.as_str().parse::<f64>().ok())
            .unwrap_or(0.0);
        format!("{}{}", prefix.as_str(), whole + fraction)
    });
    to_taste_regex()
        .replace_all(&fractions_fixed, |captures: &Captures<'_>| {
            let prefix = captures.get(1).map_or("\"amount\": ", |found| found.as_str());
            format!("{prefix}null")
        })
        .into_owned()
}

/// Extract, repair, and decode an artifact from a model reply.
///
/// Failures yield `INVALID_LLM_RESPONSE` with the raw reply in the details.
pub fn parse_artifact<T: DeserializeOwned>(reply: &str) -> Result<T, Error> {
    let candidate =
        extract_json(reply).ok_or_else(|| invalid(reply, "reply contains no JSON object"))?;
    let repaired = repair(candidate);
    serde_json::from_str(&repaired).map_err(|error| invalid(reply, &error.to_string()))
}

fn invalid(reply: &str, reason: &str) -> Error {
    Error::invalid_llm_response(format!("could not decode model reply: {reason}"))
        .with_details(json!({ "reason": reason, "raw": reply }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::recipes::GeneratedRecipe;
    use rstest::rstest;
    use serde_json::Value;

    const RECIPE: &str = r#"{
        "title": "Rice bowl",
        "description": "Quick",
        "ingredients": [
            {"name": "rice", "amount": 0.5, "unit": "cup", "available": true},
            {"name": "salt", "amount": null, "unit": "", "available": false}
        ],
        "instructions": [{"step": 1, "description": "Boil", "time": 15}],
        "cooking_time": 15,
        "preparation_time": 5,
        "total_time": 20,
        "serving_size": 2,
        "difficulty": "easy",
        "meal_type": "lunch",
        "cuisine": "Asian",
        "dietary_restrictions": ["vegan"],
        "tips": ["Rinse the rice"],
        "nutrition_info": {"calories": 300, "protein": 6, "carbohydrates": 60, "fat": 1}
    }"#;

    #[rstest]
    #[case("1/2", 0.5)]
    #[case("1/3", 0.33)]
    #[case("2/3", 0.67)]
    #[case("1/4", 0.25)]
    #[case("3/4", 0.75)]
    #[case("1/8", 0.125)]
    #[case("3/8", 0.375)]
    #[case("5/8", 0.625)]
    #[case("7/8", 0.875)]
    #[case("1 1/2", 1.5)]
    #[case("2 3/4", 2.75)]
    fn fractions_become_decimals(#[case] raw: &str, #[case] expected: f64) {
        let repaired = repair(&format!(r#"{{"amount": {raw}}}"#));
        let value: Value = serde_json::from_str(&repaired).expect("valid json");
        let amount = value["amount"].as_f64().expect("number");
        assert!((amount - expected).abs() < 1e-9, "{raw} -> {amount}");
    }

    #[rstest]
    #[case(r#""a gosto""#)]
    #[case(r#""A Gosto""#)]
    #[case(r#""à gosto""#)]
    #[case(r#"" a gôsto ""#)]
    #[case(r#""to taste""#)]
    fn to_taste_amounts_become_null(#[case] raw: &str) {
        let repaired = repair(&format!(r#"{{"name": "salt", "amount": {raw}}}"#));
        let value: Value = serde_json::from_str(&repaired).expect("valid json");
        assert!(value["amount"].is_null());
    }

    #[rstest]
    fn unknown_fractions_are_left_alone() {
        let input = r#"{"amount": 5/7}"#;
        assert_eq!(repair(input), input);
    }

    #[rstest]
    fn valid_json_is_unchanged_by_repair() {
        assert_eq!(repair(RECIPE), RECIPE);
    }

    #[rstest]
    fn repair_law_half_matches_decimal() {
        let with_fraction = RECIPE.replacen("\"amount\": 0.5", "\"amount\": 1/2", 1);
        assert_ne!(with_fraction, RECIPE);
        let expected: GeneratedRecipe = parse_artifact(RECIPE).expect("decimal");
        let repaired: GeneratedRecipe = parse_artifact(&with_fraction).expect("fraction");
        assert_eq!(repaired, expected);
        assert_eq!(repaired.ingredients[0].amount, Some(0.5));
    }

    #[rstest]
    fn prose_around_the_object_is_ignored() {
        let wrapped = format!("Here is your recipe:\n```json\n{RECIPE}\n```\nBon appétit!");
        let bare: GeneratedRecipe = parse_artifact(RECIPE).expect("bare");
        let from_prose: GeneratedRecipe = parse_artifact(&wrapped).expect("wrapped");
        assert_eq!(from_prose, bare);
    }

    #[rstest]
    #[case("I cannot help with that.")]
    #[case("} backwards {")]
    #[case("{\"title\": ")]
    fn undecodable_replies_carry_raw_text(#[case] reply: &str) {
        let err = parse_artifact::<GeneratedRecipe>(reply).expect_err("invalid");
        assert_eq!(err.code(), ErrorCode::InvalidLlmResponse);
        assert_eq!(err.details().expect("details")["raw"], reply);
    }
}
