//! Field-level parameter validation.
//!
//! Each rule is a pure check over one parameter value. Rules never look at
//! other fields; cross-field requirements live in the request builder. The
//! rule table fixes the order in which fields are checked, so the first
//! reported error is deterministic.

use chrono::NaiveDateTime;

use crate::error::{ApiError, Result};
use crate::types::ParamValue;

/// Date-time layout accepted by `fromdate` and `todate`.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const IMO_RANGE: std::ops::RangeInclusive<i64> = 1_000_000..=9_999_999;
pub const MMSI_RANGE: std::ops::RangeInclusive<i64> = 200_000_000..=799_999_999;

const EXTRADATA_TYPES: &[&str] = &["ais", "voyage", "master"];
const PORT_CALL_EVENTS: &[&str] = &["ARRIVAL", "DEPARTURE"];

/// A declarative validation rule: the field it applies to and its check.
#[derive(Clone, Copy)]
pub struct Rule {
    pub field: &'static str,
    check: fn(&str, &ParamValue) -> Result<()>,
}

impl Rule {
    pub fn check(&self, value: &ParamValue) -> Result<()> {
        (self.check)(self.field, value)
    }
}

/// Every validated field, in checking order.
pub const RULES: &[Rule] = &[
    Rule { field: "format", check: validate_format },
    Rule { field: "interval", check: validate_interval },
    Rule { field: "imo", check: validate_imo },
    Rule { field: "mmsi", check: validate_mmsi },
    Rule { field: "extradata", check: validate_extradata },
    Rule { field: "event", check: validate_event },
    Rule { field: "fromdate", check: validate_date },
    Rule { field: "todate", check: validate_date },
    Rule { field: "from", check: validate_coordinates },
    Rule { field: "to", check: validate_coordinates },
];

/// Check every present, non-null field against its rule; stop at the first
/// failure. Fields without a rule pass through untouched.
pub fn validate_params(params: &[(String, ParamValue)]) -> Result<()> {
    for rule in RULES {
        let value = params
            .iter()
            .find(|(name, value)| name == rule.field && !value.is_null())
            .map(|(_, value)| value);
        if let Some(value) = value {
            rule.check(value)?;
        }
    }
    Ok(())
}

pub fn validate_format(_field: &str, value: &ParamValue) -> Result<()> {
    match value {
        ParamValue::Text(s) if s == "json" || s == "xml" => Ok(()),
        other => Err(ApiError::argument(format!("Invalid format \"{other}\""))),
    }
}

pub fn validate_interval(field: &str, value: &ParamValue) -> Result<()> {
    if is_numeric(value) {
        Ok(())
    } else {
        Err(ApiError::argument(format!(
            "Invalid format \"{field}={value}\""
        )))
    }
}

pub fn validate_imo(_field: &str, value: &ParamValue) -> Result<()> {
    validate_identifiers("IMO", IMO_RANGE, value)
}

pub fn validate_mmsi(_field: &str, value: &ParamValue) -> Result<()> {
    validate_identifiers("MMSI", MMSI_RANGE, value)
}

fn validate_identifiers(
    label: &str,
    range: std::ops::RangeInclusive<i64>,
    value: &ParamValue,
) -> Result<()> {
    for element in value.elements() {
        match element {
            ParamValue::Int(n) if range.contains(n) => {}
            ParamValue::Int(n) => {
                return Err(ApiError::argument(format!("Invalid {label} \"{n}\"")));
            }
            other => {
                return Err(ApiError::argument(format!(
                    "{label} \"{other}\" is not an integer"
                )));
            }
        }
    }
    Ok(())
}

pub fn validate_extradata(_field: &str, value: &ParamValue) -> Result<()> {
    let rendered = value.render();
    match rendered
        .split(',')
        .find(|token| !EXTRADATA_TYPES.contains(token))
    {
        Some(token) => Err(ApiError::argument(format!(
            "Invalid ExtraData type \"{token}\""
        ))),
        None => Ok(()),
    }
}

pub fn validate_event(_field: &str, value: &ParamValue) -> Result<()> {
    let rendered = value.render();
    if PORT_CALL_EVENTS.contains(&rendered.to_uppercase().as_str()) {
        Ok(())
    } else {
        Err(ApiError::argument(format!(
            "Invalid PortCall type \"{rendered}\""
        )))
    }
}

/// Parse with [`DATE_FORMAT`] and require the value to format back to the
/// identical string, which rejects impossible calendar dates and loose
/// spellings such as single-digit months.
pub fn validate_date(field: &str, value: &ParamValue) -> Result<()> {
    let valid = match value {
        ParamValue::Text(s) => NaiveDateTime::parse_from_str(s, DATE_FORMAT)
            .map(|parsed| parsed.format(DATE_FORMAT).to_string() == *s)
            .unwrap_or(false),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ApiError::argument(format!(
            "Invalid Date format \"{field}={value}\""
        )))
    }
}

/// A `lon,lat` pair: exactly two comma-separated numeric tokens.
pub fn validate_coordinates(field: &str, value: &ParamValue) -> Result<()> {
    let rendered = match value {
        ParamValue::Text(s) => s.as_str(),
        _ => "",
    };
    let tokens: Vec<&str> = rendered.split(',').collect();
    if tokens.len() == 2 && tokens.iter().all(|t| is_numeric_str(t)) {
        Ok(())
    } else {
        Err(ApiError::argument(format!(
            "Invalid format of parameter \"{field}\" coordinate"
        )))
    }
}

fn is_numeric(value: &ParamValue) -> bool {
    match value {
        ParamValue::Int(_) => true,
        ParamValue::Float(f) => f.is_finite(),
        ParamValue::Text(s) => is_numeric_str(s),
        ParamValue::Null | ParamValue::List(_) => false,
    }
}

fn is_numeric_str(s: &str) -> bool {
    s.trim()
        .parse::<f64>()
        .map(|f| f.is_finite())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ParamValue {
        ParamValue::Text(s.to_string())
    }

    fn message(result: Result<()>) -> String {
        match result.unwrap_err() {
            ApiError::Argument(msg) => msg,
            other => panic!("expected argument error, got {other:?}"),
        }
    }

    #[test]
    fn format_accepts_only_json_and_xml() {
        assert!(validate_format("format", &text("json")).is_ok());
        assert!(validate_format("format", &text("xml")).is_ok());
        assert_eq!(
            message(validate_format("format", &text("JSON"))),
            "Invalid format \"JSON\""
        );
        assert!(validate_format("format", &text("csv")).is_err());
    }

    #[test]
    fn interval_accepts_any_number() {
        assert!(validate_interval("interval", &ParamValue::Int(720)).is_ok());
        assert!(validate_interval("interval", &ParamValue::Float(1.5)).is_ok());
        assert!(validate_interval("interval", &text("10080")).is_ok());
        assert!(validate_interval("interval", &text("-2.5")).is_ok());
        assert_eq!(
            message(validate_interval("interval", &text("weekly"))),
            "Invalid format \"interval=weekly\""
        );
        assert!(validate_interval("interval", &text("NaN")).is_err());
    }

    #[test]
    fn imo_bounds_are_inclusive() {
        assert!(validate_imo("imo", &ParamValue::Int(1_000_000)).is_ok());
        assert!(validate_imo("imo", &ParamValue::Int(9_999_999)).is_ok());
        assert_eq!(
            message(validate_imo("imo", &ParamValue::Int(999_999))),
            "Invalid IMO \"999999\""
        );
        assert_eq!(
            message(validate_imo("imo", &ParamValue::Int(10_000_000))),
            "Invalid IMO \"10000000\""
        );
    }

    #[test]
    fn imo_non_integers_have_their_own_message() {
        assert_eq!(
            message(validate_imo("imo", &text("9228801"))),
            "IMO \"9228801\" is not an integer"
        );
        assert_eq!(
            message(validate_imo("imo", &ParamValue::Float(9228801.5))),
            "IMO \"9228801.5\" is not an integer"
        );
    }

    #[test]
    fn imo_lists_check_every_element() {
        let good = ParamValue::from(vec![9228801_i64, 9441271]);
        assert!(validate_imo("imo", &good).is_ok());

        let bad = ParamValue::List(vec![ParamValue::Int(9228801), ParamValue::Int(42)]);
        assert_eq!(message(validate_imo("imo", &bad)), "Invalid IMO \"42\"");
    }

    #[test]
    fn mmsi_bounds_are_inclusive() {
        assert!(validate_mmsi("mmsi", &ParamValue::Int(200_000_000)).is_ok());
        assert!(validate_mmsi("mmsi", &ParamValue::Int(799_999_999)).is_ok());
        assert!(validate_mmsi("mmsi", &ParamValue::Int(227_441_980)).is_ok());
        assert_eq!(
            message(validate_mmsi("mmsi", &ParamValue::Int(199_999_999))),
            "Invalid MMSI \"199999999\""
        );
        assert!(validate_mmsi("mmsi", &ParamValue::Int(800_000_000)).is_err());
        assert_eq!(
            message(validate_mmsi("mmsi", &text("abc"))),
            "MMSI \"abc\" is not an integer"
        );
    }

    #[test]
    fn extradata_tokens_are_case_sensitive() {
        assert!(validate_extradata("extradata", &text("voyage")).is_ok());
        assert!(validate_extradata("extradata", &text("ais,voyage,master")).is_ok());
        assert_eq!(
            message(validate_extradata("extradata", &text("ais,Voyage"))),
            "Invalid ExtraData type \"Voyage\""
        );
        assert!(validate_extradata("extradata", &text("ais,")).is_err());
    }

    #[test]
    fn event_is_case_insensitive() {
        assert!(validate_event("event", &text("arrival")).is_ok());
        assert!(validate_event("event", &text("Departure")).is_ok());
        assert_eq!(
            message(validate_event("event", &text("anchored"))),
            "Invalid PortCall type \"anchored\""
        );
    }

    #[test]
    fn dates_must_round_trip() {
        assert!(validate_date("fromdate", &text("2021-06-15 10:00:00")).is_ok());
        assert_eq!(
            message(validate_date("fromdate", &text("2021-02-30 10:00:00"))),
            "Invalid Date format \"fromdate=2021-02-30 10:00:00\""
        );
        assert_eq!(
            message(validate_date("todate", &text("2021-06-15"))),
            "Invalid Date format \"todate=2021-06-15\""
        );
        assert!(validate_date("todate", &text("2021-6-15 10:00:00")).is_err());
        assert!(validate_date("todate", &ParamValue::Int(20210615)).is_err());
    }

    #[test]
    fn coordinates_need_two_numeric_tokens() {
        assert!(validate_coordinates("from", &text("1.24703,51.94967")).is_ok());
        assert!(validate_coordinates("to", &text("28.68018,40.96205")).is_ok());
        assert_eq!(
            message(validate_coordinates("from", &text("1.24703"))),
            "Invalid format of parameter \"from\" coordinate"
        );
        assert_eq!(
            message(validate_coordinates("to", &text("abc,51.9"))),
            "Invalid format of parameter \"to\" coordinate"
        );
        assert!(validate_coordinates("to", &text("1,2,3")).is_err());
    }

    #[test]
    fn first_failure_follows_rule_order() {
        let params = vec![
            ("mmsi".to_string(), ParamValue::Int(1)),
            ("format".to_string(), text("yaml")),
        ];
        assert_eq!(message(validate_params(&params)), "Invalid format \"yaml\"");
    }

    #[test]
    fn fromdate_and_todate_are_checked_independently() {
        let params = vec![
            ("fromdate".to_string(), text("2021-06-15 10:00:00")),
            ("todate".to_string(), text("2021-06-31 10:00:00")),
        ];
        assert_eq!(
            message(validate_params(&params)),
            "Invalid Date format \"todate=2021-06-31 10:00:00\""
        );
    }

    #[test]
    fn unknown_and_null_fields_pass() {
        let params = vec![
            ("locode".to_string(), text("BGVAR")),
            ("imo".to_string(), ParamValue::Null),
        ];
        assert!(validate_params(&params).is_ok());
    }
}
