//! Per-resource request assembly.
//!
//! # Design
//! Every operation declares an explicit, ordered schema: the parameter names
//! it accepts and their defaults (the operation's positional arguments, or
//! null). Caller keys are lower-cased in a separate pass and then matched
//! against that schema, so case-insensitivity never depends on a special map
//! type. The finished [`RequestSpec`] holds only non-null values, with
//! identifier lists already comma-joined.

use crate::error::{ApiError, Result};
use crate::http::HttpMethod;
use crate::types::{Format, ParamValue, Params};
use crate::validate;

pub const USERKEY_FIELD: &str = "userkey";
pub const ERRORMODE_FIELD: &str = "errormode";
pub const ERRORMODE_CONFLICT: i64 = 409;

/// Fields serialized as a single comma-joined value when given as a list.
const JOINED_FIELDS: &[&str] = &["imo", "mmsi"];

/// Requirements spanning several fields of one resource, checked after the
/// merge and before field validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossFieldRule {
    /// Vessel lookups need an IMO or an MMSI, positional or not.
    VesselTarget,
    /// Port calls need a vessel or a port, and not all three at once.
    PortCallTarget,
    /// Expected arrivals need an interval or a date bound.
    ArrivalTimespan,
    /// List-manager mutations need at least one vessel identifier.
    ListVessels,
}

impl CrossFieldRule {
    pub fn check(self, fields: &[(String, ParamValue)]) -> Result<()> {
        let present = |name: &str| {
            fields
                .iter()
                .any(|(field, value)| field == name && !value.is_null())
        };
        match self {
            CrossFieldRule::VesselTarget => {
                if !present("imo") && !present("mmsi") {
                    return Err(ApiError::argument(
                        "At least one IMO number or MMSI number is required.",
                    ));
                }
            }
            CrossFieldRule::PortCallTarget => {
                let (imo, mmsi, locode) = (present("imo"), present("mmsi"), present("locode"));
                if !imo && !mmsi && !locode {
                    return Err(ApiError::argument(
                        "At least one IMO number or MMSI number or Port LOCODE is required. \
                         Any combination between several IMO and MMSI numbers is possible but \
                         combination between IMO/MMSI numbers and Port LOCODE is not allowed.",
                    ));
                }
                // Only the triple is rejected; locode with just one of imo/mmsi passes.
                if imo && mmsi && locode {
                    return Err(ApiError::argument(
                        "Combination between IMO/MMSI numbers and Port LOCODE is not allowed.",
                    ));
                }
            }
            CrossFieldRule::ArrivalTimespan => {
                if !present("interval") && !present("fromdate") && !present("todate") {
                    return Err(ApiError::argument(
                        "The request should contain timespan specified by interval or \
                         fromdate / todate parameters!",
                    ));
                }
            }
            CrossFieldRule::ListVessels => {
                if !present("imo") && !present("mmsi") {
                    return Err(ApiError::argument(
                        "Vessels may be specified by list of IMO or MMSI numbers or both!",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A fully merged and validated request, ready to serialize.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub resource: &'static str,
    pub method: HttpMethod,
    /// Ordered, null-free parameters.
    pub params: Vec<(String, ParamValue)>,
    /// Success message reported when the service answers with an empty body.
    pub placeholder: Option<&'static str>,
}

impl RequestSpec {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn format(&self) -> Format {
        Format::from_param(self.get("format"))
    }

    /// Parameters in wire form, in schema order.
    pub fn wire_pairs(&self) -> impl Iterator<Item = (&str, String)> {
        self.params
            .iter()
            .map(|(field, value)| (field.as_str(), value.render()))
    }
}

/// Declares one operation's schema and turns caller arguments into a
/// [`RequestSpec`].
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    resource: &'static str,
    method: HttpMethod,
    schema: Vec<(&'static str, ParamValue)>,
    rules: Vec<CrossFieldRule>,
    placeholder: Option<&'static str>,
}

impl RequestBuilder {
    pub fn new(resource: &'static str, method: HttpMethod) -> Self {
        Self {
            resource,
            method,
            schema: Vec::new(),
            rules: Vec::new(),
            placeholder: None,
        }
    }

    /// Accept an optional field whose default is null.
    pub fn field(self, name: &'static str) -> Self {
        self.field_with_default(name, ParamValue::Null)
    }

    /// Accept several optional fields, in order.
    pub fn fields(self, names: &[&'static str]) -> Self {
        names.iter().fold(self, |builder, name| builder.field(*name))
    }

    /// Accept a field with an explicit default, typically a positional
    /// argument of the operation.
    pub fn field_with_default(mut self, name: &'static str, default: ParamValue) -> Self {
        self.schema.push((name, default));
        self
    }

    pub fn rule(mut self, rule: CrossFieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn placeholder(mut self, message: &'static str) -> Self {
        self.placeholder = Some(message);
        self
    }

    /// Merge caller arguments over the schema defaults, enforce cross-field
    /// rules, inject credentials, drop nulls, validate, and join identifier
    /// lists.
    pub fn build(&self, caller: &Params, userkey: &str, error_mode: bool) -> Result<RequestSpec> {
        let mut fields = self.merge(caller);

        for rule in &self.rules {
            rule.check(&fields)?;
        }

        fields.push((USERKEY_FIELD.to_string(), ParamValue::Text(userkey.to_string())));
        if error_mode {
            fields.push((ERRORMODE_FIELD.to_string(), ParamValue::Int(ERRORMODE_CONFLICT)));
        }
        fields.retain(|(_, value)| !value.is_null());

        validate::validate_params(&fields)?;

        for (name, value) in fields.iter_mut() {
            if JOINED_FIELDS.contains(&name.as_str()) && matches!(value, ParamValue::List(_)) {
                *value = ParamValue::Text(value.render());
            }
        }

        Ok(RequestSpec {
            resource: self.resource,
            method: self.method,
            params: fields,
            placeholder: self.placeholder,
        })
    }

    /// Lower-case caller keys, keep the ones the schema declares, and overlay
    /// them onto the defaults. A repeated key (after lower-casing) takes the
    /// last value given.
    fn merge(&self, caller: &Params) -> Vec<(String, ParamValue)> {
        let lowered: Vec<(String, &ParamValue)> = caller
            .iter()
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect();

        self.schema
            .iter()
            .map(|(name, default)| {
                let value = lowered
                    .iter()
                    .rev()
                    .find(|(key, _)| key == name)
                    .map_or_else(|| default.clone(), |(_, value)| (*value).clone());
                (name.to_string(), value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "secret";

    fn vessels(imo: ParamValue, mmsi: ParamValue) -> RequestBuilder {
        RequestBuilder::new("vessels", HttpMethod::Get)
            .field_with_default("imo", imo)
            .field_with_default("mmsi", mmsi)
            .fields(&["format", "extradata", "sat", "interval"])
    }

    fn port_calls() -> RequestBuilder {
        RequestBuilder::new("portcalls", HttpMethod::Get)
            .field_with_default("interval", ParamValue::Int(720))
            .fields(&["format", "imo", "mmsi", "locode", "extradata", "limit", "event"])
            .fields(&["fromdate", "todate"])
            .rule(CrossFieldRule::PortCallTarget)
    }

    fn names(spec: &RequestSpec) -> Vec<&str> {
        spec.params.iter().map(|(k, _)| k.as_str()).collect()
    }

    #[test]
    fn imo_list_is_comma_joined() {
        let spec = vessels(ParamValue::from(vec![9228801_i64, 9441271]), ParamValue::Null)
            .build(&Params::new(), KEY, false)
            .unwrap();
        assert_eq!(spec.get("imo"), Some(&ParamValue::Text("9228801,9441271".into())));
        assert_eq!(spec.get("mmsi"), None);
    }

    #[test]
    fn null_defaults_are_never_sent() {
        let spec = vessels(ParamValue::Int(9228801), ParamValue::Null)
            .build(&Params::new(), KEY, false)
            .unwrap();
        assert_eq!(names(&spec), vec!["imo", "userkey"]);
    }

    #[test]
    fn caller_keys_are_case_insensitive_and_unknown_keys_dropped() {
        let caller = Params::new()
            .with("FORMAT", "xml")
            .with("ExtraData", "voyage")
            .with("userkey", "spoofed")
            .with("colour", "red");
        let spec = vessels(ParamValue::Int(9228801), ParamValue::Null)
            .build(&caller, KEY, false)
            .unwrap();
        assert_eq!(names(&spec), vec!["imo", "format", "extradata", "userkey"]);
        assert_eq!(spec.get("userkey"), Some(&ParamValue::Text(KEY.into())));
        assert_eq!(spec.format(), Format::Xml);
    }

    #[test]
    fn later_duplicate_key_wins() {
        let caller = Params::new().with("format", "xml").with("Format", "json");
        let spec = vessels(ParamValue::Int(9228801), ParamValue::Null)
            .build(&caller, KEY, false)
            .unwrap();
        assert_eq!(spec.format(), Format::Json);
    }

    #[test]
    fn caller_can_override_positional_default() {
        let caller = Params::new().with("imo", 9441271);
        let spec = vessels(ParamValue::Int(9228801), ParamValue::Null)
            .build(&caller, KEY, false)
            .unwrap();
        assert_eq!(spec.get("imo"), Some(&ParamValue::Int(9441271)));
    }

    #[test]
    fn error_mode_injects_directive() {
        let spec = vessels(ParamValue::Int(9228801), ParamValue::Null)
            .build(&Params::new(), KEY, true)
            .unwrap();
        assert_eq!(spec.get("errormode"), Some(&ParamValue::Int(409)));
    }

    #[test]
    fn validation_runs_after_merge() {
        let caller = Params::new().with("format", "csv");
        let err = vessels(ParamValue::Int(9228801), ParamValue::Null)
            .build(&caller, KEY, false)
            .unwrap_err();
        assert_eq!(err, ApiError::argument("Invalid format \"csv\""));
    }

    #[test]
    fn vessel_identifier_may_come_from_caller_params() {
        let builder = vessels(ParamValue::Null, ParamValue::Null).rule(CrossFieldRule::VesselTarget);
        let err = builder.build(&Params::new(), KEY, false).unwrap_err();
        assert_eq!(
            err,
            ApiError::argument("At least one IMO number or MMSI number is required.")
        );
        let spec = builder
            .build(&Params::new().with("MMSI", 227441980), KEY, false)
            .unwrap();
        assert_eq!(names(&spec), vec!["mmsi", "userkey"]);
    }

    #[test]
    fn port_calls_need_a_target() {
        let err = port_calls().build(&Params::new(), KEY, false).unwrap_err();
        assert!(matches!(err, ApiError::Argument(ref m) if m.starts_with("At least one IMO")));
    }

    #[test]
    fn port_calls_reject_all_three_targets() {
        let caller = Params::new()
            .with("imo", 9175717)
            .with("mmsi", 227441980)
            .with("locode", "BGVAR");
        let err = port_calls().build(&caller, KEY, false).unwrap_err();
        assert_eq!(
            err,
            ApiError::argument("Combination between IMO/MMSI numbers and Port LOCODE is not allowed.")
        );
    }

    #[test]
    fn port_calls_accept_locode_with_a_single_identifier() {
        // The error text forbids any IMO/MMSI + LOCODE mix, but only the
        // three-way combination is rejected.
        let caller = Params::new().with("imo", 9175717).with("locode", "BGVAR");
        let spec = port_calls().build(&caller, KEY, false).unwrap();
        assert_eq!(names(&spec), vec!["interval", "imo", "locode", "userkey"]);
    }

    #[test]
    fn cross_field_rules_run_before_field_validation() {
        let caller = Params::new().with("format", "csv");
        let err = port_calls().build(&caller, KEY, false).unwrap_err();
        assert!(err.message().starts_with("At least one IMO"));
    }

    #[test]
    fn arrivals_need_a_timespan() {
        let builder = RequestBuilder::new("expectedarrivals", HttpMethod::Get)
            .field_with_default("locode", "GIGIB".into())
            .fields(&["interval", "fromdate", "todate"])
            .rule(CrossFieldRule::ArrivalTimespan);
        assert!(builder.build(&Params::new(), KEY, false).is_err());
        let caller = Params::new().with("todate", "2021-06-15 10:00:00");
        assert!(builder.build(&caller, KEY, false).is_ok());
    }

    #[test]
    fn list_mutations_need_a_vessel() {
        let builder = RequestBuilder::new("listmanager", HttpMethod::Post)
            .fields(&["imo", "mmsi"])
            .rule(CrossFieldRule::ListVessels)
            .placeholder("Successfully added to your ListManager.");
        let err = builder.build(&Params::new(), KEY, false).unwrap_err();
        assert_eq!(
            err,
            ApiError::argument("Vessels may be specified by list of IMO or MMSI numbers or both!")
        );
        let spec = builder
            .build(&Params::new().with("mmsi", vec![227441980_i64, 244670249]), KEY, false)
            .unwrap();
        assert_eq!(spec.get("mmsi"), Some(&ParamValue::Text("227441980,244670249".into())));
        assert_eq!(spec.placeholder, Some("Successfully added to your ListManager."));
    }

    #[test]
    fn wire_pairs_render_values() {
        let spec = port_calls()
            .build(&Params::new().with("locode", "BGVAR"), KEY, true)
            .unwrap();
        let pairs: Vec<(&str, String)> = spec.wire_pairs().collect();
        assert_eq!(
            pairs,
            vec![
                ("interval", "720".to_string()),
                ("locode", "BGVAR".to_string()),
                ("userkey", KEY.to_string()),
                ("errormode", "409".to_string()),
            ]
        );
    }
}
