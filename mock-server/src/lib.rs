//! In-memory imitation of the VesselFinder API for tests and local runs.
//!
//! Answers every resource path with small canned payloads, checks the
//! `userkey`, counts down a credit balance, and keeps a per-server list
//! manager. Business errors follow the real service: with `errormode=409`
//! they are a 409 carrying the message as the body, otherwise a 200 with an
//! `X-API-Error` header and a JSON `error` field.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub const DEFAULT_USERKEY: &str = "test-userkey";
pub const DEFAULT_CREDITS: u64 = 1_000;
pub const EXPIRATION_DATE: &str = "2030-01-01 00:00:00";

/// Raw request parameters, from the query string or a form body.
pub type Params = HashMap<String, String>;

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub userkey: String,
    pub credits: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            userkey: DEFAULT_USERKEY.to_string(),
            credits: DEFAULT_CREDITS,
        }
    }
}

impl MockConfig {
    /// `MOCK_USERKEY` and `MOCK_CREDITS` override the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(userkey) = std::env::var("MOCK_USERKEY") {
            config.userkey = userkey;
        }
        if let Some(credits) = std::env::var("MOCK_CREDITS").ok().and_then(|c| c.parse().ok()) {
            config.credits = credits;
        }
        config
    }
}

/// Account state behind one userkey.
#[derive(Debug, Default)]
pub struct Account {
    pub credits: u64,
    pub imo: BTreeSet<u64>,
    pub mmsi: BTreeSet<u64>,
}

pub type Db = Arc<RwLock<Account>>;

#[derive(Clone)]
struct AppState {
    userkey: Arc<str>,
    db: Db,
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let state = AppState {
        userkey: config.userkey.into(),
        db: Arc::new(RwLock::new(Account {
            credits: config.credits,
            ..Account::default()
        })),
    };
    Router::new()
        .route("/status", get(status))
        .route("/vessels", get(vessels))
        .route("/vesselslist", get(vessels_list))
        .route("/livedata", get(live_data))
        .route("/portcalls", get(port_calls))
        .route("/expectedarrivals", get(expected_arrivals))
        .route("/masterdata", get(master_data))
        .route("/distance", get(distance))
        .route(
            "/listmanager",
            get(list_manager)
                .post(list_add)
                .put(list_replace)
                .delete(list_delete),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockConfig::default()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

fn error_mode(params: &Params) -> bool {
    params.get("errormode").map(String::as_str) == Some("409")
}

/// Business error in whichever style the caller asked for.
fn api_error(params: &Params, message: &str) -> Response {
    debug!(error = message, "rejecting request");
    if error_mode(params) {
        (StatusCode::CONFLICT, message.to_string()).into_response()
    } else {
        (
            [("X-API-Error", message.to_string())],
            Json(json!({ "error": message })),
        )
            .into_response()
    }
}

/// Check the userkey and spend one credit. Returns the remaining balance.
async fn authorize(state: &AppState, params: &Params) -> Result<u64, Response> {
    if params.get("userkey").map(String::as_str) != Some(&*state.userkey) {
        return Err(api_error(params, "Invalid userkey"));
    }
    let mut account = state.db.write().await;
    if account.credits == 0 {
        return Err(api_error(params, "limit exceeded"));
    }
    account.credits -= 1;
    Ok(account.credits)
}

fn info_headers(credits: u64) -> [(&'static str, String); 2] {
    [
        ("X-API-Credits", credits.to_string()),
        ("X-API-Expiration-Date", EXPIRATION_DATE.to_string()),
    ]
}

fn respond(params: &Params, credits: u64, root: &str, data: Value) -> Response {
    if params.get("format").map(String::as_str) == Some("xml") {
        (
            info_headers(credits),
            [(header::CONTENT_TYPE, "application/xml")],
            to_xml(root, &data),
        )
            .into_response()
    } else {
        (info_headers(credits), Json(data)).into_response()
    }
}

/// Empty-bodied success, as the list manager mutations answer.
fn respond_empty(credits: u64) -> Response {
    (info_headers(credits), StatusCode::OK).into_response()
}

/// Render `data` as XML under `root`. This is a fixture shape, not the real
/// service's schema: array entries and the top-level value are wrapped in
/// `<item>` elements, and clients should treat the text as opaque.
fn to_xml(root: &str, data: &Value) -> String {
    fn element(name: &str, value: &Value, out: &mut String) {
        match value {
            Value::Object(map) => {
                out.push_str(&format!("<{name}>"));
                for (key, child) in map {
                    element(key, child, out);
                }
                out.push_str(&format!("</{name}>"));
            }
            Value::Array(items) => {
                for item in items {
                    element(name, item, out);
                }
            }
            Value::Null => out.push_str(&format!("<{name}/>")),
            Value::String(s) => out.push_str(&format!("<{name}>{}</{name}>", escape(s))),
            other => out.push_str(&format!("<{name}>{other}</{name}>")),
        }
    }
    fn escape(s: &str) -> String {
        s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
    }

    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    out.push_str(&format!("<{root}>"));
    element("item", data, &mut out);
    out.push_str(&format!("</{root}>"));
    out
}

/// Parse a comma-separated identifier list; `None` on any non-integer token.
fn id_list(params: &Params, key: &str) -> Option<Vec<u64>> {
    match params.get(key) {
        None => Some(Vec::new()),
        Some(raw) => raw.split(',').map(|id| id.trim().parse().ok()).collect(),
    }
}

fn ais(imo: Option<u64>, mmsi: Option<u64>) -> Value {
    let id = imo.or(mmsi).unwrap_or_default();
    json!({
        "AIS": {
            "IMO": imo.unwrap_or_default(),
            "MMSI": mmsi.unwrap_or_default(),
            "NAME": format!("VESSEL {id}"),
            "LATITUDE": 43.19,
            "LONGITUDE": 27.93,
            "SPEED": 11.2,
            "COURSE": 118.0,
            "TIMESTAMP": "2021-06-15 10:00:00",
        }
    })
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

async fn status(State(state): State<AppState>, Query(params): Query<Params>) -> Response {
    let credits = match authorize(&state, &params).await {
        Ok(credits) => credits,
        Err(response) => return response,
    };
    respond(
        &params,
        credits,
        "STATUS",
        json!({ "CREDITS": credits, "EXPIRATION_DATE": EXPIRATION_DATE }),
    )
}

async fn vessels(State(state): State<AppState>, Query(params): Query<Params>) -> Response {
    let (Some(imo), Some(mmsi)) = (id_list(&params, "imo"), id_list(&params, "mmsi")) else {
        return api_error(&params, "Invalid IMO or MMSI");
    };
    if imo.is_empty() && mmsi.is_empty() {
        return api_error(&params, "IMO or MMSI is required");
    }
    let credits = match authorize(&state, &params).await {
        Ok(credits) => credits,
        Err(response) => return response,
    };
    let items: Vec<Value> = imo
        .iter()
        .map(|&id| ais(Some(id), None))
        .chain(mmsi.iter().map(|&id| ais(None, Some(id))))
        .collect();
    respond(&params, credits, "VESSELS", Value::Array(items))
}

async fn vessels_list(State(state): State<AppState>, Query(params): Query<Params>) -> Response {
    tracked_vessels(state, params, "VESSELS").await
}

async fn live_data(State(state): State<AppState>, Query(params): Query<Params>) -> Response {
    tracked_vessels(state, params, "LIVEDATA").await
}

/// Positions for every vessel in the account's list manager.
async fn tracked_vessels(state: AppState, params: Params, root: &str) -> Response {
    let credits = match authorize(&state, &params).await {
        Ok(credits) => credits,
        Err(response) => return response,
    };
    let account = state.db.read().await;
    let items: Vec<Value> = account
        .imo
        .iter()
        .map(|&id| ais(Some(id), None))
        .chain(account.mmsi.iter().map(|&id| ais(None, Some(id))))
        .collect();
    respond(&params, credits, root, Value::Array(items))
}

async fn port_calls(State(state): State<AppState>, Query(params): Query<Params>) -> Response {
    if !params.contains_key("interval") {
        return api_error(&params, "interval is required");
    }
    let credits = match authorize(&state, &params).await {
        Ok(credits) => credits,
        Err(response) => return response,
    };
    let event = params
        .get("event")
        .map(|e| e.to_uppercase())
        .unwrap_or_else(|| "ARRIVAL".to_string());
    let call = json!({
        "PORTCALL": {
            "IMO": params.get("imo").cloned().unwrap_or_default(),
            "MMSI": params.get("mmsi").cloned().unwrap_or_default(),
            "LOCODE": params.get("locode").cloned().unwrap_or_else(|| "BGVAR".to_string()),
            "EVENT": event,
            "TIMESTAMP": "2021-06-15 10:00:00",
        }
    });
    respond(&params, credits, "PORTCALLS", json!([call]))
}

async fn expected_arrivals(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Response {
    let Some(locode) = params.get("locode").cloned() else {
        return api_error(&params, "locode is required");
    };
    let credits = match authorize(&state, &params).await {
        Ok(credits) => credits,
        Err(response) => return response,
    };
    let limit = params
        .get("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(3);
    let arrivals: Vec<Value> = (0..limit)
        .map(|i| json!({ "LOCODE": locode, "IMO": 9228801 + i as u64, "ETA": "2021-06-16 08:00:00" }))
        .collect();
    respond(&params, credits, "ARRIVALS", Value::Array(arrivals))
}

async fn master_data(State(state): State<AppState>, Query(params): Query<Params>) -> Response {
    let Some(imo) = id_list(&params, "imo").filter(|ids| !ids.is_empty()) else {
        return api_error(&params, "IMO is required");
    };
    let credits = match authorize(&state, &params).await {
        Ok(credits) => credits,
        Err(response) => return response,
    };
    let items: Vec<Value> = imo
        .iter()
        .map(|id| json!({ "MASTERDATA": { "IMO": id, "NAME": format!("VESSEL {id}"), "FLAG": "MT" } }))
        .collect();
    respond(&params, credits, "MASTERDATA", Value::Array(items))
}

async fn distance(State(state): State<AppState>, Query(params): Query<Params>) -> Response {
    let points = (
        params.get("from").and_then(|p| parse_point(p)),
        params.get("to").and_then(|p| parse_point(p)),
    );
    let (Some(from), Some(to)) = points else {
        return api_error(&params, "Invalid coordinates");
    };
    let credits = match authorize(&state, &params).await {
        Ok(credits) => credits,
        Err(response) => return response,
    };
    let nm = (great_circle_nm(from, to) * 100.0).round() / 100.0;
    respond(&params, credits, "DISTANCE", json!({ "DISTANCE": nm, "UNIT": "NM" }))
}

fn parse_point(raw: &str) -> Option<(f64, f64)> {
    let (lon, lat) = raw.split_once(',')?;
    Some((lon.trim().parse().ok()?, lat.trim().parse().ok()?))
}

/// Haversine distance between two `(lon, lat)` points, in nautical miles.
fn great_circle_nm(from: (f64, f64), to: (f64, f64)) -> f64 {
    const EARTH_RADIUS_NM: f64 = 3440.065;
    let (lon1, lat1) = (from.0.to_radians(), from.1.to_radians());
    let (lon2, lat2) = (to.0.to_radians(), to.1.to_radians());
    let a = ((lat2 - lat1) / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * ((lon2 - lon1) / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_NM * a.sqrt().asin()
}

// ---------------------------------------------------------------------------
// List manager
// ---------------------------------------------------------------------------

enum ListOp {
    Add,
    Replace,
    Delete,
}

async fn list_manager(State(state): State<AppState>, Query(params): Query<Params>) -> Response {
    let credits = match authorize(&state, &params).await {
        Ok(credits) => credits,
        Err(response) => return response,
    };
    let account = state.db.read().await;
    respond(
        &params,
        credits,
        "LISTMANAGER",
        json!({ "IMO": account.imo, "MMSI": account.mmsi }),
    )
}

async fn list_add(State(state): State<AppState>, Form(params): Form<Params>) -> Response {
    mutate_list(state, params, ListOp::Add).await
}

async fn list_replace(State(state): State<AppState>, Form(params): Form<Params>) -> Response {
    mutate_list(state, params, ListOp::Replace).await
}

async fn list_delete(State(state): State<AppState>, Query(params): Query<Params>) -> Response {
    mutate_list(state, params, ListOp::Delete).await
}

async fn mutate_list(state: AppState, params: Params, op: ListOp) -> Response {
    let (Some(imo), Some(mmsi)) = (id_list(&params, "imo"), id_list(&params, "mmsi")) else {
        return api_error(&params, "Invalid IMO or MMSI");
    };
    if imo.is_empty() && mmsi.is_empty() {
        return api_error(&params, "IMO or MMSI is required");
    }
    let credits = match authorize(&state, &params).await {
        Ok(credits) => credits,
        Err(response) => return response,
    };
    let mut account = state.db.write().await;
    match op {
        ListOp::Add => {
            account.imo.extend(imo);
            account.mmsi.extend(mmsi);
        }
        ListOp::Replace => {
            account.imo = imo.into_iter().collect();
            account.mmsi = mmsi.into_iter().collect();
        }
        ListOp::Delete => {
            for id in imo {
                account.imo.remove(&id);
            }
            for id in mmsi {
                account.mmsi.remove(&id);
            }
        }
    }
    respond_empty(credits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn id_list_parses_comma_separated_ids() {
        let p = params(&[("imo", "9228801,9441271")]);
        assert_eq!(id_list(&p, "imo"), Some(vec![9228801, 9441271]));
        assert_eq!(id_list(&p, "mmsi"), Some(Vec::new()));
        assert_eq!(id_list(&params(&[("imo", "92x")]), "imo"), None);
    }

    #[test]
    fn error_mode_requires_exact_directive() {
        assert!(error_mode(&params(&[("errormode", "409")])));
        assert!(!error_mode(&params(&[("errormode", "1")])));
        assert!(!error_mode(&params(&[])));
    }

    #[test]
    fn distance_between_known_points() {
        // Felixstowe to Istanbul is roughly 1,300 nm as the crow flies.
        let nm = great_circle_nm((1.24703, 51.94967), (28.68018, 40.96205));
        assert!((1_250.0..1_350.0).contains(&nm), "got {nm}");
        assert_eq!(great_circle_nm((10.0, 10.0), (10.0, 10.0)), 0.0);
    }

    #[test]
    fn parse_point_needs_two_numbers() {
        assert_eq!(parse_point("1.5,2.5"), Some((1.5, 2.5)));
        assert_eq!(parse_point("1.5"), None);
        assert_eq!(parse_point("a,2"), None);
    }

    #[test]
    fn xml_wraps_items_under_root() {
        let xml = to_xml("VESSELS", &json!([{ "AIS": { "IMO": 9228801 } }]));
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<VESSELS><item><AIS><IMO>9228801</IMO></AIS></item></VESSELS>"));
    }

    #[test]
    fn xml_escapes_text() {
        let xml = to_xml("R", &json!({ "NAME": "A&B <C>" }));
        assert!(xml.contains("<NAME>A&amp;B &lt;C&gt;</NAME>"));
    }
}
