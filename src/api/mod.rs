pub mod cli;
pub mod report;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::core::{
    ConfigVersion, Estimate, EstimatorConfig, EstimatorError, ProjectInputs, QueryError,
    QueryParams, SharedState, encode_query, evaluate, restore, restore_params,
};
use report::{DisplaySummary, display_summary};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiConfigVersion {
    #[serde(alias = "v1")]
    Initial,
    Latest,
}

impl From<ApiConfigVersion> for ConfigVersion {
    fn from(value: ApiConfigVersion) -> Self {
        match value {
            ApiConfigVersion::Initial => ConfigVersion::Initial,
            ApiConfigVersion::Latest => ConfigVersion::Latest,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EstimatePayload {
    own_capital: Option<f64>,
    loan_amount: Option<f64>,
    duration_months: Option<u32>,
    sale_price: Option<f64>,
    repair_cost: Option<f64>,
    config_version: Option<ApiConfigVersion>,
}

/// Both presets are built and validated once at startup.
#[derive(Clone)]
pub struct ServerState {
    default_version: ConfigVersion,
    initial: Arc<EstimatorConfig>,
    latest: Arc<EstimatorConfig>,
}

impl ServerState {
    pub fn new(default_version: ConfigVersion) -> Result<Self, EstimatorError> {
        Ok(Self {
            default_version,
            initial: Arc::new(EstimatorConfig::for_version(ConfigVersion::Initial)?),
            latest: Arc::new(EstimatorConfig::for_version(ConfigVersion::Latest)?),
        })
    }

    fn config(&self, version: Option<ConfigVersion>) -> &EstimatorConfig {
        match version.unwrap_or(self.default_version) {
            ConfigVersion::Initial => &self.initial,
            ConfigVersion::Latest => &self.latest,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InputsEcho {
    own_capital: f64,
    loan_amount: f64,
    duration_months: u32,
    sale_price: Option<f64>,
    repair_cost: Option<f64>,
}

impl From<&ProjectInputs> for InputsEcho {
    fn from(inputs: &ProjectInputs) -> Self {
        Self {
            own_capital: inputs.own_capital,
            loan_amount: inputs.loan_amount,
            duration_months: inputs.duration_months,
            sale_price: inputs.sale_price,
            repair_cost: inputs.repair_cost,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    config_version: ConfigVersion,
    inputs: InputsEcho,
    #[serde(flatten)]
    estimate: Estimate,
    display: DisplaySummary,
    share_query: String,
    warning: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn build_estimate_response(
    config: &EstimatorConfig,
    inputs: &ProjectInputs,
    estimate: Estimate,
    warning: Option<String>,
) -> Result<EstimateResponse, QueryError> {
    Ok(EstimateResponse {
        config_version: config.version,
        inputs: inputs.into(),
        display: display_summary(&estimate),
        share_query: encode_query(&SharedState::from(inputs))?,
        estimate,
        warning,
    })
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/api/estimate",
            get(estimate_get_handler).post(estimate_post_handler),
        )
        .route("/api/config", get(config_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(addr: SocketAddr, state: ServerState) -> std::io::Result<()> {
    let default_version = state.default_version;
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, ?default_version, "flip estimator API listening");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

/// Restores inputs from the shareable query string. Bad parameters fall back
/// to defaults and are reported in `warning` instead of failing the request.
async fn estimate_get_handler(
    State(state): State<ServerState>,
    query: Result<Query<QueryParams>, QueryRejection>,
) -> Response {
    let (config, restored) = match query {
        Ok(Query(params)) => {
            let version = match params.config_version() {
                Ok(version) => version,
                Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.to_string()),
            };
            let config = state.config(version);
            (config, restore_params(&params, config))
        }
        Err(rejection) => {
            let config = state.config(None);
            let malformed = QueryError::Malformed(rejection.body_text());
            (config, restore(Err(malformed), config))
        }
    };
    let inputs = restored.state.into_inputs();

    estimate_response(config, &inputs, restored.warning)
}

async fn estimate_post_handler(
    State(state): State<ServerState>,
    Json(payload): Json<EstimatePayload>,
) -> Response {
    let version = payload.config_version.map(ConfigVersion::from);
    let config = state.config(version);
    let inputs = inputs_from_payload(payload, config);

    estimate_response(config, &inputs, None)
}

async fn config_handler(
    State(state): State<ServerState>,
    query: Result<Query<QueryParams>, QueryRejection>,
) -> Response {
    let version = query
        .map_err(|rejection| rejection.body_text())
        .and_then(|Query(params)| params.config_version().map_err(|err| err.to_string()));
    match version {
        Ok(version) => json_response(StatusCode::OK, state.config(version)),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn estimate_response(
    config: &EstimatorConfig,
    inputs: &ProjectInputs,
    warning: Option<String>,
) -> Response {
    let estimate = match evaluate(inputs, config) {
        Ok(estimate) => estimate,
        Err(err) => return estimator_error_response(&err),
    };
    match build_estimate_response(config, inputs, estimate, warning) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(err) => {
            error!(error = %err, "failed to encode share query");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

fn inputs_from_payload(payload: EstimatePayload, config: &EstimatorConfig) -> ProjectInputs {
    let defaults = &config.defaults;
    ProjectInputs {
        own_capital: payload.own_capital.unwrap_or(defaults.own_capital),
        loan_amount: payload.loan_amount.unwrap_or(defaults.loan_amount),
        duration_months: payload.duration_months.unwrap_or(defaults.duration_months),
        sale_price: payload.sale_price,
        repair_cost: payload.repair_cost,
    }
}

fn estimator_error_response(err: &EstimatorError) -> Response {
    match err {
        EstimatorError::DownpaymentTooLow { .. } => {
            warn!(error = %err, "rejected estimate request");
            error_response(StatusCode::UNPROCESSABLE_ENTITY, &err.to_string())
        }
        EstimatorError::OutOfBounds { .. } => {
            warn!(error = %err, "rejected estimate request");
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
        EstimatorError::BlendedRateExceedsTarget { .. } | EstimatorError::InvalidConfig(_) => {
            error!(error = %err, "estimate aborted by configuration defect");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Uri;
    use serde_json::Value;

    fn state() -> ServerState {
        ServerState::new(ConfigVersion::Latest).expect("presets are valid")
    }

    fn payload_from_json(json: &str) -> EstimatePayload {
        serde_json::from_str(json).expect("payload should parse")
    }

    fn query(raw: &str) -> Result<Query<QueryParams>, QueryRejection> {
        let uri: Uri = format!("/api/estimate?{raw}").parse().expect("valid uri");
        Query::try_from_uri(&uri)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    #[test]
    fn payload_parses_web_keys_and_fills_defaults() {
        let payload = payload_from_json(
            r#"{
              "ownCapital": 3.5,
              "durationMonths": 9,
              "salePrice": 20,
              "configVersion": "v1"
            }"#,
        );
        assert_eq!(payload.config_version, Some(ApiConfigVersion::Initial));

        let state = state();
        let config = state.config(payload.config_version.map(ConfigVersion::from));
        assert_eq!(config.version, ConfigVersion::Initial);

        let inputs = inputs_from_payload(payload, config);
        assert_eq!(inputs.own_capital, 3.5);
        assert_eq!(inputs.loan_amount, 10.0);
        assert_eq!(inputs.duration_months, 9);
        assert_eq!(inputs.sale_price, Some(20.0));
        assert_eq!(inputs.repair_cost, None);
    }


    #[test]
    fn estimate_response_serialization_contains_expected_fields() {
        let state = state();
        let config = state.config(None);
        let inputs = inputs_from_payload(EstimatePayload::default(), config);
        let estimate = evaluate(&inputs, config).expect("defaults evaluate");
        let response =
            build_estimate_response(config, &inputs, estimate, None).expect("encodable");

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"configVersion\":\"latest\""));
        assert!(json.contains("\"purchasePrice\""));
        assert!(json.contains("\"fixedIncome\":{\"status\":\"available\""));
        assert!(json.contains("\"profitShare\":{\"status\":\"unavailable\""));
        assert!(json.contains("\"kind\":\"loanPresent\""));
        assert!(json.contains("\"shareQuery\":\"own=2&loan=10&duration=6\""));
        assert!(json.contains("\"warning\":null"));
    }

    #[tokio::test]
    async fn get_estimate_restores_shared_query() {
        let response = estimate_get_handler(
            State(state()),
            query("own=2&loan=10&duration=5"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&header::HeaderValue::from_static("no-store"))
        );

        let body = body_json(response).await;
        assert_eq!(body["fixedIncome"]["result"]["annualRate"], 0.3);
        assert_eq!(body["display"]["fixedIncome"]["income"], 0.25);
        assert_eq!(body["shareQuery"], "own=2&loan=10&duration=5");
        assert!(body["warning"].is_null());
    }

    #[tokio::test]
    async fn get_estimate_decodes_percent_encoded_link() {
        let response = estimate_get_handler(
            State(state()),
            query("%6Fwn=3%2E5&loan=8.2&duration=6&version=latest"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["inputs"]["ownCapital"], 3.5);
        assert_eq!(body["inputs"]["loanAmount"], 8.2);
        assert_eq!(body["shareQuery"], "own=3.5&loan=8.2&duration=6");
        assert!(body["warning"].is_null());
    }

    #[tokio::test]
    async fn get_estimate_with_duplicate_keys_warns_and_uses_defaults() {
        let response =
            estimate_get_handler(State(state()), query("own=3&own=4&loan=8&duration=6")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["inputs"]["ownCapital"], 2.0);
        assert!(body["warning"].as_str().expect("warning expected").contains("malformed"));
    }

    #[tokio::test]
    async fn get_estimate_falls_back_to_defaults_with_warning() {
        let response = estimate_get_handler(
            State(state()),
            query("own=2&loan=500&duration=5"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["inputs"]["loanAmount"], 10.0);
        assert_eq!(body["inputs"]["durationMonths"], 6);
        let warning = body["warning"].as_str().expect("warning expected");
        assert!(warning.contains("loan"));
    }

    #[tokio::test]
    async fn get_estimate_rejects_unknown_version() {
        let response =
            estimate_get_handler(State(state()), query("version=v9")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_estimate_rejects_low_downpayment_as_unprocessable() {
        let payload = payload_from_json(r#"{"ownCapital": 1, "loanAmount": 100}"#);
        let response = estimate_post_handler(State(state()), Json(payload)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert!(body["error"].as_str().expect("error message").contains("downpayment"));
    }

    #[tokio::test]
    async fn post_estimate_rejects_out_of_bounds_input() {
        let payload = payload_from_json(r#"{"durationMonths": 30}"#);
        let response = estimate_post_handler(State(state()), Json(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_estimate_returns_profit_share_breakdown() {
        let payload = payload_from_json(
            r#"{"ownCapital": 12, "loanAmount": 0, "durationMonths": 6, "salePrice": 18}"#,
        );
        let response = estimate_post_handler(State(state()), Json(payload)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let result = &body["profitShare"]["result"];
        assert_eq!(result["investorBreakdown"][0]["item"], "profit");
        assert_eq!(result["projectBreakdown"][3]["label"], "Sale");
        assert_eq!(body["display"]["profitShare"]["income"], 1.13);
        assert_eq!(body["display"]["investorShare"], "40%");
    }

    #[tokio::test]
    async fn config_endpoint_returns_requested_preset() {
        let response =
            config_handler(State(state()), query("version=%69nitial")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["version"], "initial");
        assert_eq!(body["sharingPolicy"], "proportional");
        assert_eq!(body["rateTiers"][0]["upperBound"], 15.0);
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let response = not_found_handler().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Not found");
    }
}
