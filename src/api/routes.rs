// src/api/routes.rs

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::api::error::{AppError, AppResult};
use crate::api::AppState;
use crate::core::models::{DomainProbe, DomainReport};
use crate::core::probe::ProbeKind;
use crate::core::scanner::ProbeParams;

/// Body accepted by every batch endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[serde(default)]
    pub domains: Option<Vec<String>>,
    /// WHOIS bound override, honoured by `/domainInfo` and `/fetch-domains`.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// DKIM selectors to try.
    #[serde(default)]
    pub selectors: Option<Vec<String>>,
}

type Payload = Result<Json<BatchRequest>, JsonRejection>;

/// Validates the body the same way for every endpoint.
fn parse_request(payload: Payload) -> AppResult<(Vec<String>, ProbeParams)> {
    let Json(request) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let domains = match request.domains {
        Some(domains) if !domains.is_empty() => domains,
        _ => return Err(AppError::bad_request("Invalid or empty domains array")),
    };
    let params = ProbeParams {
        selectors: request.selectors,
        whois_timeout: request.timeout_ms.map(Duration::from_millis),
    };
    Ok((domains, params))
}

async fn fetch_domains(State(state): State<AppState>, payload: Payload) -> AppResult<Json<Vec<DomainReport>>> {
    let (domains, params) = parse_request(payload)?;
    let reports = state.orchestrator.scan_all(domains, params).await?;
    Ok(Json(reports))
}

async fn probe_batch(kind: ProbeKind, state: AppState, payload: Payload) -> AppResult<Json<Vec<DomainProbe>>> {
    let (domains, params) = parse_request(payload)?;
    debug!(probe = %kind, domains = domains.len(), "Single-probe batch.");
    let rows = state.orchestrator.probe_all(kind, domains, params).await?;
    Ok(Json(rows))
}

fn probe_route(kind: ProbeKind) -> MethodRouter<AppState> {
    post(move |State(state): State<AppState>, payload: Payload| probe_batch(kind, state, payload))
}

async fn hello() -> &'static str {
    "Hello, World!"
}

pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/fetch-domains", post(fetch_domains))
        .route("/mx", probe_route(ProbeKind::Mx))
        .route("/spf", probe_route(ProbeKind::Spf))
        .route("/dmarc", probe_route(ProbeKind::Dmarc))
        .route("/ns", probe_route(ProbeKind::Ns))
        .route("/arecords", probe_route(ProbeKind::A))
        .route("/aaaRecords", probe_route(ProbeKind::Aaaa))
        .route("/bimiRecords", probe_route(ProbeKind::Bimi))
        .route("/dkimRecords", probe_route(ProbeKind::Dkim))
        .route("/tlsrptRecords", probe_route(ProbeKind::TlsRpt))
        .route("/mtaSts", probe_route(ProbeKind::MtaSts))
        .route("/checkhttp", probe_route(ProbeKind::Http))
        .route("/checkhttps", probe_route(ProbeKind::Https))
        .route("/checkdomainforwarding", probe_route(ProbeKind::Forwarding))
        .route("/domainInfo", probe_route(ProbeKind::Whois))
        .route("/blacklist", probe_route(ProbeKind::Blacklist))
        .route("/blocklist", probe_route(ProbeKind::Blocklist))
        .route("/subdomains", probe_route(ProbeKind::Subdomains))
        .route("/hello", get(hello))
}

#[cfg(test)]
mod tests {
    use crate::api::{create_router, AppState};
    use crate::core::orchestrator::Orchestrator;
    use crate::core::scanner::testing::{scanner, FakeDns, FakeWhois};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_app(dns: FakeDns, whois: FakeWhois) -> Router {
        let orchestrator = Orchestrator::new(Arc::new(scanner(dns, whois)), 4);
        create_router(AppState { orchestrator })
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn hello_is_plain_text() {
        let app = create_test_app(FakeDns::default(), FakeWhois::default());
        let request = Request::builder().uri("/api/hello").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Hello, World!");
    }

    #[tokio::test]
    async fn empty_or_missing_domains_are_rejected_everywhere() {
        for (uri, body) in [
            ("/api/arecords", r#"{"domains": []}"#),
            ("/api/bimiRecords", r#"{}"#),
            ("/api/mx", r#"{"domains": []}"#),
            ("/api/fetch-domains", r#"{"other": 1}"#),
            ("/api/spf", r#"{"domains": "#),
        ] {
            let app = create_test_app(FakeDns::default(), FakeWhois::default());
            let response = app.oneshot(post_json(uri, body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri} {body}");
            let body = read_json(response).await;
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn single_probe_pairs_each_domain_with_its_result() {
        let dns = FakeDns::default()
            .with_txt("a.example", &["v=spf1 include:_spf.example.com ~all", "other"])
            .with_txt("b.example", &["nothing here"]);
        let app = create_test_app(dns, FakeWhois::default());

        let response = app
            .oneshot(post_json("/api/spf", r#"{"domains": ["a.example", "b.example"]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!([
                { "domain": "a.example", "result": ["v=spf1 include:_spf.example.com ~all"] },
                { "domain": "b.example", "result": [] },
            ])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn domain_info_honours_timeout_ms() {
        let app = create_test_app(FakeDns::default(), FakeWhois::hanging());

        let response = app
            .oneshot(post_json("/api/domainInfo", r#"{"domains": ["example.com"], "timeoutMs": 500}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!([{ "domain": "example.com", "result": { "registrar": "", "creationDate": "", "ageInDays": "" } }])
        );
    }

    #[tokio::test]
    async fn fetch_domains_keeps_length_and_order() {
        let app = create_test_app(FakeDns::default(), FakeWhois::default());

        let response = app
            .oneshot(post_json("/api/fetch-domains", r#"{"domains": ["bad one", "bad two"]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let reports = read_json(response).await;
        let reports = reports.as_array().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0]["domain"], "bad one");
        assert_eq!(reports[1]["domain"], "bad two");
        assert_eq!(reports[1]["mxRecords"], json!([]));
        assert!(reports[1]["error"].is_string());
    }
}
