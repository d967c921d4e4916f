use crate::model::{ClientConfig, JobStatus, RunIdentifier, RunResults};
use crate::service::ServiceError;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

/// Client for the job service REST endpoints under `/api`.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct JobServiceClient {
    http: Client,
    base_url: Url,
}

impl JobServiceClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(cfg.request_timeout)
            .user_agent(cfg.user_agent.clone())
            .build()?;

        let base_url = Url::parse(&cfg.base_url).map_err(|e| ServiceError::InvalidBaseUrl {
            url: cfg.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::InvalidBaseUrl {
                url: cfg.base_url.clone(),
                reason: "URL cannot carry a path".into(),
            });
        }

        Ok(Self { http, base_url })
    }

    /// `GET /api/results`: identifiers of runs the service has kept, newest first.
    pub async fn list_runs(&self) -> Result<Vec<RunIdentifier>, ServiceError> {
        let url = self.endpoint(&["results"])?;
        self.get_json("GET /api/results", url).await
    }

    /// `POST /api/run?model=<model>`. The response body is ignored.
    pub async fn start_run(&self, model: &str) -> Result<(), ServiceError> {
        let url = self.endpoint(&["run"])?;
        tracing::debug!(%url, model, "starting run");
        let resp = self.http.post(url).query(&[("model", model)]).send().await?;
        check_status("POST /api/run", &resp)?;
        Ok(())
    }

    /// `GET /api/status`.
    pub async fn status(&self) -> Result<JobStatus, ServiceError> {
        let url = self.endpoint(&["status"])?;
        self.get_json("GET /api/status", url).await
    }

    /// `GET /api/results/{id}`.
    pub async fn run_results(&self, run: &RunIdentifier) -> Result<RunResults, ServiceError> {
        let url = self.endpoint(&["results", run.as_str()])?;
        self.get_json("GET /api/results/{id}", url).await
    }

    /// Build `<base>/api/<segments...>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ServiceError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot carry a path".into(),
            })?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: Url,
    ) -> Result<T, ServiceError> {
        tracing::debug!(%url, "GET");
        let resp = self.http.get(url).send().await?;
        check_status(endpoint, &resp)?;
        resp.json::<T>()
            .await
            .map_err(|source| ServiceError::Decode { endpoint, source })
    }
}

fn check_status(endpoint: &'static str, resp: &reqwest::Response) -> Result<(), ServiceError> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ServiceError::Status { endpoint, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProfitPotential;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> JobServiceClient {
        let cfg = ClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        JobServiceClient::new(&cfg).expect("client construction should not fail")
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let client = test_client("http://example.test/dash/");
        let url = client.endpoint(&["status"]).unwrap();
        assert_eq!(url.as_str(), "http://example.test/dash/api/status");
    }

    #[test]
    fn endpoint_encodes_run_identifier_as_one_segment() {
        let client = test_client("http://example.test");
        let url = client.endpoint(&["results", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://example.test/api/results/a%2Fb%20c");
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let cfg = ClientConfig {
            base_url: "not a url".into(),
            ..Default::default()
        };
        assert!(matches!(
            JobServiceClient::new(&cfg),
            Err(ServiceError::InvalidBaseUrl { .. })
        ));
    }

    #[tokio::test]
    async fn list_runs_returns_identifiers_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/results"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["a", "b"])))
            .mount(&server)
            .await;

        let runs = test_client(&server.uri()).list_runs().await.unwrap();
        assert_eq!(runs, vec![RunIdentifier::new("a"), RunIdentifier::new("b")]);
    }

    #[tokio::test]
    async fn start_run_sends_model_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/run"))
            .and(query_param("model", "gemini"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Arbitrage job started",
                "model": "gemini"
            })))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server.uri()).start_run("gemini").await.unwrap();
    }

    #[tokio::test]
    async fn start_run_rejected_while_busy_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/run"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "detail": "Job already running" })),
            )
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .start_run("openai")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Status { status, .. } if status == reqwest::StatusCode::BAD_REQUEST
        ));
    }

    #[tokio::test]
    async fn status_is_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "is_running": true,
                "progress": 42,
                "current_step": "Analyzing markets.json...",
                "results_dir": null
            })))
            .mount(&server)
            .await;

        let status = test_client(&server.uri()).status().await.unwrap();
        assert!(status.is_running);
        assert_eq!(status.progress, 42);
        assert_eq!(status.current_step, "Analyzing markets.json...");
        assert_eq!(status.results_dir, None);
    }

    #[tokio::test]
    async fn run_results_tolerates_missing_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/results/120000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "opportunities": [{
                    "type": "Real",
                    "market_title": "BTC above 100k",
                    "description": "YES and NO sum to 0.97",
                    "profit_potential": "High",
                    "confidence": 0.87
                }]
            })))
            .mount(&server)
            .await;

        let results = test_client(&server.uri())
            .run_results(&RunIdentifier::new("120000"))
            .await
            .unwrap();
        assert_eq!(results.opportunities.len(), 1);
        let opp = &results.opportunities[0];
        assert_eq!(opp.profit_potential, ProfitPotential::High);
        assert_eq!(opp.source_label(), "LLM");
    }

    #[tokio::test]
    async fn missing_run_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/results/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .run_results(&RunIdentifier::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Status { .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).status().await.unwrap_err();
        assert!(matches!(err, ServiceError::Decode { .. }));
    }
}
