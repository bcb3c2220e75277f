//! HTTP client for the Canvas LMS REST API.
//!
//! Every call is a plain authenticated GET against a fixed base URL using the
//! user's own access token. Responses are returned as provider-native JSON.

use super::error::CanvasError;
use super::types::{CanvasCourse, PlannerRange};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use url::Url;

/// Default base URL for the Canvas API.
pub const CANVAS_BASE_URL: &str = "https://rmit.instructure.com/api/v1/";

/// Configuration for the Canvas client.
#[derive(Debug, Clone)]
pub struct CanvasConfig {
    /// API base URL, e.g. `https://school.instructure.com/api/v1/`
    pub base_url: String,
    /// Timeout applied to each request
    pub timeout: Duration,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            base_url: CANVAS_BASE_URL.to_string(),
            timeout: Duration::from_secs(25),
        }
    }
}

pub struct CanvasClient {
    client: Client,
    base_url: Url,
}

impl CanvasClient {
    pub fn new(config: CanvasConfig) -> Result<Self, CanvasError> {
        // Url::join drops the last path segment unless the base ends in '/'
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout)
            .build()
            .map_err(|e| CanvasError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, base_url })
    }

    /// GET `users/self`
    pub async fn get_self(&self, token: &str) -> Result<Value, CanvasError> {
        self.get_json(token, "users/self", &[]).await
    }

    /// GET `courses?enrollment_state=active`
    pub async fn list_courses(&self, token: &str) -> Result<Value, CanvasError> {
        self.get_json(token, "courses", &[("enrollment_state", "active".to_string())])
            .await
    }

    /// Same as [`list_courses`](Self::list_courses) but parsed for mirroring.
    pub async fn list_courses_typed(&self, token: &str) -> Result<Vec<CanvasCourse>, CanvasError> {
        let value = self.list_courses(token).await?;
        serde_json::from_value(value).map_err(|e| CanvasError::UnexpectedResponse {
            message: format!("Course list did not parse: {}", e),
        })
    }

    /// GET `planner/items`, optionally bounded by a date range
    pub async fn list_planner_items(
        &self,
        token: &str,
        range: &PlannerRange,
    ) -> Result<Value, CanvasError> {
        let mut params = Vec::new();
        if let Some(start) = &range.start_date {
            params.push(("start_date", start.clone()));
        }
        if let Some(end) = &range.end_date {
            params.push(("end_date", end.clone()));
        }
        self.get_json(token, "planner/items", &params).await
    }

    /// GET `users/self/enrollments` (carries current grades)
    pub async fn list_enrollments(&self, token: &str) -> Result<Value, CanvasError> {
        self.get_json(token, "users/self/enrollments", &[]).await
    }

    /// GET `courses/{course_id}/assignments`
    pub async fn list_assignments(
        &self,
        token: &str,
        course_id: i64,
        with_submissions: bool,
    ) -> Result<Value, CanvasError> {
        let params = if with_submissions {
            vec![("include[]", "submission".to_string())]
        } else {
            Vec::new()
        };
        self.get_json(token, &format!("courses/{course_id}/assignments"), &params)
            .await
    }

    /// Resolves `path` against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, CanvasError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    async fn get_json(
        &self,
        token: &str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Value, CanvasError> {
        let url = self.endpoint(path)?;
        let start = Instant::now();

        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ACCEPT, "application/json")
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = status_body(response.text().await);
            warn!(
                path = %url.path(),
                status = status.as_u16(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Canvas request failed"
            );
            return Err(CanvasError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value = response.json::<Value>().await?;
        info!(
            path = %url.path(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Canvas request completed"
        );
        Ok(value)
    }
}

/// Body of a non-success response, or a note saying why it could not be read.
fn status_body(read: Result<String, reqwest::Error>) -> String {
    match read {
        Ok(body) => body,
        Err(e) => {
            warn!("Failed to read Canvas error body: {}", e);
            format!("<unreadable body: {e}>")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> CanvasClient {
        CanvasClient::new(CanvasConfig {
            base_url: format!("{}/api/v1", server.uri()),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = CanvasClient::new(CanvasConfig {
            base_url: "https://canvas.example.edu/api/v1".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();

        assert_eq!(
            client.endpoint("/courses/5/assignments").unwrap().as_str(),
            "https://canvas.example.edu/api/v1/courses/5/assignments"
        );
    }

    #[tokio::test]
    async fn test_list_courses_sends_token_and_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/courses"))
            .and(query_param("enrollment_state", "active"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 101, "name": "Systems", "course_code": "COSC1", "end_at": "2026-11-30T00:00:00Z"},
                {"id": 102, "access_restricted_by_date": true}
            ])))
            .mount(&server)
            .await;

        let courses = client(&server).list_courses_typed("tok").await.unwrap();

        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].name.as_deref(), Some("Systems"));
        assert!(courses[1].name.is_none());
    }

    #[tokio::test]
    async fn test_assignments_include_submission() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/courses/7/assignments"))
            .and(query_param("include[]", "submission"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .mount(&server)
            .await;

        let value = client(&server).list_assignments("tok", 7, true).await.unwrap();
        assert_eq!(value, json!([{"id": 1}]));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/self"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid access token"))
            .mount(&server)
            .await;

        let err = client(&server).get_self("expired").await.unwrap_err();
        assert_eq!(
            err,
            CanvasError::Status {
                status: 401,
                body: "Invalid access token".to_string(),
            }
        );
        assert!(!err.is_retryable());
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_unreadable_error_body_is_described() {
        let read_err = Client::new()
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .unwrap_err();

        let body = status_body(Err(read_err));
        assert!(body.starts_with("<unreadable body: "));
        assert_eq!(status_body(Ok("gone".to_string())), "gone");
    }

    #[tokio::test]
    async fn test_planner_sends_date_range() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/planner/items"))
            .and(query_param("start_date", "2026-10-01"))
            .and(query_param("end_date", "2026-10-31"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"plannable_id": 9}])))
            .expect(1)
            .mount(&server)
            .await;

        let range = PlannerRange {
            start_date: Some("2026-10-01".to_string()),
            end_date: Some("2026-10-31".to_string()),
        };
        let value = client(&server)
            .list_planner_items("tok", &range)
            .await
            .unwrap();
        assert_eq!(value, json!([{"plannable_id": 9}]));
    }

    #[tokio::test]
    async fn test_assignments_without_submissions_omit_include() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/courses/7/assignments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        client(&server)
            .list_assignments("tok", 7, false)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.query_pairs().all(|(k, _)| k != "include[]"));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/self/enrollments"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = CanvasClient::new(CanvasConfig {
            base_url: format!("{}/api/v1/", server.uri()),
            timeout: Duration::from_millis(200),
        })
        .unwrap();

        let err = client.list_enrollments("tok").await.unwrap_err();
        assert_eq!(err, CanvasError::Timeout);
        assert!(err.is_retryable());
    }
}
