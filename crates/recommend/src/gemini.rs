use crate::{fallback_recommendations, RecommendError, Recommender};
use async_trait::async_trait;
use lumina_core::{urls, Recommendation, RecommendConfig};
use serde_json::{json, Value};
use tracing::{debug, error};
use url::Url;

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiRecommender {
    http: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl GeminiRecommender {
    pub fn new(cfg: &RecommendConfig) -> Result<Self, RecommendError> {
        let endpoint = Url::parse(&urls::generate_content_url(&cfg.api_base, &cfg.model))?;
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key: cfg
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn try_recommend(&self, mood: &str) -> Result<Vec<Recommendation>, RecommendError> {
        let api_key = self.api_key.as_deref().ok_or(RecommendError::MissingApiKey)?;

        debug!(endpoint = %self.endpoint, "requesting recommendations");
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, api_key)
            .json(&build_request(mood))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecommendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RecommendError::Malformed(e.to_string()))?;
        parse_reply(&body)
    }
}

#[async_trait]
impl Recommender for GeminiRecommender {
    async fn recommend(&self, mood: &str) -> Vec<Recommendation> {
        match self.try_recommend(mood).await {
            Ok(list) => list,
            Err(err) => {
                error!(error = %err, "recommendation request failed; using fallback list");
                fallback_recommendations()
            }
        }
    }
}

fn build_request(mood: &str) -> Value {
    let prompt = format!(
        "Suggest 5 song titles and artists that fit the mood: \"{mood}\". \
         Provide them in a list format with descriptions of why they fit."
    );
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "artist": { "type": "STRING" },
                        "reason": { "type": "STRING" }
                    },
                    "required": ["title", "artist", "reason"]
                }
            }
        }
    })
}

/// Joins the first candidate's text parts and reads them as the JSON array the
/// schema asked for. A reply with no text is an empty list.
fn parse_reply(body: &Value) -> Result<Vec<Recommendation>, RecommendError> {
    let text: String = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&text).map_err(|e| RecommendError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{build_request, parse_reply, GeminiRecommender};
    use crate::{RecommendError, Recommender};
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::{Json, Router};
    use lumina_core::RecommendConfig;
    use serde_json::{json, Value};

    #[test]
    fn request_carries_mood_and_schema() {
        let req = build_request("rainy sunday");
        let prompt = req["contents"][0]["parts"][0]["text"].as_str().expect("prompt");
        assert!(prompt.contains("\"rainy sunday\""));
        assert_eq!(req["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            req["generationConfig"]["responseSchema"]["items"]["required"],
            json!(["title", "artist", "reason"])
        );
    }

    #[test]
    fn parses_candidate_text() {
        let body = json!({"candidates": [{"content": {"parts": [
            {"text": "[{\"title\":\"Nightcall\",\"artist\":\"Kavinsky\",\"reason\":\"Neon drive.\"}"},
            {"text": ",{\"title\":\"Tokyo\",\"artist\":\"Leon Bridges\",\"reason\":\"City lights.\"}]"}
        ]}}]});
        let list = parse_reply(&body).expect("parse");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].artist, "Kavinsky");
        assert_eq!(list[1].title, "Tokyo");
    }

    #[test]
    fn empty_text_is_empty_list_and_junk_is_malformed() {
        assert!(parse_reply(&json!({"candidates": []})).expect("empty").is_empty());

        let junk = json!({"candidates": [{"content": {"parts": [{"text": "here are songs!"}]}}]});
        assert!(matches!(parse_reply(&junk), Err(RecommendError::Malformed(_))));

        let missing_field = json!({"candidates": [{"content": {"parts": [
            {"text": "[{\"title\":\"Nightcall\",\"artist\":\"Kavinsky\"}]"}
        ]}}]});
        assert!(matches!(parse_reply(&missing_field), Err(RecommendError::Malformed(_))));
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{addr}/v1beta")
    }

    fn config(api_base: String, api_key: Option<&str>) -> RecommendConfig {
        RecommendConfig {
            api_base,
            api_key: api_key.map(str::to_string),
            ..RecommendConfig::default()
        }
    }

    #[tokio::test]
    async fn service_reply_is_used_when_well_formed() {
        async fn generate(
            uri: Uri,
            headers: HeaderMap,
            Json(_req): Json<Value>,
        ) -> (StatusCode, Json<Value>) {
            if uri.path() != "/v1beta/models/gemini-3-flash-preview:generateContent" {
                return (StatusCode::NOT_FOUND, Json(json!({})));
            }
            if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("k-123") {
                return (StatusCode::FORBIDDEN, Json(json!({})));
            }
            let text = "[{\"title\":\"Nightcall\",\"artist\":\"Kavinsky\",\"reason\":\"Neon drive.\"}]";
            (
                StatusCode::OK,
                Json(json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})),
            )
        }
        let base = serve(Router::new().fallback(generate)).await;

        let client = GeminiRecommender::new(&config(base, Some("k-123"))).expect("client");
        let list = client.recommend("night drive").await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "Nightcall");
    }

    #[tokio::test]
    async fn any_failure_yields_fallback() {
        async fn broken() -> StatusCode {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        let base = serve(Router::new().fallback(broken)).await;

        let client = GeminiRecommender::new(&config(base.clone(), Some("k-123"))).expect("client");
        assert!(matches!(
            client.try_recommend("calm").await,
            Err(RecommendError::Status { status: 500, .. })
        ));
        let titles: Vec<String> = client
            .recommend("calm")
            .await
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["Midnight City", "Weightless"]);

        let keyless = GeminiRecommender::new(&config(base, None)).expect("client");
        assert!(!keyless.has_api_key());
        assert_eq!(keyless.recommend("calm").await.len(), 2);
    }
}
