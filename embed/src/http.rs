//! Client for an OpenAI-compatible `/v1/embeddings` endpoint, e.g. a
//! text-embeddings-inference server hosting the sentence-transformer models.

use crate::embedder::{EmbedError, Embedder};
use async_trait::async_trait;
use serde::Deserialize;

pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model_name: String,
    dims: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model_name: impl Into<String>,
        dims: usize,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            model_name: model_name.into(),
            dims,
        }
    }

    fn url(&self) -> String {
        format!("{}/v1/embeddings", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut request = self.client.post(self.url()).json(&serde_json::json!({
            "model": self.model_name,
            "input": text,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| EmbedError::Request(err.to_string()))?
            .json::<EmbeddingResponse>()
            .await
            .map_err(|err| EmbedError::Response(err.to_string()))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| EmbedError::Response("no embedding in response".to_string()))?;

        check_dimensions(&self.model_name, self.dims, embedding)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

fn check_dimensions(model: &str, expected: usize, embedding: Vec<f32>) -> Result<Vec<f32>, EmbedError> {
    if embedding.len() != expected {
        return Err(EmbedError::DimensionMismatch {
            model: model.to_string(),
            expected,
            actual: embedding.len(),
        });
    }
    Ok(embedding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_endpoint_without_double_slash() {
        let embedder = HttpEmbedder::new("http://localhost:8080/", None, "all-MiniLM-L6-v2", 384);
        assert_eq!(embedder.url(), "http://localhost:8080/v1/embeddings");
    }

    #[test]
    fn response_with_wrong_width_is_rejected() {
        let err = check_dimensions("all-mpnet-base-v2", 768, vec![0.0; 384]).unwrap_err();
        assert_eq!(
            err,
            EmbedError::DimensionMismatch {
                model: "all-mpnet-base-v2".to_string(),
                expected: 768,
                actual: 384,
            }
        );
    }

    #[test]
    fn response_body_parses_first_embedding() {
        let body = r#"{"data":[{"embedding":[0.1,0.2],"index":0}],"model":"m"}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.1, 0.2]);
    }
}
