//! Vector-search backend contract and the Pinecone-style HTTP client.
//!
//! The deployment fixes the embedding dimension; the core only depends
//! on `embed` + `search` and the `{is_available: true}` filter key.

use serde_json::Value;

use sufra_domain::config::VectorConfig;
use sufra_domain::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Query,
    Passage,
}

impl InputType {
    fn as_str(&self) -> &'static str {
        match self {
            InputType::Query => "query",
            InputType::Passage => "passage",
        }
    }
}

/// One ranked hit from the vector index.
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Value,
}

/// The search backend contract.
#[async_trait::async_trait]
pub trait VectorBackend: Send + Sync {
    async fn embed(&self, text: &str, input_type: InputType) -> Result<Vec<f32>>;

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &Value,
    ) -> Result<Vec<VectorMatch>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pinecone-style HTTP implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct PineconeBackend {
    api_key: String,
    index_url: String,
    embed_url: String,
    embed_model: String,
    client: reqwest::Client,
}

impl PineconeBackend {
    pub fn from_config(cfg: &VectorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| Error::Vector(e.to_string()))?;
        Ok(Self {
            api_key: cfg.api_key.clone(),
            index_url: format!(
                "https://{}.svc.{}.pinecone.io",
                cfg.index, cfg.environment
            ),
            embed_url: "https://api.pinecone.io/embed".into(),
            embed_model: "multilingual-e5-large".into(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl VectorBackend for PineconeBackend {
    async fn embed(&self, text: &str, input_type: InputType) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.embed_model,
            "parameters": { "input_type": input_type.as_str() },
            "inputs": [{ "text": text }],
        });
        let resp: Value = self
            .client
            .post(&self.embed_url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Vector(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Vector(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Vector(e.to_string()))?;

        let values = resp
            .pointer("/data/0/values")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::Vector("embed response missing values".into()))?;
        Ok(values
            .iter()
            .filter_map(Value::as_f64)
            .map(|v| v as f32)
            .collect())
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &Value,
    ) -> Result<Vec<VectorMatch>> {
        let body = serde_json::json!({
            "vector": vector,
            "topK": top_k,
            "filter": filter,
            "includeMetadata": true,
        });
        let resp: Value = self
            .client
            .post(format!("{}/query", self.index_url))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Vector(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Vector(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Vector(e.to_string()))?;

        let matches = resp
            .get("matches")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(matches
            .iter()
            .filter_map(|m| {
                Some(VectorMatch {
                    id: m.get("id")?.as_str()?.to_string(),
                    score: m.get("score")?.as_f64()? as f32,
                    metadata: m.get("metadata").cloned().unwrap_or(Value::Null),
                })
            })
            .collect())
    }
}
