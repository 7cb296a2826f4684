use anyhow::{Context, Result};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Upper bound on unique words per classification call. Larger deduped
/// sets are split into batches issued in one concurrent round.
pub const MAX_TERMS_PER_REQUEST: usize = 100;

/// Clinical category assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermCategory {
    Anatomy,
    Medication,
    Condition,
    Procedure,
    Symptom,
    Dosage,
    #[serde(other)]
    Other,
}

/// Classifier verdict for a single word.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermClassification {
    pub word: String,
    pub is_medical: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<TermCategory>,
}

/// Boundary to the external medical-term detection service.
///
/// Decides which flagged words are clinically significant enough to need
/// human review. Words missing from the response default to non-medical;
/// a failed call is treated the same way by the caller, so review can
/// never be blocked by a classifier outage.
#[async_trait::async_trait]
pub trait MedicalTermClassifier: Send + Sync {
    async fn classify(&self, words: &[String]) -> Result<Vec<TermClassification>>;
}

/// HTTP client for the hosted classification endpoint.
pub struct HttpMedicalTermClassifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMedicalTermClassifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(concat!("consult-scribe/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn classify_batch(&self, batch: &[String]) -> Result<Vec<TermClassification>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&batch)
            .send()
            .await
            .context("Classification request failed")?
            .error_for_status()
            .context("Classification service returned an error status")?;

        response
            .json()
            .await
            .context("Failed to parse classification response")
    }
}

#[async_trait::async_trait]
impl MedicalTermClassifier for HttpMedicalTermClassifier {
    async fn classify(&self, words: &[String]) -> Result<Vec<TermClassification>> {
        if words.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            "Classifying {} unique words in {} batch(es)",
            words.len(),
            words.len().div_ceil(MAX_TERMS_PER_REQUEST)
        );

        let batches = words
            .chunks(MAX_TERMS_PER_REQUEST)
            .map(|batch| self.classify_batch(batch));

        let results = try_join_all(batches).await?;
        Ok(results.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_wire_shape() {
        let raw = r#"[
            {"word": "amoxicilina", "isMedical": true, "category": "medication"},
            {"word": "mesa", "isMedical": false}
        ]"#;

        let parsed: Vec<TermClassification> = serde_json::from_str(raw).unwrap();
        assert!(parsed[0].is_medical);
        assert_eq!(parsed[0].category, Some(TermCategory::Medication));
        assert!(!parsed[1].is_medical);
        assert!(parsed[1].category.is_none());
    }

    #[test]
    fn unknown_categories_fall_back_to_other() {
        let raw = r#"[{"word": "x", "isMedical": true, "category": "genomics"}]"#;
        let parsed: Vec<TermClassification> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed[0].category, Some(TermCategory::Other));
    }
}
