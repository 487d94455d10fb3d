//! Semantic entailment classification seam
//!
//! The classifier is an external collaborator; the search layer only sees
//! the `Classifier` trait. Labels arrive one per item, in item order, and a
//! mismatch is fatal to the calling search because the earliest/source
//! determination cannot be trusted with partial labels.

use crate::items::{Item, Label};
use crate::network::HttpClient;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier returned {got} labels for {expected} items")]
    LengthMismatch { expected: usize, got: usize },
    #[error("classifier backend error: {0}")]
    Backend(String),
}

/// Labels a batch of items against a claim.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify_batch(
        &self,
        claim: &str,
        items: &[Item],
    ) -> Result<Vec<Label>, ClassifyError>;
}

/// Remote inference service speaking a small JSON protocol:
/// request `{"claim": .., "texts": [..]}`, response `{"labels": [..]}`.
/// Items are sent in bounded chunks so large windows do not overload the
/// backend; labels are concatenated back in order.
pub struct HttpClassifier {
    client: HttpClient,
    endpoint: String,
    batch_size: usize,
}

impl HttpClassifier {
    pub fn new(client: HttpClient, endpoint: impl Into<String>, batch_size: usize) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            batch_size: batch_size.max(1),
        }
    }

    async fn classify_chunk(
        &self,
        claim: &str,
        chunk: &[Item],
    ) -> Result<Vec<Label>, ClassifyError> {
        let body = serde_json::json!({
            "claim": claim,
            "texts": chunk.iter().map(|i| i.body.as_str()).collect::<Vec<_>>(),
        });
        let response = self
            .client
            .post_json(&self.endpoint, &body)
            .await
            .map_err(|e| ClassifyError::Backend(e.to_string()))?;
        let labels = response
            .get("labels")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ClassifyError::Backend("response has no 'labels' list".into()))?;
        labels
            .iter()
            .map(|v| {
                v.as_str()
                    .and_then(Label::parse)
                    .ok_or_else(|| ClassifyError::Backend(format!("unknown label {v}")))
            })
            .collect()
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify_batch(
        &self,
        claim: &str,
        items: &[Item],
    ) -> Result<Vec<Label>, ClassifyError> {
        let mut labels = Vec::with_capacity(items.len());
        for chunk in items.chunks(self.batch_size) {
            labels.extend(self.classify_chunk(claim, chunk).await?);
            debug!("classified {}/{} items", labels.len(), items.len());
        }
        if labels.len() != items.len() {
            return Err(ClassifyError::LengthMismatch {
                expected: items.len(),
                got: labels.len(),
            });
        }
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn items(n: usize) -> Vec<Item> {
        (0..n)
            .map(|i| Item {
                author: format!("@user{i}"),
                body: format!("text {i}"),
                created_at: Utc.with_ymd_and_hms(2020, 1, 1 + i as u32, 0, 0, 0).unwrap(),
                permalink: format!("/user{i}/status/{i}"),
                engagement: Default::default(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_labels_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/classify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "labels": ["entails", "neutral"]
            })))
            .mount(&server)
            .await;

        let classifier = HttpClassifier::new(
            HttpClient::new().unwrap(),
            format!("{}/classify", server.uri()),
            16,
        );
        let labels = classifier.classify_batch("claim", &items(2)).await.unwrap();
        assert_eq!(labels, vec![Label::Entails, Label::Neutral]);
    }

    #[tokio::test]
    async fn test_length_mismatch_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "labels": ["entails"]
            })))
            .mount(&server)
            .await;

        let classifier =
            HttpClassifier::new(HttpClient::new().unwrap(), server.uri(), 16);
        let err = classifier
            .classify_batch("claim", &items(3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::LengthMismatch {
                expected: 3,
                got: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_chunks_respect_claim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"claim": "the claim"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "labels": ["neutral"]
            })))
            .mount(&server)
            .await;

        let classifier = HttpClassifier::new(HttpClient::new().unwrap(), server.uri(), 1);
        let labels = classifier
            .classify_batch("the claim", &items(2))
            .await
            .unwrap();
        assert_eq!(labels.len(), 2);
    }

    #[tokio::test]
    async fn test_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let classifier = HttpClassifier::new(HttpClient::new().unwrap(), server.uri(), 16);
        let err = classifier.classify_batch("claim", &items(1)).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Backend(_)));
    }
}
