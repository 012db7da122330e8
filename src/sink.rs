//! Listing upload to the local collection endpoint

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SinkError;
use crate::model::ListingRecord;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8081/etsy/products";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where and how to send uploads.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SinkConfig {
    /// Blocking agent that reports non-2xx responses instead of failing on them.
    pub fn agent(&self) -> ureq::Agent {
        ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .timeout_global(Some(Duration::from_secs(self.timeout_secs)))
                .http_status_as_error(false)
                .build(),
        )
    }
}

/// Listing record plus the caller-supplied classification fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPayload<'a> {
    #[serde(flatten)]
    pub listing: &'a ListingRecord,
    pub product_type: &'a str,
    pub acc: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct EndpointReply {
    #[serde(default)]
    message: Option<String>,
}

/// POST the payload as JSON. Returns the endpoint's message on success.
pub fn upload_listing(
    agent: &ureq::Agent,
    endpoint: &str,
    payload: &ListingPayload<'_>,
) -> Result<String, SinkError> {
    let body = serde_json::to_string(payload)?;
    tracing::info!("uploading listing {} to {}", payload.listing.id, endpoint);

    let response = agent
        .post(endpoint)
        .header("Content-Type", "application/json")
        .send(body.as_bytes())?;
    let status = response.status();
    let text = response.into_body().read_to_string().unwrap_or_default();
    let message = serde_json::from_str::<EndpointReply>(&text)
        .unwrap_or_default()
        .message;

    if status.is_success() {
        Ok(message.unwrap_or_else(|| "Listing uploaded".to_string()))
    } else {
        let message = message.unwrap_or_else(|| "Upload failed".to_string());
        tracing::warn!("endpoint returned {}: {}", status, message);
        Err(SinkError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShopInfo;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing() -> ListingRecord {
        ListingRecord {
            id: "111".to_string(),
            url: "https://www.etsy.com/listing/111/mug".to_string(),
            title: Some("Mug".to_string()),
            description: None,
            price: Some("12.00".to_string()),
            images: vec![],
            material: None,
            variation: None,
            personalization: None,
            tags: Some(vec!["mug".to_string()]),
            shop: ShopInfo::default(),
        }
    }

    fn config(server: &MockServer) -> SinkConfig {
        SinkConfig {
            endpoint: format!("{}/etsy/products", server.uri()),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_payload_is_flat() {
        let record = listing();
        let payload = ListingPayload {
            listing: &record,
            product_type: "mug",
            acc: "acc-1",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["id"], "111");
        assert_eq!(json["productType"], "mug");
        assert_eq!(json["acc"], "acc-1");
        assert_eq!(json["shop"]["avatarUrl"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_upload_success_returns_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/etsy/products"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(
                serde_json::json!({"id": "111", "productType": "mug", "acc": "a1"}),
            ))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "Saved row 4"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = config(&server);
        let result = tokio::task::spawn_blocking(move || {
            let record = listing();
            let payload = ListingPayload {
                listing: &record,
                product_type: "mug",
                acc: "a1",
            };
            upload_listing(&config.agent(), &config.endpoint, &payload)
        })
        .await
        .unwrap();

        assert_eq!(result.unwrap(), "Saved row 4");
    }

    #[tokio::test]
    async fn test_upload_rejection_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(serde_json::json!({"message": "Duplicate listing"})),
            )
            .mount(&server)
            .await;

        let config = config(&server);
        let result = tokio::task::spawn_blocking(move || {
            let record = listing();
            let payload = ListingPayload {
                listing: &record,
                product_type: "mug",
                acc: "a1",
            };
            upload_listing(&config.agent(), &config.endpoint, &payload)
        })
        .await
        .unwrap();

        match result {
            Err(SinkError::Rejected { status, message }) => {
                assert_eq!(status, 422);
                assert_eq!(message, "Duplicate listing");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
