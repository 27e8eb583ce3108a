//! reqwest implementation of the remote gateway

use super::{Gateway, RemoteAck, Resource};
use crate::config::{GATEWAY_USER_AGENT, MIN_GATEWAY_TIMEOUT_MS};
use crate::database::RecordId;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        let timeout = Duration::from_millis(timeout_ms.max(MIN_GATEWAY_TIMEOUT_MS));
        let client = Client::builder()
            .user_agent(GATEWAY_USER_AGENT)
            .timeout(timeout)
            .build()?;

        tracing::info!("Remote gateway configured at {} (timeout {:?})", base_url, timeout);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn record_url(&self, resource: Resource, id: &RecordId) -> String {
        format!("{}/{}", self.url(resource.path()), id)
    }

    async fn ack(response: Response) -> Result<RemoteAck> {
        let body = check_status(response).await?.text().await?;
        if body.trim().is_empty() {
            return Ok(RemoteAck::default());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AppError::GatewayStatus {
            status: status.as_u16(),
            path: response.url().path().to_string(),
        })
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn create(&self, resource: Resource, body: Value) -> Result<RemoteAck> {
        tracing::debug!("POST {}", resource.path());
        let response = self
            .client
            .post(self.url(resource.path()))
            .json(&body)
            .send()
            .await?;
        Self::ack(response).await
    }

    async fn update(&self, resource: Resource, id: &RecordId, body: Value) -> Result<RemoteAck> {
        tracing::debug!("PUT {}/{}", resource.path(), id);
        let response = self
            .client
            .put(self.record_url(resource, id))
            .json(&body)
            .send()
            .await?;
        Self::ack(response).await
    }

    async fn delete(&self, resource: Resource, id: &RecordId) -> Result<()> {
        tracing::debug!("DELETE {}/{}", resource.path(), id);
        let response = self.client.delete(self.record_url(resource, id)).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn list(&self, resource: Resource) -> Result<Vec<Value>> {
        let response = self.client.get(self.url(resource.path())).send().await?;
        let body: Value = check_status(response).await?.json().await?;

        Ok(match body {
            Value::Array(records) => records,
            Value::Null => Vec::new(),
            _ => {
                tracing::warn!("GET {} returned a non-list body, ignoring it", resource.path());
                Vec::new()
            }
        })
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Value>> {
        let response = self
            .client
            .get(self.url(Resource::Items.path()))
            .query(&[("code", code)])
            .send()
            .await?;
        let body: Value = check_status(response).await?.json().await?;

        Ok(match body {
            Value::Array(records) => records.into_iter().next(),
            Value::Null => None,
            record => Some(record),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn gateway_for(server: &MockServer) -> HttpGateway {
        HttpGateway::new(&server.base_url(), 2_000).unwrap()
    }

    #[tokio::test]
    async fn test_create_returns_server_fields() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/items").json_body(json!({"nama": "Kamera"}));
                then.status(201)
                    .header("content-type", "application/json")
                    .json_body(json!({"id": 42, "img_url": "https://cdn/x.jpg", "qr_url": "https://cdn/q.png"}));
            })
            .await;

        let ack = gateway_for(&server)
            .create(Resource::Items, json!({"nama": "Kamera"}))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(ack.id, Some(RecordId::new("42")));
        assert_eq!(ack.img_url.as_deref(), Some("https://cdn/x.jpg"));
        assert_eq!(ack.qr_url.as_deref(), Some("https://cdn/q.png"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/loans/7");
                then.status(500);
            })
            .await;

        let result = gateway_for(&server)
            .update(Resource::Loans, &RecordId::new("7"), json!({"status": "selesai"}))
            .await;

        assert!(matches!(result, Err(AppError::GatewayStatus { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_empty_body_is_plain_ack() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/loans/7");
                then.status(204);
            })
            .await;

        let ack = gateway_for(&server)
            .update(Resource::Loans, &RecordId::new("7"), json!({"status": "selesai"}))
            .await
            .unwrap();

        assert_eq!(ack, RemoteAck::default());
    }

    #[tokio::test]
    async fn test_find_by_code_takes_first_match() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/items").query_param("code", "ITEM-1");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!([{"code": "ITEM-1", "nama": "Kamera"}, {"code": "ITEM-1"}]));
            })
            .await;

        let found = gateway_for(&server).find_by_code("ITEM-1").await.unwrap();

        assert_eq!(found.unwrap()["nama"], "Kamera");
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let server = MockServer::start_async().await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/loans/3");
                then.status(200);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/loans");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!([{"id": 1}, {"id": 2}]));
            })
            .await;

        let gateway = gateway_for(&server);
        gateway.delete(Resource::Loans, &RecordId::new("3")).await.unwrap();
        let loans = gateway.list(Resource::Loans).await.unwrap();

        delete.assert_async().await;
        assert_eq!(loans.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_failure() {
        let gateway = HttpGateway::new("http://127.0.0.1:9", 500).unwrap();

        assert!(gateway.list(Resource::Items).await.is_err());
    }
}
