//! HTTP client for the Optimus mobile-money aggregator.

use super::{
    CollectionWindow, InitiateCollection, InitiatedCollection, PaymentProvider, ProviderError,
};
use crate::config::ConfigStore;
use async_trait::async_trait;
use bgp_sdk::objects::{PaymentEnvironment, ProviderTransaction};
use serde::de::DeserializeOwned;
use url::Url;

/// Where and as whom to call the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimusEndpoint {
    pub environment: PaymentEnvironment,
    pub base_url: Url,
    pub api_key: String,
}

impl OptimusEndpoint {
    /// `{base}/transactions/mobile-money-collections/{api_key}`
    fn collections_url(&self) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["transactions", "mobile-money-collections", self.api_key.as_str()]);
        Ok(url)
    }
}

/// The aggregator answers either with the payload itself or wrapped in `data`.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(inner) => inner,
        }
    }
}

/// Aggregator client whose endpoint can be swapped while running.
#[derive(Clone)]
pub struct OptimusClient {
    http: reqwest::Client,
    endpoint: ConfigStore<Option<OptimusEndpoint>>,
}

impl OptimusClient {
    pub fn new(http: reqwest::Client, endpoint: ConfigStore<Option<OptimusEndpoint>>) -> Self {
        Self { http, endpoint }
    }

    async fn current_endpoint(&self) -> Result<OptimusEndpoint, ProviderError> {
        self.endpoint
            .read()
            .await
            .clone()
            .ok_or(ProviderError::NotConfigured("the active environment"))
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str::<Envelope<T>>(&body)
            .map(Envelope::into_inner)
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PaymentProvider for OptimusClient {
    #[tracing::instrument(skip_all, err, fields(uid = %request.app_transaction_uid))]
    async fn initiate_collection(
        &self,
        request: InitiateCollection,
    ) -> Result<InitiatedCollection, ProviderError> {
        let endpoint = self.current_endpoint().await?;
        let response = self
            .http
            .post(endpoint.collections_url()?)
            .json(&request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    #[tracing::instrument(skip_all, err, fields(limit = window.limit, offset = window.offset))]
    async fn list_collections(
        &self,
        window: CollectionWindow,
    ) -> Result<Vec<ProviderTransaction>, ProviderError> {
        let endpoint = self.current_endpoint().await?;
        let response = self
            .http
            .get(endpoint.collections_url()?)
            .query(&[("limit", window.limit), ("offset", window.offset)])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    #[tracing::instrument(skip_all, err, fields(uid = transaction_uid))]
    async fn get_collection(
        &self,
        transaction_uid: &str,
    ) -> Result<Option<ProviderTransaction>, ProviderError> {
        let endpoint = self.current_endpoint().await?;
        let response = self
            .http
            .get(endpoint.collections_url()?)
            .query(&[("app_transaction_uid", transaction_uid)])
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let transactions: Vec<ProviderTransaction> = Self::parse_response(response).await?;
        Ok(transactions
            .into_iter()
            .find(|t| t.app_transaction_uid == transaction_uid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bgp_sdk::objects::{Currency, PaymentNetwork};
    use rust_decimal::Decimal;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, OptimusClient) {
        let server = MockServer::start().await;
        let endpoint = OptimusEndpoint {
            environment: PaymentEnvironment::Sandbox,
            base_url: Url::parse(&format!("{}/api/v1/", server.uri())).unwrap(),
            api_key: "key-123".into(),
        };
        let client = OptimusClient::new(reqwest::Client::new(), ConfigStore::new(Some(endpoint)));
        (server, client)
    }

    const COLLECTIONS_PATH: &str = "/api/v1/transactions/mobile-money-collections/key-123";

    #[tokio::test]
    async fn lists_wrapped_collections() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path(COLLECTIONS_PATH))
            .and(query_param("limit", "50"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "app_transaction_uid": "abc123",
                    "transaction_status": "completed",
                    "total_amount": "5000",
                    "debit_phone_number": "256771234567"
                }]
            })))
            .mount(&server)
            .await;

        let txs = client
            .list_collections(CollectionWindow {
                limit: 50,
                offset: 0,
            })
            .await
            .unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].app_transaction_uid, "abc123");
        assert_eq!(txs[0].total_amount, "5000");
    }

    #[tokio::test]
    async fn lists_bare_array() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path(COLLECTIONS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"app_transaction_uid": "a", "transaction_status": "pending", "total_amount": 1000},
                {"app_transaction_uid": "b", "transaction_status": "failed", "total_amount": 2000}
            ])))
            .mount(&server)
            .await;

        let txs = client
            .list_collections(CollectionWindow {
                limit: 10,
                offset: 0,
            })
            .await
            .unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[1].total_amount, "2000");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path(COLLECTIONS_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let result = client
            .list_collections(CollectionWindow {
                limit: 10,
                offset: 0,
            })
            .await;
        assert!(
            matches!(
                result,
                Err(ProviderError::Status { status: 401, ref body }) if body == "bad key"
            ),
            "unexpected result: {result:?}"
        );
    }

    #[tokio::test]
    async fn initiate_posts_idempotency_key() {
        let (server, client) = setup().await;

        Mock::given(method("POST"))
            .and(path(COLLECTIONS_PATH))
            .and(body_partial_json(json!({
                "app_transaction_uid": "bgp-1",
                "phone": "+256771234567",
                "provider": "MTN"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": {"payment_url": "https://pay.example/x", "reference": "OPT-1"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let initiated = client
            .initiate_collection(InitiateCollection {
                app_transaction_uid: "bgp-1".into(),
                plan_id: "starter".into(),
                phone: "+256771234567".into(),
                provider: PaymentNetwork::Mtn,
                amount: Decimal::from(5000),
                currency: Currency::Ugx,
                callback_url: None,
            })
            .await
            .unwrap();
        assert_eq!(initiated.payment_url.as_deref(), Some("https://pay.example/x"));
        assert_eq!(initiated.reference.as_deref(), Some("OPT-1"));
    }

    #[tokio::test]
    async fn get_collection_filters_by_uid() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path(COLLECTIONS_PATH))
            .and(query_param("app_transaction_uid", "abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"app_transaction_uid": "abc123", "transaction_status": "paid", "total_amount": "5000"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(COLLECTIONS_PATH))
            .and(query_param("app_transaction_uid", "missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let found = client.get_collection("abc123").await.unwrap().unwrap();
        assert_eq!(found.transaction_status, "paid");
        assert!(client.get_collection("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unconfigured_endpoint_fails_without_request() {
        let client = OptimusClient::new(reqwest::Client::new(), ConfigStore::new(None));
        let result = client.get_collection("abc").await;
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn endpoint_swap_takes_effect() {
        let store = ConfigStore::new(None);
        let client = OptimusClient::new(reqwest::Client::new(), store.clone());
        let other = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/transactions/mobile-money-collections/live-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&other)
            .await;

        store
            .update(Some(OptimusEndpoint {
                environment: PaymentEnvironment::Production,
                base_url: Url::parse(&format!("{}/v2", other.uri())).unwrap(),
                api_key: "live-key".into(),
            }))
            .await;

        let txs = client
            .list_collections(CollectionWindow {
                limit: 1,
                offset: 0,
            })
            .await
            .unwrap();
        assert!(txs.is_empty());
    }
}
