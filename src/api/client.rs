//!
//! HTTP client for the wallet API snapshot endpoints.
//!
//! Each fetch is an independent request returning the complete current view for one user.
//! There is no ordering between the three resources and no client-side caching; the caller
//! decides when a view is stale.

use super::types::*;
use crate::identity::Identity;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Read side of the wallet API, keyed by user identity.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
	async fn fetch_wallet(&self, identity: &Identity) -> Result<WalletSnapshot, SnapshotError>;

	async fn fetch_ledger(&self, identity: &Identity) -> Result<Vec<LedgerEntry>, SnapshotError>;

	async fn fetch_notifications(
		&self,
		identity: &Identity,
	) -> Result<Vec<Notification>, SnapshotError>;
}

/// Wallet API client
#[derive(Clone)]
pub struct SnapshotClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// Base URL of the API, e.g. `http://localhost:8000/`.
	base_url: Url,
}

impl SnapshotClient {
	/// Create a new API client.
	///
	/// # Arguments
	/// * `base_url` - Root URL of the wallet API.
	/// * `timeout` - Per-request timeout applied by the HTTP client.
	pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SnapshotError> {
		let http_client = Client::builder().timeout(timeout).build()?;
		Ok(Self {
			http_client,
			base_url: parse_base_url(base_url)?,
		})
	}

	pub(crate) fn http_client(&self) -> &Client {
		&self.http_client
	}

	/// Resolve `segments` under the base URL, percent-encoding each one.
	pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, SnapshotError> {
		let mut url = self.base_url.clone();
		url.path_segments_mut()
			.map_err(|_| SnapshotError::UrlError(format!("{} cannot be a base", self.base_url)))?
			.pop_if_empty()
			.extend(segments);
		Ok(url)
	}

	fn user_query(&self, resource: &str, identity: &Identity) -> Result<Url, SnapshotError> {
		let mut url = self.endpoint(&[resource])?;
		url.query_pairs_mut().append_pair("user_id", identity.as_str());
		Ok(url)
	}

	/// Execute a GET request and decode the JSON body.
	async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SnapshotError> {
		debug!("GET {}", url);
		let response = self.http_client.get(url.clone()).send().await?;

		if !response.status().is_success() {
			return Err(SnapshotError::StatusError {
				status: response.status().as_u16(),
				url: url.to_string(),
			});
		}

		Ok(response.json::<T>().await?)
	}
}

#[async_trait::async_trait]
impl SnapshotSource for SnapshotClient {
	async fn fetch_wallet(&self, identity: &Identity) -> Result<WalletSnapshot, SnapshotError> {
		if identity.is_empty() {
			return Err(SnapshotError::EmptyIdentity);
		}
		let url = self.endpoint(&["users", identity.as_str()])?;
		self.get_json(url).await
	}

	async fn fetch_ledger(&self, identity: &Identity) -> Result<Vec<LedgerEntry>, SnapshotError> {
		if identity.is_empty() {
			return Err(SnapshotError::EmptyIdentity);
		}
		let url = self.user_query("transactions", identity)?;
		self.get_json(url).await
	}

	async fn fetch_notifications(
		&self,
		identity: &Identity,
	) -> Result<Vec<Notification>, SnapshotError> {
		if identity.is_empty() {
			return Err(SnapshotError::EmptyIdentity);
		}
		let url = self.user_query("notifications", identity)?;
		self.get_json(url).await
	}
}

fn parse_base_url(base_url: &str) -> Result<Url, SnapshotError> {
	let url = Url::parse(base_url).map_err(|e| SnapshotError::UrlError(format!("{}: {}", base_url, e)))?;
	if url.cannot_be_a_base() {
		return Err(SnapshotError::UrlError(format!("{} cannot be a base", base_url)));
	}
	Ok(url)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use wiremock::matchers::{method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn client_for(server: &MockServer) -> SnapshotClient {
		SnapshotClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
	}

	#[test]
	fn test_endpoint_encodes_segments() {
		let client = SnapshotClient::new("http://api.local/v1/", Duration::from_secs(1)).unwrap();
		let url = client.endpoint(&["users", "a b/c"]).unwrap();
		assert_eq!(url.as_str(), "http://api.local/v1/users/a%20b%2Fc");
	}

	#[test]
	fn test_rejects_non_base_url() {
		assert!(matches!(
			SnapshotClient::new("mailto:someone@example.com", Duration::from_secs(1)),
			Err(SnapshotError::UrlError(_))
		));
	}

	#[tokio::test]
	async fn test_fetch_wallet() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/users/u1"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"_id": "u1",
				"rank": "marshal",
				"credits": 120,
				"balance": 36.0
			})))
			.expect(1)
			.mount(&server)
			.await;

		let wallet = client_for(&server)
			.fetch_wallet(&Identity::new("u1"))
			.await
			.unwrap();
		assert_eq!(wallet.rank, "marshal");
		assert_eq!(wallet.credits, 120);
		assert_eq!(wallet.balance, 36.0);
	}

	#[tokio::test]
	async fn test_fetch_ledger_keeps_server_order() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/transactions"))
			.and(query_param("user_id", "u1"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!([
				{"type": "payment", "amount_cr": 5, "amount_pay": 1.0, "ts": "2024-01-01T00:00:00"},
				{"type": "manual_adj", "amount_cr": 10, "amount_pay": 0.0, "ts": "2024-02-01T00:00:00"}
			])))
			.mount(&server)
			.await;

		let ledger = client_for(&server)
			.fetch_ledger(&Identity::new("u1"))
			.await
			.unwrap();
		assert_eq!(ledger.len(), 2);
		assert_eq!(ledger[0].entry_type, LedgerEntryType::Payment);
		assert_eq!(ledger[1].entry_type, LedgerEntryType::ManualAdjustment);
	}

	#[tokio::test]
	async fn test_fetch_notifications() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/notifications"))
			.and(query_param("user_id", "u1"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!([
				{"message": "Reward granted", "ts": "2024-02-01T00:00:00", "read": true}
			])))
			.mount(&server)
			.await;

		let notes = client_for(&server)
			.fetch_notifications(&Identity::new("u1"))
			.await
			.unwrap();
		assert_eq!(notes.len(), 1);
		assert_eq!(notes[0].message, "Reward granted");
		assert!(notes[0].read);
	}

	#[tokio::test]
	async fn test_non_success_status_is_transport_error() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/users/ghost"))
			.respond_with(ResponseTemplate::new(404))
			.mount(&server)
			.await;

		let err = client_for(&server)
			.fetch_wallet(&Identity::new("ghost"))
			.await
			.unwrap_err();
		assert!(matches!(err, SnapshotError::StatusError { status: 404, .. }));
	}

	#[tokio::test]
	async fn test_undecodable_body_is_transport_error() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/transactions"))
			.respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
			.mount(&server)
			.await;

		let err = client_for(&server)
			.fetch_ledger(&Identity::new("u1"))
			.await
			.unwrap_err();
		assert!(matches!(err, SnapshotError::HttpError(_)));
	}

	#[tokio::test]
	async fn test_empty_identity_issues_no_request() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(200))
			.expect(0)
			.mount(&server)
			.await;

		let client = client_for(&server);
		let empty = Identity::empty();
		assert!(matches!(
			client.fetch_wallet(&empty).await,
			Err(SnapshotError::EmptyIdentity)
		));
		assert!(matches!(
			client.fetch_ledger(&empty).await,
			Err(SnapshotError::EmptyIdentity)
		));
		assert!(matches!(
			client.fetch_notifications(&empty).await,
			Err(SnapshotError::EmptyIdentity)
		));
	}
}
