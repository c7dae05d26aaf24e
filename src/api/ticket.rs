//! Reward-bearing support tickets.
//!
//! Filing a ticket is two sequential writes: create the ticket, then submit it for review with
//! the requested reward. Any wallet or notification change caused by the ticket reaches the
//! client later as push events, so nothing here touches synchronized state.

use super::client::SnapshotClient;
use super::types::*;
use crate::identity::Identity;

use reqwest::Url;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Rank a new ticket is routed to when the caller does not choose one.
pub const DEFAULT_TARGET_RANK: &str = "marshal";

/// What the user typed into the ticket form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketDraft {
	pub title: String,
	pub body: String,
	pub category: String,
	pub sub_category: String,
	pub reward: TicketReward,
}

/// Client for the ticket endpoints, sharing the snapshot client's HTTP pool and base URL.
#[derive(Clone)]
pub struct TicketClient {
	api: SnapshotClient,
	target_rank: String,
}

impl TicketClient {
	pub fn new(api: SnapshotClient) -> Self {
		Self {
			api,
			target_rank: DEFAULT_TARGET_RANK.to_string(),
		}
	}

	pub fn with_target_rank(mut self, rank: impl Into<String>) -> Self {
		self.target_rank = rank.into();
		self
	}

	/// Create the ticket and submit it with its reward.
	///
	/// The author and the assignee are both the filing user. If creation fails the submit step
	/// is never attempted.
	pub async fn file(&self, author: &Identity, draft: TicketDraft) -> Result<Ticket, TicketError> {
		if author.is_empty() {
			return Err(TicketError::EmptyIdentity);
		}

		let new_ticket = NewTicket {
			title: draft.title,
			body_md: draft.body,
			category: draft.category,
			sub_category: draft.sub_category,
			author_id: author.as_str().to_string(),
			assignee_id: author.as_str().to_string(),
			target_rank: self.target_rank.clone(),
		};

		let created = self
			.create(&new_ticket)
			.await
			.map_err(TicketError::CreateFailed)?;
		info!("Created ticket {} ({})", created.id, created.title);

		let submitted = self
			.submit(&created.id, draft.reward)
			.await
			.map_err(|source| TicketError::SubmitFailed {
				ticket_id: created.id.clone(),
				source,
			})?;
		info!(
			"Submitted ticket {} for review (status: {})",
			submitted.id,
			submitted.status.as_deref().unwrap_or("unknown")
		);

		Ok(submitted)
	}

	async fn create(&self, ticket: &NewTicket) -> Result<Ticket, SnapshotError> {
		let url = self.api.endpoint(&["tickets"])?;
		self.send_json(self.api.http_client().post(url.clone()), url, ticket)
			.await
	}

	async fn submit(&self, ticket_id: &str, reward: TicketReward) -> Result<Ticket, SnapshotError> {
		let url = self.api.endpoint(&["tickets", ticket_id, "submit"])?;
		self.send_json(self.api.http_client().patch(url.clone()), url, &reward)
			.await
	}

	async fn send_json<B: Serialize, T: DeserializeOwned>(
		&self,
		request: reqwest::RequestBuilder,
		url: Url,
		body: &B,
	) -> Result<T, SnapshotError> {
		debug!("Sending ticket request to {}", url);
		let response = request.json(body).send().await?;

		if !response.status().is_success() {
			return Err(SnapshotError::StatusError {
				status: response.status().as_u16(),
				url: url.to_string(),
			});
		}

		Ok(response.json::<T>().await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use std::time::Duration;
	use wiremock::matchers::{body_json, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn draft() -> TicketDraft {
		TicketDraft {
			title: "Broken badge reader".to_string(),
			body: "Door 4 rejects every badge".to_string(),
			category: "facilities".to_string(),
			sub_category: "access".to_string(),
			reward: TicketReward {
				reward_credits: 15,
				reward_pay: 2.5,
			},
		}
	}

	fn client_for(server: &MockServer) -> TicketClient {
		TicketClient::new(SnapshotClient::new(&server.uri(), Duration::from_secs(5)).unwrap())
	}

	#[tokio::test]
	async fn test_file_creates_then_submits() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/tickets"))
			.and(body_json(json!({
				"title": "Broken badge reader",
				"body_md": "Door 4 rejects every badge",
				"category": "facilities",
				"sub_category": "access",
				"author_id": "u1",
				"assignee_id": "u1",
				"target_rank": "marshal"
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"_id": "t9",
				"title": "Broken badge reader",
				"status": "open"
			})))
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("PATCH"))
			.and(path("/tickets/t9/submit"))
			.and(body_json(json!({"reward_credits": 15, "reward_pay": 2.5})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"_id": "t9",
				"title": "Broken badge reader",
				"status": "awaiting_review"
			})))
			.expect(1)
			.mount(&server)
			.await;

		let ticket = client_for(&server)
			.file(&Identity::new("u1"), draft())
			.await
			.unwrap();
		assert_eq!(ticket.id, "t9");
		assert_eq!(ticket.status.as_deref(), Some("awaiting_review"));
	}

	#[tokio::test]
	async fn test_failed_create_skips_submit() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/tickets"))
			.respond_with(ResponseTemplate::new(422))
			.mount(&server)
			.await;
		Mock::given(method("PATCH"))
			.respond_with(ResponseTemplate::new(200))
			.expect(0)
			.mount(&server)
			.await;

		let err = client_for(&server)
			.file(&Identity::new("u1"), draft())
			.await
			.unwrap_err();
		assert!(matches!(err, TicketError::CreateFailed(_)));
	}

	#[tokio::test]
	async fn test_failed_submit_reports_ticket_id() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/tickets"))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(json!({"_id": "t3", "title": "x"})),
			)
			.mount(&server)
			.await;
		Mock::given(method("PATCH"))
			.and(path("/tickets/t3/submit"))
			.respond_with(ResponseTemplate::new(500))
			.mount(&server)
			.await;

		match client_for(&server).file(&Identity::new("u1"), draft()).await {
			Err(TicketError::SubmitFailed { ticket_id, .. }) => assert_eq!(ticket_id, "t3"),
			other => panic!("expected submit failure, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_empty_identity_rejected() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200))
			.expect(0)
			.mount(&server)
			.await;

		let err = client_for(&server)
			.with_target_rank("executor")
			.file(&Identity::empty(), draft())
			.await
			.unwrap_err();
		assert!(matches!(err, TicketError::EmptyIdentity));
	}
}
