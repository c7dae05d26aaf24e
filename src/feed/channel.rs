//!
//! Push channel over a WebSocket with reconnect-with-backoff.
//!
//! The channel keeps one logical connection to the server's event endpoint and hands decoded
//! events to exactly one subscriber. A new subscription replaces the previous one. While the
//! connection is down nothing is buffered; subscribers learn about the gap through
//! `ChannelNotice::Closed` / `ChannelNotice::Opened` and are expected to resynchronize.

use super::types::*;

use backoff::ExponentialBackoff;
use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Capacity of the per-subscription notice queue
const NOTICE_BUFFER: usize = 256;

/// Reconnect delay policy: exponential, capped, reset after every successful open.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
	/// Delay before the first reconnect attempt
	pub initial: Duration,
	/// Upper bound for any delay
	pub max: Duration,
	/// Growth factor between consecutive failures
	pub multiplier: f64,
}

impl Default for BackoffPolicy {
	fn default() -> Self {
		Self {
			initial: Duration::from_secs(1),
			max: Duration::from_secs(30),
			multiplier: 2.0,
		}
	}
}

impl BackoffPolicy {
	/// Build the delay generator. It never gives up.
	pub fn build(&self) -> ExponentialBackoff {
		ExponentialBackoffBuilder::new()
			.with_initial_interval(self.initial)
			.with_max_interval(self.max)
			.with_multiplier(self.multiplier)
			.with_randomization_factor(0.0)
			.with_max_elapsed_time(None)
			.build()
	}
}

/// Anything that can hand out event subscriptions.
pub trait EventSource: Send + Sync {
	/// Start a subscription, replacing any previous one.
	fn subscribe(&self) -> Subscription;
}

/// Connection bookkeeping shared by a channel and its subscriptions
struct Connections {
	state: watch::Sender<ChannelState>,
	active: Mutex<ActiveConnection>,
}

#[derive(Default)]
struct ActiveConnection {
	/// Serial of the most recent subscription
	serial: u64,
	task: Option<AbortHandle>,
}

impl Connections {
	fn lock(&self) -> MutexGuard<'_, ActiveConnection> {
		self.active
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Stop the connection of subscription `serial` if it is still the active one.
	fn release(&self, serial: u64) {
		let mut active = self.lock();
		if active.serial != serial {
			return;
		}
		if let Some(task) = active.task.take() {
			task.abort();
			self.state.send_replace(ChannelState::Disconnected);
			debug!("Push subscription dropped, connection stopped");
		}
	}
}

/// A live subscription to the push feed.
///
/// Dropping it stops the underlying connection task.
pub struct Subscription {
	receiver: mpsc::Receiver<ChannelNotice>,
	owner: Option<(Arc<Connections>, u64)>,
}

impl Subscription {
	/// Wrap a bare notice queue that is not backed by a connection task.
	#[cfg(test)]
	pub fn from_receiver(receiver: mpsc::Receiver<ChannelNotice>) -> Self {
		Self {
			receiver,
			owner: None,
		}
	}

	/// Wait for the next notice. `None` means the subscription was replaced or shut down.
	pub async fn recv(&mut self) -> Option<ChannelNotice> {
		self.receiver.recv().await
	}
}

impl Stream for Subscription {
	type Item = ChannelNotice;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.receiver.poll_recv(cx)
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some((connections, serial)) = self.owner.take() {
			connections.release(serial);
		}
	}
}

/// WebSocket-backed event channel
pub struct EventChannel {
	/// The WebSocket URL of the event endpoint.
	ws_url: String,
	policy: BackoffPolicy,
	connections: Arc<Connections>,
}

impl EventChannel {
	/// Create a new channel. No connection is made until the first `subscribe`.
	///
	/// # Arguments
	/// * `ws_url` - The WebSocket endpoint broadcasting events.
	/// * `policy` - Reconnect delay policy.
	pub fn new(ws_url: String, policy: BackoffPolicy) -> Self {
		let (state, _) = watch::channel(ChannelState::Disconnected);
		Self {
			ws_url,
			policy,
			connections: Arc::new(Connections {
				state,
				active: Mutex::new(ActiveConnection::default()),
			}),
		}
	}

	/// Observe connection state changes.
	pub fn state(&self) -> watch::Receiver<ChannelState> {
		self.connections.state.subscribe()
	}

	/// Stop the current connection for good.
	pub fn shutdown(&self) {
		if let Some(task) = self.connections.lock().task.take() {
			task.abort();
		}
		self.connections.state.send_replace(ChannelState::Closed);
		info!("Push channel shut down");
	}
}

impl EventSource for EventChannel {
	fn subscribe(&self) -> Subscription {
		let (sender, receiver) = mpsc::channel(NOTICE_BUFFER);

		let mut active = self.connections.lock();
		if let Some(previous) = active.task.take() {
			debug!("Replacing previous push subscription");
			previous.abort();
			self.connections.state.send_replace(ChannelState::Disconnected);
		}

		active.serial += 1;
		let task = tokio::spawn(run_connection(
			self.ws_url.clone(),
			self.policy.clone(),
			self.connections.clone(),
			sender,
		));
		active.task = Some(task.abort_handle());

		Subscription {
			receiver,
			owner: Some((self.connections.clone(), active.serial)),
		}
	}
}

/// Why a connection stopped pumping frames
enum PumpOutcome {
	/// The server closed or the stream ended
	Ended,
	/// The transport failed
	Lost(ChannelError),
	/// Nobody is listening any more
	SubscriberGone,
}

/// Connection state machine: Connecting → Open → Disconnected → (backoff) → Connecting …
async fn run_connection(
	ws_url: String,
	policy: BackoffPolicy,
	connections: Arc<Connections>,
	notices: mpsc::Sender<ChannelNotice>,
) {
	let state = &connections.state;
	let mut backoff = policy.build();

	loop {
		state.send_replace(ChannelState::Connecting);
		debug!("Attempting WebSocket connection to: {}", ws_url);

		match connect_async(ws_url.as_str()).await {
			Ok((mut ws_stream, response)) => {
				debug!(
					"WebSocket connection established, response status: {}",
					response.status()
				);
				backoff.reset();
				state.send_replace(ChannelState::Open);
				info!("Push channel open");

				if notices.send(ChannelNotice::Opened).await.is_err() {
					break;
				}

				let outcome = pump_frames(&mut ws_stream, &notices).await;
				state.send_replace(ChannelState::Disconnected);

				match outcome {
					PumpOutcome::SubscriberGone => break,
					PumpOutcome::Ended => info!("Push channel closed by server"),
					PumpOutcome::Lost(e) => warn!("Push channel lost: {}", e),
				}

				if notices.send(ChannelNotice::Closed).await.is_err() {
					break;
				}
			}
			Err(e) => {
				state.send_replace(ChannelState::Disconnected);
				warn!("Push channel connect failed: {}", ChannelError::from(e));
			}
		}

		let delay = backoff.next_backoff().unwrap_or(policy.max);
		info!("Reconnecting push channel in {:?}", delay);
		tokio::time::sleep(delay).await;

		if notices.is_closed() {
			break;
		}
	}

	debug!("Push connection task finished");
}

/// Forward decoded events until the connection ends.
async fn pump_frames<S>(ws_stream: &mut S, notices: &mpsc::Sender<ChannelNotice>) -> PumpOutcome
where
	S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
	while let Some(msg) = ws_stream.next().await {
		let text = match msg {
			Ok(Message::Text(text)) => text,
			Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
				Ok(text) => text,
				Err(e) => {
					warn!("Dropping non UTF-8 binary frame: {}", e);
					continue;
				}
			},
			Ok(Message::Close(frame)) => {
				debug!("Received close frame: {:?}", frame);
				return PumpOutcome::Ended;
			}
			// Ping/pong are answered by the transport
			Ok(_) => continue,
			Err(e) => return PumpOutcome::Lost(ChannelError::from(e)),
		};

		match parse_frame(&text) {
			Ok(event) => {
				debug!("Received {} event for {}", event.kind, event.user_id());
				if notices.send(ChannelNotice::Event(event)).await.is_err() {
					return PumpOutcome::SubscriberGone;
				}
			}
			Err(e) => warn!("Dropping push frame: {}", e),
		}
	}

	PumpOutcome::Ended
}
