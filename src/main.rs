mod api;
mod commands;
mod config;
mod feed;
mod identity;
mod sync;
mod utils;

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use crate::api::{SnapshotClient, TicketClient};
use crate::commands::Command;
use crate::config::Config;
use crate::feed::EventChannel;
use crate::identity::{FileIdentitySlot, IdentitySlot, IdentityStore, MemoryIdentitySlot};
use crate::sync::{SyncEngine, SyncHandle, TerminalSink};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	// Initialize tracing subscriber; RUST_LOG adds directives on top of the info default
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting wallet live sync");

	let config = match Config::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Failed to load configuration: {}", e);
			return;
		}
	};

	let snapshot_client = match SnapshotClient::new(&config.api_url, config.http_timeout) {
		Ok(client) => client,
		Err(e) => {
			error!("Failed to create snapshot client: {}", e);
			return;
		}
	};
	let ticket_client =
		TicketClient::new(snapshot_client.clone()).with_target_rank(config.target_rank.clone());

	info!("Created snapshot client for {}", config.api_url);

	let channel = Arc::new(EventChannel::new(
		config.ws_url.clone(),
		config.backoff_policy(),
	));

	info!("Created event channel for {}", config.ws_url);

	let slot: Box<dyn IdentitySlot> = match &config.data_dir {
		Some(data_dir) => {
			info!("Persisting the active user under {}", data_dir.display());
			Box::new(FileIdentitySlot::new(data_dir.clone()))
		}
		None => {
			info!("Identity persistence disabled, the active user lasts for this session only");
			Box::new(MemoryIdentitySlot::default())
		}
	};
	let store = Arc::new(IdentityStore::restore(slot));

	let (engine, handle) = SyncEngine::new(
		Arc::new(snapshot_client),
		channel.clone(),
		TerminalSink,
		config.engine_config(),
	);

	{
		let handle = handle.clone();
		store.on_change(move |identity| handle.identity_changed(identity.clone()));
	}

	let engine_task = engine.spawn();
	handle.identity_changed(store.get());

	info!("{}", commands::HELP);

	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	loop {
		tokio::select! {
			_ = tokio::signal::ctrl_c() => {
				info!("Interrupted");
				break;
			}
			line = lines.next_line() => match line {
				Ok(Some(line)) => {
					if !run_command(&line, &store, &ticket_client, &channel).await {
						break;
					}
				}
				Ok(None) => break,
				Err(e) => {
					error!("Failed to read input: {}", e);
					break;
				}
			}
		}
	}

	shutdown(&handle, &channel, engine_task).await;
}

/// Execute one line of input. Returns `false` when the user asked to quit.
async fn run_command(
	line: &str,
	store: &IdentityStore,
	ticket_client: &TicketClient,
	channel: &EventChannel,
) -> bool {
	let command = match commands::parse(line) {
		Ok(Some(command)) => command,
		Ok(None) => return true,
		Err(e) => {
			warn!("{}", e);
			return true;
		}
	};

	match command {
		Command::User(identity) => store.set(identity),
		Command::Ticket(draft) => {
			let author = store.get();
			let ticket_client = ticket_client.clone();
			// Filing takes two round trips; keep reading input meanwhile
			tokio::spawn(async move {
				match ticket_client.file(&author, draft).await {
					Ok(ticket) => info!(
						"Ticket {} submitted ({})",
						ticket.id,
						ticket.status.as_deref().unwrap_or("pending")
					),
					Err(e) => error!("Failed to file ticket: {}", e),
				}
			});
		}
		Command::Status => {
			let state = *channel.state().borrow();
			info!("Active user: {}, push channel: {:?}", store.get(), state);
		}
		Command::Help => info!("{}", commands::HELP),
		Command::Quit => return false,
	}

	true
}

async fn shutdown(
	handle: &SyncHandle,
	channel: &EventChannel,
	engine_task: tokio::task::JoinHandle<sync::RefreshStats>,
) {
	info!("Shutting down");
	handle.shutdown();
	channel.shutdown();

	if let Err(e) = engine_task.await {
		error!("Sync engine task failed: {}", e);
	}
}
