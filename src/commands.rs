//! Terminal commands.

use crate::api::{TicketDraft, TicketReward};
use crate::identity::Identity;

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
	/// Switch the active identity; an empty argument clears it
	User(Identity),
	/// File and submit a ticket for the active identity
	Ticket(TicketDraft),
	Status,
	Quit,
	Help,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
	#[error("Unknown command: {0}")]
	Unknown(String),

	#[error("Usage: ticket <title> | <body> | <category> | <sub_category> | <credits> | <pay>")]
	TicketUsage,

	#[error("Invalid {field}: {value:?}")]
	InvalidNumber { field: &'static str, value: String },
}

pub const HELP: &str = "Commands: user <id> | ticket <title> | <body> | <category> | <sub_category> | <credits> | <pay> | status | quit";

/// Parse a line of input. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
	let line = line.trim();
	if line.is_empty() {
		return Ok(None);
	}

	let (name, rest) = match line.split_once(char::is_whitespace) {
		Some((name, rest)) => (name, rest.trim()),
		None => (line, ""),
	};

	let command = match name {
		"user" => Command::User(Identity::from_input(rest)),
		"ticket" => Command::Ticket(parse_ticket(rest)?),
		"status" => Command::Status,
		"quit" | "exit" => Command::Quit,
		"help" => Command::Help,
		other => return Err(CommandError::Unknown(other.to_string())),
	};

	Ok(Some(command))
}

fn parse_ticket(args: &str) -> Result<TicketDraft, CommandError> {
	let fields: Vec<&str> = args.split('|').map(str::trim).collect();
	let [title, body, category, sub_category, credits, pay] = fields.as_slice() else {
		return Err(CommandError::TicketUsage);
	};
	if title.is_empty() {
		return Err(CommandError::TicketUsage);
	}

	let reward_credits = parse_reward::<i64>("credits", credits)?;
	let reward_pay = parse_reward::<f64>("pay", pay)?;

	Ok(TicketDraft {
		title: title.to_string(),
		body: body.to_string(),
		category: category.to_string(),
		sub_category: sub_category.to_string(),
		reward: TicketReward {
			reward_credits,
			reward_pay,
		},
	})
}

/// A blank reward field counts as zero.
fn parse_reward<T>(field: &'static str, value: &str) -> Result<T, CommandError>
where
	T: std::str::FromStr + Default,
{
	if value.is_empty() {
		return Ok(T::default());
	}
	value.parse::<T>().map_err(|_| CommandError::InvalidNumber {
		field,
		value: value.to_string(),
	})
}
