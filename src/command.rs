use crate::topic::{is_valid_string, InvalidTopic, TopicBuf};

/// A single decoded protocol line.
///
/// The decoder is stateless: whether a command is permitted in the
/// connection's current state (named or not) is the session's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	/// `name <name>`: announce a display name.
	Name(String),
	/// `sub <topic>`: subscribe to a topic.
	Subscribe(TopicBuf),
	/// `unsub <topic>`: withdraw a subscription.
	Unsubscribe(TopicBuf),
	/// `pub <topic> <payload>`: publish a line to a topic.
	Publish { topic: TopicBuf, payload: String },
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCommand {
	#[error("unrecognised command verb")]
	UnknownVerb,
	#[error("missing required argument")]
	MissingArgument,
	#[error("name contains a reserved character")]
	BadName,
	#[error("publish payload cannot be empty")]
	EmptyPayload,
	#[error(transparent)]
	BadTopic(#[from] InvalidTopic),
}

impl Command {
	/// Decodes one line, with the trailing newline already stripped.
	///
	/// The line splits on the first space into a verb and its argument
	/// tail; a `pub` tail splits once more into topic and payload. The
	/// payload is taken verbatim, so embedded spaces and colons survive.
	pub fn parse(line: &str) -> Result<Self, InvalidCommand> {
		let (verb, tail) = match line.split_once(' ') {
			Some((verb, tail)) => (verb, Some(tail)),
			None => (line, None),
		};

		match verb {
			"name" => {
				let name = required(tail)?;
				if !is_valid_string(name) {
					return Err(InvalidCommand::BadName);
				}
				Ok(Self::Name(name.to_owned()))
			}
			"sub" => Ok(Self::Subscribe(TopicBuf::new(required(tail)?)?)),
			"unsub" => Ok(Self::Unsubscribe(TopicBuf::new(required(tail)?)?)),
			"pub" => {
				let tail = required(tail)?;
				let (topic, payload) = tail.split_once(' ').ok_or(InvalidCommand::EmptyPayload)?;
				if payload.is_empty() {
					return Err(InvalidCommand::EmptyPayload);
				}
				Ok(Self::Publish {
					topic: TopicBuf::new(topic)?,
					payload: payload.to_owned(),
				})
			}
			_ => Err(InvalidCommand::UnknownVerb),
		}
	}

	/// The wire verb of this command.
	pub fn verb(&self) -> &'static str {
		match self {
			Self::Name(_) => "name",
			Self::Subscribe(_) => "sub",
			Self::Unsubscribe(_) => "unsub",
			Self::Publish { .. } => "pub",
		}
	}
}

fn required(tail: Option<&str>) -> Result<&str, InvalidCommand> {
	tail.filter(|tail| !tail.is_empty())
		.ok_or(InvalidCommand::MissingArgument)
}
