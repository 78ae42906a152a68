//! Typed decoding of the gateway's `{ success, errorCode, errorMessage, ... }` envelope.
//!
//! Status codes are interpreted before the body: 503 becomes a retryable
//! [`TransientError::ServiceUnavailable`], any other non-2xx status becomes [`Error::Http`].
//! A 2xx body must carry `success`; `success: false` becomes [`Error::Business`].

// crates.io
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, error::TransientError, http::HttpReply};

const NOT_FOUND: u16 = 404;
const SERVICE_UNAVAILABLE: u16 = 503;
const MISSING_ERROR_CODE: &str = "n/a";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
	success: Option<bool>,
	#[serde(default)]
	error_code: Value,
	#[serde(default)]
	error_message: Option<String>,
	#[serde(flatten)]
	fields: Map<String, Value>,
}

/// Maps transport-level status codes onto the error taxonomy.
pub fn check_status(operation: &str, reply: &HttpReply) -> Result<()> {
	if reply.is_success() {
		return Ok(());
	}
	if reply.status == SERVICE_UNAVAILABLE {
		return Err(TransientError::ServiceUnavailable {
			operation: operation.into(),
			status: reply.status,
			retry_after: reply.retry_after,
		}
		.into());
	}

	Err(Error::http(operation, reply.status, &reply.body))
}

/// Decodes the whole body as `T` after the status check, without envelope semantics.
pub fn decode_raw<T>(operation: &str, reply: &HttpReply) -> Result<T>
where
	T: DeserializeOwned,
{
	check_status(operation, reply)?;

	let mut deserializer = serde_json::Deserializer::from_slice(&reply.body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|e| malformed(operation, reply, format!("{} at `{}`", e.inner(), e.path())))
}

/// Decodes a required envelope field as `T`.
pub fn decode_field<T>(operation: &str, reply: &HttpReply, field: &str) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut fields = open(operation, reply)?;
	let value = match fields.remove(field) {
		Some(Value::Null) | None =>
			return Err(malformed(operation, reply, format!("missing field `{field}`"))),
		Some(value) => value,
	};

	from_value(operation, reply, field, value)
}

/// Decodes an envelope list field; a 404, an absent field, or `null` yield an empty list.
pub fn decode_list<T>(operation: &str, reply: &HttpReply, field: &str) -> Result<Vec<T>>
where
	T: DeserializeOwned,
{
	if reply.status == NOT_FOUND {
		tracing::debug!(operation, "Gateway reported no records.");

		return Ok(Vec::new());
	}

	let mut fields = open(operation, reply)?;

	match fields.remove(field) {
		Some(Value::Null) | None => Ok(Vec::new()),
		Some(value) => from_value(operation, reply, field, value),
	}
}

/// Accepts a bare `{ "success": true }` acknowledgement.
pub fn decode_ack(operation: &str, reply: &HttpReply) -> Result<()> {
	open(operation, reply).map(|_| ())
}

fn open(operation: &str, reply: &HttpReply) -> Result<Map<String, Value>> {
	let envelope: RawEnvelope = decode_raw(operation, reply)?;

	match envelope.success {
		Some(true) => Ok(envelope.fields),
		Some(false) => Err(Error::Business {
			operation: operation.into(),
			error_code: error_code_label(&envelope.error_code),
			message: envelope.error_message.unwrap_or_default(),
		}),
		None => Err(malformed(operation, reply, "missing field `success`".into())),
	}
}

fn from_value<T>(operation: &str, reply: &HttpReply, field: &str, value: Value) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(value).map_err(|e| {
		let path = e.path().to_string();
		let location = if path == "." { field.to_owned() } else { format!("{field}.{path}") };

		malformed(operation, reply, format!("{} at `{location}`", e.inner()))
	})
}

fn error_code_label(code: &Value) -> String {
	match code {
		Value::Null => MISSING_ERROR_CODE.into(),
		Value::String(code) => code.clone(),
		other => other.to_string(),
	}
}

fn malformed(operation: &str, reply: &HttpReply, detail: String) -> Error {
	Error::MalformedResponse { operation: operation.into(), status: Some(reply.status), detail }
}
