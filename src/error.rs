//! Errors surfaced by the backend collaborator.

use thiserror::Error;

/// Failure of a single request to the vault backend.
///
/// Every variant is recoverable: callers turn it into a status line for the
/// subsystem that issued the request and carry on.
#[derive(Debug, Error)]
pub enum ApiError {
	/// The request never produced a response (offline, CORS, aborted).
	#[error("request failed: {0}")]
	Transport(#[from] reqwest::Error),

	/// The backend answered with a non-success status.
	#[error("backend returned {status}: {detail}")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Response body, usually a FastAPI `detail` message.
		detail: String,
	},

	/// The backend refused a write because it runs in demo mode.
	#[error("refused by backend: {0}")]
	Forbidden(String),

	/// The response body did not match the expected shape.
	#[error("malformed response: {0}")]
	Decode(#[from] serde_json::Error),

	/// A mutating action was requested while demo mode is active.
	#[error("demo mode: write operations are disabled")]
	DemoMode,
}

impl ApiError {
	/// Short message suitable for an inline status indicator.
	pub fn status_line(&self) -> String {
		match self {
			ApiError::Status { status: 404, .. } => "Not found".to_string(),
			ApiError::Forbidden(_) | ApiError::DemoMode => "Disabled in demo mode".to_string(),
			other => other.to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_lines() {
		let missing = ApiError::Status {
			status: 404,
			detail: "Insight x not found".into(),
		};
		assert_eq!(missing.status_line(), "Not found");
		assert_eq!(ApiError::DemoMode.status_line(), "Disabled in demo mode");

		let server = ApiError::Status {
			status: 500,
			detail: "boom".into(),
		};
		assert_eq!(server.status_line(), "backend returned 500: boom");
	}
}
