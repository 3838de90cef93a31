//! Vault backend: the [`Backend`] seam and its HTTP implementation.

mod types;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use log::debug;
use serde::de::DeserializeOwned;

use crate::components::force_graph::GraphSnapshot;
use crate::components::navigation::Theme;
use crate::config::FeatureFlags;
use crate::error::ApiError;

pub use types::{
	GraphPayload, IndexBuildReport, IndexStatus, InsightDetail, SearchQuery, SearchResponse,
	ThemeSummary, ThemesPayload, WireEdge, WireNode, WireOrphan, themes_from,
};

/// Everything the explorer asks of the vault.
///
/// Futures borrow the backend and are not `Send`; they run on the
/// single-threaded [`Runtime`](crate::runtime::Runtime).
pub trait Backend {
	fn config(&self) -> LocalBoxFuture<'_, Result<FeatureFlags, ApiError>>;
	fn themes(&self) -> LocalBoxFuture<'_, Result<Vec<Theme>, ApiError>>;
	fn graph(&self, theme: Option<&str>) -> LocalBoxFuture<'_, Result<GraphSnapshot, ApiError>>;
	fn search(&self, query: &SearchQuery) -> LocalBoxFuture<'_, Result<SearchResponse, ApiError>>;
	fn insight(&self, id: &str) -> LocalBoxFuture<'_, Result<InsightDetail, ApiError>>;
	fn refresh_vault(&self) -> LocalBoxFuture<'_, Result<(), ApiError>>;
	fn embedding_index_status(&self) -> LocalBoxFuture<'_, Result<IndexStatus, ApiError>>;
	fn embedding_index_build(&self) -> LocalBoxFuture<'_, Result<IndexBuildReport, ApiError>>;
}

/// [`Backend`] over the FastAPI dashboard routes.
#[derive(Clone, Debug)]
pub struct HttpBackend {
	client: reqwest::Client,
	base_url: String,
}

impl HttpBackend {
	/// `base_url` without trailing slash, e.g. `http://localhost:8000`.
	pub fn new(base_url: impl Into<String>) -> Self {
		let base_url = base_url.into().trim_end_matches('/').to_string();
		Self {
			client: reqwest::Client::new(),
			base_url,
		}
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	async fn get<T: DeserializeOwned>(
		&self,
		path: &str,
		query: &[(&str, String)],
	) -> Result<T, ApiError> {
		debug!("GET {}", path);
		let response = self.client.get(self.url(path)).query(query).send().await?;
		decode(response).await
	}

	async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
		debug!("POST {}", path);
		let response = self.client.post(self.url(path)).send().await?;
		decode(response).await
	}
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
	let status = response.status();
	let body = response.text().await?;
	if status == reqwest::StatusCode::FORBIDDEN {
		return Err(ApiError::Forbidden(detail_of(&body)));
	}
	if !status.is_success() {
		return Err(ApiError::Status {
			status: status.as_u16(),
			detail: detail_of(&body),
		});
	}
	Ok(serde_json::from_str(&body)?)
}

/// FastAPI wraps error messages as `{"detail": "..."}`.
fn detail_of(body: &str) -> String {
	serde_json::from_str::<serde_json::Value>(body)
		.ok()
		.and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_owned))
		.unwrap_or_else(|| body.trim().to_string())
}

fn search_params(query: &SearchQuery) -> Vec<(&'static str, String)> {
	let mut params = vec![
		("q", query.text.clone()),
		("semantic", query.semantic.to_string()),
		("limit", query.limit.to_string()),
	];
	if let Some(theme) = &query.theme {
		params.push(("theme", theme.clone()));
	}
	params
}

impl Backend for HttpBackend {
	fn config(&self) -> LocalBoxFuture<'_, Result<FeatureFlags, ApiError>> {
		self.get("/api/config", &[]).boxed_local()
	}

	fn themes(&self) -> LocalBoxFuture<'_, Result<Vec<Theme>, ApiError>> {
		async move {
			let payload: ThemesPayload = self.get("/api/vault/themes", &[]).await?;
			Ok(themes_from(payload))
		}
		.boxed_local()
	}

	fn graph(&self, theme: Option<&str>) -> LocalBoxFuture<'_, Result<GraphSnapshot, ApiError>> {
		let query: Vec<(&str, String)> = theme.map(|t| ("theme", t.to_string())).into_iter().collect();
		async move {
			let payload: GraphPayload = self.get("/api/vault/graph", &query).await?;
			Ok(payload.into_snapshot())
		}
		.boxed_local()
	}

	fn search(&self, query: &SearchQuery) -> LocalBoxFuture<'_, Result<SearchResponse, ApiError>> {
		let params = search_params(query);
		async move { self.get("/api/vault/search", &params).await }.boxed_local()
	}

	fn insight(&self, id: &str) -> LocalBoxFuture<'_, Result<InsightDetail, ApiError>> {
		let path = format!("/api/vault/insight/{}", urlencoding::encode(id));
		async move { self.get(&path, &[]).await }.boxed_local()
	}

	fn refresh_vault(&self) -> LocalBoxFuture<'_, Result<(), ApiError>> {
		async move {
			let _: serde_json::Value = self.post("/api/vault/refresh").await?;
			Ok(())
		}
		.boxed_local()
	}

	fn embedding_index_status(&self) -> LocalBoxFuture<'_, Result<IndexStatus, ApiError>> {
		self.get("/api/vault/embedding-index/status", &[]).boxed_local()
	}

	fn embedding_index_build(&self) -> LocalBoxFuture<'_, Result<IndexBuildReport, ApiError>> {
		self.post("/api/vault/embedding-index/build").boxed_local()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn detail_prefers_fastapi_message() {
		assert_eq!(
			detail_of(r#"{"detail": "Refresh disabled in demo mode"}"#),
			"Refresh disabled in demo mode"
		);
		assert_eq!(detail_of("  Internal Server Error\n"), "Internal Server Error");
	}

	#[test]
	fn search_params_skip_missing_theme() {
		let query = SearchQuery {
			text: "alpha".into(),
			theme: None,
			semantic: true,
			limit: 25,
		};
		let params = search_params(&query);
		assert_eq!(
			params,
			vec![
				("q", "alpha".to_string()),
				("semantic", "true".to_string()),
				("limit", "25".to_string()),
			]
		);

		let scoped = SearchQuery {
			theme: Some("AI".into()),
			..query
		};
		assert!(search_params(&scoped).contains(&("theme", "AI".to_string())));
	}

	#[test]
	fn base_url_loses_trailing_slash() {
		let backend = HttpBackend::new("http://localhost:8000/");
		assert_eq!(backend.base_url(), "http://localhost:8000");
		assert_eq!(backend.url("/api/config"), "http://localhost:8000/api/config");
	}
}
