use crate::config::SearchConfig;
use crate::runtime::{CancelToken, Debouncer};
use crate::state::LoadStatus;

use super::types::SearchResult;

/// Search box state: query text, mode, debounce and last good results.
#[derive(Debug)]
pub struct SearchBox {
	query: String,
	semantic: bool,
	limit: usize,
	debouncer: Debouncer,
	results: Vec<SearchResult>,
	status: LoadStatus,
	keyword_fallback: bool,
}

impl SearchBox {
	pub fn new(config: &SearchConfig) -> Self {
		Self {
			query: String::new(),
			semantic: config.semantic,
			limit: config.limit,
			debouncer: Debouncer::default(),
			results: Vec::new(),
			status: LoadStatus::Idle,
			keyword_fallback: false,
		}
	}

	/// Record a keystroke. Returns the token the caller's timer must present
	/// to [`SearchBox::fire`], or `None` when the query became empty and
	/// everything was cleared.
	pub fn set_query(&mut self, text: &str) -> Option<CancelToken> {
		self.query = text.trim().to_string();
		if self.query.is_empty() {
			self.clear();
			return None;
		}
		Some(self.debouncer.restart())
	}

	/// Toggle semantic mode; restarts the debounce when a query is active.
	pub fn set_semantic(&mut self, semantic: bool) -> Option<CancelToken> {
		if self.semantic == semantic {
			return None;
		}
		self.semantic = semantic;
		self.keyword_fallback = false;
		self.is_active().then(|| self.debouncer.restart())
	}

	/// `true` once per live token; superseded tokens are refused.
	pub fn fire(&mut self, token: &CancelToken) -> bool {
		self.debouncer.fire(token) && self.is_active()
	}

	/// Drop any pending debounce without touching the results.
	pub fn cancel_pending(&mut self) {
		self.debouncer.cancel();
	}

	pub fn clear(&mut self) {
		self.debouncer.cancel();
		self.results.clear();
		self.status = LoadStatus::Idle;
		self.keyword_fallback = false;
	}

	pub fn is_active(&self) -> bool {
		!self.query.is_empty()
	}

	pub fn query(&self) -> &str {
		&self.query
	}

	pub fn semantic(&self) -> bool {
		self.semantic
	}

	pub fn limit(&self) -> usize {
		self.limit
	}

	pub fn results(&self) -> &[SearchResult] {
		&self.results
	}

	pub fn status(&self) -> &LoadStatus {
		&self.status
	}

	/// The backend answered a semantic request with keyword matches.
	pub fn keyword_fallback(&self) -> bool {
		self.keyword_fallback
	}

	pub(super) fn mark_loading(&mut self) {
		self.status = LoadStatus::Loading;
	}

	pub(super) fn replace_results(&mut self, results: Vec<SearchResult>, semantic: bool) {
		self.keyword_fallback = self.semantic && !semantic;
		self.results = results;
		self.status = LoadStatus::Ready;
	}

	pub(super) fn fail(&mut self, message: String) {
		self.status = LoadStatus::Failed(message);
	}
}
