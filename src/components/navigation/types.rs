use serde::Deserialize;

use crate::api::SearchQuery;

/// One theme of the vault with the number of insights it holds.
#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
	pub name: String,
	pub color: String,
	pub count: usize,
	pub latest_date: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SearchResult {
	pub id: String,
	#[serde(default)]
	pub label: String,
	#[serde(default)]
	pub theme: String,
	/// Cosine similarity; absent for keyword matches.
	#[serde(default)]
	pub score: Option<f64>,
	#[serde(default)]
	pub snippet: Option<String>,
}

impl SearchResult {
	pub fn title(&self) -> &str {
		if self.label.is_empty() { &self.id } else { &self.label }
	}
}

/// A search the panel wants issued, tagged with the generation it answers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchRequest {
	pub generation: u64,
	pub query: SearchQuery,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NavigationEvent {
	/// `None` means "all themes".
	ThemeSelected(Option<String>),
	/// `None` when the query was cleared.
	SearchResultsChanged(Option<Vec<String>>),
	ResultChosen(String),
}
