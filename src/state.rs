//! Ambient UI state owned by the coordinator.

use std::collections::HashMap;

use crate::config::FeatureFlags;

/// Fallback colour for insights whose theme is unknown.
pub const DEFAULT_THEME_COLOR: &str = "#64748b";

/// Monotonic request counter; only the latest issued request may land.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Generation(u64);

impl Generation {
	/// Issue a new request number, superseding every earlier one.
	pub fn advance(&mut self) -> u64 {
		self.0 += 1;
		self.0
	}

	pub fn is_current(&self, generation: u64) -> bool {
		self.0 == generation
	}

	pub fn latest(&self) -> u64 {
		self.0
	}
}

/// Progress of one asynchronous load.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LoadStatus {
	#[default]
	Idle,
	Loading,
	Ready,
	Failed(String),
}

impl LoadStatus {
	pub fn message(&self) -> Option<&str> {
		match self {
			LoadStatus::Failed(msg) => Some(msg),
			LoadStatus::Loading => Some("Loading…"),
			_ => None,
		}
	}
}

/// State shared by the components but owned by none of them.
///
/// Each async path writes only its own slice: theme loads touch
/// `themes_status` and `theme_colors`, graph loads touch `graph_*`, searches
/// touch `search_generation`.
#[derive(Debug, Default)]
pub struct AppState {
	pub features: FeatureFlags,
	pub active_theme: Option<String>,
	pub selection: Option<String>,
	pub search_generation: Generation,
	pub graph_generation: Generation,
	pub themes_status: LoadStatus,
	pub graph_status: LoadStatus,
	pub refresh_status: LoadStatus,
	pub theme_colors: HashMap<String, String>,
}

impl AppState {
	pub fn theme_color(&self, theme: &str) -> String {
		self.theme_colors
			.get(theme)
			.cloned()
			.unwrap_or_else(|| DEFAULT_THEME_COLOR.to_string())
	}
}
