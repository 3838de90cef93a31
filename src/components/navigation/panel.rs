use log::{debug, info, warn};

use crate::api::{IndexBuildReport, IndexStatus, SearchQuery, SearchResponse};
use crate::config::SearchConfig;
use crate::error::ApiError;
use crate::events::{EventTable, Evented, Shared};
use crate::runtime::CancelToken;
use crate::state::{AppState, LoadStatus};

use super::search::SearchBox;
use super::types::{NavigationEvent, SearchRequest, Theme};

/// Theme list, search box and embedding-index status.
///
/// The active theme and the search generation live in [`AppState`] so the
/// coordinator can read them; everything else is owned here.
pub struct NavigationPanel {
	state: Shared<AppState>,
	themes: Vec<Theme>,
	search: SearchBox,
	index: Option<IndexStatus>,
	index_status: LoadStatus,
	events: EventTable<NavigationEvent>,
}

impl Evented for NavigationPanel {
	type Event = NavigationEvent;

	fn events(&mut self) -> &mut EventTable<NavigationEvent> {
		&mut self.events
	}
}

impl NavigationPanel {
	pub fn new(state: Shared<AppState>, config: &SearchConfig) -> Self {
		Self {
			state,
			themes: Vec::new(),
			search: SearchBox::new(config),
			index: None,
			index_status: LoadStatus::Idle,
			events: EventTable::default(),
		}
	}

	// ---- themes ----

	pub fn set_themes(&mut self, mut themes: Vec<Theme>) {
		themes.sort_by(|a, b| a.name.cmp(&b.name));
		let mut state = self.state.borrow_mut();
		state.theme_colors = themes
			.iter()
			.map(|t| (t.name.clone(), t.color.clone()))
			.collect();
		state.themes_status = LoadStatus::Ready;
		info!("{} themes loaded", themes.len());
		self.themes = themes;
	}

	/// The previous list stays on screen.
	pub fn theme_load_failed(&mut self, err: &ApiError) {
		warn!("theme list failed to load: {}", err);
		self.state.borrow_mut().themes_status = LoadStatus::Failed(err.status_line());
	}

	pub fn themes(&self) -> &[Theme] {
		&self.themes
	}

	pub fn themes_status(&self) -> LoadStatus {
		self.state.borrow().themes_status.clone()
	}

	pub fn active_theme(&self) -> Option<String> {
		self.state.borrow().active_theme.clone()
	}

	pub fn total_insights(&self) -> usize {
		self.themes.iter().map(|t| t.count).sum()
	}

	/// Single-select; `None` selects every theme. Re-selecting the active
	/// theme does nothing and returns `false`.
	pub fn select_theme(&mut self, name: Option<&str>) -> bool {
		{
			let mut state = self.state.borrow_mut();
			if state.active_theme.as_deref() == name {
				return false;
			}
			state.active_theme = name.map(str::to_owned);
		}
		self.events
			.queue(NavigationEvent::ThemeSelected(name.map(str::to_owned)));
		true
	}

	// ---- search ----

	/// Restart the debounce for `text`. An empty query clears results and
	/// supersedes every in-flight search.
	pub fn set_query(&mut self, text: &str) -> Option<CancelToken> {
		let token = self.search.set_query(text);
		if token.is_none() {
			self.state.borrow_mut().search_generation.advance();
			self.events.queue(NavigationEvent::SearchResultsChanged(None));
		}
		token
	}

	pub fn set_semantic(&mut self, semantic: bool) -> Option<CancelToken> {
		self.search.set_semantic(semantic)
	}

	/// Called when the debounce timer for `token` elapses. `None` when the
	/// token was superseded, so no request is made.
	pub fn begin_search(&mut self, token: &CancelToken) -> Option<SearchRequest> {
		if !self.search.fire(token) {
			return None;
		}
		Some(self.issue_search())
	}

	/// Re-issue the active query right away, e.g. after the theme changed.
	pub fn rerun_search(&mut self) -> Option<SearchRequest> {
		if !self.search.is_active() {
			return None;
		}
		self.search.cancel_pending();
		Some(self.issue_search())
	}

	fn issue_search(&mut self) -> SearchRequest {
		let (generation, theme) = {
			let mut state = self.state.borrow_mut();
			(state.search_generation.advance(), state.active_theme.clone())
		};
		self.search.mark_loading();
		SearchRequest {
			generation,
			query: SearchQuery {
				text: self.search.query().to_string(),
				theme,
				semantic: self.search.semantic(),
				limit: self.search.limit(),
			},
		}
	}

	/// Land a search response. Returns `false` for stale generations, which
	/// are dropped without touching anything.
	pub fn apply_results(
		&mut self,
		generation: u64,
		result: Result<SearchResponse, ApiError>,
	) -> bool {
		if !self.state.borrow().search_generation.is_current(generation) {
			debug!("discarding stale search response (generation {})", generation);
			return false;
		}
		match result {
			Ok(response) => {
				let ids = response.results.iter().map(|r| r.id.clone()).collect();
				self.search.replace_results(response.results, response.semantic);
				self.events
					.queue(NavigationEvent::SearchResultsChanged(Some(ids)));
			}
			Err(err) => {
				warn!("search failed: {}", err);
				self.search.fail(err.status_line());
			}
		}
		true
	}

	pub fn search(&self) -> &SearchBox {
		&self.search
	}

	pub fn choose_result(&mut self, id: &str) {
		self.events.queue(NavigationEvent::ResultChosen(id.to_string()));
	}

	// ---- embedding index ----

	pub fn set_index_status(&mut self, result: Result<IndexStatus, ApiError>) {
		match result {
			Ok(status) => {
				self.index = Some(status);
				self.index_status = LoadStatus::Ready;
			}
			Err(err) => {
				warn!("embedding index status unavailable: {}", err);
				self.index_status = LoadStatus::Failed(err.status_line());
			}
		}
	}

	pub fn index_build_started(&mut self) {
		self.index_status = LoadStatus::Loading;
	}

	pub fn index_build_finished(&mut self, result: Result<IndexBuildReport, ApiError>) {
		match result {
			Ok(report) => {
				info!("embedding index: {}", report.message);
				self.index = Some(IndexStatus {
					built: true,
					count: Some(report.count),
				});
				self.index_status = LoadStatus::Ready;
			}
			Err(err) => {
				warn!("embedding index build failed: {}", err);
				self.index_status = LoadStatus::Failed(err.status_line());
			}
		}
	}

	pub fn index(&self) -> Option<IndexStatus> {
		self.index
	}

	pub fn index_status(&self) -> &LoadStatus {
		&self.index_status
	}

	/// Write actions are hidden behind demo mode.
	pub fn can_build_index(&self) -> bool {
		!self.state.borrow().features.demo_mode
	}
}
