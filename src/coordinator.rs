//! Wires the graph, navigation panel and viewer together and owns every
//! request to the backend.

use std::cell::RefCell;
use std::future::Future;
use std::rc::{Rc, Weak};

use log::{debug, error, info, warn};

use crate::api::Backend;
use crate::components::force_graph::{GraphEngine, GraphEvent};
use crate::components::navigation::{NavigationEvent, NavigationPanel, SearchRequest};
use crate::components::viewer::{DocumentViewer, ViewerEvent};
use crate::config::ExplorerConfig;
use crate::error::ApiError;
use crate::events::{Shared, dispatch, subscribe};
use crate::runtime::{CancelToken, Runtime};
use crate::state::{AppState, LoadStatus};

/// Part of the UI whose headless model just changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Subsystem {
	/// Feature flags, refresh and index actions.
	Toolbar,
	Navigation,
	Graph,
	Viewer,
}

type ChangeListener = Rc<dyn Fn(Subsystem)>;

struct Inner {
	backend: Rc<dyn Backend>,
	runtime: Rc<dyn Runtime>,
	config: ExplorerConfig,
	state: Shared<AppState>,
	graph: Shared<GraphEngine>,
	navigation: Shared<NavigationPanel>,
	viewer: Shared<DocumentViewer>,
	listeners: RefCell<Vec<ChangeListener>>,
}

/// Cheap handle; clones share one set of components.
#[derive(Clone)]
pub struct Coordinator(Rc<Inner>);

impl Coordinator {
	pub fn new(config: ExplorerConfig, backend: Rc<dyn Backend>, runtime: Rc<dyn Runtime>) -> Self {
		let state: Shared<AppState> = Rc::default();
		let graph = Rc::new(RefCell::new(GraphEngine::new(&config, 800.0, 600.0)));
		let navigation = Rc::new(RefCell::new(NavigationPanel::new(
			state.clone(),
			&config.search,
		)));
		let viewer = Rc::new(RefCell::new(DocumentViewer::new(state.clone())));
		let coordinator = Self(Rc::new(Inner {
			backend,
			runtime,
			config,
			state,
			graph,
			navigation,
			viewer,
			listeners: RefCell::new(Vec::new()),
		}));
		coordinator.wire();
		coordinator
	}

	fn downgrade(&self) -> Weak<Inner> {
		Rc::downgrade(&self.0)
	}

	/// Handlers hold a weak reference so components never keep the
	/// coordinator alive.
	fn handler<E>(&self, f: impl Fn(&Coordinator, &E) + 'static) -> impl Fn(&E) + 'static {
		let weak = self.downgrade();
		move |event| {
			if let Some(inner) = weak.upgrade() {
				f(&Coordinator(inner), event);
			}
		}
	}

	fn wire(&self) {
		subscribe(
			&self.0.graph,
			self.handler(|c, event: &GraphEvent| match event {
				GraphEvent::NodeClicked(id) => c.load_insight(id),
				GraphEvent::NodeHovered(id) => debug!("hover: {:?}", id),
			}),
		);
		subscribe(
			&self.0.navigation,
			self.handler(|c, event: &NavigationEvent| match event {
				NavigationEvent::ThemeSelected(theme) => c.apply_theme(theme.as_deref()),
				NavigationEvent::SearchResultsChanged(ids) => {
					let ids = ids.as_deref().unwrap_or_default();
					dispatch(&c.0.graph, |g| g.highlight_search_results(ids));
					c.notify(Subsystem::Graph);
				}
				NavigationEvent::ResultChosen(id) => c.load_insight(id),
			}),
		);
		subscribe(
			&self.0.viewer,
			self.handler(|c, event: &ViewerEvent| match event {
				ViewerEvent::LinkActivated(id) => c.load_insight(id),
			}),
		);
	}

	// ---- accessors ----

	pub fn config(&self) -> &ExplorerConfig {
		&self.0.config
	}

	pub fn state(&self) -> Shared<AppState> {
		self.0.state.clone()
	}

	pub fn graph(&self) -> Shared<GraphEngine> {
		self.0.graph.clone()
	}

	pub fn navigation(&self) -> Shared<NavigationPanel> {
		self.0.navigation.clone()
	}

	pub fn viewer(&self) -> Shared<DocumentViewer> {
		self.0.viewer.clone()
	}

	pub fn is_demo(&self) -> bool {
		self.0.state.borrow().features.demo_mode
	}

	// ---- change notification ----

	/// Called after every state change the coordinator drives.
	pub fn subscribe_changes(&self, listener: impl Fn(Subsystem) + 'static) {
		self.0.listeners.borrow_mut().push(Rc::new(listener));
	}

	fn notify(&self, subsystem: Subsystem) {
		let listeners = self.0.listeners.borrow().clone();
		for listener in listeners {
			listener(subsystem);
		}
	}

	fn spawn(&self, task: impl Future<Output = ()> + 'static) {
		self.0.runtime.spawn_local(Box::pin(task));
	}

	// ---- bootstrap ----

	/// Kick off [`Coordinator::bootstrap`] on the runtime.
	pub fn start(&self, initial_insight: Option<String>) {
		let this = self.clone();
		self.spawn(async move { this.bootstrap(initial_insight).await });
	}

	/// Feature flags, themes, index status, the full graph, then the
	/// deep-linked insight. Each step fails on its own.
	pub async fn bootstrap(&self, initial_insight: Option<String>) {
		info!("bootstrapping insight explorer");
		let backend = self.0.backend.clone();
		match backend.config().await {
			Ok(features) => {
				info!("demo mode: {}", features.demo_mode);
				self.0.state.borrow_mut().features = features;
			}
			Err(err) => warn!("feature flags unavailable, keeping defaults: {}", err),
		}
		self.notify(Subsystem::Toolbar);

		self.reload_themes().await;
		self.reload_index_status().await;
		self.reload_graph().await;
		if let Some(id) = initial_insight.filter(|id| !id.trim().is_empty()) {
			self.load_insight(&id);
		}
		info!("explorer ready");
	}

	async fn reload_themes(&self) {
		self.0.state.borrow_mut().themes_status = LoadStatus::Loading;
		self.notify(Subsystem::Navigation);
		let backend = self.0.backend.clone();
		let result = backend.themes().await;
		{
			let mut navigation = self.0.navigation.borrow_mut();
			match result {
				Ok(themes) => navigation.set_themes(themes),
				Err(err) => navigation.theme_load_failed(&err),
			}
		}
		self.notify(Subsystem::Navigation);
	}

	async fn reload_index_status(&self) {
		let backend = self.0.backend.clone();
		let result = backend.embedding_index_status().await;
		self.0.navigation.borrow_mut().set_index_status(result);
		self.notify(Subsystem::Navigation);
	}

	/// Fetch the snapshot for the active theme. A reload superseded by a
	/// newer one while in flight is dropped.
	async fn reload_graph(&self) {
		let (generation, theme) = {
			let mut state = self.0.state.borrow_mut();
			state.graph_status = LoadStatus::Loading;
			(state.graph_generation.advance(), state.active_theme.clone())
		};
		self.notify(Subsystem::Graph);

		let backend = self.0.backend.clone();
		let result = backend.graph(theme.as_deref()).await;

		let snapshot = {
			let mut state = self.0.state.borrow_mut();
			if !state.graph_generation.is_current(generation) {
				debug!("discarding stale graph for theme {:?}", theme);
				return;
			}
			match result {
				Ok(snapshot) => {
					state.graph_status = LoadStatus::Ready;
					Some(snapshot)
				}
				Err(err) => {
					error!("graph load failed: {}", err);
					state.graph_status = LoadStatus::Failed(err.status_line());
					None
				}
			}
		};
		if let Some(snapshot) = snapshot {
			info!(
				"graph loaded for {}: {} nodes",
				theme.as_deref().unwrap_or("all themes"),
				snapshot.nodes.len()
			);
			dispatch(&self.0.graph, |g| g.ingest(snapshot));
		}
		self.notify(Subsystem::Graph);
	}

	fn spawn_graph_reload(&self) {
		let this = self.clone();
		self.spawn(async move { this.reload_graph().await });
	}

	// ---- insights ----

	/// Select `id` everywhere and show it in the viewer.
	pub fn load_insight(&self, id: &str) {
		let id = id.trim();
		if id.is_empty() {
			return;
		}
		self.0.state.borrow_mut().selection = Some(id.to_string());
		dispatch(&self.0.graph, |g| g.select(Some(id)));
		let generation = dispatch(&self.0.viewer, |v| v.begin_load(id));
		self.notify(Subsystem::Graph);
		self.notify(Subsystem::Viewer);

		let (this, id) = (self.clone(), id.to_string());
		self.spawn(async move {
			let backend = this.0.backend.clone();
			let result = backend.insight(&id).await;
			if dispatch(&this.0.viewer, |v| v.finish_load(generation, result)) {
				this.notify(Subsystem::Viewer);
			}
		});
	}

	pub fn activate_link(&self, target: &str) {
		dispatch(&self.0.viewer, |v| v.activate_link(target));
	}

	pub fn close_insight(&self) {
		self.0.state.borrow_mut().selection = None;
		dispatch(&self.0.graph, |g| g.select(None));
		dispatch(&self.0.viewer, |v| v.clear());
		self.notify(Subsystem::Graph);
		self.notify(Subsystem::Viewer);
	}

	// ---- navigation ----

	pub fn select_theme(&self, theme: Option<&str>) {
		dispatch(&self.0.navigation, |n| n.select_theme(theme));
		self.notify(Subsystem::Navigation);
	}

	fn apply_theme(&self, theme: Option<&str>) {
		info!("theme selected: {}", theme.unwrap_or("all"));
		dispatch(&self.0.graph, |g| g.set_theme_filter(theme));
		self.spawn_graph_reload();
		if let Some(request) = dispatch(&self.0.navigation, |n| n.rerun_search()) {
			self.run_search(request);
		}
	}

	/// Debounced search box input.
	pub fn on_search_input(&self, text: &str) {
		let token = dispatch(&self.0.navigation, |n| n.set_query(text));
		self.notify(Subsystem::Navigation);
		if let Some(token) = token {
			self.schedule_search(token);
		}
	}

	pub fn set_semantic(&self, semantic: bool) {
		let token = dispatch(&self.0.navigation, |n| n.set_semantic(semantic));
		self.notify(Subsystem::Navigation);
		if let Some(token) = token {
			self.schedule_search(token);
		}
	}

	pub fn choose_result(&self, id: &str) {
		dispatch(&self.0.navigation, |n| n.choose_result(id));
	}

	fn schedule_search(&self, token: CancelToken) {
		let weak = self.downgrade();
		self.0.runtime.set_timeout(
			self.0.config.search.debounce(),
			Box::new(move || {
				let Some(inner) = weak.upgrade() else {
					return;
				};
				let this = Coordinator(inner);
				if let Some(request) = dispatch(&this.0.navigation, |n| n.begin_search(&token)) {
					this.run_search(request);
				}
			}),
		);
	}

	fn run_search(&self, request: SearchRequest) {
		debug!("search #{}: {:?}", request.generation, request.query.text);
		self.notify(Subsystem::Navigation);
		let this = self.clone();
		self.spawn(async move {
			let backend = this.0.backend.clone();
			let result = backend.search(&request.query).await;
			if dispatch(&this.0.navigation, |n| n.apply_results(request.generation, result)) {
				this.notify(Subsystem::Navigation);
			}
		});
	}

	// ---- write actions ----

	/// Rescan the vault, then reload themes, the current snapshot and the
	/// active search. Refused in demo mode.
	pub fn refresh(&self) -> Result<(), ApiError> {
		if self.is_demo() {
			warn!("refresh refused: demo mode");
			self.0.state.borrow_mut().refresh_status =
				LoadStatus::Failed(ApiError::DemoMode.status_line());
			self.notify(Subsystem::Toolbar);
			return Err(ApiError::DemoMode);
		}
		self.0.state.borrow_mut().refresh_status = LoadStatus::Loading;
		self.notify(Subsystem::Toolbar);

		let this = self.clone();
		self.spawn(async move {
			let backend = this.0.backend.clone();
			match backend.refresh_vault().await {
				Ok(()) => {
					info!("vault rescanned");
					this.reload_themes().await;
					this.reload_graph().await;
					if let Some(request) = dispatch(&this.0.navigation, |n| n.rerun_search()) {
						this.run_search(request);
					}
					this.0.state.borrow_mut().refresh_status = LoadStatus::Ready;
				}
				Err(err) => {
					error!("vault refresh failed: {}", err);
					this.0.state.borrow_mut().refresh_status = LoadStatus::Failed(err.status_line());
				}
			}
			this.notify(Subsystem::Toolbar);
		});
		Ok(())
	}

	/// Build the semantic search index. Refused in demo mode.
	pub fn build_index(&self) -> Result<(), ApiError> {
		if self.is_demo() {
			warn!("index build refused: demo mode");
			return Err(ApiError::DemoMode);
		}
		self.0.navigation.borrow_mut().index_build_started();
		self.notify(Subsystem::Navigation);

		let this = self.clone();
		self.spawn(async move {
			let backend = this.0.backend.clone();
			let result = backend.embedding_index_build().await;
			let built = result.is_ok();
			this.0.navigation.borrow_mut().index_build_finished(result);
			if built {
				this.reload_index_status().await;
			}
			this.notify(Subsystem::Navigation);
		});
		Ok(())
	}

	// ---- viewport ----

	pub fn zoom_in(&self) {
		self.0.graph.borrow_mut().zoom_in();
	}

	pub fn zoom_out(&self) {
		self.0.graph.borrow_mut().zoom_out();
	}

	pub fn reset_view(&self) {
		self.0.graph.borrow_mut().reset_view();
	}
}
