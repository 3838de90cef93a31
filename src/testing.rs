//! Test doubles: a manual clock [`Runtime`] and a scripted [`Backend`].

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;

use crate::api::{
	Backend, IndexBuildReport, IndexStatus, InsightDetail, SearchQuery, SearchResponse,
};
use crate::components::force_graph::{GraphSnapshot, InsightNode, LinkEdge};
use crate::components::navigation::{SearchResult, Theme};
use crate::config::FeatureFlags;
use crate::error::ApiError;
use crate::runtime::Runtime;

type Timer = (Duration, u64, Box<dyn FnOnce()>);

/// Spawns onto a [`LocalPool`]; timers fire only when [`ManualRuntime::advance`] is called.
pub struct ManualRuntime {
	spawner: LocalSpawner,
	now: Cell<Duration>,
	seq: Cell<u64>,
	timers: RefCell<Vec<Timer>>,
}

impl ManualRuntime {
	pub fn new(pool: &LocalPool) -> Rc<Self> {
		Rc::new(Self {
			spawner: pool.spawner(),
			now: Cell::new(Duration::ZERO),
			seq: Cell::new(0),
			timers: RefCell::new(Vec::new()),
		})
	}

	/// Move the clock forward, firing due timers in deadline order.
	pub fn advance(&self, by: Duration) {
		let target = self.now.get() + by;
		loop {
			let next = {
				let mut timers = self.timers.borrow_mut();
				let due = timers
					.iter()
					.enumerate()
					.filter(|(_, (at, _, _))| *at <= target)
					.min_by_key(|(_, (at, seq, _))| (*at, *seq))
					.map(|(i, _)| i);
				due.map(|i| timers.remove(i))
			};
			let Some((at, _, callback)) = next else {
				break;
			};
			self.now.set(at);
			callback();
		}
		self.now.set(target);
	}

	pub fn pending_timers(&self) -> usize {
		self.timers.borrow().len()
	}
}

impl Runtime for ManualRuntime {
	fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
		self.spawner
			.spawn_local(task)
			.expect("local pool accepts tasks");
	}

	fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) {
		let seq = self.seq.get();
		self.seq.set(seq + 1);
		self.timers
			.borrow_mut()
			.push((self.now.get() + delay, seq, callback));
	}
}

/// In-memory vault with call recording, failure injection and held responses.
///
/// Every call is recorded under a key such as `themes`, `graph:AI` or
/// `search:alpha`. Keys passed to [`MockBackend::hold`] do not answer until
/// [`MockBackend::release`] is called for them.
#[derive(Default)]
pub struct MockBackend {
	pub demo_mode: Cell<bool>,
	pub themes: RefCell<Vec<Theme>>,
	pub nodes: RefCell<Vec<InsightNode>>,
	pub edges: RefCell<Vec<LinkEdge>>,
	pub insights: RefCell<HashMap<String, InsightDetail>>,
	calls: RefCell<Vec<String>>,
	failing: RefCell<HashSet<String>>,
	holds: RefCell<HashSet<String>>,
	held: RefCell<HashMap<String, oneshot::Sender<()>>>,
}

impl MockBackend {
	/// Two themes, four insights, `alpha–beta` and `alpha–gamma`.
	pub fn vault() -> Rc<Self> {
		let backend = Self::default();
		*backend.themes.borrow_mut() = vec![theme("AI", "#3b82f6", 3), theme("Psychology", "#10b981", 1)];
		*backend.nodes.borrow_mut() = vec![
			node("alpha", "AI", "#3b82f6"),
			node("beta", "AI", "#3b82f6"),
			node("gamma", "AI", "#3b82f6"),
			node("delta", "Psychology", "#10b981"),
		];
		*backend.edges.borrow_mut() = vec![LinkEdge::new("alpha", "beta"), LinkEdge::new("alpha", "gamma")];
		for id in ["alpha", "beta", "gamma", "delta"] {
			backend.insights.borrow_mut().insert(
				id.to_string(),
				InsightDetail {
					id: id.to_string(),
					source_title: Some(id.to_uppercase()),
					theme: Some("AI".into()),
					novelty_score: 0.5,
					content: Some(format!("About {}. See [[alpha]].", id)),
					..InsightDetail::default()
				},
			);
		}
		Rc::new(backend)
	}

	pub fn calls(&self) -> Vec<String> {
		self.calls.borrow().clone()
	}

	/// Calls whose key starts with `prefix`.
	pub fn calls_to(&self, prefix: &str) -> Vec<String> {
		self.calls
			.borrow()
			.iter()
			.filter(|c| c.starts_with(prefix))
			.cloned()
			.collect()
	}

	/// Make the operation named `op` (`themes`, `graph`, `search`, ...) fail.
	pub fn fail(&self, op: &str) {
		self.failing.borrow_mut().insert(op.to_string());
	}

	pub fn hold(&self, key: &str) {
		self.holds.borrow_mut().insert(key.to_string());
	}

	pub fn release(&self, key: &str) {
		self.holds.borrow_mut().remove(key);
		if let Some(tx) = self.held.borrow_mut().remove(key) {
			let _ = tx.send(());
		}
	}

	async fn call(&self, op: &str, key: String) -> Result<(), ApiError> {
		self.calls.borrow_mut().push(key.clone());
		if self.holds.borrow().contains(&key) {
			let (tx, rx) = oneshot::channel();
			self.held.borrow_mut().insert(key, tx);
			let _ = rx.await;
		}
		if self.failing.borrow().contains(op) {
			return Err(ApiError::Status {
				status: 500,
				detail: format!("{} unavailable", op),
			});
		}
		Ok(())
	}
}

pub fn theme(name: &str, color: &str, count: usize) -> Theme {
	Theme {
		name: name.into(),
		color: color.into(),
		count,
		latest_date: None,
	}
}

pub fn node(id: &str, theme: &str, color: &str) -> InsightNode {
	InsightNode::new(id, id.to_uppercase(), theme, color, 0.5)
}

impl Backend for MockBackend {
	fn config(&self) -> LocalBoxFuture<'_, Result<FeatureFlags, ApiError>> {
		async move {
			self.call("config", "config".into()).await?;
			Ok(FeatureFlags {
				demo_mode: self.demo_mode.get(),
			})
		}
		.boxed_local()
	}

	fn themes(&self) -> LocalBoxFuture<'_, Result<Vec<Theme>, ApiError>> {
		async move {
			self.call("themes", "themes".into()).await?;
			Ok(self.themes.borrow().clone())
		}
		.boxed_local()
	}

	fn graph(&self, theme: Option<&str>) -> LocalBoxFuture<'_, Result<GraphSnapshot, ApiError>> {
		let theme = theme.map(str::to_owned);
		async move {
			let key = format!("graph:{}", theme.as_deref().unwrap_or_default());
			self.call("graph", key).await?;
			let nodes: Vec<InsightNode> = self
				.nodes
				.borrow()
				.iter()
				.filter(|n| theme.as_ref().is_none_or(|t| n.theme == *t))
				.cloned()
				.collect();
			Ok(GraphSnapshot::new(nodes, self.edges.borrow().clone()))
		}
		.boxed_local()
	}

	fn search(&self, query: &SearchQuery) -> LocalBoxFuture<'_, Result<SearchResponse, ApiError>> {
		let query = query.clone();
		async move {
			self.call("search", format!("search:{}", query.text)).await?;
			Ok(SearchResponse {
				count: 1,
				semantic: query.semantic,
				results: vec![SearchResult {
					id: query.text.clone(),
					label: query.text.to_uppercase(),
					theme: query.theme.unwrap_or_else(|| "AI".into()),
					score: Some(0.9),
					snippet: None,
				}],
			})
		}
		.boxed_local()
	}

	fn insight(&self, id: &str) -> LocalBoxFuture<'_, Result<InsightDetail, ApiError>> {
		let id = id.to_owned();
		async move {
			self.call("insight", format!("insight:{}", id)).await?;
			self.insights
				.borrow()
				.get(&id)
				.cloned()
				.ok_or(ApiError::Status {
					status: 404,
					detail: format!("Insight {} not found", id),
				})
		}
		.boxed_local()
	}

	fn refresh_vault(&self) -> LocalBoxFuture<'_, Result<(), ApiError>> {
		async move {
			if self.demo_mode.get() {
				return Err(ApiError::Forbidden("Refresh disabled in demo mode".into()));
			}
			self.call("refresh", "refresh".into()).await
		}
		.boxed_local()
	}

	fn embedding_index_status(&self) -> LocalBoxFuture<'_, Result<IndexStatus, ApiError>> {
		async move {
			self.call("index-status", "index-status".into()).await?;
			Ok(IndexStatus {
				built: false,
				count: None,
			})
		}
		.boxed_local()
	}

	fn embedding_index_build(&self) -> LocalBoxFuture<'_, Result<IndexBuildReport, ApiError>> {
		async move {
			self.call("index-build", "index-build".into()).await?;
			let count = self.insights.borrow().len();
			Ok(IndexBuildReport {
				status: "success".into(),
				count,
				message: format!("Indexed {} insights", count),
			})
		}
		.boxed_local()
	}
}
