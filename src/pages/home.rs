use std::rc::Rc;

use leptos::prelude::*;
use log::warn;

use crate::api::HttpBackend;
use crate::components::force_graph::{ForceGraphCanvas, GraphEngine};
use crate::components::navigation::NavigationSidebar;
use crate::components::viewer::InsightViewer;
use crate::components::viewer::links::{deep_link_id, insight_href};
use crate::config::ExplorerConfig;
use crate::coordinator::{Coordinator, Subsystem};
use crate::runtime::BrowserRuntime;

fn page_origin() -> String {
	web_sys::window()
		.and_then(|w| w.location().origin().ok())
		.unwrap_or_default()
}

fn current_fragment() -> String {
	web_sys::window()
		.and_then(|w| w.location().hash().ok())
		.unwrap_or_default()
}

/// Point the address bar at the insight on screen, so the view can be shared.
fn sync_fragment(id: &str) {
	let href = insight_href(id);
	if current_fragment() == href {
		return;
	}
	if let Some(window) = web_sys::window() {
		let _ = window.location().set_hash(&href);
	}
}

fn stats_line(graph: &GraphEngine) -> String {
	let mut line = format!(
		"{} insights · {} links · {} orphans",
		graph.nodes().len(),
		graph.edges().len(),
		graph.orphan_ids().len()
	);
	if !graph.unresolved_links().is_empty() {
		line.push_str(&format!(" · {} unresolved", graph.unresolved_links().len()));
	}
	line
}

/// Explorer page: toolbar, navigation sidebar, graph canvas and viewer.
#[component]
pub fn Home() -> impl IntoView {
	let config = use_context::<ExplorerConfig>().unwrap_or_default();
	let api_base = config.api_base.clone().unwrap_or_else(page_origin);
	let resize_debounce = config.resize_debounce();
	let coordinator = Coordinator::new(
		config,
		Rc::new(HttpBackend::new(api_base)),
		Rc::new(BrowserRuntime),
	);

	let toolbar_rev = RwSignal::new(0u64);
	let navigation_rev = RwSignal::new(0u64);
	let graph_rev = RwSignal::new(0u64);
	let viewer_rev = RwSignal::new(0u64);
	let viewer = coordinator.viewer();
	coordinator.subscribe_changes(move |subsystem| {
		let revision = match subsystem {
			Subsystem::Toolbar => toolbar_rev,
			Subsystem::Navigation => navigation_rev,
			Subsystem::Graph => graph_rev,
			Subsystem::Viewer => viewer_rev,
		};
		revision.update(|r| *r += 1);
		if subsystem == Subsystem::Viewer {
			if let Some(id) = viewer.borrow().shown_id() {
				sync_fragment(id);
			}
		}
	});

	let engine = coordinator.graph();
	coordinator.start(deep_link_id(&current_fragment()));
	let coordinator = StoredValue::new_local(coordinator);

	let demo = move || {
		toolbar_rev.track();
		coordinator.with_value(|c| c.is_demo())
	};
	let refresh_status = move || {
		toolbar_rev.track();
		coordinator
			.with_value(|c| c.state().borrow().refresh_status.message().map(str::to_owned))
			.map(|msg| view! { <span class="status">{msg}</span> })
	};
	let graph_status = move || {
		graph_rev.track();
		coordinator
			.with_value(|c| c.state().borrow().graph_status.message().map(str::to_owned))
			.map(|msg| view! { <div class="graph-status">{msg}</div> })
	};
	let graph_stats = move || {
		graph_rev.track();
		coordinator.with_value(|c| stats_line(&c.graph().borrow()))
	};

	view! {
		<div class="explorer">
			<header class="toolbar">
				<h1>"Insight Explorer"</h1>
				<span class="graph-stats">{graph_stats}</span>
				<div class="toolbar-actions">
					<button on:click=move |_| coordinator.with_value(|c| c.zoom_out()) title="Zoom out">
						"−"
					</button>
					<button on:click=move |_| coordinator.with_value(|c| c.reset_view()) title="Reset view">
						"⟲"
					</button>
					<button on:click=move |_| coordinator.with_value(|c| c.zoom_in()) title="Zoom in">
						"+"
					</button>
					<button
						class="refresh"
						disabled=demo
						on:click=move |_| {
							if let Err(err) = coordinator.with_value(|c| c.refresh()) {
								warn!("{}", err);
							}
						}
					>
						"Refresh vault"
					</button>
					{refresh_status}
					{move || demo().then(|| view! { <span class="demo-badge">"Demo"</span> })}
				</div>
			</header>
			<aside class="sidebar">
				<NavigationSidebar coordinator=coordinator revision=navigation_rev />
			</aside>
			<main class="graph-pane">
				<ForceGraphCanvas engine=engine resize_debounce=resize_debounce />
				{graph_status}
			</main>
			<aside class="viewer-pane">
				<InsightViewer coordinator=coordinator revision=viewer_rev />
			</aside>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::{GraphSnapshot, InsightNode, LinkEdge};

	#[test]
	fn stats_count_unresolved_links() {
		let mut graph = GraphEngine::new(&ExplorerConfig::default(), 800.0, 600.0);
		let node = |id: &str| InsightNode::new(id, id, "AI", "#3b82f6", 0.5);
		let mut snapshot = GraphSnapshot::new(
			vec![node("a"), node("b"), node("c")],
			vec![LinkEdge::new("a", "b")],
		);
		assert_eq!(stats_line(&graph), "0 insights · 0 links · 0 orphans");

		snapshot.unresolved_links = vec!["ghost".into(), "later".into()];
		graph.ingest(snapshot);
		assert_eq!(stats_line(&graph), "3 insights · 1 links · 1 orphans · 2 unresolved");
	}
}
