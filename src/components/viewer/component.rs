use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::MouseEvent;

use super::document::{RenderedInsight, ViewerContent};
use super::links::LINK_ATTRIBUTE;
use crate::coordinator::Coordinator;

fn insight_view(
	insight: RenderedInsight,
	coordinator: StoredValue<Coordinator, LocalStorage>,
) -> impl IntoView {
	let level = insight.novelty_level;
	let novelty = format!("{} novelty · {}%", level.label(), insight.novelty_percent());
	view! {
		<article class="insight">
			<header class="insight-header">
				<button
					class="insight-close"
					title="Close"
					on:click=move |_| coordinator.with_value(|c| c.close_insight())
				>
					"×"
				</button>
				<h2 class="insight-title">{insight.title}</h2>
				<div class="insight-meta">
					<span
						class="insight-theme"
						style=format!("background-color: {}", insight.theme_color)
					>
						{insight.theme}
					</span>
					<span class=format!("novelty novelty-{}", level.label().to_lowercase())>
						{novelty}
					</span>
					{insight.date.map(|d| view! { <time class="insight-date">{d}</time> })}
					{insight
						.source_link
						.map(|href| {
							view! {
								<a class="insight-source" href=href target="_blank" rel="noopener noreferrer">
									"Source"
								</a>
							}
						})}
				</div>
			</header>
			<ul class="chips concepts">
				{insight
					.concepts
					.into_iter()
					.map(|c| view! { <li class="chip concept">{c}</li> })
					.collect_view()}
			</ul>
			<ul class="chips tags">
				{insight
					.tags
					.into_iter()
					.map(|t| view! { <li class="chip tag">{format!("#{}", t)}</li> })
					.collect_view()}
			</ul>
			<div class="insight-body" inner_html=insight.body_html></div>
			{insight.filename.map(|f| view! { <footer class="insight-file">{f}</footer> })}
		</article>
	}
}

/// Detail pane. Cross-reference clicks inside the body are delegated to the
/// coordinator as link activations.
#[component]
pub fn InsightViewer(
	coordinator: StoredValue<Coordinator, LocalStorage>,
	revision: RwSignal<u64>,
) -> impl IntoView {
	let on_click = move |ev: MouseEvent| {
		let Some(element) = ev
			.target()
			.and_then(|t| t.dyn_into::<web_sys::Element>().ok())
		else {
			return;
		};
		let Ok(Some(anchor)) = element.closest(&format!("[{}]", LINK_ATTRIBUTE)) else {
			return;
		};
		if let Some(id) = anchor.get_attribute(LINK_ATTRIBUTE) {
			ev.prevent_default();
			coordinator.with_value(|c| c.activate_link(&id));
		}
	};

	let content = move || {
		revision.track();
		let content = coordinator.with_value(|c| c.viewer().borrow().content().clone());
		match content {
			ViewerContent::Empty => view! {
				<p class="viewer-placeholder">"Select an insight in the graph or from search results."</p>
			}
			.into_any(),
			ViewerContent::Loading { id } => view! {
				<p class="viewer-loading">{format!("Loading {}…", id)}</p>
			}
			.into_any(),
			ViewerContent::Failed { id, message } => view! {
				<div class="viewer-error">
					<p>{format!("Could not load {}", id)}</p>
					<p class="status">{message}</p>
				</div>
			}
			.into_any(),
			ViewerContent::Loaded(insight) => insight_view(*insight, coordinator).into_any(),
		}
	};

	view! {
		<section class="insight-viewer" on:click=on_click>
			{content}
		</section>
	}
}
