use leptos::prelude::*;
use log::warn;

use super::panel::NavigationPanel;
use crate::api::IndexStatus;
use crate::coordinator::Coordinator;

fn with_panel<R>(
	coordinator: StoredValue<Coordinator, LocalStorage>,
	f: impl FnOnce(&NavigationPanel) -> R,
) -> R {
	coordinator.with_value(|c| f(&c.navigation().borrow()))
}

fn index_label(index: Option<IndexStatus>) -> String {
	match index {
		Some(IndexStatus {
			built: true,
			count,
		}) => format!("Semantic index: {} notes", count.unwrap_or_default()),
		Some(_) => "Semantic index not built".to_string(),
		None => "Semantic index status unknown".to_string(),
	}
}

/// Theme list, search box with results, and embedding-index status.
///
/// Re-reads the headless [`NavigationPanel`] whenever `revision` moves.
#[component]
pub fn NavigationSidebar(
	coordinator: StoredValue<Coordinator, LocalStorage>,
	revision: RwSignal<u64>,
) -> impl IntoView {
	let themes = move || {
		revision.track();
		let (themes, active, total) = with_panel(coordinator, |p| {
			(p.themes().to_vec(), p.active_theme(), p.total_insights())
		});
		let all = view! {
			<li
				class="theme-item"
				class:active=active.is_none()
				on:click=move |_| coordinator.with_value(|c| c.select_theme(None))
			>
				<span class="theme-name">"All themes"</span>
				<span class="theme-count">{total}</span>
			</li>
		};
		let items = themes
			.into_iter()
			.map(|theme| {
				let is_active = active.as_deref() == Some(theme.name.as_str());
				let name = theme.name.clone();
				view! {
					<li
						class="theme-item"
						class:active=is_active
						on:click=move |_| coordinator.with_value(|c| c.select_theme(Some(name.as_str())))
					>
						<span class="theme-dot" style=format!("background-color: {}", theme.color)></span>
						<span class="theme-name">{theme.name}</span>
						<span class="theme-count">{theme.count}</span>
					</li>
				}
			})
			.collect_view();
		(all, items)
	};

	let themes_status = move || {
		revision.track();
		with_panel(coordinator, |p| p.themes_status().message().map(str::to_owned))
			.map(|msg| view! { <p class="status">{msg}</p> })
	};

	let search_status = move || {
		revision.track();
		with_panel(coordinator, |p| {
			let search = p.search();
			if search.keyword_fallback() {
				Some("Semantic index not built, showing keyword matches".to_string())
			} else {
				search.status().message().map(str::to_owned)
			}
		})
		.map(|msg| view! { <p class="status">{msg}</p> })
	};

	let results = move || {
		revision.track();
		let results = with_panel(coordinator, |p| p.search().results().to_vec());
		let state = coordinator.with_value(|c| c.state());
		results
			.into_iter()
			.map(|result| {
				let color = state.borrow().theme_color(&result.theme);
				let title = result.title().to_string();
				let id = result.id.clone();
				view! {
					<li
						class="result-card"
						on:click=move |_| coordinator.with_value(|c| c.choose_result(&id))
					>
						<span class="result-title">{title}</span>
						<span class="result-theme" style=format!("color: {}", color)>
							{result.theme}
						</span>
						{result
							.score
							.map(|s| view! { <span class="result-score">{format!("{:.0}%", s * 100.0)}</span> })}
						{result.snippet.map(|s| view! { <p class="result-snippet">{s}</p> })}
					</li>
				}
			})
			.collect_view()
	};

	let index = move || {
		revision.track();
		let (label, status) = with_panel(coordinator, |p| {
			(
				index_label(p.index()),
				p.index_status().message().map(str::to_owned),
			)
		});
		view! {
			<span class="index-label">{label}</span>
			{status.map(|msg| view! { <span class="status">{msg}</span> })}
		}
	};

	let build_disabled = move || {
		revision.track();
		!with_panel(coordinator, |p| p.can_build_index())
	};

	view! {
		<nav class="navigation">
			<section class="search">
				<input
					type="search"
					class="search-input"
					placeholder="Search insights…"
					on:input=move |ev| {
						let text = event_target_value(&ev);
						coordinator.with_value(|c| c.on_search_input(&text));
					}
				/>
				<label class="mode-toggle">
					<input
						type="checkbox"
						prop:checked=move || {
							revision.track();
							with_panel(coordinator, |p| p.search().semantic())
						}
						on:change=move |ev| {
							let semantic = event_target_checked(&ev);
							coordinator.with_value(|c| c.set_semantic(semantic));
						}
					/>
					"Semantic"
				</label>
				{search_status}
				<ul class="results">{results}</ul>
			</section>
			<section class="themes">
				<h3>"Themes"</h3>
				{themes_status}
				<ul class="theme-list">{themes}</ul>
			</section>
			<section class="index">
				{index}
				<button
					class="build-index"
					disabled=build_disabled
					on:click=move |_| {
						if let Err(err) = coordinator.with_value(|c| c.build_index()) {
							warn!("{}", err);
						}
					}
				>
					"Build index"
				</button>
			</section>
		</nav>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn index_labels() {
		assert_eq!(
			index_label(Some(IndexStatus {
				built: true,
				count: Some(42),
			})),
			"Semantic index: 42 notes"
		);
		assert_eq!(
			index_label(Some(IndexStatus {
				built: false,
				count: None,
			})),
			"Semantic index not built"
		);
	}
}
