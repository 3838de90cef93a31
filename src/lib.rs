//! Leptos client-side app wiring and routes.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info, warn};

// Modules
pub mod api;
pub mod components;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
mod pages;
pub mod runtime;
pub mod state;
#[cfg(test)]
mod testing;

// Top-Level pages
use crate::config::{CONFIG_ELEMENT_ID, ExplorerConfig};
use crate::pages::home::Home;
use crate::pages::not_found::NotFound;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// Read the page's inline JSON config, falling back to defaults.
pub fn load_config() -> ExplorerConfig {
	let raw = web_sys::window()
		.and_then(|w| w.document())
		.and_then(|d| d.get_element_by_id(CONFIG_ELEMENT_ID))
		.and_then(|el| el.text_content());
	match raw {
		Some(raw) => ExplorerConfig::from_json(&raw).unwrap_or_else(|err| {
			warn!("ignoring invalid #{}: {}", CONFIG_ELEMENT_ID, err);
			ExplorerConfig::default()
		}),
		None => ExplorerConfig::default(),
	}
}

/// An app router which renders the explorer and handles 404's
#[component]
pub fn App() -> impl IntoView {
	// Provides context that manages stylesheets, titles, meta tags, etc.
	provide_meta_context();
	provide_context(load_config());

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />

		// sets the document title
		<Title text="Insight Explorer" />

		// injects metadata in the <head> of the page
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
			</Routes>
		</Router>
	}
}
