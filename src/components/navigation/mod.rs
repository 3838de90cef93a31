//! Theme list, debounced search and embedding-index status.

mod component;
mod panel;
mod search;
mod types;

pub use component::NavigationSidebar;
pub use panel::NavigationPanel;
pub use search::SearchBox;
pub use types::{NavigationEvent, SearchRequest, SearchResult, Theme};
