//! Insight detail pane.

mod component;
mod document;
pub mod links;

pub use component::InsightViewer;
pub use document::{
	DocumentViewer, NoveltyLevel, RenderedInsight, ViewerContent, ViewerEvent, date_part,
	markdown_to_html, source_link,
};
