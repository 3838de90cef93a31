//! Explorer configuration.
//!
//! Defaults cover a local backend; a page can override any subset by embedding
//! `<script type="application/json" id="explorer-config">{...}</script>`.

use std::time::Duration;

use log::warn;
use serde::Deserialize;

use crate::components::force_graph::{DragRelease, RadiusConfig, SimulationParameters};

/// Id of the optional inline JSON config element.
pub const CONFIG_ELEMENT_ID: &str = "explorer-config";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExplorerConfig {
	/// Absolute backend origin; `None` means "same origin as the page".
	pub api_base: Option<String>,
	pub search: SearchConfig,
	pub radius: RadiusConfig,
	pub drag_release: DragRelease,
	pub zoom: ZoomConfig,
	pub simulation: SimulationParameters,
	pub resize_debounce_ms: u64,
}

impl Default for ExplorerConfig {
	fn default() -> Self {
		Self {
			api_base: None,
			search: SearchConfig::default(),
			radius: RadiusConfig::default(),
			drag_release: DragRelease::default(),
			zoom: ZoomConfig::default(),
			simulation: SimulationParameters::default(),
			resize_debounce_ms: 150,
		}
	}
}

impl ExplorerConfig {
	/// Parse a page-supplied config. Bounds the graph cannot work with are
	/// put back to their defaults.
	pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
		let mut config: Self = serde_json::from_str(raw)?;
		config.repair();
		Ok(config)
	}

	fn repair(&mut self) {
		let radius = &mut self.radius;
		if !(radius.min >= 0.0 && radius.min <= radius.max && radius.max.is_finite()) {
			warn!(
				"radius bounds {}..{} are unusable, using defaults",
				radius.min, radius.max
			);
			let defaults = RadiusConfig::default();
			radius.min = defaults.min;
			radius.max = defaults.max;
		}
		let zoom = &mut self.zoom;
		if !(zoom.min > 0.0 && zoom.min <= zoom.max && zoom.max.is_finite()) {
			warn!("zoom bounds {}..{} are unusable, using defaults", zoom.min, zoom.max);
			let defaults = ZoomConfig::default();
			zoom.min = defaults.min;
			zoom.max = defaults.max;
		}
		if !(zoom.step > 0.0 && zoom.step.is_finite()) {
			warn!("zoom step {} is unusable, using default", zoom.step);
			zoom.step = ZoomConfig::default().step;
		}
	}

	pub fn resize_debounce(&self) -> Duration {
		Duration::from_millis(self.resize_debounce_ms)
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
	pub debounce_ms: u64,
	pub limit: usize,
	/// Initial position of the keyword/semantic toggle.
	pub semantic: bool,
}

impl Default for SearchConfig {
	fn default() -> Self {
		Self {
			debounce_ms: 300,
			limit: 25,
			semantic: true,
		}
	}
}

impl SearchConfig {
	pub fn debounce(&self) -> Duration {
		Duration::from_millis(self.debounce_ms)
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZoomConfig {
	pub min: f64,
	pub max: f64,
	/// Factor applied by the zoom-in / zoom-out controls.
	pub step: f64,
}

impl Default for ZoomConfig {
	fn default() -> Self {
		Self {
			min: 0.1,
			max: 10.0,
			step: 1.25,
		}
	}
}

/// Switches reported by the backend's `/api/config`.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct FeatureFlags {
	/// Read-only deployment: refresh and index builds are disabled.
	#[serde(default, alias = "demoMode")]
	pub demo_mode: bool,
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::{InsightNode, RadiusPolicy};

	#[test]
	fn partial_json_keeps_defaults() {
		let config = ExplorerConfig::from_json(
			r#"{"search": {"debounce_ms": 500}, "radius": {"policy": "novelty"}}"#,
		)
		.unwrap();
		assert_eq!(config.search.debounce_ms, 500);
		assert_eq!(config.search.limit, 25);
		assert_eq!(config.radius.policy, RadiusPolicy::Novelty);
		assert_eq!(config.zoom, ZoomConfig::default());
		assert_eq!(config.resize_debounce(), Duration::from_millis(150));
	}

	#[test]
	fn inverted_bounds_fall_back_to_defaults() {
		let config = ExplorerConfig::from_json(r#"{"radius": {"min": 20}}"#).unwrap();
		assert_eq!(config.radius.min, 4.0);
		assert_eq!(config.radius.max, 16.0);
		let node = InsightNode::new("a", "A", "AI", "#fff", 0.5);
		assert_eq!(config.radius.radius(&node), 4.0);

		let config =
			ExplorerConfig::from_json(r#"{"zoom": {"min": 5, "max": 2, "step": 0}}"#).unwrap();
		assert_eq!(config.zoom, ZoomConfig::default());
		let config = ExplorerConfig::from_json(r#"{"zoom": {"min": 0}}"#).unwrap();
		assert_eq!(config.zoom.min, 0.1);
	}

	#[test]
	fn usable_bounds_are_kept() {
		let config = ExplorerConfig::from_json(
			r#"{"radius": {"min": 2, "max": 30}, "zoom": {"min": 0.5, "max": 4, "step": 2}}"#,
		)
		.unwrap();
		assert_eq!((config.radius.min, config.radius.max), (2.0, 30.0));
		assert_eq!(
			config.zoom,
			ZoomConfig {
				min: 0.5,
				max: 4.0,
				step: 2.0,
			}
		);
	}

	#[test]
	fn feature_flags_accept_both_spellings() {
		let snake: FeatureFlags = serde_json::from_str(r#"{"demo_mode": true}"#).unwrap();
		let camel: FeatureFlags = serde_json::from_str(r#"{"demoMode": true}"#).unwrap();
		let empty: FeatureFlags = serde_json::from_str("{}").unwrap();
		assert!(snake.demo_mode && camel.demo_mode);
		assert!(!empty.demo_mode);
	}
}
