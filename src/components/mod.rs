pub mod force_graph;
pub mod navigation;
pub mod viewer;
