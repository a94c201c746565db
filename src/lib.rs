pub mod aggregate;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod graph;
pub mod loader;
pub mod model;
pub mod panels;
pub mod store;
