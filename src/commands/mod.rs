pub mod brief;
pub mod catalog;
pub mod experiments;
pub mod github;
pub mod recommendations;
pub mod rollups;
pub mod settings;
pub mod store;
pub mod targets;
