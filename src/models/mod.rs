pub mod baseline;
pub mod catalog;
pub mod experiment;
pub mod queue;
pub mod recommendation;
pub mod settings;
pub mod target;
pub mod telemetry;
