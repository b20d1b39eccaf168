pub mod baseline;
pub mod discovery;
pub mod experiments;
pub mod layers;
pub mod queue_health;
pub mod recommendations;
pub mod scoring;
pub mod stats;
pub mod telemetry;
pub mod validate;
