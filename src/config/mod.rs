pub mod loader;
pub mod models;
pub mod robots;
pub mod validation;

pub use loader::load_config;
pub use models::*;
pub use robots::{RobotsConfig, RobotsConfigBuilder, RobotsOption, SpecProducer};
pub use validation::{ServerConfigValidator, UnrecognizedKey, ValidationError, ValidationResult};
