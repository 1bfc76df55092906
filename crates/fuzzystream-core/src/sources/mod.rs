//! Temperature sensor implementations.

pub mod helpers;

pub mod external_tool;
pub mod thermal_zone;

pub use external_tool::ExternalToolSensor;
pub use thermal_zone::FilesystemSensor;
