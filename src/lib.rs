pub mod logging;
pub mod overlay;
pub mod platform;
pub mod settings;
pub mod shell;
