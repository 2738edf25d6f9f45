pub mod app;
pub mod encoding;
pub mod locator;
pub mod logging;
pub mod resources;
