// Presentation layer - HTTP surface consumed by the rendering front end
pub mod app_state;
pub mod handlers;
