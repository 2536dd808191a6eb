// Presentation layer - HTTP surface for inbound events
pub mod app_state;
pub mod handlers;
