// Deckwise client application library.
//
// Re-exports the app loop, configuration, the front end and the message
// types so integration tests can drive the whole system.

pub mod app;
pub mod config;
pub mod frontend;
pub mod protocol;
