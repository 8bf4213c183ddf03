/// Update handlers for messages, inline queries and callbacks
pub mod handlers;
/// Settings UI: text, keyboard and callback actions
pub mod settings;
