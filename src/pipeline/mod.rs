//! The media retrieval-and-delivery pipeline.
//!
//! URL extraction → allow-list validation → format policy → engine fetch →
//! classification → delivery. Each stage before delivery is a pure function;
//! the fetch stage talks to the extraction engine, and delivery talks to
//! Telegram.

/// Extension → delivery-kind classification
pub mod classify;
/// Delivery coordination for both direct and inline requests
pub mod deliver;
/// First-URL extraction from free text
pub mod extract;
/// Extraction-engine boundary
pub mod fetch;
/// Format-selection policy
pub mod format;
/// Supported-platform allow-list
pub mod validate;
