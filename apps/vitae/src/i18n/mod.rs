// Localized messages backed by the bundled Fluent catalog.
// The catalog is created once at startup; a `Messages` resolver is loaded once per render.

pub mod args;
pub mod bundle;
pub mod catalog;
pub mod messages;
pub mod negotiate;

pub use args::MessageArgs;
pub use catalog::MessageCatalog;
pub use messages::{Messages, MessagesError};
