// smartmarks services
// Collaborators of the synchronization store and process-wide infrastructure.

pub mod auth;
pub mod backing_store;
pub mod change_feed;
pub mod logging;
pub mod settings_engine;
