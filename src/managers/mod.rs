// smartmarks state managers
// Managers own in-memory state: the per-user bookmark collection, its sync worker, and on-screen notifications.

pub mod bookmark_collection;
pub mod bookmark_sync;
pub mod notification_center;
