//! Database repositories for the data access layer
//!
//! Each repository owns one table and exposes the queries the service layer
//! needs. Conflict resolution for deduplicated files and the claim protocol
//! for the task queue live here rather than in the services, so every caller
//! gets the same concurrency behavior.

pub mod files;
pub mod images;
pub mod tasks;

pub use files::FileRepository;
pub use images::{ImageListPage, ImageListQuery, ImageRepository, ListDirection};
pub use tasks::{ResizeTaskRepository, TASK_NOTIFY_CHANNEL};
