//! Picstash Database Library
//!
//! Repositories for the persistent tables: content-addressed file records,
//! image resources, and the durable resize task queue. Status strings are
//! mapped to the core sum types at this boundary, so callers never see raw
//! text columns.

pub mod db;

pub use db::{
    FileRepository, ImageListPage, ImageListQuery, ImageRepository, ListDirection,
    ResizeTaskRepository, TASK_NOTIFY_CHANNEL,
};
