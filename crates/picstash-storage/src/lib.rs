//! Picstash Storage Library
//!
//! This crate provides storage abstraction and implementations for Picstash.
//! It includes the Storage trait and implementations for the local filesystem
//! and S3.
//!
//! # Storage key format
//!
//! Storage keys are content-addressed: `media/{checksum}{ext}`, where the
//! extension follows from the mime type. Identical bytes always land on the
//! same key, so a duplicate upload racing the first one rewrites the same
//! content instead of creating a second copy.
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so all backends and callers stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::storage_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use picstash_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
