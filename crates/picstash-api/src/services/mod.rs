//! Domain services: content-addressed blob storage, upload orchestration,
//! image queries, and the in-memory notification hub.

pub mod content;
pub mod images;
pub mod notifier;
pub mod upload;

pub use content::ContentStore;
pub use images::{ImageDto, ImagePage, ImageQueryService, ListImagesParams};
pub use notifier::ImageNotifier;
pub use upload::{UploadRequest, UploadService};
