//! Repository for image resources.

use chrono::{DateTime, Utc};
use picstash_core::models::{
    Image, ImageDetails, ImageStatus, NewProcessingImage, NewStoredImage,
};
use picstash_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::files::FileRepository;

const IMAGE_COLUMNS: &str = "id, title, original_width, original_height, processed_width, \
     processed_height, original_file_id, processed_file_id, status, created_at, updated_at";

/// Traversal direction for cursor pagination. The page content is always
/// returned newest first regardless of direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListDirection {
    #[default]
    Next,
    Prev,
}

/// Validated list parameters. `cursor` is the `created_at` of the row the
/// client is paging from; rows strictly older (`Next`) or strictly newer
/// (`Prev`) than it are returned.
#[derive(Debug, Clone)]
pub struct ImageListQuery {
    pub title: Option<String>,
    pub cursor: Option<DateTime<Utc>>,
    pub direction: ListDirection,
    pub limit: i64,
}

/// One page of joined image rows. `has_more` reports whether further rows
/// exist past this page in the traversal direction; the repository probes
/// with `limit + 1` and truncates.
#[derive(Debug)]
pub struct ImageListPage {
    pub items: Vec<ImageDetails>,
    pub has_more: bool,
}

/// Repository for the `images` table.
///
/// Status transitions are guarded in SQL: an image leaves `processing` at
/// most once, so a redelivered resize result can never overwrite a terminal
/// state.
#[derive(Clone)]
pub struct ImageRepository {
    pool: PgPool,
    files: FileRepository,
}

impl ImageRepository {
    pub fn new(pool: PgPool) -> Self {
        let files = FileRepository::new(pool.clone());
        Self { pool, files }
    }

    /// Insert an image that is complete at creation time, either because the
    /// original already matches the requested dimensions or because an
    /// existing processed file is being reused.
    #[tracing::instrument(skip(self, image), fields(db.table = "images", db.operation = "insert", title = %image.title))]
    pub async fn create_stored(&self, image: NewStoredImage) -> Result<Image, AppError> {
        let record = sqlx::query_as::<Postgres, Image>(&format!(
            r#"
            INSERT INTO images (title, original_width, original_height, processed_width,
                                processed_height, original_file_id, processed_file_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {IMAGE_COLUMNS}
            "#,
        ))
        .bind(&image.title)
        .bind(image.original_width)
        .bind(image.original_height)
        .bind(image.processed_width)
        .bind(image.processed_height)
        .bind(image.original_file_id)
        .bind(image.processed_file_id)
        .bind(ImageStatus::Stored)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(image_id = %record.id, "Image created as stored");
        Ok(record)
    }

    /// Insert an image awaiting asynchronous resize.
    #[tracing::instrument(skip(self, image), fields(db.table = "images", db.operation = "insert", title = %image.title))]
    pub async fn create_processing(&self, image: NewProcessingImage) -> Result<Image, AppError> {
        let record = sqlx::query_as::<Postgres, Image>(&format!(
            r#"
            INSERT INTO images (title, original_width, original_height, original_file_id, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {IMAGE_COLUMNS}
            "#,
        ))
        .bind(&image.title)
        .bind(image.original_width)
        .bind(image.original_height)
        .bind(image.original_file_id)
        .bind(ImageStatus::Processing)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(image_id = %record.id, "Image created as processing");
        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select", db.record_id = %image_id))]
    pub async fn get_by_id(&self, image_id: Uuid) -> Result<Option<Image>, AppError> {
        let record = sqlx::query_as::<Postgres, Image>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images WHERE id = $1",
        ))
        .bind(image_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Fetch an image joined with its file rows.
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select", db.record_id = %image_id))]
    pub async fn get_details(&self, image_id: Uuid) -> Result<Option<ImageDetails>, AppError> {
        let Some(image) = self.get_by_id(image_id).await? else {
            return Ok(None);
        };

        let mut details = self.attach_files(vec![image]).await?;
        Ok(details.pop())
    }

    /// Look for a finished image that already holds the requested variant of
    /// the given original, so a repeat upload can reuse its processed file
    /// instead of resizing again.
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    pub async fn find_stored_variant(
        &self,
        original_file_id: Uuid,
        width: i32,
        height: i32,
    ) -> Result<Option<Image>, AppError> {
        let record = sqlx::query_as::<Postgres, Image>(&format!(
            r#"
            SELECT {IMAGE_COLUMNS}
            FROM images
            WHERE original_file_id = $1
              AND processed_width = $2
              AND processed_height = $3
              AND status = $4
              AND processed_file_id IS NOT NULL
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        ))
        .bind(original_file_id)
        .bind(width)
        .bind(height)
        .bind(ImageStatus::Stored)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Transition a processing image to `stored` with its processed artifact.
    /// Returns `None` when the image is no longer in `processing`, in which
    /// case the caller must not publish a completion event.
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "update", db.record_id = %image_id))]
    pub async fn mark_stored(
        &self,
        image_id: Uuid,
        processed_file_id: Uuid,
        width: i32,
        height: i32,
    ) -> Result<Option<Image>, AppError> {
        let record = sqlx::query_as::<Postgres, Image>(&format!(
            r#"
            UPDATE images
            SET status = $2, processed_file_id = $3, processed_width = $4,
                processed_height = $5, updated_at = NOW()
            WHERE id = $1 AND status = $6
            RETURNING {IMAGE_COLUMNS}
            "#,
        ))
        .bind(image_id)
        .bind(ImageStatus::Stored)
        .bind(processed_file_id)
        .bind(width)
        .bind(height)
        .bind(ImageStatus::Processing)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Transition a processing image to `failed`. Returns `None` when the
    /// image already reached a terminal state.
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "update", db.record_id = %image_id))]
    pub async fn mark_failed(&self, image_id: Uuid) -> Result<Option<Image>, AppError> {
        let record = sqlx::query_as::<Postgres, Image>(&format!(
            r#"
            UPDATE images
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING {IMAGE_COLUMNS}
            "#,
        ))
        .bind(image_id)
        .bind(ImageStatus::Failed)
        .bind(ImageStatus::Processing)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Cursor-paginated listing with optional case-insensitive title search.
    /// Fetches one row past the limit to detect whether more pages exist.
    #[tracing::instrument(skip(self, query), fields(db.table = "images", db.operation = "select", limit = query.limit))]
    pub async fn list(&self, query: ImageListQuery) -> Result<ImageListPage, AppError> {
        let mut sql = format!("SELECT {IMAGE_COLUMNS} FROM images WHERE 1=1");
        let mut param_count = 0;

        if query.title.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND title ILIKE ${}", param_count));
        }

        if query.cursor.is_some() {
            param_count += 1;
            match query.direction {
                ListDirection::Next => {
                    sql.push_str(&format!(" AND created_at < ${}", param_count))
                }
                ListDirection::Prev => {
                    sql.push_str(&format!(" AND created_at > ${}", param_count))
                }
            }
        }

        match query.direction {
            ListDirection::Next => sql.push_str(" ORDER BY created_at DESC"),
            ListDirection::Prev => sql.push_str(" ORDER BY created_at ASC"),
        }

        param_count += 1;
        sql.push_str(&format!(" LIMIT ${}", param_count));

        let mut db_query = sqlx::query_as::<Postgres, Image>(&sql);

        if let Some(title) = &query.title {
            db_query = db_query.bind(format!("%{}%", title));
        }
        if let Some(cursor) = query.cursor {
            db_query = db_query.bind(cursor);
        }
        db_query = db_query.bind(query.limit + 1);

        let mut records = db_query.fetch_all(&self.pool).await?;

        let has_more = records.len() as i64 > query.limit;
        if has_more {
            records.truncate(query.limit as usize);
        }
        if query.direction == ListDirection::Prev {
            // The backward query runs oldest first; flip back to display order.
            records.reverse();
        }

        let items = self.attach_files(records).await?;
        Ok(ImageListPage { items, has_more })
    }

    /// Resolve the file rows for a batch of images in one query.
    async fn attach_files(&self, images: Vec<Image>) -> Result<Vec<ImageDetails>, AppError> {
        let mut file_ids: Vec<Uuid> = Vec::with_capacity(images.len() * 2);
        for image in &images {
            file_ids.push(image.original_file_id);
            if let Some(file_id) = image.processed_file_id {
                file_ids.push(file_id);
            }
        }

        let files = self.files.get_by_ids(&file_ids).await?;

        images
            .into_iter()
            .map(|image| {
                let original_file =
                    files.get(&image.original_file_id).cloned().ok_or_else(|| {
                        AppError::Internal(format!(
                            "image {} references missing original file {}",
                            image.id, image.original_file_id
                        ))
                    })?;
                let processed_file = match image.processed_file_id {
                    Some(file_id) => {
                        Some(files.get(&file_id).cloned().ok_or_else(|| {
                            AppError::Internal(format!(
                                "image {} references missing processed file {}",
                                image.id, file_id
                            ))
                        })?)
                    }
                    None => None,
                };
                Ok(ImageDetails {
                    image,
                    original_file,
                    processed_file,
                })
            })
            .collect()
    }
}
