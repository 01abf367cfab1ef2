//! Image API integration tests.
//!
//! Run with: `cargo test -p picstash-api --test images_test`
//! Requires Docker for testcontainers (Postgres).

mod helpers;

use helpers::fixtures::{create_garbage_bytes, create_test_png, create_test_png_variant};
use helpers::{api_path, setup_test_app, setup_test_app_with, upload_form, upload_png};
use picstash_core::models::ImageStatus;
use serde_json::Value;
use std::time::Duration;

#[tokio::test]
async fn test_upload_matching_dimensions_is_stored_immediately() {
    let app = setup_test_app().await;

    let id = upload_png(&app, create_test_png(64, 64), "exact fit", 64, 64).await;

    // No resize needed, so the image is terminal without waiting on the queue.
    let image = app
        .state
        .db
        .image_repository
        .get_by_id(id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(image.status, ImageStatus::Stored);
    assert_eq!(image.processed_width, Some(64));
    assert_eq!(image.processed_height, Some(64));
    assert_eq!(image.processed_file_id, Some(image.original_file_id));

    let response = app.server.get(&api_path(&format!("/images/{}", id))).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["title"], "exact fit");
    assert_eq!(body["width"], 64);
    assert_eq!(body["height"], 64);
    assert!(body["url"].as_str().unwrap().starts_with("http://"));
}

#[tokio::test]
async fn test_get_processing_image_serves_original() {
    let app = setup_test_app().await;
    // Stop the worker pool so the image stays in processing for the read.
    app.queue.shutdown().await;

    let id = upload_png(&app, create_test_png(120, 60), "still working", 60, 30).await;

    // Until the resize lands, the DTO points at the original file and its
    // actual dimensions.
    let response = app.server.get(&api_path(&format!("/images/{}", id))).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["width"], 120);
    assert_eq!(body["height"], 60);

    let image = app
        .state
        .db
        .image_repository
        .get_by_id(id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(image.status, ImageStatus::Processing);
    let original = app
        .state
        .db
        .file_repository
        .get_by_id(image.original_file_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(body["url"], original.url.as_str());
}

#[tokio::test]
async fn test_upload_duplicate_bytes_reuses_file_row() {
    let app = setup_test_app().await;
    let data = create_test_png(32, 32);

    let first = upload_png(&app, data.clone(), "first copy", 32, 32).await;
    let second = upload_png(&app, data, "second copy", 32, 32).await;
    assert_ne!(first, second);

    let file_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(file_count, 1, "identical bytes must share one file row");

    // Distinct images, same underlying file.
    let a = app
        .state
        .db
        .image_repository
        .get_by_id(first)
        .await
        .unwrap()
        .unwrap();
    let b = app
        .state
        .db
        .image_repository
        .get_by_id(second)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(a.original_file_id, b.original_file_id);
}

#[tokio::test]
async fn test_upload_reuses_processed_variant() {
    let app = setup_test_app().await;
    let data = create_test_png(100, 50);

    let first = upload_png(&app, data.clone(), "needs resize", 50, 25).await;
    let first_image = helpers::wait_for_terminal_status(&app, first).await;
    assert_eq!(first_image.status, ImageStatus::Stored);

    // Same bytes at the same target size: the new image shares the finished
    // processed file and never touches the queue.
    let second = upload_png(&app, data, "same resize", 50, 25).await;
    let second_image = app
        .state
        .db
        .image_repository
        .get_by_id(second)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second_image.status, ImageStatus::Stored);
    assert_eq!(second_image.processed_file_id, first_image.processed_file_id);

    let task_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resize_tasks")
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(task_count, 1, "variant reuse must not enqueue a second task");
}

#[tokio::test]
async fn test_upload_rejects_blank_title() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post(&api_path("/images"))
        .multipart(upload_form(create_test_png(16, 16), "a.png", "   ", 16, 16))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_INPUT");
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn test_upload_rejects_out_of_range_dimensions() {
    let app = setup_test_app().await;

    for (width, height) in [(0, 100), (100, 0), (10_001, 100), (100, 10_001)] {
        let response = app
            .server
            .post(&api_path("/images"))
            .multipart(upload_form(
                create_test_png(16, 16),
                "a.png",
                "bad dims",
                width,
                height,
            ))
            .await;
        assert_eq!(
            response.status_code(),
            400,
            "dimensions {}x{} must be rejected",
            width,
            height
        );
    }
}

#[tokio::test]
async fn test_upload_rejects_non_integer_dimension() {
    let app = setup_test_app().await;

    let form = axum_test::multipart::MultipartForm::new()
        .add_part(
            "file",
            axum_test::multipart::Part::bytes(create_test_png(16, 16))
                .file_name("a.png")
                .mime_type("image/png"),
        )
        .add_text("title", "bad width")
        .add_text("width", "abc")
        .add_text("height", "16");
    let response = app.server.post(&api_path("/images")).multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_upload_rejects_missing_file_field() {
    let app = setup_test_app().await;

    let form = axum_test::multipart::MultipartForm::new()
        .add_text("title", "no file")
        .add_text("width", "16")
        .add_text("height", "16");
    let response = app.server.post(&api_path("/images")).multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_upload_rejects_undecodable_content() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post(&api_path("/images"))
        .multipart(upload_form(create_garbage_bytes(), "fake.png", "not an image", 16, 16))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_upload_rejects_recognized_but_unsupported_format() {
    let app = setup_test_app().await;

    // GIF is sniffable from its signature but outside the supported set.
    let response = app
        .server
        .post(&api_path("/images"))
        .multipart(upload_form(
            helpers::fixtures::create_gif_bytes(),
            "animation.png",
            "a gif in disguise",
            16,
            16,
        ))
        .await;

    assert_eq!(response.status_code(), 415);
    let body: Value = response.json();
    assert_eq!(body["error"], "UNSUPPORTED_MEDIA_TYPE");
}

#[tokio::test]
async fn test_upload_rejects_disallowed_declared_content_type() {
    let app = setup_test_app().await;

    let form = axum_test::multipart::MultipartForm::new()
        .add_part(
            "file",
            axum_test::multipart::Part::bytes(create_test_png(16, 16))
                .file_name("a.txt")
                .mime_type("text/plain"),
        )
        .add_text("title", "wrong type")
        .add_text("width", "16")
        .add_text("height", "16");
    let response = app.server.post(&api_path("/images")).multipart(form).await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_upload_rejects_format_outside_allowlist() {
    // Restrict the allowlist to JPEG only; a PNG then fails the sniffed
    // mime allowlist check even when declared as JPEG.
    let app = setup_test_app_with(|cfg| {
        cfg.allowed_content_types = vec!["image/jpeg".to_string()];
    })
    .await;

    let form = axum_test::multipart::MultipartForm::new()
        .add_part(
            "file",
            axum_test::multipart::Part::bytes(create_test_png(16, 16))
                .file_name("a.jpg")
                .mime_type("image/jpeg"),
        )
        .add_text("title", "sneaky png")
        .add_text("width", "16")
        .add_text("height", "16");
    let response = app.server.post(&api_path("/images")).multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_upload_rejects_oversized_file() {
    let app = setup_test_app_with(|cfg| {
        cfg.max_file_size_bytes = 100;
    })
    .await;

    let response = app
        .server
        .post(&api_path("/images"))
        .multipart(upload_form(create_test_png(64, 64), "big.png", "too big", 64, 64))
        .await;

    assert_eq!(response.status_code(), 413);
    let body: Value = response.json();
    assert_eq!(body["error"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_get_image_not_found() {
    let app = setup_test_app().await;

    let response = app
        .server
        .get(&api_path(&format!("/images/{}", uuid::Uuid::new_v4())))
        .await;

    assert_eq!(response.status_code(), 404);
    let body: Value = response.json();
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_get_image_malformed_id() {
    let app = setup_test_app().await;

    let response = app.server.get(&api_path("/images/not-a-uuid")).await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_list_images_pagination() {
    let app = setup_test_app().await;

    let mut ids = Vec::new();
    for i in 0..5u8 {
        let data = create_test_png_variant(24, 24, i);
        ids.push(upload_png(&app, data, &format!("image {}", i), 24, 24).await);
        // Distinct created_at values keep the cursor ordering unambiguous.
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let response = app.server.get(&api_path("/images?limit=2")).await;
    assert_eq!(response.status_code(), 200);
    let page: Value = response.json();
    let items = page["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    // Newest first.
    assert_eq!(items[0]["title"], "image 4");
    assert_eq!(items[1]["title"], "image 3");
    assert_eq!(page["hasNext"], true);
    assert_eq!(page["hasPrev"], false);
    let next_cursor = page["nextCursor"].as_str().unwrap().to_string();

    let response = app
        .server
        .get(&api_path(&format!(
            "/images?limit=2&cursor={}&direction=next",
            next_cursor
        )))
        .await;
    assert_eq!(response.status_code(), 200);
    let page2: Value = response.json();
    let items2 = page2["items"].as_array().unwrap();
    assert_eq!(items2.len(), 2);
    assert_eq!(items2[0]["title"], "image 2");
    assert_eq!(items2[1]["title"], "image 1");
    assert_eq!(page2["hasNext"], true);
    assert_eq!(page2["hasPrev"], true);

    // Walk back: the previous page relative to page 2's first row is page 1.
    let prev_cursor = page2["prevCursor"].as_str().unwrap();
    let response = app
        .server
        .get(&api_path(&format!(
            "/images?limit=2&cursor={}&direction=prev",
            prev_cursor
        )))
        .await;
    assert_eq!(response.status_code(), 200);
    let page1_again: Value = response.json();
    let items1 = page1_again["items"].as_array().unwrap();
    assert_eq!(items1.len(), 2);
    assert_eq!(items1[0]["title"], "image 4");
    assert_eq!(items1[1]["title"], "image 3");
}

#[tokio::test]
async fn test_list_images_last_page_has_no_next() {
    let app = setup_test_app().await;

    for i in 0..3u8 {
        let data = create_test_png_variant(24, 24, i);
        upload_png(&app, data, &format!("image {}", i), 24, 24).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let response = app.server.get(&api_path("/images?limit=2")).await;
    let page: Value = response.json();
    let next_cursor = page["nextCursor"].as_str().unwrap();

    let response = app
        .server
        .get(&api_path(&format!(
            "/images?limit=2&cursor={}&direction=next",
            next_cursor
        )))
        .await;
    let last_page: Value = response.json();
    assert_eq!(last_page["items"].as_array().unwrap().len(), 1);
    assert_eq!(last_page["hasNext"], false);
    assert_eq!(last_page["hasPrev"], true);
}

#[tokio::test]
async fn test_list_images_title_filter() {
    let app = setup_test_app().await;

    upload_png(&app, create_test_png_variant(24, 24, 1), "sunset beach", 24, 24).await;
    upload_png(&app, create_test_png_variant(24, 24, 2), "city night", 24, 24).await;

    let response = app.server.get(&api_path("/images?title=SUN")).await;
    assert_eq!(response.status_code(), 200);
    let page: Value = response.json();
    let items = page["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "sunset beach");
}

#[tokio::test]
async fn test_list_images_rejects_bad_direction() {
    let app = setup_test_app().await;

    let response = app
        .server
        .get(&api_path("/images?direction=backwards"))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_list_images_rejects_garbage_cursor() {
    let app = setup_test_app().await;

    let response = app
        .server
        .get(&api_path("/images?cursor=%%%not-base64%%%"))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_test_app().await;

    let response = app.server.get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "healthy");
    assert_eq!(body["storage"], "healthy");
}

#[tokio::test]
async fn test_openapi_spec_served() {
    let app = setup_test_app().await;

    let response = app.server.get("/api/openapi.json").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["info"]["title"], "Picstash API");
    assert!(body["paths"]["/api/images"].is_object());
}

#[tokio::test]
async fn test_request_id_header_echoed() {
    let app = setup_test_app().await;

    let response = app.server.get("/health").await;
    assert!(response.headers().contains_key("x-request-id"));

    let response = app
        .server
        .get("/health")
        .add_header("x-request-id", "my-custom-id")
        .await;
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "my-custom-id"
    );
}
