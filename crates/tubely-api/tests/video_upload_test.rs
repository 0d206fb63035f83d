mod helpers;

use axum_test::multipart::{MultipartForm, Part};
use helpers::{setup_test_app, setup_test_app_with, FakeProber, TestOptions, TEST_BUCKET};
use std::sync::Arc;
use tubely_core::models::AssetRecord;
use uuid::Uuid;

const MP4_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42fake-video-payload";

fn video_form(bytes: &[u8], mime_type: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "video",
        Part::bytes(bytes.to_vec())
            .file_name("boots.mp4")
            .mime_type(mime_type),
    )
}

fn signed_prefix(aspect: &str) -> String {
    format!("https://{}.example.test/{}/", TEST_BUCKET, aspect)
}

#[tokio::test]
async fn test_upload_video_stores_object_and_returns_signed_url() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    let response = app
        .client()
        .post(&format!("/api/video_upload/{}", video.id))
        .add_header("Authorization", app.bearer(owner))
        .multipart(video_form(MP4_BYTES, "video/mp4"))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: AssetRecord = response.json();
    let signed = body.video_url.unwrap();
    assert!(signed.starts_with(&signed_prefix("landscape")));
    assert!(signed.ends_with(".mp4?expires=900"));

    // The record keeps the bucket,key reference, never the signed URL
    let stored = app.repository.snapshot(video.id).unwrap();
    let reference = stored.video_url.unwrap();
    let key = reference
        .strip_prefix(&format!("{},", TEST_BUCKET))
        .unwrap();
    let (aspect, file) = key.split_once('/').unwrap();
    assert_eq!(aspect, "landscape");
    assert_eq!(file.len(), 64 + ".mp4".len());
    assert!(file[..64].chars().all(|c| c.is_ascii_hexdigit()));

    let (content_type, bytes) = app.storage.object(&reference).unwrap();
    assert_eq!(content_type, "video/mp4");
    assert_eq!(bytes, MP4_BYTES);

    assert_eq!(app.scratch_entries(), 0);
}

#[tokio::test]
async fn test_upload_video_classifies_portrait_and_other() {
    for (width, height, aspect) in [(1080, 1920, "portrait"), (1000, 1000, "other")] {
        let app = setup_test_app_with(TestOptions {
            prober: Arc::new(FakeProber::dimensions(width, height)),
            ..Default::default()
        })
        .await;
        let owner = Uuid::new_v4();
        let video = app.create_video(owner).await;

        let body: AssetRecord = app
            .client()
            .post(&format!("/api/video_upload/{}", video.id))
            .add_header("Authorization", app.bearer(owner))
            .multipart(video_form(MP4_BYTES, "video/mp4"))
            .await
            .json();

        assert!(body.video_url.unwrap().starts_with(&signed_prefix(aspect)));
    }
}

#[tokio::test]
async fn test_upload_video_rejects_non_mp4() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    let response = app
        .client()
        .post(&format!("/api/video_upload/{}", video.id))
        .add_header("Authorization", app.bearer(owner))
        .multipart(video_form(MP4_BYTES, "video/quicktime"))
        .await;

    assert_eq!(response.status_code(), 400);
    assert_eq!(app.storage.len(), 0);
    assert_eq!(app.repository.snapshot(video.id).unwrap(), video);
}

#[tokio::test]
async fn test_upload_video_without_streams() {
    let app = setup_test_app_with(TestOptions {
        prober: Arc::new(FakeProber::without_streams()),
        ..Default::default()
    })
    .await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    let response = app
        .client()
        .post(&format!("/api/video_upload/{}", video.id))
        .add_header("Authorization", app.bearer(owner))
        .multipart(video_form(MP4_BYTES, "video/mp4"))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NO_STREAMS");
    assert_eq!(app.storage.len(), 0);
    assert_eq!(app.scratch_entries(), 0);
}

#[tokio::test]
async fn test_upload_video_too_large() {
    let app = setup_test_app_with(TestOptions {
        max_video_bytes: 32,
        ..Default::default()
    })
    .await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    let response = app
        .client()
        .post(&format!("/api/video_upload/{}", video.id))
        .add_header("Authorization", app.bearer(owner))
        .multipart(video_form(&[0u8; 33], "video/mp4"))
        .await;

    assert_eq!(response.status_code(), 413);
    assert_eq!(app.storage.len(), 0);
    assert_eq!(app.repository.snapshot(video.id).unwrap(), video);
    assert_eq!(app.scratch_entries(), 0);
}

#[tokio::test]
async fn test_upload_video_forbidden_for_non_owner() {
    let app = setup_test_app().await;
    let video = app.create_video(Uuid::new_v4()).await;

    let response = app
        .client()
        .post(&format!("/api/video_upload/{}", video.id))
        .add_header("Authorization", app.bearer(Uuid::new_v4()))
        .multipart(video_form(MP4_BYTES, "video/mp4"))
        .await;

    assert_eq!(response.status_code(), 403);
    assert_eq!(app.storage.len(), 0);
}

#[tokio::test]
async fn test_oversized_upload_from_non_owner_fails_on_ownership() {
    let app = setup_test_app_with(TestOptions {
        max_video_bytes: 32,
        ..Default::default()
    })
    .await;
    let video = app.create_video(Uuid::new_v4()).await;

    let response = app
        .client()
        .post(&format!("/api/video_upload/{}", video.id))
        .add_header("Authorization", app.bearer(Uuid::new_v4()))
        .multipart(video_form(&vec![0u8; 4 * 1024 * 1024], "video/mp4"))
        .await;

    assert_eq!(response.status_code(), 403);
    assert_eq!(app.repository.snapshot(video.id).unwrap(), video);
    assert_eq!(app.storage.len(), 0);
    assert_eq!(app.scratch_entries(), 0);
}

#[tokio::test]
async fn test_upload_video_keeps_declared_content_type() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    let response = app
        .client()
        .post(&format!("/api/video_upload/{}", video.id))
        .add_header("Authorization", app.bearer(owner))
        .multipart(video_form(MP4_BYTES, "video/mp4; codecs=avc1"))
        .await;

    assert_eq!(response.status_code(), 200);
    let reference = app
        .repository
        .snapshot(video.id)
        .unwrap()
        .video_url
        .unwrap();
    let (content_type, _) = app.storage.object(&reference).unwrap();
    assert_eq!(content_type, "video/mp4; codecs=avc1");
}

#[tokio::test]
async fn test_upload_video_keeps_existing_thumbnail() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    let thumbnail: AssetRecord = app
        .client()
        .post(&format!("/api/thumbnail_upload/{}", video.id))
        .add_header("Authorization", app.bearer(owner))
        .multipart(MultipartForm::new().add_part(
            "thumbnail",
            Part::bytes(b"png".to_vec())
                .file_name("t.png")
                .mime_type("image/png"),
        ))
        .await
        .json();

    let uploaded: AssetRecord = app
        .client()
        .post(&format!("/api/video_upload/{}", video.id))
        .add_header("Authorization", app.bearer(owner))
        .multipart(video_form(MP4_BYTES, "video/mp4"))
        .await
        .json();

    assert_eq!(uploaded.thumbnail_url, thumbnail.thumbnail_url);
    assert!(uploaded.video_url.is_some());
}

#[tokio::test]
async fn test_get_video_signs_on_read() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    app.client()
        .post(&format!("/api/video_upload/{}", video.id))
        .add_header("Authorization", app.bearer(owner))
        .multipart(video_form(MP4_BYTES, "video/mp4"))
        .await;

    let response = app
        .client()
        .get(&format!("/api/videos/{}", video.id))
        .add_header("Authorization", app.bearer(owner))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: AssetRecord = response.json();
    assert!(body
        .video_url
        .unwrap()
        .starts_with(&signed_prefix("landscape")));
}

#[tokio::test]
async fn test_get_video_not_found_and_unauthorized() {
    let app = setup_test_app().await;
    let user = Uuid::new_v4();

    let response = app
        .client()
        .get(&format!("/api/videos/{}", Uuid::new_v4()))
        .add_header("Authorization", app.bearer(user))
        .await;
    assert_eq!(response.status_code(), 404);

    let response = app
        .client()
        .get(&format!("/api/videos/{}", Uuid::new_v4()))
        .await;
    assert_eq!(response.status_code(), 401);
}

/// Runs the real ffprobe and ffmpeg against a generated clip.
#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe on PATH"]
async fn test_upload_video_with_real_media_tools() {
    use tubely_processing::{FfmpegRemuxer, FfprobeProber};

    let source_dir = tempfile::tempdir().unwrap();
    let source = source_dir.path().join("clip.mp4");
    let status = std::process::Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-f",
            "lavfi",
            "-i",
            "testsrc=size=1280x720:duration=1",
            "-pix_fmt",
            "yuv420p",
        ])
        .arg(&source)
        .status()
        .unwrap();
    assert!(status.success());
    let clip = std::fs::read(&source).unwrap();

    let app = setup_test_app_with(TestOptions {
        prober: Arc::new(FfprobeProber::new("ffprobe").unwrap()),
        remuxer: Arc::new(FfmpegRemuxer::new("ffmpeg").unwrap()),
        max_video_bytes: 64 * 1024 * 1024,
        ..Default::default()
    })
    .await;
    let owner = Uuid::new_v4();
    let video = app.create_video(owner).await;

    let response = app
        .client()
        .post(&format!("/api/video_upload/{}", video.id))
        .add_header("Authorization", app.bearer(owner))
        .multipart(video_form(&clip, "video/mp4"))
        .await;

    assert_eq!(response.status_code(), 200);
    let reference = app
        .repository
        .snapshot(video.id)
        .unwrap()
        .video_url
        .unwrap();
    assert!(reference.starts_with(&format!("{},landscape/", TEST_BUCKET)));

    // Fast start puts the moov box ahead of mdat
    let (_, stored) = app.storage.object(&reference).unwrap();
    let moov = stored.windows(4).position(|w| w == b"moov").unwrap();
    let mdat = stored.windows(4).position(|w| w == b"mdat").unwrap();
    assert!(moov < mdat);
    assert_eq!(app.scratch_entries(), 0);
}
