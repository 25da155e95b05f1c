use mockito::Matcher;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

use submint::config::ServiceConfig;
use submint::error::SubmintError;
use submint::language::Language;
use submint::service::HttpProcessingClient;
use submint::session::{SubmitOutcome, UploadStatus};
use submint::video::VideoFile;
use submint::workflow::Studio;

fn client(server: &mockito::Server) -> Arc<HttpProcessingClient> {
    Arc::new(
        HttpProcessingClient::new(&ServiceConfig {
            base_url: server.url(),
            chunk_size: 1024 * 1024,
            request_timeout_secs: Some(30),
        })
        .unwrap(),
    )
}

async fn mock_track(server: &mut mockito::Server, file: &str, body: &str) -> mockito::Mock {
    server
        .mock("GET", format!("/api/download/p1/{}", file).as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("stream".into(), "true".into()),
            Matcher::UrlEncoded("format".into(), "vtt".into()),
        ]))
        .with_header("content-type", "text/vtt")
        .with_body(body)
        .create_async()
        .await
}

#[tokio::test]
async fn test_upload_resolve_and_write_playback() {
    let mut server = mockito::Server::new_async().await;
    let upload = server
        .mock("POST", "/api/process-video")
        .match_body(Matcher::Regex("french".to_string()))
        .with_header("content-type", "application/json")
        .with_body(r#"{"process_id":"p1","original_srt":"o.srt","translations":{"french":"f.srt"}}"#)
        .expect(1)
        .create_async()
        .await;
    let _t = mock_track(&mut server, "o.srt", "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nHello\n").await;
    let _t = mock_track(&mut server, "f.srt", "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nBonjour\n").await;
    let mut studio = Studio::new(&server.url(), client(&server), None);
    studio
        .select_file(VideoFile::new("movie.mp4", "video/mp4", vec![42u8; 10 * 1024 * 1024]))
        .unwrap();
    studio.toggle_language(Language::French);

    let mut progress = Vec::new();
    let outcome = assert_ok!(studio.submit_with_progress(|p| progress.push(p)).await);
    upload.assert_async().await;

    let SubmitOutcome::Completed(references) = outcome else {
        panic!("expected completed outcome");
    };
    assert_eq!(references.len(), 2);
    assert_eq!(references[0].language, "Original");
    assert!(references[0].remote_url.ends_with("/api/download/p1/o.srt"));
    assert_eq!(references[1].language, "French");
    assert!(references[1].remote_url.ends_with("/api/download/p1/f.srt"));

    assert_eq!(studio.session().lock().status(), UploadStatus::Succeeded);
    assert_eq!(progress.last(), Some(&100));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));

    let dir = tempfile::tempdir().unwrap();
    let manifest = assert_ok!(studio.write_playback(dir.path()).await);
    assert!(manifest.exists());
    let french = std::fs::read_to_string(dir.path().join("french.vtt")).unwrap();
    assert!(french.contains("Bonjour"));

    studio.close_playback();
    assert_eq!(studio.registry().live_count(), 1);
}

#[tokio::test]
async fn test_failed_track_is_omitted_from_playback() {
    let mut server = mockito::Server::new_async().await;
    let _upload = server
        .mock("POST", "/api/process-video")
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"process_id":"p1","original_srt":"o.srt","translations":{"french":"f.srt","german":"g.srt","spanish":"Translation failed: quota"}}"#,
        )
        .create_async()
        .await;
    let _t = mock_track(&mut server, "o.srt", "WEBVTT\n").await;
    let _t = mock_track(&mut server, "g.srt", "WEBVTT\n").await;
    let _missing = server
        .mock("GET", "/api/download/p1/f.srt")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":"File not found"}"#)
        .create_async()
        .await;

    let mut studio = Studio::new(&server.url(), client(&server), None);
    studio
        .select_file(VideoFile::new("movie.mp4", "video/mp4", vec![1u8; 2048]))
        .unwrap();
    for language in Language::ALL {
        studio.toggle_language(language);
    }

    let outcome = assert_ok!(studio.submit().await);
    let SubmitOutcome::Completed(references) = outcome else {
        panic!("expected completed outcome");
    };
    let labels: Vec<&str> = references.iter().map(|r| r.language.as_str()).collect();
    assert_eq!(labels, vec!["Original", "French", "German"]);

    let playback = studio.playback().unwrap();
    let tracks: Vec<&str> = playback.tracks.iter().map(|t| t.label.as_str()).collect();
    assert_eq!(tracks, vec!["Original", "German"]);
    assert_eq!(playback.default_track().unwrap().label, "Original");

    let notes = studio.session().lock().take_notifications();
    let messages: Vec<&str> = notes.iter().map(|n| n.message.as_str()).collect();
    assert_eq!(
        messages,
        vec!["Video processed successfully!", "1 of 3 subtitle tracks failed to load"]
    );
}

#[tokio::test]
async fn test_server_error_marks_session_failed() {
    let mut server = mockito::Server::new_async().await;
    let _upload = server
        .mock("POST", "/api/process-video")
        .with_status(500)
        .with_body(r#"{"error":"transcription backend offline"}"#)
        .create_async()
        .await;

    let mut studio = Studio::new(&server.url(), client(&server), None);
    studio
        .select_file(VideoFile::new("movie.mp4", "video/mp4", vec![1u8; 512]))
        .unwrap();
    studio.toggle_language(Language::German);

    let err = assert_err!(studio.submit().await);
    assert!(matches!(err, SubmintError::Transport(_)));
    assert_eq!(studio.session().lock().status(), UploadStatus::Failed);
    assert!(studio.playback().is_none());
}

#[tokio::test]
async fn test_downloads_do_not_depend_on_playback() {
    let mut server = mockito::Server::new_async().await;
    let _upload = server
        .mock("POST", "/api/process-video")
        .with_header("content-type", "application/json")
        .with_body(r#"{"process_id":"p1","original_srt":"o.srt","translations":{"german":"g.srt"}}"#)
        .create_async()
        .await;
    // SRT downloads only: every playback fetch gets non-text content and is dropped
    let mut downloads = Vec::new();
    for (file, body) in [("o.srt", "Hello"), ("g.srt", "Hallo")] {
        let mock = server
            .mock("GET", format!("/api/download/p1/{}", file).as_str())
            .match_query(Matcher::Any)
            .with_header("content-type", "application/x-subrip")
            .with_body(format!("1\n00:00:00,000 --> 00:00:01,000\n{}\n", body))
            .create_async()
            .await;
        downloads.push(mock);
    }

    let mut studio = Studio::new(&server.url(), client(&server), None);
    studio
        .select_file(VideoFile::new("movie.mp4", "video/mp4", vec![1u8; 512]))
        .unwrap();
    studio.toggle_language(Language::German);
    assert_ok!(studio.submit().await);
    assert!(studio.playback().unwrap().is_empty());

    let dir = tempfile::tempdir().unwrap();
    let saved = assert_ok!(studio.save_subtitles(dir.path()).await);
    assert_eq!(saved.len(), 2);
    let german = std::fs::read_to_string(dir.path().join("subtitles_german.srt")).unwrap();
    assert!(german.contains("Hallo"));
    assert!(dir.path().join("subtitles_original.srt").exists());
}
