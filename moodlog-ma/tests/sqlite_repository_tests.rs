//! Integration tests for the SQLite entry repository

mod helpers;

use helpers::db_utils::stored_status;
use helpers::{build_store, create_test_db, face_emotions, happy_mood, FakeEmotion, FakeSentiment};
use moodlog_common::{AnalysisStatus, Error};
use moodlog_ma::db::SqliteEntryRepository;
use moodlog_ma::models::{AnalysisPayload, EmotionData, EntryKind, MediaRef, Modality, NewEntry};
use moodlog_ma::types::EntryRepository;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_created_entries_round_trip() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let repo = SqliteEntryRepository::new(pool, Some("alice".to_string()));

    let text = repo.create(NewEntry::text("Evening notes").unwrap()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let video = repo
        .create(
            NewEntry::video(
                MediaRef::new("https://cdn.example/v.mp4").with_thumbnail("https://cdn.example/v.jpg"),
                93.5,
            )
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(text.status, AnalysisStatus::Pending);
    assert_eq!(text.owner_id, "alice");

    let listed = repo.list().await.unwrap();
    assert_eq!(listed, vec![video.clone(), text.clone()], "newest first, unchanged");

    match &listed[0].kind {
        EntryKind::Video(body) => {
            assert_eq!(body.thumbnail_url.as_deref(), Some("https://cdn.example/v.jpg"));
            assert_eq!(body.duration, 93.5);
        }
        other => panic!("expected video, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_analysis_persists_payloads() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let repo = SqliteEntryRepository::new(pool.clone(), Some("alice".to_string()));

    let text = repo.create(NewEntry::text("Calm").unwrap()).await.unwrap();
    let video = repo
        .create(NewEntry::video(MediaRef::new("https://cdn.example/v.mp4"), 10.0).unwrap())
        .await
        .unwrap();

    let mood = AnalysisPayload::Mood(happy_mood());
    let mut data = EmotionData::new();
    data.insert(Modality::Face, face_emotions());
    let emotion = AnalysisPayload::Emotion(data);

    repo.update_analysis(text.id, Some(&mood), AnalysisStatus::Success)
        .await
        .unwrap();
    repo.update_analysis(video.id, Some(&emotion), AnalysisStatus::Success)
        .await
        .unwrap();

    let listed = repo.list().await.unwrap();
    let find = |id| listed.iter().find(|e| e.id == id).unwrap();
    assert_eq!(find(text.id).payload(), Some(mood));
    assert_eq!(find(video.id).payload(), Some(emotion));
    assert_eq!(stored_status(&pool, text.id).await.unwrap(), "SUCCESS");
}

#[tokio::test]
async fn test_update_job_only_touches_video_entries() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let repo = SqliteEntryRepository::new(pool, Some("alice".to_string()));

    let text = repo.create(NewEntry::text("words").unwrap()).await.unwrap();
    let video = repo
        .create(NewEntry::video(MediaRef::new("https://cdn.example/v.mp4"), 1.0).unwrap())
        .await
        .unwrap();

    repo.update_job(video.id, Some("job-9")).await.unwrap();
    assert!(matches!(
        repo.update_job(text.id, Some("job-9")).await,
        Err(Error::NotFound(_))
    ));

    let listed = repo.list().await.unwrap();
    let video = listed.iter().find(|e| e.id == video.id).unwrap();
    assert_eq!(video.job_id(), Some("job-9"));

    repo.update_job(video.id, None).await.unwrap();
    let listed = repo.list().await.unwrap();
    assert_eq!(listed.iter().find(|e| e.id == video.id).unwrap().job_id(), None);
}

#[tokio::test]
async fn test_entries_are_scoped_to_owner() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let alice = SqliteEntryRepository::new(pool.clone(), Some("alice".to_string()));
    let bob = SqliteEntryRepository::new(pool, Some("bob".to_string()));

    let entry = alice.create(NewEntry::text("private").unwrap()).await.unwrap();

    assert!(bob.list().await.unwrap().is_empty());
    assert!(matches!(bob.delete(entry.id).await, Err(Error::NotFound(_))));
    assert!(matches!(
        bob.update_analysis(entry.id, None, AnalysisStatus::Error).await,
        Err(Error::NotFound(_))
    ));

    alice.delete(entry.id).await.unwrap();
    assert!(alice.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_principal_is_auth_error() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let repo = SqliteEntryRepository::new(pool, None);

    assert!(matches!(
        repo.create(NewEntry::text("anon").unwrap()).await,
        Err(Error::Auth(_))
    ));
    assert!(matches!(repo.list().await, Err(Error::Auth(_))));
}

#[tokio::test]
async fn test_store_results_survive_reload() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let repo = Arc::new(SqliteEntryRepository::new(pool.clone(), Some("alice".to_string())));
    let emotion = Arc::new(FakeEmotion::new());

    let store = build_store(repo.clone(), Arc::new(FakeSentiment::new()), emotion.clone());
    let text = store.create_text("Persisted mood").await.unwrap();
    let video = store
        .create_video(MediaRef::new("https://cdn.example/v.mp4"), 12.0)
        .await
        .unwrap();
    store.wait_idle().await;

    let reloaded = build_store(repo, Arc::new(FakeSentiment::new()), emotion);
    reloaded.refresh().await.unwrap();

    let text = reloaded.get(text.id).await.unwrap();
    assert_eq!(text.status, AnalysisStatus::Success);
    assert_eq!(text.payload(), Some(AnalysisPayload::Mood(happy_mood())));

    let video = reloaded.get(video.id).await.unwrap();
    assert_eq!(video.status, AnalysisStatus::Loading);
    assert_eq!(video.job_id(), Some("job-1"));
}
