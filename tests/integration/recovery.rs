use std::time::Duration;

use assert_matches::assert_matches;
use jukebox::commands::music::utils::guild_session::PlaybackState;
use jukebox::commands::music::utils::music_manager::MusicError;
use jukebox::commands::music::utils::session_actor::{EnqueueOutcome, JoinOutcome};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::fixtures::{guild, other_guild, other_voice_channel, text_channel, track, voice_channel};
use crate::common::{Harness, harness, wait};

#[rstest]
#[tokio::test(start_paused = true)]
async fn crashed_session_is_replaced_and_isolated(harness: Harness) {
    harness.sink.panic_on("boom");

    let neighbour = harness.registry.session(other_guild());
    neighbour
        .join(other_voice_channel(), text_channel())
        .await
        .unwrap();
    neighbour.enqueue(track("A"), None).await.unwrap();

    let crashed = harness.joined().await;
    assert_matches!(
        crashed.enqueue(track("boom"), None).await,
        Err(MusicError::SessionClosed)
    );

    wait(Duration::from_secs(1)).await;
    assert!(crashed.is_closed());
    // The crashed session's voice connection is released
    assert_eq!(harness.connector.disconnect_count(), 1);

    let snapshot = neighbour.snapshot().await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Playing);
    assert_eq!(snapshot.current.map(|now| now.track.title), Some("A".to_string()));

    let fresh = harness.session();
    assert!(!fresh.is_closed());
    let snapshot = fresh.snapshot().await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Idle);
    assert!(snapshot.queue.is_empty());

    assert_eq!(
        fresh.join(voice_channel(), text_channel()).await.unwrap(),
        JoinOutcome::Connected
    );
    assert_eq!(
        fresh.enqueue(track("C"), None).await.unwrap(),
        EnqueueOutcome::Playing(track("C"))
    );
    assert!(fresh.disconnect().await.unwrap());
    assert_eq!(harness.connector.disconnect_count(), 2);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn handles_from_before_a_crash_report_closed(harness: Harness) {
    harness.sink.panic_on("boom");
    let crashed = harness.joined().await;
    let _ = crashed.enqueue(track("boom"), None).await;

    assert_matches!(crashed.snapshot().await, Err(MusicError::SessionClosed));
    assert!(harness.registry.existing(guild()).is_none());
}
