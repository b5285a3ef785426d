use assert_matches::assert_matches;
use jukebox::commands::music::utils::guild_session::PlaybackState;
use jukebox::commands::music::utils::music_manager::MusicError;
use jukebox::commands::music::utils::session_actor::{EnqueueOutcome, JoinOutcome};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tokio_test::{assert_err, assert_ok};

use crate::common::fixtures::{other_voice_channel, text_channel, track, voice_channel};
use crate::common::mocks::SinkCall;
use crate::common::{Harness, harness};

fn titles(queue: &[jukebox::commands::music::audio_sources::track_metadata::QueuedTrack]) -> Vec<&str> {
    queue.iter().map(|t| t.title.as_str()).collect()
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn enqueue_preserves_call_order(harness: Harness) {
    let session = harness.session();
    for (i, name) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
        let outcome = session.enqueue(track(name), None).await.unwrap();
        assert_eq!(
            outcome,
            EnqueueOutcome::Queued {
                track: track(name),
                position: i + 1
            }
        );
    }

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(titles(&snapshot.queue), vec!["a", "b", "c", "d", "e"]);
    assert_eq!(snapshot.state, PlaybackState::Idle);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn queued_tracks_play_in_order_after_join(harness: Harness) {
    let session = harness.session();
    session.enqueue(track("A"), Some(text_channel())).await.unwrap();
    session.enqueue(track("B"), Some(text_channel())).await.unwrap();

    let joined = session.join(voice_channel(), text_channel()).await.unwrap();
    assert_eq!(joined, JoinOutcome::Connected);

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.current.map(|now| now.track.title), Some("A".to_string()));
    assert_eq!(titles(&snapshot.queue), vec!["B"]);
    assert_eq!(snapshot.state, PlaybackState::Playing);
    assert_eq!(harness.sink.played(), vec!["A"]);

    harness.sink.finish_current();
    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.current.map(|now| now.track.title), Some("B".to_string()));
    assert!(snapshot.queue.is_empty());

    harness.sink.finish_current();
    let snapshot = session.snapshot().await.unwrap();
    assert!(snapshot.current.is_none());
    assert_eq!(snapshot.state, PlaybackState::StoppedEmpty);
    assert_eq!(harness.sink.played(), vec!["A", "B"]);

    assert!(harness.announcer.any_contains("Now playing: **A**"));
    assert!(harness.announcer.any_contains("Now playing: **B**"));
    assert!(harness.announcer.any_contains("No one is listening"));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn enqueue_on_stopped_session_starts_playback(harness: Harness) {
    let session = harness.joined().await;

    let outcome = session.enqueue(track("A"), None).await.unwrap();
    assert_eq!(outcome, EnqueueOutcome::Playing(track("A")));

    let outcome = session.enqueue(track("B"), None).await.unwrap();
    assert_eq!(
        outcome,
        EnqueueOutcome::Queued {
            track: track("B"),
            position: 1
        }
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn stale_completions_are_ignored(harness: Harness) {
    let session = harness.joined().await;
    for name in ["A", "B", "C"] {
        session.enqueue(track(name), None).await.unwrap();
    }

    let first = harness.sink.completion(0);
    first.finished();
    first.finished();
    first.failed("late decoder error");

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.current.map(|now| now.track.title), Some("B".to_string()));
    assert_eq!(titles(&snapshot.queue), vec!["C"]);
    assert_eq!(harness.sink.played(), vec!["A", "B"]);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn playback_failure_moves_the_queue_on(harness: Harness) {
    let session = harness.joined().await;
    session.enqueue(track("A"), None).await.unwrap();
    session.enqueue(track("B"), None).await.unwrap();

    harness.sink.fail_current("stream reset");

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.current.map(|now| now.track.title), Some("B".to_string()));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn start_failure_is_reported_and_skipped(harness: Harness) {
    harness.sink.break_track("broken");
    let session = harness.session();
    session.enqueue(track("broken"), None).await.unwrap();
    session.enqueue(track("fine"), None).await.unwrap();

    session.join(voice_channel(), text_channel()).await.unwrap();

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.current.map(|now| now.track.title), Some("fine".to_string()));
    assert!(harness.announcer.any_contains("error occurred while playing **broken**"));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn loop_replays_the_current_track(harness: Harness) {
    let session = harness.joined().await;
    session.enqueue(track("A"), None).await.unwrap();
    session.enqueue(track("B"), None).await.unwrap();
    assert!(session.toggle_loop().await.unwrap());

    harness.sink.finish_current();
    session.snapshot().await.unwrap();
    harness.sink.finish_current();

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.current.map(|now| now.track.title), Some("A".to_string()));
    assert_eq!(titles(&snapshot.queue), vec!["B"]);
    assert_eq!(harness.sink.played(), vec!["A", "A", "A"]);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn looped_track_that_fails_to_restart_is_dropped(harness: Harness) {
    let session = harness.joined().await;
    session.enqueue(track("A"), None).await.unwrap();
    session.enqueue(track("B"), None).await.unwrap();
    session.toggle_loop().await.unwrap();

    harness.sink.break_track("A");
    harness.sink.finish_current();

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.current.map(|now| now.track.title), Some("B".to_string()));
    assert!(snapshot.queue.is_empty());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn skip_stops_the_sink_and_advances(harness: Harness) {
    let session = harness.joined().await;
    assert_matches!(session.skip().await, Err(MusicError::NothingPlaying));

    session.enqueue(track("A"), None).await.unwrap();
    session.enqueue(track("B"), None).await.unwrap();

    let skipped = session.skip().await.unwrap();
    assert_eq!(skipped.title, "A");

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.current.map(|now| now.track.title), Some("B".to_string()));
    assert!(harness.sink.calls().contains(&SinkCall::Stop));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn pause_and_resume_follow_the_state(harness: Harness) {
    let session = harness.session();
    assert_matches!(session.pause().await, Err(MusicError::NotConnected));

    let session = harness.joined().await;
    assert_matches!(session.pause().await, Err(MusicError::NothingPlaying));
    assert_matches!(session.resume().await, Err(MusicError::NotPaused));

    session.enqueue(track("A"), None).await.unwrap();
    assert_ok!(session.pause().await);
    assert_matches!(session.pause().await, Err(MusicError::NothingPlaying));
    assert_eq!(session.snapshot().await.unwrap().state, PlaybackState::Paused);

    assert_ok!(session.resume().await);
    assert_err!(session.resume().await);
    assert_eq!(session.snapshot().await.unwrap().state, PlaybackState::Playing);

    let calls = harness.sink.calls();
    assert_eq!(&calls[1..], &[SinkCall::Pause, SinkCall::Resume]);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn out_of_range_volume_changes_nothing(harness: Harness) {
    let session = harness.joined().await;
    session.enqueue(track("A"), None).await.unwrap();

    assert_eq!(session.set_volume(50).await.unwrap(), 0.5);
    assert_matches!(
        session.set_volume(250).await,
        Err(MusicError::VolumeOutOfRange(250))
    );

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.volume, 0.5);
    assert_eq!(snapshot.state, PlaybackState::Playing);

    let volume_calls: Vec<_> = harness
        .sink
        .calls()
        .into_iter()
        .filter(|call| matches!(call, SinkCall::SetVolume(_)))
        .collect();
    assert_eq!(volume_calls, vec![SinkCall::SetVolume(0.5)]);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn volume_carries_over_to_the_next_track(harness: Harness) {
    let session = harness.joined().await;
    session.set_volume(150).await.unwrap();
    session.enqueue(track("A"), None).await.unwrap();

    assert_eq!(
        harness.sink.calls(),
        vec![SinkCall::Play {
            title: "A".to_string(),
            volume: 1.5
        }]
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn disconnect_resets_the_session(harness: Harness) {
    let session = harness.joined().await;
    session.enqueue(track("A"), None).await.unwrap();
    session.enqueue(track("B"), None).await.unwrap();
    session.toggle_sticky().await.unwrap();
    session.toggle_loop().await.unwrap();
    session.set_volume(30).await.unwrap();

    assert!(session.disconnect().await.unwrap());

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Idle);
    assert!(snapshot.queue.is_empty());
    assert!(snapshot.current.is_none());
    assert!(!snapshot.sticky);
    assert!(!snapshot.loop_enabled);
    assert_eq!(snapshot.volume, 1.0);
    assert_eq!(harness.connector.disconnect_count(), 1);

    // Idempotent, and the session behaves as fresh afterwards
    assert!(!session.disconnect().await.unwrap());
    assert_eq!(harness.connector.disconnect_count(), 1);
    assert_eq!(
        session.enqueue(track("C"), None).await.unwrap(),
        EnqueueOutcome::Queued {
            track: track("C"),
            position: 1
        }
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn external_disconnect_resets_without_leaving(harness: Harness) {
    let session = harness.joined().await;
    session.enqueue(track("A"), None).await.unwrap();

    harness.connector.set_connected(false);
    session.connection_lost();

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Idle);
    assert!(snapshot.current.is_none());
    assert_eq!(harness.connector.disconnect_count(), 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn voice_loss_for_a_replaced_connection_is_ignored(harness: Harness) {
    let session = harness.joined().await;
    session.disconnect().await.unwrap();
    session.join(voice_channel(), text_channel()).await.unwrap();
    session.enqueue(track("A"), None).await.unwrap();

    // Gateway update from the earlier leave lands after the rejoin
    session.connection_lost();

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Playing);
    assert_eq!(snapshot.current.map(|now| now.track.title), Some("A".to_string()));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn voice_loss_while_disconnected_keeps_the_queue(harness: Harness) {
    let session = harness.session();
    session.enqueue(track("A"), None).await.unwrap();

    session.connection_lost();

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(titles(&snapshot.queue), vec!["A"]);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn disconnect_leaves_a_connection_the_session_never_owned(harness: Harness) {
    harness.connector.set_connected(true);
    let session = harness.session();

    assert!(session.disconnect().await.unwrap());
    assert_eq!(harness.connector.disconnect_count(), 1);

    assert!(!session.disconnect().await.unwrap());
    assert_eq!(harness.connector.disconnect_count(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn join_moves_between_channels(harness: Harness) {
    let session = harness.joined().await;

    assert_eq!(
        session.join(voice_channel(), text_channel()).await.unwrap(),
        JoinOutcome::AlreadyConnected
    );
    assert_eq!(
        session.join(other_voice_channel(), text_channel()).await.unwrap(),
        JoinOutcome::Moved
    );

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.voice_channel, Some(other_voice_channel()));
    assert_eq!(harness.connector.connect_count(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn cleanqueue_keeps_the_current_track(harness: Harness) {
    let session = harness.joined().await;
    for name in ["A", "B", "C"] {
        session.enqueue(track(name), None).await.unwrap();
    }

    assert_eq!(session.clear_queue().await.unwrap(), 2);

    let snapshot = session.snapshot().await.unwrap();
    assert!(snapshot.queue.is_empty());
    assert_eq!(snapshot.current.map(|now| now.track.title), Some("A".to_string()));
}
