use std::time::Duration;

use assert_matches::assert_matches;
use jukebox::commands::music::utils::guild_session::PlaybackState;
use jukebox::commands::music::utils::music_manager::MusicError;
use jukebox::commands::music::utils::session_actor::JoinOutcome;
use poise::serenity_prelude::GuildId;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tokio::time::Instant;

use crate::common::fixtures::{
    SAMPLE_GUILD_ID, other_voice_channel, text_channel, track, voice_channel,
};
use crate::common::{Harness, harness};

#[rstest]
#[tokio::test(start_paused = true)]
async fn transient_failures_back_off_then_connect(harness: Harness) {
    harness.connector.fail_transiently(2);
    let session = harness.session();
    let started = Instant::now();

    let outcome = session.join(voice_channel(), text_channel()).await;

    assert_matches!(outcome, Ok(JoinOutcome::Connected));
    assert_eq!(harness.connector.connect_count(), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(15));
    assert_eq!(session.snapshot().await.unwrap().state, PlaybackState::StoppedEmpty);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn gives_up_after_four_attempts(harness: Harness) {
    harness.connector.fail_transiently(10);
    let session = harness.session();
    session.enqueue(track("A"), None).await.unwrap();
    let started = Instant::now();

    let outcome = session.join(voice_channel(), text_channel()).await;

    assert_matches!(outcome, Err(MusicError::JoinError(_)));
    assert_eq!(harness.connector.connect_count(), 4);
    assert_eq!(started.elapsed(), Duration::from_secs(35));

    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Idle);
    assert_eq!(snapshot.voice_channel, None);
    assert_eq!(snapshot.queue.len(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn fatal_failure_is_not_retried(harness: Harness) {
    harness.connector.fail_fatally();
    let session = harness.session();
    let started = Instant::now();

    let outcome = session.join(voice_channel(), text_channel()).await;

    assert_matches!(outcome, Err(MusicError::JoinError(_)));
    assert_eq!(harness.connector.connect_count(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(session.snapshot().await.unwrap().state, PlaybackState::Idle);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failed_move_keeps_the_old_channel(harness: Harness) {
    let session = harness.joined().await;
    harness.connector.fail_fatally();

    let outcome = session.join(other_voice_channel(), text_channel()).await;

    assert_matches!(outcome, Err(MusicError::JoinError(_)));
    let snapshot = session.snapshot().await.unwrap();
    assert_eq!(snapshot.voice_channel, Some(voice_channel()));
    assert_eq!(snapshot.state, PlaybackState::StoppedEmpty);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn backoff_in_one_guild_does_not_block_another(harness: Harness) {
    harness.connector.fail_transiently(3);
    let busy = harness.session();
    let joining = tokio::spawn(async move { busy.join(voice_channel(), text_channel()).await });

    let other = harness.registry.session(GuildId::new(SAMPLE_GUILD_ID + 1));
    let started = Instant::now();
    let snapshot = other.snapshot().await.unwrap();

    assert_eq!(snapshot.state, PlaybackState::Idle);
    assert_eq!(started.elapsed(), Duration::ZERO);

    assert_matches!(joining.await.unwrap(), Ok(JoinOutcome::Connected));
}
