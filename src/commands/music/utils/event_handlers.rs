use poise::serenity_prelude as serenity;
use serenity::async_trait;
use songbird::tracks::PlayMode;
use songbird::{Event, EventContext, EventHandler};
use tracing::debug;

use super::voice::TrackCompletion;

/// Forwards a songbird track event to the owning guild session.
pub struct TrackEndNotifier {
    pub completion: TrackCompletion,
}

impl TrackEndNotifier {
    pub fn new(completion: TrackCompletion) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            let failure = tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(e.to_string()),
                _ => None,
            });

            debug!(
                "Track {} ended ({})",
                self.completion.serial(),
                failure.as_deref().unwrap_or("ok")
            );

            match failure {
                Some(reason) => self.completion.failed(reason),
                None => self.completion.finished(),
            }
        }
        None
    }
}
