//! Event handlers for the kudos bot.
//!
//! - `GiveKudosHandler` - Message notifications containing `<@user> ++`
//! - `LeaderboardHandler` - The `/kudos [n]` slash command

mod give_kudos;
mod leaderboard;

use std::sync::Arc;

pub use give_kudos::GiveKudosHandler;
pub use leaderboard::{LeaderboardHandler, LEADERBOARD_COMMAND, LEADERBOARD_FAILED_REPLY};

use crate::application::dispatch::{CommandDispatcher, EventRouter, NotificationDispatcher};
use crate::application::registry::HandlerRegistry;
use crate::domain::envelope::{MessageEvent, SlashCommand};
use crate::ports::CounterStore;

/// Router with the kudos handlers registered for both event classes.
pub fn kudos_router(counters: Arc<dyn CounterStore>) -> EventRouter {
    let notifications = HandlerRegistry::<MessageEvent>::builder()
        .register(Arc::new(GiveKudosHandler::new(Arc::clone(&counters))))
        .build();
    let commands = HandlerRegistry::<SlashCommand>::builder()
        .register(Arc::new(LeaderboardHandler::new(counters)))
        .build();

    EventRouter::new(
        NotificationDispatcher::notifications(notifications),
        CommandDispatcher::commands(commands),
    )
}
