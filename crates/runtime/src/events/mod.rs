//! Topic-based event bus for game notifications.
//!
//! `PlayerUpdated`, `MinedTilesUpdated` and `BattleUpdated` are pull signals:
//! they say something changed and carry nothing else. Intent lifecycle events
//! carry the action id and outcome.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::IntentEvent;
