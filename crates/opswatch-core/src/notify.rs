//! Dispatch payloads — what the scheduler hands to the Discord delivery task.

use serde::{Deserialize, Serialize};

use crate::types::Operation;

/// Embed color used for operation notifications (Discord red).
pub const NOTIFICATION_COLOR: u32 = 0xED4245;

/// Controls which optional lines an operations embed includes.
///
/// Two profiles exist: the full one for cron-driven "upcoming operations"
/// posts and a reduced one for the 30-minute reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageOptions {
    pub color: u32,
    pub show_leader: bool,
    pub show_game: bool,
    pub show_date_start: bool,
    pub show_date_end: bool,
    pub show_opserv_link: bool,
    pub include_timestamp: bool,
}

impl MessageOptions {
    /// Full profile: every field plus a "Last updated" footer.
    pub fn upcoming() -> Self {
        Self {
            color: NOTIFICATION_COLOR,
            show_leader: true,
            show_game: true,
            show_date_start: true,
            show_date_end: true,
            show_opserv_link: true,
            include_timestamp: true,
        }
    }

    /// Reduced profile for the 30-minute reminder: the game is implied by
    /// the channel, the end date is noise that close to start, and the
    /// footer timestamp would just repeat "now".
    pub fn starting_soon() -> Self {
        Self {
            show_game: false,
            show_date_end: false,
            include_timestamp: false,
            ..Self::upcoming()
        }
    }
}

/// One notification ready for delivery to a single Discord channel.
#[derive(Debug, Clone)]
pub struct NotificationDelivery {
    pub channel_id: u64,
    pub title: String,
    pub operations: Vec<Operation>,
    pub options: MessageOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_soon_reduces_the_full_profile() {
        let full = MessageOptions::upcoming();
        let soon = MessageOptions::starting_soon();
        assert!(full.show_game && full.show_date_end && full.include_timestamp);
        assert!(!soon.show_game && !soon.show_date_end && !soon.include_timestamp);
        assert!(soon.show_leader && soon.show_date_start && soon.show_opserv_link);
        assert_eq!(soon.color, full.color);
    }
}
