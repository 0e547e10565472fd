//! Operations embed rendering.
//!
//! One embed per notification, one field per operation. Which lines a field
//! carries is controlled by [`MessageOptions`] — the cron-driven notifier
//! shows everything, the 30-minute reminder drops the game name, end date
//! and footer.

use chrono::{DateTime, Utc};
use serenity::builder::{CreateEmbed, CreateEmbedFooter};

use opswatch_core::notify::MessageOptions;
use opswatch_core::types::Operation;

/// Deep link into the Opserv web UI for one operation.
fn opserv_link(operation_id: i64) -> String {
    format!("https://www.the-bwc.com/opserv/operation.php?id={operation_id}&do=view")
}

/// The body lines for one operation's embed field.
///
/// Times render as Discord `<t:…>` markers so each client shows them in its
/// own timezone.
pub fn operation_lines(operation: &Operation, options: &MessageOptions) -> String {
    let mut lines = Vec::new();

    if options.show_game {
        lines.push(format!("**{}**", operation.game_name));
    }
    if options.show_leader {
        lines.push(format!("**Leader:** {}", operation.leader_name));
    }
    if options.show_date_start {
        lines.push(format!("**Start:** <t:{}>", operation.date_start));
    }
    if options.show_date_end {
        lines.push(format!("**End:** <t:{}>", operation.date_end));
    }
    if options.show_opserv_link {
        lines.push(format!(
            "_Go to [Opserv]({}) for details_",
            opserv_link(operation.operation_id)
        ));
    }

    lines.join("\n")
}

/// Build the full notification embed.
pub fn operations_embed(
    title: &str,
    operations: &[Operation],
    options: &MessageOptions,
    now: DateTime<Utc>,
) -> CreateEmbed {
    let mut embed = CreateEmbed::new().title(title).colour(options.color);

    if options.include_timestamp {
        embed = embed.footer(CreateEmbedFooter::new(format!(
            "Last updated: {}",
            now.format("%Y-%m-%d %H:%M")
        )));
    }

    for operation in operations {
        embed = embed.field(
            operation.operation_name.clone(),
            operation_lines(operation, options),
            false,
        );
    }

    embed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operation() -> Operation {
        Operation {
            operation_id: 42,
            operation_name: "Operation Redwing".to_string(),
            game_id: 16,
            game_name: "Arma 3".to_string(),
            leader_name: "Shepard".to_string(),
            is_opsec: true,
            is_completed: false,
            date_start: 1_704_103_200,
            date_end: 1_704_110_400,
        }
    }

    #[test]
    fn full_profile_includes_every_line() {
        let lines = operation_lines(&operation(), &MessageOptions::upcoming());
        assert!(lines.contains("**Arma 3**"));
        assert!(lines.contains("**Leader:** Shepard"));
        assert!(lines.contains("**Start:** <t:1704103200>"));
        assert!(lines.contains("**End:** <t:1704110400>"));
        assert!(lines.contains("operation.php?id=42&do=view"));
    }

    #[test]
    fn reduced_profile_drops_game_and_end_date() {
        let lines = operation_lines(&operation(), &MessageOptions::starting_soon());
        assert!(!lines.contains("Arma 3"));
        assert!(!lines.contains("**End:**"));
        assert!(lines.contains("**Leader:** Shepard"));
        assert!(lines.contains("**Start:** <t:1704103200>"));
        assert!(lines.contains("operation.php?id=42&do=view"));
    }
}
