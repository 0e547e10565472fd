use serde::{Deserialize, Serialize};

/// Audience classification for an operation and its notification channels.
///
/// Persisted registry keys use the numeric string form (`"0"` / `"1"`),
/// which mirrors the Opserv `is_opsec` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Opsec,
}

impl Visibility {
    pub fn from_opsec(is_opsec: bool) -> Self {
        if is_opsec {
            Visibility::Opsec
        } else {
            Visibility::Public
        }
    }

    pub fn is_opsec(self) -> bool {
        matches!(self, Visibility::Opsec)
    }

    /// Canonical registry-file key: `"0"` for Public, `"1"` for OPSEC.
    pub fn as_key(self) -> &'static str {
        match self {
            Visibility::Public => "0",
            Visibility::Opsec => "1",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "0" => Some(Visibility::Public),
            "1" => Some(Visibility::Opsec),
            _ => None,
        }
    }

    /// Human label used in embed titles and command replies.
    pub fn label(self) -> &'static str {
        match self {
            Visibility::Public => "Public",
            Visibility::Opsec => "OPSEC",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Composite identity of one notification schedule: which game, for which
/// audience, into which Discord channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationKey {
    pub game_id: i64,
    pub visibility: Visibility,
    pub channel_id: u64,
}

impl NotificationKey {
    pub fn new(game_id: i64, visibility: Visibility, channel_id: u64) -> Self {
        Self {
            game_id,
            visibility,
            channel_id,
        }
    }
}

impl std::fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.game_id,
            self.visibility.as_key(),
            self.channel_id
        )
    }
}

/// One registry row: a notification key plus its cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub key: NotificationKey,
    pub cron: String,
}

/// A scheduled operation as read from the Opserv database.
///
/// `date_start` / `date_end` are epoch seconds (the XenForo convention),
/// which is also what Discord `<t:…>` time markers take. Read-only — the
/// bot never writes to the operations store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_id: i64,
    pub operation_name: String,
    pub game_id: i64,
    pub game_name: String,
    pub leader_name: String,
    pub is_opsec: bool,
    pub is_completed: bool,
    pub date_start: i64,
    pub date_end: i64,
}

/// Truncate an epoch-seconds timestamp down to its minute boundary.
///
/// Cron firing and the sweep window both operate at minute granularity, so
/// comparisons ignore the seconds component of `date_start`.
pub fn truncate_to_minute(epoch_secs: i64) -> i64 {
    epoch_secs - epoch_secs.rem_euclid(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_key_roundtrip() {
        assert_eq!(Visibility::from_key("0"), Some(Visibility::Public));
        assert_eq!(Visibility::from_key("1"), Some(Visibility::Opsec));
        assert_eq!(Visibility::from_key("2"), None);
        assert_eq!(Visibility::Opsec.as_key(), "1");
        assert!(Visibility::Opsec.is_opsec());
        assert!(!Visibility::Public.is_opsec());
    }

    #[test]
    fn key_display_matches_registry_encoding() {
        let key = NotificationKey::new(16, Visibility::Opsec, 555);
        assert_eq!(key.to_string(), "16-1-555");
    }

    #[test]
    fn minute_truncation() {
        assert_eq!(truncate_to_minute(0), 0);
        assert_eq!(truncate_to_minute(59), 0);
        assert_eq!(truncate_to_minute(60), 60);
        assert_eq!(truncate_to_minute(1_704_103_529), 1_704_103_500);
    }
}
