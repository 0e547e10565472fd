use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use opswatch_core::types::{NotificationKey, ScheduleEntry, Visibility};

use crate::error::Result;

// channel_id -> cron expression
type ChannelMap = BTreeMap<String, String>;
// visibility key ("0"/"1") -> channels
type VisibilityMap = BTreeMap<String, ChannelMap>;
// game_id -> visibilities
type GameMap = BTreeMap<String, VisibilityMap>;

/// On-disk shape. Every key level is the decimal string form of its numeric
/// component — one canonical encoding, applied on both store and lookup.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    opsec_channels_map: GameMap,
}

#[derive(Serialize)]
struct RegistryFileRef<'a> {
    opsec_channels_map: &'a GameMap,
}

/// Durable (game, visibility, channel) → cron mapping.
///
/// Mutations are write-through: the whole map is re-serialized after every
/// `upsert`/`remove`, via a temp file renamed over the target so a crash
/// mid-write never leaves a truncated registry. If the save itself fails,
/// the in-memory mutation is rolled back before the error is returned.
pub struct ScheduleRegistry {
    path: PathBuf,
    map: GameMap,
}

impl ScheduleRegistry {
    /// Read the persisted map. A missing file is an empty registry, not an
    /// error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Ok(Self {
                path,
                map: GameMap::new(),
            });
        }

        let contents = std::fs::read_to_string(&path)?;
        let file: RegistryFile = serde_json::from_str(&contents)?;
        Ok(Self {
            path,
            map: file.opsec_channels_map,
        })
    }

    /// Serialize the full map to disk (temp file + atomic rename).
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&RegistryFileRef {
            opsec_channels_map: &self.map,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Insert or overwrite the cron expression for a key.
    ///
    /// Returns `true` when the key did not exist before. The cron string is
    /// assumed already validated — that happens at the command layer.
    pub fn upsert(
        &mut self,
        game_id: i64,
        visibility: Visibility,
        channel_id: u64,
        cron: &str,
    ) -> Result<bool> {
        let before = self.map.clone();

        let is_new = self
            .map
            .entry(game_id.to_string())
            .or_default()
            .entry(visibility.as_key().to_string())
            .or_default()
            .insert(channel_id.to_string(), cron.to_string())
            .is_none();

        if let Err(e) = self.save() {
            self.map = before;
            return Err(e);
        }
        Ok(is_new)
    }

    /// Delete the entry for a key. Returns `false` (and does not touch the
    /// file) when no such entry exists.
    pub fn remove(
        &mut self,
        game_id: i64,
        visibility: Visibility,
        channel_id: u64,
    ) -> Result<bool> {
        let before = self.map.clone();

        let game_key = game_id.to_string();
        let vis_key = visibility.as_key();
        let channel_key = channel_id.to_string();

        let removed = self
            .map
            .get_mut(&game_key)
            .and_then(|vis_map| vis_map.get_mut(vis_key))
            .and_then(|channels| channels.remove(&channel_key))
            .is_some();

        if !removed {
            return Ok(false);
        }

        // Prune empty nesting levels so the file doesn't accumulate husks.
        if let Some(vis_map) = self.map.get_mut(&game_key) {
            if vis_map.get(vis_key).is_some_and(ChannelMap::is_empty) {
                vis_map.remove(vis_key);
            }
            if vis_map.is_empty() {
                self.map.remove(&game_key);
            }
        }

        if let Err(e) = self.save() {
            self.map = before;
            return Err(e);
        }
        Ok(true)
    }

    /// All notifications configured for one Discord channel.
    pub fn get_channel_notifications(&self, channel_id: u64) -> Vec<(i64, Visibility, String)> {
        let channel_key = channel_id.to_string();
        let mut results = Vec::new();

        for entry in self.entries() {
            if entry.key.channel_id.to_string() == channel_key {
                results.push((entry.key.game_id, entry.key.visibility, entry.cron));
            }
        }
        results
    }

    /// Full snapshot of the registry as structured entries.
    ///
    /// Rows whose keys fail to parse back to numbers are logged and
    /// skipped rather than taking the whole registry down.
    pub fn entries(&self) -> Vec<ScheduleEntry> {
        let mut entries = Vec::new();

        for (game_key, vis_map) in &self.map {
            let Ok(game_id) = game_key.parse::<i64>() else {
                warn!(key = %game_key, "registry: non-numeric game key skipped");
                continue;
            };
            for (vis_key, channels) in vis_map {
                let Some(visibility) = Visibility::from_key(vis_key) else {
                    warn!(key = %vis_key, game_id, "registry: unknown visibility key skipped");
                    continue;
                };
                for (channel_key, cron) in channels {
                    let Ok(channel_id) = channel_key.parse::<u64>() else {
                        warn!(key = %channel_key, game_id, "registry: non-numeric channel key skipped");
                        continue;
                    };
                    entries.push(ScheduleEntry {
                        key: NotificationKey::new(game_id, visibility, channel_id),
                        cron: cron.clone(),
                    });
                }
            }
        }
        entries
    }

    pub fn len(&self) -> usize {
        self.map
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_in(dir: &tempfile::TempDir) -> ScheduleRegistry {
        ScheduleRegistry::load(dir.path().join("schedules.json")).unwrap()
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);
        assert!(registry.is_empty());
        assert!(registry.entries().is_empty());
    }

    #[test]
    fn upsert_reports_new_then_existing() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_in(&dir);

        assert!(registry
            .upsert(16, Visibility::Opsec, 555, "0 19 * * *")
            .unwrap());
        assert!(!registry
            .upsert(16, Visibility::Opsec, 555, "0 20 * * *")
            .unwrap());

        let notifications = registry.get_channel_notifications(555);
        assert_eq!(notifications, vec![(16, Visibility::Opsec, "0 20 * * *".to_string())]);
    }

    #[test]
    fn remove_absent_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_in(&dir);
        assert!(!registry.remove(16, Visibility::Opsec, 555).unwrap());
    }

    #[test]
    fn remove_prunes_empty_levels() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_in(&dir);
        registry
            .upsert(16, Visibility::Opsec, 555, "0 19 * * *")
            .unwrap();

        assert!(registry.remove(16, Visibility::Opsec, 555).unwrap());
        assert!(registry.is_empty());

        // The persisted file must not keep empty nested maps around.
        let contents =
            std::fs::read_to_string(dir.path().join("schedules.json")).unwrap();
        assert!(!contents.contains("\"16\""));
    }

    #[test]
    fn mutations_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedules.json");

        {
            let mut registry = ScheduleRegistry::load(&path).unwrap();
            registry
                .upsert(16, Visibility::Opsec, 555, "0 19 * * *")
                .unwrap();
            registry
                .upsert(7, Visibility::Public, 555, "*/30 * * * *")
                .unwrap();
        }

        let registry = ScheduleRegistry::load(&path).unwrap();
        assert_eq!(registry.len(), 2);
        let mut entries = registry.entries();
        entries.sort_by_key(|e| e.key.game_id);
        assert_eq!(
            entries[0].key,
            NotificationKey::new(7, Visibility::Public, 555)
        );
        assert_eq!(entries[1].cron, "0 19 * * *");
    }

    #[test]
    fn keys_persist_as_strings_at_every_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedules.json");
        let mut registry = ScheduleRegistry::load(&path).unwrap();
        registry
            .upsert(16, Visibility::Opsec, 555, "0 19 * * *")
            .unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            parsed["opsec_channels_map"]["16"]["1"]["555"],
            serde_json::json!("0 19 * * *")
        );
    }

    #[test]
    fn channel_lookup_ignores_other_channels() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_in(&dir);
        registry
            .upsert(16, Visibility::Opsec, 555, "0 19 * * *")
            .unwrap();
        registry
            .upsert(16, Visibility::Public, 777, "0 9 * * *")
            .unwrap();

        assert_eq!(registry.get_channel_notifications(555).len(), 1);
        assert_eq!(registry.get_channel_notifications(777).len(), 1);
        assert!(registry.get_channel_notifications(999).is_empty());
    }
}
