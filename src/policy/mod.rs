//! Persistent policy document.
//!
//! The [`PolicyDocument`] is the single persisted aggregate: group scope
//! control, welcome settings, the forbidden-term filter, the owner override
//! set, the locked-nickname registry, and the targeted-user registry.
//!
//! The wire form uses the camelCase keys of the historical document so an
//! existing file loads unchanged, and unknown keys round-trip through the
//! flattened `extra` map (merge semantics, never replace).

pub mod store;

pub use store::{JsonFileBackend, MemoryBackend, PolicyBackend, PolicyStore};

use crate::event::{GroupId, UserId};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::HashSet;

/// Global scope control: which groups the engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMode {
    /// Manage every group.
    #[default]
    #[serde(rename = "none")]
    Disabled,
    /// Manage every group except the listed ones.
    Blacklist,
    /// Manage only the listed groups.
    Whitelist,
}

/// Secondary action applied after a keyword-triggered deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Punishment {
    #[default]
    None,
    /// Temporary mute of fixed default duration ("ban" on the wire).
    #[serde(rename = "ban")]
    Mute,
    /// Immediate removal, without blocking re-invitation.
    Kick,
}

/// A persisted nickname lock.
///
/// Once `locked_by_admin` is set, only an administrator may remove or change
/// the lock; the owning user may never self-clear it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicknameLock {
    pub nickname: String,
    #[serde(rename = "lockedByAdmin")]
    pub locked_by_admin: bool,
}

/// A targeted-user record. Presence alone is the operative signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    #[serde(rename = "addedBy")]
    pub added_by: UserId,
    #[serde(rename = "addedAt")]
    pub added_at: i64,
}

impl TargetRecord {
    pub fn added_now_by(added_by: impl Into<UserId>) -> Self {
        Self { added_by: added_by.into(), added_at: Utc::now().timestamp() }
    }
}

/// The persisted policy state for all groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "groupListMode", default)]
    pub group_list_mode: ListMode,
    /// Comma-separated group id list, interpreted per mode.
    #[serde(rename = "groupListIds", default)]
    pub group_list_ids: String,

    #[serde(rename = "welcomeEnable", default = "default_true")]
    pub welcome_enable: bool,
    /// Template with `{nickname}` / `{user_id}` placeholders.
    #[serde(rename = "welcomeTemplate", default = "default_welcome_template")]
    pub welcome_template: String,

    #[serde(rename = "filterEnable", default)]
    pub filter_enable: bool,
    /// `|`-delimited forbidden-term list.
    #[serde(rename = "filterKeywords", default = "default_filter_keywords")]
    pub filter_keywords: String,
    #[serde(rename = "filterPunish", default)]
    pub filter_punish: Punishment,

    /// Comma-separated user ids granted administrator-equivalent rights
    /// regardless of platform-reported role.
    #[serde(rename = "ownerQQs", default)]
    pub owner_ids: String,

    #[serde(rename = "lockedNicknames", default, deserialize_with = "de_locks")]
    pub locked_nicknames: BTreeMap<GroupId, BTreeMap<UserId, NicknameLock>>,

    #[serde(rename = "targetedUsers", default)]
    pub targeted_users: BTreeMap<GroupId, BTreeMap<UserId, TargetRecord>>,

    /// Keys written by other document versions; preserved across save.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn default_true() -> bool {
    true
}

fn default_welcome_template() -> String {
    "欢迎 {nickname}({user_id}) 加入本群！".to_string()
}

fn default_filter_keywords() -> String {
    "加群|兼职|博彩".to_string()
}

impl Default for PolicyDocument {
    fn default() -> Self {
        Self {
            group_list_mode: ListMode::Disabled,
            group_list_ids: String::new(),
            welcome_enable: true,
            welcome_template: default_welcome_template(),
            filter_enable: false,
            filter_keywords: default_filter_keywords(),
            filter_punish: Punishment::None,
            owner_ids: String::new(),
            locked_nicknames: BTreeMap::new(),
            targeted_users: BTreeMap::new(),
            extra: serde_json::Map::new(),
        }
    }
}

impl PolicyDocument {
    /// Group ids from the comma-separated list field.
    pub fn group_list(&self) -> HashSet<&str> {
        split_list(&self.group_list_ids, ',')
    }

    /// Owner-override user ids.
    pub fn owner_set(&self) -> HashSet<&str> {
        split_list(&self.owner_ids, ',')
    }

    /// Whether a user is in the owner-override set.
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_set().contains(user_id)
    }

    /// Forbidden terms from the `|`-delimited keyword field.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.filter_keywords.split('|').filter(|k| !k.is_empty())
    }

    pub fn lock_for(&self, group_id: &str, user_id: &str) -> Option<&NicknameLock> {
        self.locked_nicknames.get(group_id)?.get(user_id)
    }

    pub fn set_lock(&mut self, group_id: &str, user_id: &str, lock: NicknameLock) {
        self.locked_nicknames
            .entry(group_id.to_string())
            .or_default()
            .insert(user_id.to_string(), lock);
    }

    /// Remove a lock entry. Returns whether one existed.
    pub fn remove_lock(&mut self, group_id: &str, user_id: &str) -> bool {
        let Some(group) = self.locked_nicknames.get_mut(group_id) else {
            return false;
        };
        let removed = group.remove(user_id).is_some();
        if group.is_empty() {
            self.locked_nicknames.remove(group_id);
        }
        removed
    }

    pub fn is_targeted(&self, group_id: &str, user_id: &str) -> bool {
        self.targeted_users.get(group_id).is_some_and(|g| g.contains_key(user_id))
    }

    pub fn add_target(&mut self, group_id: &str, user_id: &str, record: TargetRecord) {
        self.targeted_users
            .entry(group_id.to_string())
            .or_default()
            .insert(user_id.to_string(), record);
    }

    /// Remove a target entry. Returns whether one existed.
    pub fn remove_target(&mut self, group_id: &str, user_id: &str) -> bool {
        let Some(group) = self.targeted_users.get_mut(group_id) else {
            return false;
        };
        let removed = group.remove(user_id).is_some();
        if group.is_empty() {
            self.targeted_users.remove(group_id);
        }
        removed
    }

    pub fn targets_in(&self, group_id: &str) -> Vec<(&str, &TargetRecord)> {
        self.targeted_users
            .get(group_id)
            .map(|g| g.iter().map(|(id, rec)| (id.as_str(), rec)).collect())
            .unwrap_or_default()
    }

    /// Merge a partial document over this one, key by key.
    ///
    /// Keys present in `partial` overwrite; everything else (including the
    /// nested lock and target maps) is untouched. This is the only write
    /// path the configuration surface uses.
    pub fn merge(&mut self, partial: serde_json::Map<String, Value>) -> Result<(), serde_json::Error> {
        let mut current = serde_json::to_value(&*self)?;
        if let Value::Object(map) = &mut current {
            for (key, value) in partial {
                map.insert(key, value);
            }
        }
        *self = serde_json::from_value(current)?;
        Ok(())
    }
}

fn split_list(raw: &str, sep: char) -> HashSet<&str> {
    raw.split(sep).map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Lock entries at the persistence boundary.
///
/// Historical documents stored a bare nickname string; those were always
/// admin-placed locks. Normalized to [`NicknameLock`] on read so the
/// ambiguity never leaks past the store.
#[derive(Deserialize)]
#[serde(untagged)]
enum LockEntry {
    Structured(NicknameLock),
    Legacy(String),
}

impl From<LockEntry> for NicknameLock {
    fn from(entry: LockEntry) -> Self {
        match entry {
            LockEntry::Structured(lock) => lock,
            LockEntry::Legacy(nickname) => NicknameLock { nickname, locked_by_admin: true },
        }
    }
}

fn de_locks<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<GroupId, BTreeMap<UserId, NicknameLock>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<GroupId, BTreeMap<UserId, LockEntry>> =
        BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(g, users)| (g, users.into_iter().map(|(u, e)| (u, e.into())).collect()))
        .collect())
}
