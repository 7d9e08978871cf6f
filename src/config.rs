//! Configuration surface exposed to the host's settings UI.
//!
//! The engine does not render configuration screens; it exposes an
//! enumerated options schema and applies each change as a single-key merge
//! into the policy document, persisted immediately.

use crate::policy::PolicyStore;
use serde_json::Value;
use thiserror::Error;

/// Errors from applying a configuration change.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error(transparent)]
    Store(#[from] crate::error::StoreError),
}

/// Kind of widget an option should be rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Fixed choice list (wire values).
    Select(&'static [&'static str]),
    Text,
    Bool,
}

/// One entry of the options schema.
#[derive(Debug, Clone)]
pub struct ConfigOption {
    /// Document key the option merges into.
    pub key: &'static str,
    pub label: &'static str,
    pub kind: OptionKind,
    pub help: &'static str,
}

/// The full options schema, in display order.
pub const SCHEMA: &[ConfigOption] = &[
    ConfigOption {
        key: "groupListMode",
        label: "名单模式",
        kind: OptionKind::Select(&["none", "blacklist", "whitelist"]),
        help: "选择插件生效的范围",
    },
    ConfigOption {
        key: "groupListIds",
        label: "群号列表",
        kind: OptionKind::Text,
        help: "多个群号用英文逗号 , 分隔",
    },
    ConfigOption {
        key: "welcomeEnable",
        label: "启用入群欢迎",
        kind: OptionKind::Bool,
        help: "是否在新成员入群时发送欢迎语",
    },
    ConfigOption {
        key: "welcomeTemplate",
        label: "欢迎语模板",
        kind: OptionKind::Text,
        help: "支持变量: {nickname}, {user_id}",
    },
    ConfigOption {
        key: "filterEnable",
        label: "启用关键词过滤",
        kind: OptionKind::Bool,
        help: "检测到关键词自动撤回",
    },
    ConfigOption {
        key: "filterKeywords",
        label: "违禁词列表",
        kind: OptionKind::Text,
        help: "使用 | 分隔多个词",
    },
    ConfigOption {
        key: "filterPunish",
        label: "触发惩罚",
        kind: OptionKind::Select(&["none", "ban", "kick"]),
        help: "触发违禁词后的额外操作",
    },
    ConfigOption {
        key: "ownerQQs",
        label: "主人账号",
        kind: OptionKind::Text,
        help: "视为管理员的账号, 英文逗号分隔",
    },
];

fn option_for(key: &str) -> Option<&'static ConfigOption> {
    SCHEMA.iter().find(|opt| opt.key == key)
}

/// Apply one configuration change: validate against the schema, merge the
/// single key into the document, persist.
pub async fn apply(store: &PolicyStore, key: &str, value: Value) -> Result<(), ConfigError> {
    let Some(option) = option_for(key) else {
        return Err(ConfigError::UnknownOption(key.to_string()));
    };

    match option.kind {
        OptionKind::Bool if !value.is_boolean() => {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: "expected a boolean".to_string(),
            });
        }
        OptionKind::Text if !value.is_string() => {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: "expected a string".to_string(),
            });
        }
        OptionKind::Select(choices) => {
            let ok = value.as_str().is_some_and(|v| choices.contains(&v));
            if !ok {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("expected one of {choices:?}"),
                });
            }
        }
        _ => {}
    }

    store
        .mutate(|doc| {
            let mut partial = serde_json::Map::new();
            partial.insert(key.to_string(), value);
            // The schema gate above guarantees the merge deserializes.
            doc.merge(partial)
        })
        .await?
        .map_err(|e| ConfigError::InvalidValue { key: key.to_string(), message: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{ListMode, MemoryBackend, Punishment};
    use serde_json::json;
    use std::sync::Arc;

    async fn store() -> PolicyStore {
        PolicyStore::open(Arc::new(MemoryBackend::new())).await.unwrap()
    }

    #[test]
    fn schema_covers_every_exposed_key() {
        let keys: Vec<_> = SCHEMA.iter().map(|o| o.key).collect();
        assert_eq!(keys, vec![
            "groupListMode",
            "groupListIds",
            "welcomeEnable",
            "welcomeTemplate",
            "filterEnable",
            "filterKeywords",
            "filterPunish",
            "ownerQQs",
        ]);
    }

    #[tokio::test]
    async fn apply_merges_a_single_key() {
        let store = store().await;
        apply(&store, "filterPunish", json!("kick")).await.unwrap();
        apply(&store, "groupListMode", json!("whitelist")).await.unwrap();
        apply(&store, "ownerQQs", json!("1,2")).await.unwrap();

        assert_eq!(store.read(|d| d.filter_punish), Punishment::Kick);
        assert_eq!(store.read(|d| d.group_list_mode), ListMode::Whitelist);
        assert!(store.read(|d| d.is_owner("2")));
        // Untouched keys keep their defaults.
        assert!(store.read(|d| d.welcome_enable));
    }

    #[tokio::test]
    async fn apply_rejects_unknown_keys_and_bad_values() {
        let store = store().await;
        assert!(matches!(
            apply(&store, "nope", json!(1)).await,
            Err(ConfigError::UnknownOption(_))
        ));
        assert!(matches!(
            apply(&store, "welcomeEnable", json!("yes")).await,
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            apply(&store, "filterPunish", json!("banhammer")).await,
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
