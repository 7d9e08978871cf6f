//! The moderation decision engine.
//!
//! Every inbound message or membership event first passes the access filter;
//! if allowed, it is offered in strict order to the nickname guard (passive
//! correction), the target filter, the keyword filter, then the command
//! router. Each stage may consume the event, in which case later stages do
//! not run. All mutating stages persist through the policy store before
//! emitting a user-visible acknowledgement.

use crate::Flow;
use crate::event::{MessageEvent, NoticeEvent};
use crate::gateway::{ActionGateway, GroupActions};
use crate::handlers::Registry;
use crate::policy::{PolicyBackend, PolicyStore};
use crate::{access, guard, keyword, target};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The engine: policy store, action gateway, and the command registry.
pub struct Engine {
    store: PolicyStore,
    actions: GroupActions,
    registry: Registry,
}

impl Engine {
    /// Create the engine: load the policy document (or initialize defaults
    /// and persist them) and build the command registry.
    pub async fn new(
        backend: Arc<dyn PolicyBackend>,
        gateway: Arc<dyn ActionGateway>,
    ) -> Result<Self, crate::error::StoreError> {
        let store = PolicyStore::open(backend).await?;
        info!("moderation engine ready");
        Ok(Self { store, actions: GroupActions::new(gateway), registry: Registry::new() })
    }

    /// The policy store, for the configuration surface and tests.
    pub fn store(&self) -> &PolicyStore {
        &self.store
    }

    /// Handle an inbound message event.
    pub async fn handle_message(&self, ev: &MessageEvent) {
        if !ev.is_group() {
            return;
        }
        if !self.store.read(|doc| access::allowed(doc, &ev.group_id)) {
            // Denied groups are simply not managed.
            return;
        }

        let is_admin = self.is_admin(ev);

        // Passive nickname correction never consumes the message.
        guard::passive_check(&self.store, &self.actions, ev).await;

        if target::enforce(&self.store, &self.actions, ev, is_admin).await == Flow::Stop {
            return;
        }

        let doc = self.store.snapshot();
        if keyword::enforce(&doc, &self.actions, ev, is_admin).await == Flow::Stop {
            return;
        }

        self.registry.dispatch(&self.store, &self.actions, ev, is_admin).await;
    }

    /// Handle an inbound notice event.
    pub async fn handle_notice(&self, ev: &NoticeEvent) {
        let Some(group_id) = ev.group_id.as_deref() else {
            return;
        };
        if !self.store.read(|doc| access::allowed(doc, group_id)) {
            return;
        }

        if ev.is_member_join() {
            let Some(user_id) = ev.user_id.as_deref() else {
                return;
            };

            // A joining member holding a lock gets a deferred corrective
            // rename; immediate renames race the platform's own post-join
            // processing.
            let has_lock =
                self.store.read(|doc| doc.lock_for(group_id, user_id).is_some());
            if has_lock {
                debug!(group = %group_id, user = %user_id, "scheduling entry rename");
                guard::schedule_entry_check(
                    self.store.clone(),
                    self.actions.clone(),
                    group_id.to_string(),
                    user_id.to_string(),
                );
            }

            if self.store.read(|doc| doc.welcome_enable) {
                self.send_welcome(group_id, user_id).await;
            }
        } else if ev.is_card_change() {
            guard::reactive_check(&self.store, &self.actions, ev).await;
        }
    }

    /// Administrator = platform-reported elevated role, or membership in the
    /// configured owner-identifier set. The override exists because some
    /// platform roles under-report trust level.
    fn is_admin(&self, ev: &MessageEvent) -> bool {
        ev.sender.role.is_elevated() || self.store.read(|doc| doc.is_owner(&ev.user_id))
    }

    /// Greet a new member, mentioning them and rendering the template.
    async fn send_welcome(&self, group_id: &str, user_id: &str) {
        // Resolve the joiner's display name; any failure falls back to the id.
        let nickname = match self.actions.get_group_member_info(group_id, user_id).await {
            Ok(info) => {
                let data = &info["data"];
                [&data["nickname"], &data["card"]]
                    .iter()
                    .find_map(|v| v.as_str().filter(|s| !s.is_empty()))
                    .map(str::to_string)
                    .unwrap_or_else(|| user_id.to_string())
            }
            Err(_) => user_id.to_string(),
        };

        let template = self.store.read(|doc| doc.welcome_template.clone());
        let text =
            template.replace("{nickname}", &nickname).replace("{user_id}", user_id);

        let segments = json!([
            { "type": "at", "data": { "qq": user_id } },
            { "type": "text", "data": { "text": format!(" {text}") } }
        ]);
        if let Err(e) = self.actions.send_segments(group_id, segments).await {
            warn!(group = %group_id, user = %user_id, error = %e, "welcome message failed");
        }
    }
}
