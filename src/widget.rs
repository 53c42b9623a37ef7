//! Seams onto the external widget manager that owns the bot registry.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::BotRecord;
use crate::utils::warn_once;

/// Surface the ingestion pipeline drives once the owner is reachable.
///
/// The owner keeps the registry; the pipeline only reads a snapshot, swaps
/// in the merged list, and asks the owner to persist and redraw.
#[async_trait]
pub trait WidgetOwner: Send + Sync {
    /// Snapshot of the registry in display order.
    fn bots(&self) -> Vec<BotRecord>;

    /// Replace the registry wholesale. Ordering is the caller's contract.
    fn replace_bots(&self, bots: Vec<BotRecord>);

    /// Persist the registry to the owner's backing store.
    async fn save_bots(&self) -> Result<()>;

    /// Redraw whatever surface shows the expert list.
    fn render_experts(&self);
}

/// Hands out the owner once the host has one. The pipeline polls this
/// instead of reaching into any ambient global.
pub trait OwnerProvider: Send + Sync {
    fn try_owner(&self) -> Option<Arc<dyn WidgetOwner>>;
}

/// Late-bound owner slot for hosts whose manager boots after ingestion
/// starts. The host installs the owner when its own startup finishes.
#[derive(Default)]
pub struct SharedOwnerSlot {
    owner: RwLock<Option<Arc<dyn WidgetOwner>>>,
}

impl SharedOwnerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, owner: Arc<dyn WidgetOwner>) {
        *self.owner.write() = Some(owner);
    }

    pub fn clear(&self) {
        *self.owner.write() = None;
    }
}

impl OwnerProvider for SharedOwnerSlot {
    fn try_owner(&self) -> Option<Arc<dyn WidgetOwner>> {
        self.owner.read().clone()
    }
}

/// Persist then redraw, in that order, once per pass.
///
/// A failed save is warned about and the redraw still happens: the merge is
/// already applied in memory and the page should show it.
pub async fn commit(owner: &dyn WidgetOwner) {
    if let Err(error) = owner.save_bots().await {
        warn_once(&format!("Failed to save bot registry: {error:#}"));
    }
    owner.render_experts();
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use parking_lot::Mutex;

    struct RecordingOwner {
        bots: RwLock<Vec<BotRecord>>,
        fail_save: bool,
        events: Mutex<Vec<&'static str>>,
    }

    impl RecordingOwner {
        fn new(fail_save: bool) -> Self {
            Self {
                bots: RwLock::new(Vec::new()),
                fail_save,
                events: Mutex::new(Vec::new()),
            }
        }

        fn events(&self) -> Vec<&'static str> {
            self.events.lock().clone()
        }
    }

    #[async_trait]
    impl WidgetOwner for RecordingOwner {
        fn bots(&self) -> Vec<BotRecord> {
            self.bots.read().clone()
        }

        fn replace_bots(&self, bots: Vec<BotRecord>) {
            *self.bots.write() = bots;
        }

        async fn save_bots(&self) -> Result<()> {
            self.events.lock().push("save");
            if self.fail_save {
                bail!("disk full");
            }
            Ok(())
        }

        fn render_experts(&self) {
            self.events.lock().push("render");
        }
    }

    #[tokio::test]
    async fn commit_saves_before_rendering() {
        let owner = RecordingOwner::new(false);

        commit(&owner).await;

        assert_eq!(owner.events(), ["save", "render"]);
    }

    #[tokio::test]
    async fn failed_save_still_renders() {
        let owner = RecordingOwner::new(true);

        commit(&owner).await;

        assert_eq!(owner.events(), ["save", "render"]);
    }

    #[test]
    fn slot_hands_out_the_installed_owner() {
        let slot = SharedOwnerSlot::new();
        assert!(slot.try_owner().is_none());

        slot.install(Arc::new(RecordingOwner::new(false)));
        assert!(slot.try_owner().is_some());

        slot.clear();
        assert!(slot.try_owner().is_none());
    }
}
