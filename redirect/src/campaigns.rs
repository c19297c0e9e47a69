use crate::config::CampaignConfig;
use rotation::memory::MemoryStore;
use rotation::types::Campaign;
use std::collections::HashMap;
use std::sync::Arc;

/// Configured campaigns, keyed by slug.
pub struct Campaigns {
    by_slug: HashMap<String, Arc<Campaign>>,
}

impl Campaigns {
    /// Registers every campaign and seeds `store` with its phone pool, in
    /// configured order.
    pub fn load(configs: &[CampaignConfig], store: &MemoryStore) -> Self {
        let mut by_slug = HashMap::with_capacity(configs.len());

        for config in configs {
            for phone in &config.phones {
                store.add_phone(&config.id, phone.entry());
            }
            by_slug.insert(config.slug.clone(), Arc::new(config.campaign()));

            tracing::info!(
                campaign_id = %config.id,
                slug = %config.slug,
                mode = %config.rotation_mode,
                phones = config.phones.len(),
                "loaded campaign"
            );
        }

        Campaigns { by_slug }
    }

    pub fn get(&self, slug: &str) -> Option<Arc<Campaign>> {
        self.by_slug.get(slug).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_slug.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slug.is_empty()
    }
}
