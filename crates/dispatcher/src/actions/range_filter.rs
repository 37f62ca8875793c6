//! RangeFilterAction - daily refresh of the location-based species list
//!
//! Runs at most once per calendar day: the refresh is skipped while the
//! stored `last_updated` date is current. The new list and date are
//! swapped into live settings under the write lock in one step.

use std::sync::Arc;

use chrono::Utc;
use contracts::{ActionError, RangeModel, SettingsHandle};
use tracing::{debug, info, instrument};

/// Refreshes `range_filter.included_species` from the range model
pub struct RangeFilterAction {
    settings: SettingsHandle,
    model: Arc<dyn RangeModel>,
}

impl RangeFilterAction {
    pub fn new(settings: SettingsHandle, model: Arc<dyn RangeModel>) -> Self {
        Self { settings, model }
    }

    pub fn describe(&self) -> String {
        "Refresh range filter species list".to_string()
    }

    #[instrument(name = "range_filter_execute", skip(self))]
    pub async fn execute(&mut self) -> Result<(), ActionError> {
        let today = Utc::now().date_naive();
        let range_filter = self.settings.snapshot().await.range_filter;

        if !range_filter.enabled {
            return Ok(());
        }
        if today <= range_filter.last_updated {
            debug!(%today, "Range filter already refreshed today");
            return Ok(());
        }

        let candidates = self.model.probable_species(today).await?;
        let included: Vec<String> = candidates.into_iter().map(|s| s.label).collect();

        info!(species_count = included.len(), %today, "Updated range filter species list");

        self.settings
            .update(|settings| {
                settings.range_filter.included_species = included;
                settings.range_filter.last_updated = today;
            })
            .await;

        Ok(())
    }
}
