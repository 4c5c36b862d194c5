// Views of a collection narrowed to the selected building.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::{Building, BuildingKey, Entity};
use crate::store::Snapshot;

/// Records belonging to `key`, in collection order. No key, no records.
pub fn filter_by_building<E: Entity>(items: &[Arc<E>], key: Option<&BuildingKey>) -> Vec<Arc<E>> {
    let Some(key) = key else {
        return Vec::new();
    };
    items
        .iter()
        .filter(|e| e.building_key() == key)
        .cloned()
        .collect()
}

/// A filtered view recomputed whenever the collection or the selection
/// changes.
pub struct SelectedView<E: Entity> {
    items: watch::Receiver<Snapshot<E>>,
    selected: watch::Receiver<Option<Arc<Building>>>,
}

impl<E: Entity> SelectedView<E> {
    pub(crate) fn new(
        items: watch::Receiver<Snapshot<E>>,
        selected: watch::Receiver<Option<Arc<Building>>>,
    ) -> Self {
        Self { items, selected }
    }

    /// The filtered records right now.
    pub fn current(&self) -> Vec<Arc<E>> {
        let items = self.items.borrow().clone();
        let selected = self.selected.borrow().clone();
        filter_by_building(&items, selected.as_ref().map(|b| &b.key))
    }

    /// Wait until either input changes, then return the recomputed view.
    /// Returns `None` once either input is gone.
    pub async fn changed(&mut self) -> Option<Vec<Arc<E>>> {
        tokio::select! {
            r = self.items.changed() => r.ok()?,
            r = self.selected.changed() => r.ok()?,
        }
        let items = self.items.borrow_and_update().clone();
        let selected = self.selected.borrow_and_update().clone();
        Some(filter_by_building(
            &items,
            selected.as_ref().map(|b| &b.key),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PvUnit;

    fn pv(id: i64, building: &str) -> Arc<PvUnit> {
        Arc::new(PvUnit {
            id,
            building_key: building.into(),
            peak_power_kwp: 9.8,
            module_count: Some(24),
            azimuth_deg: Some(180.0),
            tilt_deg: Some(30.0),
        })
    }

    #[test]
    fn filters_by_key_preserving_order() {
        let items = vec![pv(1, "B1"), pv(2, "B2"), pv(3, "B1")];
        let key = BuildingKey::from("B1");
        let ids: Vec<i64> = filter_by_building(&items, Some(&key))
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn no_selection_means_no_records() {
        let items = vec![pv(1, "B1")];
        assert!(filter_by_building(&items, None).is_empty());
    }

    #[tokio::test]
    async fn recomputes_when_selection_changes() {
        let (items_tx, items_rx) = watch::channel(Arc::new(vec![pv(1, "B1"), pv(2, "B2")]));
        let (sel_tx, sel_rx) = watch::channel(None);
        let mut view = SelectedView::<PvUnit>::new(items_rx, sel_rx);
        assert!(view.current().is_empty());

        sel_tx.send_replace(Some(Arc::new(Building::new("B2", "School"))));
        let ids: Vec<i64> = view
            .changed()
            .await
            .expect("inputs alive")
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![2]);

        items_tx.send_replace(Arc::new(vec![pv(4, "B2"), pv(5, "B2")]));
        let view_now = view.changed().await.expect("inputs alive");
        assert_eq!(view_now.len(), 2);
    }
}
