// ── Reactive entity views ──
//
// Collection subscriptions narrowed to the selected building.

mod selected;

pub use selected::{SelectedView, filter_by_building};
