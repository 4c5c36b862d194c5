// survey-core: Reactive survey state between survey-api and consumers (CLI).

pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod provider;
pub mod reload;
pub mod selection;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::SessionConfig;
pub use error::CoreError;
pub use notify::{Notification, NotificationChannel, NotificationFeed, NotificationId, NotificationKind};
pub use provider::{MountedProvider, Operation, Provider, UpdateOutcome};
pub use reload::{CompletionHandle, ParticipantId, ReloadCoordinator, ReloadSignal, SwitchPhase};
pub use selection::SelectionContext;
pub use session::Session;
pub use store::{EntityCollection, Snapshot};
pub use stream::SelectedView;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Records
    Building, BuildingKey, Fixture, FixtureKey, PvUnit, Room, Utility,
    // Requests
    BuildingUpdate, FixtureUpdate, NewFixture, NewUtility,
    // Supporting types
    EntityKind, FixtureKind, Glazing, UtilityKind, ValidationErrors,
};

pub use survey_api::{Backend, BackendEvent, HttpBackend};
