// survey-api: Async client for the survey backend (command invocation + pushed events)

pub mod backend;
pub mod commands;
pub mod error;
pub mod events;
pub mod invoke;
pub mod records;
pub mod transport;

pub use backend::{Backend, HttpBackend};
pub use error::Error;
pub use events::{BackendEvent, EventStream, ReconnectConfig};
pub use invoke::InvokeClient;
pub use records::{
    Building, BuildingKey, BuildingUpdate, Fixture, FixtureKind, FixtureUpdate, Glazing, NewFixture,
    NewUtility, PvUnit, Room, Utility, UtilityKind,
};
pub use transport::TransportConfig;
