pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod store;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{seed_demo_catalog, SeedSummary};
pub use store::{DiscoveryStore, InMemoryDiscoveryStore, SqlDiscoveryStore, StoreError};
