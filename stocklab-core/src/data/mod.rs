//! Panel I/O and persistence

pub mod frame;
pub mod ingest;
pub mod schema;
pub mod store;

pub use frame::{
    dataframe_to_observations, dataframe_to_transformed, observations_to_dataframe,
    transformed_to_dataframe,
};
pub use ingest::{read_panel_csv, write_transformed_csv, DataError};
pub use schema::{columns, PanelSchema, SchemaError};
pub use store::{InsertSummary, ObservationStore, StoreError, StoreMeta};
