//! Domain types for StockLab

pub mod observation;
pub mod panel;

pub use observation::{defined, DerivedFields, Observation, TransformedObservation};
pub use panel::{OrderError, Panel, TickerSeries};
