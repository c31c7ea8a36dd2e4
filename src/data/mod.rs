//! Data module - CSV loading, base table preparation and filtering

pub mod boundaries;
mod loader;
pub mod mappings;
mod processor;

pub use loader::{DataLoader, LoaderError};
pub use processor::{
    CountrySelection, DataProcessor, UnmappedActivityPolicy, ACTIVE_STATE, COUNTRY, LATITUDE,
    LONGITUDE, TYPE, VOLCANO_NAME,
};
