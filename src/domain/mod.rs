pub mod data_type;
pub mod event;
pub mod series;
pub mod stats;
pub mod winter;
