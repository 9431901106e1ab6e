pub mod breakup_events;
pub mod climate_stats;
pub mod download_metadata;
pub mod folder_setup;
pub mod logging;
pub mod percentiles;
pub mod project_config;
pub mod sampling;
pub mod series_csv;
pub mod stats_plot;
pub mod usgs_api;
pub mod winter_folding;
pub mod winter_plot;
