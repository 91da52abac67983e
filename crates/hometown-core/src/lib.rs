// Library root: configuration, dataset loading and the city aggregation /
// ranking pipeline shared by the enrichment client and the binary.

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod pipeline;
pub mod rank;
pub mod stats;
pub mod top_cities;
