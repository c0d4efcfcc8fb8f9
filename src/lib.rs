//! Soil saturated hydraulic conductivity (Ksat) and runoff estimation.
//!
//! Pipeline: soil input (manual fractions or a coordinate) → feature
//! assembly with texture classification → Ksat regressor → runoff
//! coefficient. Served over HTTP by `ksat_server` and from the command line
//! by `runoff_coefficient`.

pub mod config;
pub mod features;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod predictor;
pub mod report;
pub mod runoff;
pub mod server;
pub mod service;
pub mod simulation;
pub mod texture;
