//! Shared application service layer for rapidprep.
//!
//! Wraps the pipeline stages behind one interface for the CLI: reading
//! inputs, caching weight tables, reporting progress and writing outputs.

pub mod error;
pub mod inflow_service;
pub mod muskingum_service;
pub mod network_service;
pub mod pipeline;
pub mod profile_service;
pub mod progress;
pub mod weight_service;

// Re-export key types for convenience
pub use error::{AppError, AppResult};
pub use inflow_service::{compute_inflow, list_intervals};
pub use muskingum_service::{build_muskingum, flag_reservoirs, write_muskingum, ReservoirInput};
pub use network_service::{
    build_connectivity, connectivity_options, drainage_fields, link_source, read_drainage,
    write_network, NetworkSummary,
};
pub use pipeline::{run_pipeline, run_pipeline_file, PipelineResponse, PipelineTiming};
pub use profile_service::{profile_catalog, resolve_profile};
pub use progress::{PipelineStage, ProgressEvent};
pub use weight_service::{
    ensure_weight_table, index_labels, load_grid, write_inspection, WeightRequest, WeightResponse,
};
