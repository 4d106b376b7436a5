//! End-to-end pipeline: connectivity, weights, inflow and Muskingum files.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rp_cache::WeightTableStore;
use rp_inflow::InflowOptions;
use rp_project::PipelineConfig;
use rp_weights::WeightOptions;

use crate::error::AppResult;
use crate::inflow_service::compute_inflow;
use crate::muskingum_service::{build_muskingum, ReservoirInput};
use crate::network_service::{
    build_connectivity, connectivity_options, drainage_fields, link_source, read_drainage,
    write_network, NetworkSummary,
};
use crate::profile_service::{profile_catalog, resolve_profile};
use crate::progress::{PipelineStage, ProgressEvent};
use crate::weight_service::{ensure_weight_table, index_labels, write_inspection, WeightRequest};

/// Wall-clock time per stage.
#[derive(Debug, Clone, Default)]
pub struct PipelineTiming {
    pub network_time_s: f64,
    pub weights_time_s: f64,
    pub inflow_time_s: f64,
    pub muskingum_time_s: f64,
    pub write_time_s: f64,
    pub total_time_s: f64,
}

#[derive(Debug, Clone)]
pub struct PipelineResponse {
    pub network: NetworkSummary,
    pub weight_rows: Option<usize>,
    pub weight_key: Option<String>,
    pub weights_from_cache: bool,
    pub inflow_steps: Option<usize>,
    pub interval: Option<String>,
    /// Files written, in order.
    pub outputs: Vec<PathBuf>,
    pub timing: PipelineTiming,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(ProgressEvent)>,
    stage: PipelineStage,
    started: Instant,
    message: impl Into<String>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(ProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            Some(message.into()),
        ));
    }
}

/// Load a pipeline file and run it.
pub fn run_pipeline_file(
    path: &Path,
    mut progress_cb: Option<&mut dyn FnMut(ProgressEvent)>,
) -> AppResult<PipelineResponse> {
    let started = Instant::now();
    emit_progress(&mut progress_cb, PipelineStage::LoadingPipeline, started, "Loading pipeline");
    let config = rp_project::load_pipeline(path)?;
    run_pipeline(&config, progress_cb)
}

pub fn run_pipeline(
    config: &PipelineConfig,
    mut progress_cb: Option<&mut dyn FnMut(ProgressEvent)>,
) -> AppResult<PipelineResponse> {
    let started = Instant::now();
    let mut timing = PipelineTiming::default();

    let catalog = profile_catalog(config.profiles.as_deref())?;
    rp_project::validate_pipeline(config, &catalog).map_err(rp_project::ProjectError::from)?;
    let profile = resolve_profile(&catalog, &config.profile)?;
    let outputs = &config.outputs;

    // Network
    let stage_started = Instant::now();
    emit_progress(&mut progress_cb, PipelineStage::ReadingDrainage, started, "Reading drainage lines");
    let fields = drainage_fields(&config.network.fields);
    let records = read_drainage(&config.network.drainage, &fields)?;
    emit_progress(
        &mut progress_cb,
        PipelineStage::BuildingConnectivity,
        started,
        format!("Building connectivity for {} reaches", records.len()),
    );
    let network = build_connectivity(
        &records,
        link_source(config.network.link_source),
        connectivity_options(&config.network),
    )?;
    timing.network_time_s = stage_started.elapsed().as_secs_f64();

    // Weights
    let mut weights = None;
    if let Some(def) = &config.weights {
        let stage_started = Instant::now();
        emit_progress(&mut progress_cb, PipelineStage::ReadingGrid, started, "Reading grid coordinates");
        let store = match &config.cache_dir {
            Some(dir) => Some(WeightTableStore::new(dir.clone())?),
            None => None,
        };
        if store.is_some() {
            emit_progress(&mut progress_cb, PipelineStage::CheckingCache, started, "Checking weight table cache");
        }
        let request = WeightRequest {
            catchments: &def.catchments,
            id_field: &def.catchment_id_field,
            crs: def.crs.as_deref(),
            grid: &def.grid,
            profile: &profile,
            options: WeightOptions {
                buffer_deg: def.buffer_deg,
                reach_field: def.reach_field.clone(),
                labels: index_labels(def.index_labels),
            },
            inspect: def.inspect,
            cache: store.as_ref(),
        };
        emit_progress(&mut progress_cb, PipelineStage::BuildingWeights, started, "Intersecting catchments with grid cells");
        let response = ensure_weight_table(&request, &network.reach_ids())?;
        if response.loaded_from_cache {
            emit_progress(&mut progress_cb, PipelineStage::LoadingCachedWeights, started, "Loaded cached weight table");
        }
        timing.weights_time_s = stage_started.elapsed().as_secs_f64();
        weights = Some(response);
    }

    // Inflow
    let mut inflow = None;
    if let (Some(def), Some(w)) = (&config.inflow, &weights) {
        let stage_started = Instant::now();
        emit_progress(&mut progress_cb, PipelineStage::ComputingInflow, started, "Computing lateral inflow");
        let series = compute_inflow(
            &w.table,
            &def.runoff,
            &profile,
            InflowOptions {
                interval: def.interval.clone(),
                clamp_negative: def.clamp_negative,
            },
        )?;
        timing.inflow_time_s = stage_started.elapsed().as_secs_f64();
        inflow = Some(series);
    }

    // Muskingum
    let mut muskingum = None;
    if let Some(def) = &config.muskingum {
        let stage_started = Instant::now();
        emit_progress(&mut progress_cb, PipelineStage::ComputingMuskingum, started, "Computing Muskingum parameters");
        let reservoirs = def.reservoirs.as_deref().map(|path| ReservoirInput {
            drainage: &config.network.drainage,
            id_field: &config.network.fields.reach_id,
            reservoirs: path,
        });
        let params = build_muskingum(&network, &records, def.options.clone(), reservoirs.as_ref())?;
        timing.muskingum_time_s = stage_started.elapsed().as_secs_f64();
        muskingum = Some(params);
    }

    // Outputs, only once every stage succeeded
    let stage_started = Instant::now();
    emit_progress(&mut progress_cb, PipelineStage::WritingOutputs, started, "Writing outputs");
    std::fs::create_dir_all(&outputs.dir)?;
    let mut written = Vec::new();

    let connectivity = outputs.path(&outputs.connectivity);
    let basin_ids = outputs.path(&outputs.basin_ids);
    write_network(&network, &connectivity, Some(&basin_ids))?;
    written.extend([connectivity, basin_ids]);

    if let Some(w) = &weights {
        let path = outputs.path(&outputs.weight_table);
        w.table.write_csv(&path)?;
        written.push(path);
        if config.weights.as_ref().is_some_and(|d| d.inspect) {
            let (points, cells) = (outputs.path(&outputs.grid_points), outputs.path(&outputs.grid_cells));
            write_inspection(w, &points, &cells)?;
            written.extend([points, cells]);
        }
    }
    if let Some(series) = &inflow {
        let path = outputs.path(&outputs.inflow);
        series.write_netcdf(&path)?;
        written.push(path);
    }
    if let Some(params) = &muskingum {
        let (kfac, k, x) = (
            outputs.path(&outputs.kfac),
            outputs.path(&outputs.k),
            outputs.path(&outputs.x),
        );
        params.write_files(&kfac, &k, &x)?;
        written.extend([kfac, k, x]);
    }
    timing.write_time_s = stage_started.elapsed().as_secs_f64();
    timing.total_time_s = started.elapsed().as_secs_f64();

    emit_progress(&mut progress_cb, PipelineStage::Completed, started, "Pipeline completed");
    tracing::info!(
        pipeline = %config.name,
        reaches = network.len(),
        outputs = written.len(),
        total_s = timing.total_time_s,
        "pipeline finished"
    );

    Ok(PipelineResponse {
        network: NetworkSummary::of(&network),
        weight_rows: weights.as_ref().map(|w| w.table.len()),
        weight_key: weights.as_ref().and_then(|w| w.key.clone()),
        weights_from_cache: weights.as_ref().is_some_and(|w| w.loaded_from_cache),
        inflow_steps: inflow.as_ref().map(|s| s.n_steps()),
        interval: inflow.as_ref().map(|s| s.interval.clone()),
        outputs: written,
        timing,
    })
}
