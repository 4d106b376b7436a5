use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use rp_app::{
    build_connectivity, build_muskingum, compute_inflow, ensure_weight_table, list_intervals,
    profile_catalog, read_drainage, resolve_profile, run_pipeline_file, write_muskingum,
    write_network, AppResult, NetworkSummary, PipelineResponse, PipelineStage, ProgressEvent,
    write_inspection, ReservoirInput, WeightRequest,
};
use rp_cache::WeightTableStore;
use rp_inflow::InflowOptions;
use rp_muskingum::{KfacFormula, LengthUnit, MuskingumOptions};
use rp_network::{read_connectivity_csv, ConnectivityOptions, DrainageFields, LinkSource};
use rp_weights::{IndexLabels, WeightOptions, WeightTable};

#[derive(Parser)]
#[command(name = "rapidprep")]
#[command(about = "rapidprep - RAPID river routing input preprocessor", long_about = None)]
struct Cli {
    /// Log more detail (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage of a pipeline file
    Run {
        /// Path to the pipeline YAML file
        pipeline_path: PathBuf,
    },
    /// Build the connectivity and basin id files from drainage lines
    Connectivity {
        /// Drainage attributes (CSV, or GeoJSON by extension)
        drainage: PathBuf,
        /// Output connectivity CSV
        #[arg(short, long, default_value = "rapid_connect.csv")]
        output: PathBuf,
        /// Output basin id CSV
        #[arg(long)]
        basin_ids: Option<PathBuf>,
        /// Link reaches through FromNode/ToNode instead of NextDownID
        #[arg(long)]
        node_topology: bool,
        /// Fixed number of upstream columns
        #[arg(long)]
        max_upstream: Option<usize>,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Intersect catchments with the LSM grid
    WeightTable {
        /// Catchment polygons (GeoJSON)
        catchments: PathBuf,
        /// NetCDF file carrying the grid coordinates
        grid: PathBuf,
        /// Connectivity CSV listing every reach
        connectivity: PathBuf,
        /// Grid profile name
        #[arg(short, long)]
        profile: String,
        /// Output weight table CSV
        #[arg(short, long, default_value = "weight_table.csv")]
        output: PathBuf,
        /// Catchment id property
        #[arg(long, default_value = "HydroID")]
        id_field: String,
        /// Catchment CRS when the file declares none (EPSG:4326 or EPSG:3857 only)
        ///
        /// Geographic coordinates (EPSG:4326, CRS84, NAD83, ETRS89) and
        /// spherical Web Mercator (EPSG:3857) are the only accepted systems.
        /// Projected data such as Albers or UTM is rejected; reproject it
        /// to EPSG:4326 first.
        #[arg(long)]
        crs: Option<String>,
        /// Search buffer around catchments, degrees
        #[arg(long)]
        buffer: Option<f64>,
        /// Reach id column name
        #[arg(long, default_value = "rivid")]
        reach_field: String,
        /// Use the west_east/south_north index columns
        #[arg(long)]
        wrf_labels: bool,
        /// Directory for grid point and cell GeoJSON
        #[arg(long)]
        inspect_dir: Option<PathBuf>,
        /// Reuse weight tables stored here
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Extra profile catalog
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Compute lateral inflow volumes from a runoff file
    Inflow {
        /// Weight table CSV
        weight_table: PathBuf,
        /// Runoff NetCDF file
        runoff: PathBuf,
        /// Grid profile name
        #[arg(short, long)]
        profile: String,
        /// Output NetCDF file
        #[arg(short, long, default_value = "m3_riv.nc")]
        output: PathBuf,
        /// Output interval label, e.g. 3hr
        #[arg(long)]
        interval: Option<String>,
        /// Set negative increments to zero
        #[arg(long)]
        clamp_negative: bool,
        /// Extra profile catalog
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Compute Muskingum kfac, k and x files
    Muskingum {
        /// Drainage attributes (CSV, or GeoJSON by extension)
        drainage: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
        /// kfac formula (length_over_celerity, eta_length_sqrt_slope, ...)
        #[arg(long, default_value = "length_over_celerity")]
        formula: KfacFormula,
        /// Wave celerity, m/s
        #[arg(long)]
        celerity: Option<f64>,
        /// Multiplier from kfac to k
        #[arg(long)]
        lambda: Option<f64>,
        /// x of reaches outside reservoirs
        #[arg(long)]
        x: Option<f64>,
        /// Reach lengths are in meters
        #[arg(long)]
        meters: bool,
        /// Reservoir polygons (GeoJSON); their reaches get x = 0
        #[arg(long)]
        reservoirs: Option<PathBuf>,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// List grid profiles
    Profiles {
        /// Extra profile catalog
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// List the output intervals a runoff file supports
    Intervals {
        /// Runoff NetCDF file
        runoff: PathBuf,
        /// Grid profile name
        #[arg(short, long)]
        profile: String,
        /// Extra profile catalog
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// List cached weight tables
    Cached {
        /// Cache directory
        cache_dir: PathBuf,
    },
}

#[derive(clap::Args)]
struct FieldArgs {
    /// Reach id attribute
    #[arg(long, default_value = "HydroID")]
    id_field: String,
    /// Downstream id attribute
    #[arg(long, default_value = "NextDownID")]
    next_down_field: String,
    /// Reach length attribute
    #[arg(long, default_value = "LengthKm")]
    length_field: String,
    /// Reach slope attribute
    #[arg(long, default_value = "Slope")]
    slope_field: String,
}

impl FieldArgs {
    fn fields(&self) -> DrainageFields {
        DrainageFields {
            reach_id: self.id_field.clone(),
            next_down: self.next_down_field.clone(),
            length: self.length_field.clone(),
            slope: self.slope_field.clone(),
            ..DrainageFields::default()
        }
    }
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::Run { pipeline_path } => cmd_run(&pipeline_path),
        Commands::Connectivity {
            drainage,
            output,
            basin_ids,
            node_topology,
            max_upstream,
            fields,
        } => cmd_connectivity(
            &drainage,
            &output,
            basin_ids.as_deref(),
            node_topology,
            max_upstream,
            &fields,
        ),
        Commands::WeightTable {
            catchments,
            grid,
            connectivity,
            profile,
            output,
            id_field,
            crs,
            buffer,
            reach_field,
            wrf_labels,
            inspect_dir,
            cache_dir,
            catalog,
        } => {
            let labels = if wrf_labels {
                IndexLabels::WestEastSouthNorth
            } else {
                IndexLabels::LonLat
            };
            cmd_weight_table(WeightTableArgs {
                catchments: &catchments,
                grid: &grid,
                connectivity: &connectivity,
                profile: &profile,
                output: &output,
                id_field: &id_field,
                crs: crs.as_deref(),
                options: WeightOptions {
                    buffer_deg: buffer,
                    reach_field,
                    labels,
                },
                inspect_dir: inspect_dir.as_deref(),
                cache_dir,
                catalog: catalog.as_deref(),
            })
        }
        Commands::Inflow {
            weight_table,
            runoff,
            profile,
            output,
            interval,
            clamp_negative,
            catalog,
        } => cmd_inflow(
            &weight_table,
            &runoff,
            &profile,
            &output,
            InflowOptions {
                interval,
                clamp_negative,
            },
            catalog.as_deref(),
        ),
        Commands::Muskingum {
            drainage,
            output_dir,
            formula,
            celerity,
            lambda,
            x,
            meters,
            reservoirs,
            fields,
        } => {
            let defaults = MuskingumOptions::default();
            let options = MuskingumOptions {
                formula,
                celerity_mps: celerity.unwrap_or(defaults.celerity_mps),
                lambda_k: lambda.unwrap_or(defaults.lambda_k),
                x_default: x.unwrap_or(defaults.x_default),
                length_unit: if meters {
                    LengthUnit::Meters
                } else {
                    LengthUnit::Kilometers
                },
            };
            cmd_muskingum(&drainage, &output_dir, options, reservoirs.as_deref(), &fields)
        }
        Commands::Profiles { catalog } => cmd_profiles(catalog.as_deref()),
        Commands::Intervals {
            runoff,
            profile,
            catalog,
        } => cmd_intervals(&runoff, &profile, catalog.as_deref()),
        Commands::Cached { cache_dir } => cmd_cached(cache_dir),
    }
}

fn cmd_run(pipeline_path: &Path) -> AppResult<()> {
    println!("Running pipeline: {}", pipeline_path.display());

    let mut last_emit = Instant::now();
    let mut last_stage: Option<PipelineStage> = None;
    let response = run_pipeline_file(
        pipeline_path,
        Some(&mut |event: ProgressEvent| {
            let emit_now = last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    println!("✓ Pipeline completed");
    print_network(&response.network);
    if let Some(rows) = response.weight_rows {
        if response.weights_from_cache {
            println!("  Weight rows: {} (cached)", rows);
        } else {
            println!("  Weight rows: {}", rows);
        }
    }
    if let (Some(steps), Some(interval)) = (response.inflow_steps, &response.interval) {
        println!("  Inflow steps: {} at {}", steps, interval);
    }
    println!("\nOutputs:");
    for path in &response.outputs {
        println!("  {}", path.display());
    }
    print_timing_summary(&response);
    Ok(())
}

fn cmd_connectivity(
    drainage: &Path,
    output: &Path,
    basin_ids: Option<&Path>,
    node_topology: bool,
    max_upstream: Option<usize>,
    fields: &FieldArgs,
) -> AppResult<()> {
    let records = read_drainage(drainage, &fields.fields())?;
    let source = if node_topology {
        LinkSource::NodeTopology
    } else {
        LinkSource::NextDown
    };
    let network = build_connectivity(
        &records,
        source,
        ConnectivityOptions {
            max_upstream,
            ..ConnectivityOptions::default()
        },
    )?;
    write_network(&network, output, basin_ids)?;

    println!("✓ Wrote connectivity to {}", output.display());
    if let Some(path) = basin_ids {
        println!("✓ Wrote basin ids to {}", path.display());
    }
    print_network(&NetworkSummary::of(&network));
    Ok(())
}

struct WeightTableArgs<'a> {
    catchments: &'a Path,
    grid: &'a Path,
    connectivity: &'a Path,
    profile: &'a str,
    output: &'a Path,
    id_field: &'a str,
    crs: Option<&'a str>,
    options: WeightOptions,
    inspect_dir: Option<&'a Path>,
    cache_dir: Option<PathBuf>,
    catalog: Option<&'a Path>,
}

fn cmd_weight_table(args: WeightTableArgs) -> AppResult<()> {
    let catalog = profile_catalog(args.catalog)?;
    let profile = resolve_profile(&catalog, args.profile)?;
    let network = read_connectivity_csv(args.connectivity, ConnectivityOptions::default().outlet_sentinel)?;
    let store = match args.cache_dir {
        Some(dir) => Some(WeightTableStore::new(dir)?),
        None => None,
    };
    let request = WeightRequest {
        catchments: args.catchments,
        id_field: args.id_field,
        crs: args.crs,
        grid: args.grid,
        profile: &profile,
        options: args.options,
        inspect: args.inspect_dir.is_some(),
        cache: store.as_ref(),
    };
    let response = ensure_weight_table(&request, &network.reach_ids())?;
    response.table.write_csv(args.output)?;
    if let Some(dir) = args.inspect_dir {
        std::fs::create_dir_all(dir)?;
        write_inspection(&response, &dir.join("grid_points.geojson"), &dir.join("grid_cells.geojson"))?;
        println!("✓ Wrote grid points and cells to {}", dir.display());
    }

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.key.as_deref().unwrap_or("-"));
    }
    println!("✓ Wrote weight table to {}", args.output.display());
    println!("  Reaches: {}", network.len());
    println!("  Rows: {}", response.table.len());
    if let Some(dummies) = response.dummies {
        println!("  Reaches without catchment: {}", dummies);
    }
    Ok(())
}

fn cmd_inflow(
    weight_table: &Path,
    runoff: &Path,
    profile: &str,
    output: &Path,
    options: InflowOptions,
    catalog: Option<&Path>,
) -> AppResult<()> {
    let catalog = profile_catalog(catalog)?;
    let profile = resolve_profile(&catalog, profile)?;
    let table = WeightTable::read_csv(weight_table)?;

    let started = Instant::now();
    let series = compute_inflow(&table, runoff, &profile, options)?;
    series.write_netcdf(output)?;

    println!("✓ Wrote inflow to {}", output.display());
    println!("  Reaches: {}", series.reach_ids.len());
    println!("  Steps: {} at {}", series.n_steps(), series.interval);
    println!("  Elapsed: {:.3}s", started.elapsed().as_secs_f64());
    Ok(())
}

fn cmd_muskingum(
    drainage: &Path,
    output_dir: &Path,
    options: MuskingumOptions,
    reservoirs: Option<&Path>,
    fields: &FieldArgs,
) -> AppResult<()> {
    let records = read_drainage(drainage, &fields.fields())?;
    let network = build_connectivity(&records, LinkSource::NextDown, ConnectivityOptions::default())?;
    let reservoir_input = reservoirs.map(|path| ReservoirInput {
        drainage,
        id_field: &fields.id_field,
        reservoirs: path,
    });
    let params = build_muskingum(&network, &records, options, reservoir_input.as_ref())?;

    std::fs::create_dir_all(output_dir)?;
    let (kfac, k, x) = (
        output_dir.join("kfac.csv"),
        output_dir.join("k.csv"),
        output_dir.join("x.csv"),
    );
    write_muskingum(&params, &kfac, &k, &x)?;

    println!("✓ Wrote Muskingum parameters to {}", output_dir.display());
    println!("  Formula: {}", kfac_label(&params));
    println!("  Reaches: {}", params.len());
    let reservoir_count = params.x.iter().filter(|&&v| v == 0.0).count();
    if reservoir_count > 0 {
        println!("  Reservoir reaches: {}", reservoir_count);
    }
    Ok(())
}

fn kfac_label(params: &rp_muskingum::MuskingumParameters) -> String {
    match params.eta {
        Some(eta) => format!("eta = {:.6}", eta),
        None => "length / celerity".to_string(),
    }
}

fn cmd_profiles(catalog: Option<&Path>) -> AppResult<()> {
    let catalog = profile_catalog(catalog)?;
    println!("Grid profiles:");
    for entry in &catalog.profiles {
        let profile = &entry.profile;
        let intervals: Vec<&str> = profile.intervals().collect();
        println!("  {} [{}]", profile.name, intervals.join(", "));
        if !profile.description.is_empty() {
            println!("      {}", profile.description);
        }
    }
    Ok(())
}

fn cmd_intervals(runoff: &Path, profile: &str, catalog: Option<&Path>) -> AppResult<()> {
    let catalog = profile_catalog(catalog)?;
    let profile = resolve_profile(&catalog, profile)?;
    let intervals = list_intervals(runoff, &profile)?;
    println!("Intervals for {} ({}):", runoff.display(), profile.name);
    for label in intervals {
        println!("  {}", label);
    }
    Ok(())
}

fn cmd_cached(cache_dir: PathBuf) -> AppResult<()> {
    let store = WeightTableStore::new(cache_dir.clone())?;
    let manifests = store.list()?;
    if manifests.is_empty() {
        println!("No cached weight tables in {}", cache_dir.display());
    } else {
        println!("Cached weight tables:");
        for m in manifests {
            println!(
                "  {} ({}, {} reaches, {} rows, {})",
                m.key, m.profile, m.reaches, m.rows, m.timestamp
            );
        }
    }
    Ok(())
}

fn print_network(summary: &NetworkSummary) {
    println!("  Reaches: {}", summary.reaches);
    println!("  Outlets: {}", summary.outlets);
    println!("  Upstream columns: {}", summary.width);
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &ProgressEvent) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
    let mut line = format!(
        "\r{} {}  elapsed={:.2}s",
        spinner[spin_idx],
        event.stage.label(),
        event.elapsed_wall_s
    );
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {}", msg));
    }
    print!("{}", line);
    let _ = io::stdout().flush();
}

fn print_timing_summary(response: &PipelineResponse) {
    let timing = &response.timing;
    let total = timing.total_time_s.max(1.0e-12);
    let pct = |t: f64| 100.0 * t / total;

    println!("\nTiming summary:");
    println!(
        "  Network:   {:.3}s ({:.1}%)",
        timing.network_time_s,
        pct(timing.network_time_s)
    );
    if response.weight_rows.is_some() {
        println!(
            "  Weights:   {:.3}s ({:.1}%)",
            timing.weights_time_s,
            pct(timing.weights_time_s)
        );
    }
    if response.inflow_steps.is_some() {
        println!(
            "  Inflow:    {:.3}s ({:.1}%)",
            timing.inflow_time_s,
            pct(timing.inflow_time_s)
        );
    }
    if timing.muskingum_time_s > 0.0 {
        println!(
            "  Muskingum: {:.3}s ({:.1}%)",
            timing.muskingum_time_s,
            pct(timing.muskingum_time_s)
        );
    }
    println!(
        "  Write:     {:.3}s ({:.1}%)",
        timing.write_time_s,
        pct(timing.write_time_s)
    );
    println!("  Total:     {:.3}s", timing.total_time_s);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn crs_help_names_the_accepted_systems() {
        let mut cli = Cli::command();
        let weight_table = cli.find_subcommand_mut("weight-table").unwrap();
        let help = weight_table.render_long_help().to_string();
        assert!(help.contains("EPSG:3857"), "{help}");
        assert!(help.contains("Albers"), "{help}");
    }
}
