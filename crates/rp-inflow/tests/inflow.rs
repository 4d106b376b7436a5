//! InflowComputer integration tests.

use ndarray::{Array1, Array3};
use rp_core::{CellIndex, ReachId};
use rp_grid::{LonConvention, MemoryRunoffSource, NetcdfSource};
use rp_inflow::{
    Accumulation, CoordinateNames, DimensionNames, GridProfile, InflowComputer, InflowOptions,
    InflowSeries, Schedule, Segment,
};
use rp_weights::{IndexLabels, WeightRecord, WeightTable};

fn hourly_profile(accumulation: Accumulation) -> GridProfile {
    GridProfile {
        name: "test".to_string(),
        description: String::new(),
        dimensions: DimensionNames {
            time: "time".to_string(),
            lat: "lat".to_string(),
            lon: "lon".to_string(),
        },
        coordinates: CoordinateNames {
            time: None,
            lon: "lon".to_string(),
            lat: "lat".to_string(),
        },
        runoff_variables: vec!["RO".to_string()],
        unit_scale: 1.0,
        accumulation,
        longitude: LonConvention::Signed,
        schedules: vec![Schedule {
            interval: "1hr".to_string(),
            step_hours: 1.0,
            time_signature: vec![],
            raw_time_len: None,
            segments: vec![Segment {
                start: 0,
                end: None,
                stride: 1,
            }],
        }],
    }
}

fn row(reach_id: ReachId, area: f64, lon: usize, lat: usize, npoints: usize) -> WeightRecord {
    WeightRecord {
        reach_id,
        area_sqm: area,
        cell: CellIndex::new(lon, lat),
        npoints,
        weight: 0.0,
        lon: f64::NAN,
        lat: f64::NAN,
    }
}

fn table(rows: Vec<WeightRecord>) -> WeightTable {
    WeightTable::new("rivid", IndexLabels::LonLat, rows)
}

fn source(data: Array3<f64>) -> MemoryRunoffSource {
    let (nt, ny, nx) = data.dim();
    MemoryRunoffSource::new()
        .with_dimension("time", nt)
        .with_dimension("lat", ny)
        .with_dimension("lon", nx)
        .with_variable("RO", &["time", "lat", "lon"], data.into_dyn())
        .unwrap()
}

#[test]
fn two_point_reach_sums_area_times_increment() {
    let mut data = Array3::zeros((2, 6, 6));
    data[[1, 4, 3]] = 0.01;
    data[[1, 5, 3]] = 0.02;
    let weights = table(vec![row(5, 1000.0, 3, 4, 2), row(5, 2000.0, 3, 5, 2)]);

    let computer = InflowComputer::new(hourly_profile(Accumulation::Cumulative), InflowOptions::default());
    let series = computer.compute(&weights, &source(data)).unwrap();
    assert_eq!(series.reach_ids, vec![5]);
    assert_eq!(series.n_steps(), 2);
    assert_eq!(series.volumes[[0, 0]], 0.0);
    assert!((series.volumes[[1, 0]] - 50.0).abs() < 1e-9);
}

#[test]
fn single_point_reach_is_area_times_increment() {
    let cumulative = [0.5, 0.75, 0.75, 1.5, 1.25];
    let data = Array3::from_shape_fn((5, 2, 3), |(t, j, i)| {
        if (j, i) == (1, 2) {
            cumulative[t]
        } else {
            9.0
        }
    });
    let area = 1234.5;
    let weights = table(vec![row(42, area, 2, 1, 1), row(43, 0.0, 0, 0, 1)]);

    let computer = InflowComputer::new(hourly_profile(Accumulation::Cumulative), InflowOptions::default());
    let series = computer.compute(&weights, &source(data.clone())).unwrap();
    let expected: Vec<f64> = [0.5, 0.25, 0.0, 0.75, -0.25].iter().map(|d| area * d).collect();
    let got = series.reach(42).unwrap().to_vec();
    for (g, e) in got.iter().zip(&expected) {
        assert!((g - e).abs() < 1e-9, "{got:?} vs {expected:?}");
    }
    // zero-area dummy row yields zero inflow
    assert!(series.reach(43).unwrap().iter().all(|&v| v == 0.0));

    let clamped = InflowComputer::new(
        hourly_profile(Accumulation::Cumulative),
        InflowOptions {
            clamp_negative: true,
            ..Default::default()
        },
    )
    .compute(&weights, &source(data))
    .unwrap();
    assert_eq!(clamped.reach(42).unwrap()[4], 0.0);
}

fn highres_profile() -> GridProfile {
    let seg = |start, end, stride| Segment {
        start,
        end: Some(end),
        stride,
    };
    let schedule = |interval: &str, hours, segments| Schedule {
        interval: interval.to_string(),
        step_hours: hours,
        time_signature: vec![1.0, 3.0, 6.0],
        raw_time_len: Some(125),
        segments,
    };
    let mut profile = hourly_profile(Accumulation::Cumulative);
    profile.coordinates.time = Some("time".to_string());
    profile.schedules = vec![
        schedule("1hr", 1.0, vec![seg(0, 90, 1)]),
        schedule("3hr", 3.0, vec![seg(0, 90, 3), seg(90, 108, 1)]),
        schedule("6hr", 6.0, vec![seg(0, 90, 6), seg(90, 108, 2), seg(108, 124, 1)]),
    ];
    profile
}

fn highres_source() -> MemoryRunoffSource {
    let mut hours: Vec<f64> = (0..=90).map(f64::from).collect();
    hours.extend((1..=18).map(|k| 90.0 + 3.0 * f64::from(k)));
    hours.extend((1..=16).map(|k| 144.0 + 6.0 * f64::from(k)));
    // one meter of runoff per hour, accumulated
    let data = Array3::from_shape_fn((125, 2, 2), |(t, _, _)| hours[t]);
    source(data)
        .with_variable("time", &["time"], Array1::from(hours).into_dyn())
        .unwrap()
}

#[test]
fn highres_three_hourly_has_49_steps() {
    let weights = table(vec![row(1, 1.0, 0, 0, 1)]);
    let src = highres_source();

    let three = InflowComputer::new(
        highres_profile(),
        InflowOptions {
            interval: Some("3hr".to_string()),
            ..Default::default()
        },
    )
    .compute(&weights, &src)
    .unwrap();
    assert_eq!(three.n_steps(), 49);
    assert_eq!(three.interval, "3hr");
    let col = three.reach(1).unwrap();
    assert_eq!(col[0], 0.0);
    assert_eq!(col[1], 3.0);
    assert_eq!(col[30], 3.0);
    assert_eq!(col[48], 3.0);

    // coarsest interval by default
    let default = InflowComputer::new(highres_profile(), InflowOptions::default())
        .compute(&weights, &src)
        .unwrap();
    assert_eq!((default.n_steps(), default.interval.as_str()), (41, "6hr"));

    let unknown = InflowComputer::new(
        highres_profile(),
        InflowOptions {
            interval: Some("12hr".to_string()),
            ..Default::default()
        },
    )
    .compute(&weights, &src)
    .unwrap_err();
    assert!(unknown.is_configuration());
}

#[test]
fn summed_variables_and_unit_scale() {
    let mut profile = hourly_profile(Accumulation::Incremental);
    profile.dimensions = DimensionNames {
        time: "Time".to_string(),
        lat: "south_north".to_string(),
        lon: "west_east".to_string(),
    };
    profile.runoff_variables = vec!["SFCRNOFF".into(), "INTRFLOW".into(), "UGDRNOFF".into()];
    profile.unit_scale = 0.001;

    let dims = ["Time", "south_north", "west_east"];
    let field = |v: f64| Array3::from_elem((3, 2, 2), v).into_dyn();
    let src = MemoryRunoffSource::new()
        .with_dimension("Time", 3)
        .with_dimension("south_north", 2)
        .with_dimension("west_east", 2)
        .with_variable("SFCRNOFF", &dims, field(1.0))
        .unwrap()
        .with_variable("INTRFLOW", &dims, field(2.0))
        .unwrap()
        .with_variable("UGDRNOFF", &dims, field(3.0))
        .unwrap();

    let weights = WeightTable::new(
        "COMID",
        IndexLabels::WestEastSouthNorth,
        vec![row(8, 1000.0, 1, 1, 1)],
    );
    let series = InflowComputer::new(profile, InflowOptions::default())
        .compute(&weights, &src)
        .unwrap();
    assert_eq!(series.reach_field, "COMID");
    for &v in series.volumes.iter() {
        assert!((v - 6.0).abs() < 1e-12);
    }
}

#[test]
fn validation_failures() {
    let computer = InflowComputer::new(hourly_profile(Accumulation::Cumulative), InflowOptions::default());
    let data = Array3::zeros((2, 3, 3));

    let empty = computer.compute(&table(vec![]), &source(data.clone())).unwrap_err();
    assert!(empty.is_configuration());

    let outside = computer
        .compute(&table(vec![row(1, 1.0, 3, 0, 1)]), &source(data.clone()))
        .unwrap_err();
    assert!(outside.is_data_validation());

    let bad_npoints = computer
        .compute(&table(vec![row(1, 1.0, 0, 0, 2)]), &source(data.clone()))
        .unwrap_err();
    assert!(bad_npoints.is_configuration());

    // (time, lon, lat) instead of (time, lat, lon)
    let transposed = MemoryRunoffSource::new()
        .with_dimension("time", 2)
        .with_dimension("lat", 3)
        .with_dimension("lon", 3)
        .with_variable("RO", &["time", "lon", "lat"], data.into_dyn())
        .unwrap();
    let err = computer
        .compute(&table(vec![row(1, 1.0, 0, 0, 1)]), &transposed)
        .unwrap_err();
    assert!(err.is_data_validation());
}

#[test]
fn netcdf_runoff_to_inflow_file() {
    let dir = std::env::temp_dir().join("rp_inflow_tests");
    std::fs::create_dir_all(&dir).unwrap();
    let runoff_path = dir.join("runoff.nc");

    let mut file = netcdf::create(&runoff_path).unwrap();
    file.add_unlimited_dimension("time").unwrap();
    file.add_dimension("lat", 2).unwrap();
    file.add_dimension("lon", 2).unwrap();
    let mut ro = file.add_variable::<f32>("RO", &["time", "lat", "lon"]).unwrap();
    // cumulative: 0, 1, 3 meters in every cell
    let values: Vec<f32> = [0.0f32, 1.0, 3.0]
        .iter()
        .flat_map(|&v| std::iter::repeat(v).take(4))
        .collect();
    ro.put_values(&values, vec![0..3, 0..2, 0..2].as_slice()).unwrap();
    drop(file);

    let src = NetcdfSource::open(&runoff_path).unwrap();
    let weights = table(vec![row(11, 10.0, 1, 0, 2), row(11, 30.0, 0, 1, 2)]);
    let series = InflowComputer::new(hourly_profile(Accumulation::Cumulative), InflowOptions::default())
        .compute(&weights, &src)
        .unwrap();
    assert_eq!(series.reach(11).unwrap().to_vec(), vec![0.0, 40.0, 80.0]);

    let out = dir.join("m3_riv.nc");
    series.write_netcdf(&out).unwrap();
    let back = InflowSeries::read_netcdf(&out).unwrap();
    assert_eq!(back.reach_field, "rivid");
    assert_eq!(back.volumes, series.volumes);
}
