//! NetcdfSource integration tests over files written with libnetcdf.

use ndarray::Array3;
use rp_grid::{GridError, LonConvention, LsmGrid, NetcdfSource, RunoffSource, Window};

fn temp_path(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("rp_grid_tests");
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

const FILL: i16 = -32767;

/// 4 time steps on a 3 x 5 grid; RO packed as short with scale 0.001 and
/// one fill value in the last step.
fn write_runoff_file(path: &std::path::Path) -> Array3<f64> {
    let (nt, ny, nx) = (4, 3, 5);
    let mut expected = Array3::from_shape_fn((nt, ny, nx), |(t, j, i)| {
        (t * 100 + j * 10 + i) as f64 * 0.001
    });
    expected[[3, 2, 4]] = 0.0;

    let mut file = netcdf::create(path).unwrap();
    file.add_unlimited_dimension("time").unwrap();
    file.add_dimension("lat", ny).unwrap();
    file.add_dimension("lon", nx).unwrap();
    file.add_attribute("Conventions", "CF-1.6").unwrap();

    let mut lon = file.add_variable::<f64>("lon", &["lon"]).unwrap();
    lon.put_values(&[0.0, 90.0, 180.0, 270.0, 359.0], ..).unwrap();
    let mut lat = file.add_variable::<f32>("lat", &["lat"]).unwrap();
    lat.put_values(&[10.0f32, 0.0, -10.0], ..).unwrap();
    let mut time = file.add_variable::<i32>("time", &["time"]).unwrap();
    time.put_values(&[0, 6, 12, 18], vec![0..nt].as_slice()).unwrap();

    let mut ro = file.add_variable::<i16>("RO", &["time", "lat", "lon"]).unwrap();
    ro.put_attribute("_FillValue", FILL).unwrap();
    ro.put_attribute("scale_factor", 0.001f64).unwrap();
    let mut packed: Vec<i16> = (0..nt)
        .flat_map(move |t| {
            (0..ny).flat_map(move |j| (0..nx).map(move |i| (t * 100 + j * 10 + i) as i16))
        })
        .collect();
    *packed.last_mut().unwrap() = FILL;
    ro.put_values(&packed, vec![0..nt, 0..ny, 0..nx].as_slice())
        .unwrap();
    expected
}

#[test]
fn netcdf4_file_reads_as_runoff_source() {
    let path = temp_path("runoff_header.nc");
    write_runoff_file(&path);

    let src = NetcdfSource::open(&path).unwrap();
    assert_eq!(src.dimensions().resolve("TIME"), Some("time"));
    assert_eq!(src.dimension_len("time"), Some(4));
    assert_eq!(
        src.variable_dims("RO").unwrap(),
        vec!["time".to_string(), "lat".to_string(), "lon".to_string()]
    );
    let times = src.read_coordinate("time").unwrap();
    assert_eq!(times.as_slice().unwrap(), &[0.0, 6.0, 12.0, 18.0]);

    let grid = LsmGrid::from_source(&src, "LON", "Lat", LonConvention::Signed).unwrap();
    assert_eq!(grid.n_lon(), 5);
    assert_eq!(grid.n_lat(), 3);
    assert_eq!(grid.point(rp_core::CellIndex::new(4, 2)), (-1.0, -10.0));
}

#[test]
fn window_read_matches_full_array() {
    let path = temp_path("runoff_window.nc");
    let expected = write_runoff_file(&path);
    let src = NetcdfSource::open(&path).unwrap();

    let window = Window {
        lat: 1..3,
        lon: 2..5,
    };
    let block = src.read_window("RO", &window).unwrap();
    assert_eq!(block.dim(), (4, 2, 3));
    for t in 0..4 {
        for j in 0..2 {
            for i in 0..3 {
                let want = expected[[t, j + 1, i + 2]];
                assert!((block[[t, j, i]] - want).abs() < 1e-12);
            }
        }
    }
    // the fill value became zero runoff
    assert_eq!(block[[3, 1, 2]], 0.0);
}

#[test]
fn window_reads_check_rank_and_bounds() {
    let path = temp_path("runoff_bounds.nc");
    write_runoff_file(&path);
    let src = NetcdfSource::open(&path).unwrap();

    let outside = Window {
        lat: 2..4,
        lon: 0..1,
    };
    assert!(matches!(
        src.read_window("RO", &outside),
        Err(GridError::OutOfRange { .. })
    ));
    let whole = Window {
        lat: 0..1,
        lon: 0..1,
    };
    assert!(matches!(
        src.read_window("lon", &whole),
        Err(GridError::Shape { .. })
    ));
    assert!(matches!(
        src.read_window("SRO", &whole),
        Err(GridError::MissingVariable { .. })
    ));
}
