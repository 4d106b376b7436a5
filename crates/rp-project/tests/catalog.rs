use rp_inflow::Accumulation;
use rp_project::{builtin_catalog, load_catalog, save_catalog, ProfileCatalog, ValidationError};

#[test]
fn builtin_profiles_load_and_validate() {
    let catalog = builtin_catalog().unwrap();
    assert_eq!(
        catalog.names(),
        vec!["ecmwf_lowres", "ecmwf_highres", "wrf_hydro", "gldas", "nldas"]
    );

    let highres = catalog.profile("ECMWF_HighRes").unwrap();
    let steps: Vec<usize> = highres
        .schedules
        .iter()
        .map(|s| s.output_len(125).unwrap())
        .collect();
    assert_eq!(steps, vec![91, 49, 41]);

    let lowres = catalog.profile("ecmwf_lowres").unwrap();
    assert_eq!(lowres.schedules[0].output_len(61).unwrap(), 61);

    let wrf = catalog.profile("wrf_hydro").unwrap();
    assert_eq!(wrf.runoff_variables.len(), 3);
    assert_eq!(wrf.unit_scale, 0.001);
    assert_eq!(wrf.accumulation, Accumulation::Cumulative);
    assert_eq!(
        catalog.profile("gldas").unwrap().accumulation,
        Accumulation::Incremental
    );
}

#[test]
fn roundtrip_json_catalog() {
    let catalog = builtin_catalog().unwrap();
    let path = std::env::temp_dir().join("rp_project_catalog.json");
    save_catalog(&path, &catalog).unwrap();
    let loaded = load_catalog(&path).unwrap();
    assert_eq!(catalog, loaded);
}

#[test]
fn merge_replaces_same_name() {
    let mut catalog = builtin_catalog().unwrap();
    let mut custom = catalog.profile("nldas").unwrap().clone();
    custom.name = "NLDAS".to_string();
    custom.unit_scale = 1.0;
    catalog.merge(ProfileCatalog {
        version: 2,
        profiles: vec![custom.into()],
    });
    assert_eq!(catalog.profiles.len(), 5);
    assert_eq!(catalog.profile("nldas").unwrap().unit_scale, 1.0);
}

#[test]
fn duplicate_profile_names_rejected() {
    let mut catalog = builtin_catalog().unwrap();
    let mut dup = catalog.profiles[0].clone();
    dup.profile.name = "ECMWF_LOWRES".to_string();
    catalog.profiles.push(dup);
    assert!(matches!(
        rp_project::validate_catalog(&catalog),
        Err(ValidationError::DuplicateId { .. })
    ));
}
