//! Muskingum files from drainage attributes.

use std::collections::BTreeSet;

use rp_muskingum::{
    attributes_from_drainage, read_column_csv, KfacFormula, MuskingumOptions,
    MuskingumParameterBuilder,
};
use rp_network::features::parse_drainage_csv;
use rp_network::{ConnectivityBuilder, ConnectivityOptions, DrainageFields, LinkSource};

const DRAINAGE: &str = "\
HydroID,NextDownID,LengthKm,Slope
10,-1,2.0,0.01
20,10,1.0,0.0
30,10,4.0,0.04
40,20,1.5,0.0025
50,40,0.5,0.09
";

#[test]
fn writes_three_aligned_files() {
    let records = parse_drainage_csv(DRAINAGE, &DrainageFields::default()).unwrap();
    let network = ConnectivityBuilder::from_drainage(&records, LinkSource::NextDown, ConnectivityOptions::default())
        .unwrap()
        .build()
        .unwrap();
    let attributes = attributes_from_drainage(&records);

    let builder = MuskingumParameterBuilder::new(MuskingumOptions {
        formula: KfacFormula::EtaLengthSqrtSlopeClipped,
        ..Default::default()
    });
    let params = builder
        .build(&network, &attributes, &BTreeSet::from([30]))
        .unwrap();
    assert_eq!(params.reach_ids, vec![10, 20, 30, 40, 50]);
    assert!(params.eta.unwrap() > 0.0);

    let dir = std::env::temp_dir().join("rp_muskingum_tests");
    std::fs::create_dir_all(&dir).unwrap();
    let (kfac, k, x) = (dir.join("kfac.csv"), dir.join("k.csv"), dir.join("x.csv"));
    params.write_files(&kfac, &k, &x).unwrap();

    let kfac_back = read_column_csv(&kfac).unwrap();
    let k_back = read_column_csv(&k).unwrap();
    assert_eq!(kfac_back, params.kfac);
    for (kv, fv) in k_back.iter().zip(&kfac_back) {
        assert!((kv - 0.35 * fv).abs() < 1e-9);
    }
    assert_eq!(read_column_csv(&x).unwrap(), vec![0.3, 0.3, 0.0, 0.3, 0.3]);
}
