//! Dataset tool tests: CSV I/O, folds, catalog, normalization, zero columns

use std::fs;
use std::path::Path;

use isr_expgen::dataset::{
    drop_zero_columns, format_value, normalize_fold, Dataset, DatasetCatalog, FoldSet,
    MinMaxScaler, Sampling, SyntheticFunction,
};
use isr_expgen::ErrorKind;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

// ============================================================================
// CSV
// ============================================================================

#[test]
fn test_load_csv() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "yacht-train-0.csv", "1.5, 2, 3\n4,5,6\n\n");
    let data = Dataset::load_csv(dir.path().join("yacht-train-0.csv")).unwrap();
    assert_eq!(data.num_instances(), 2);
    assert_eq!(data.num_attributes(), 2);
    assert_eq!(data.targets(), [3.0, 6.0]);
    assert_eq!(data.rows()[0][0], 1.5);
}

#[test]
fn test_load_csv_rejects_text_and_ragged_rows() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "text.csv", "1,2\nx,3\n");
    write(dir.path(), "ragged.csv", "1,2,3\n4,5\n");

    let err = Dataset::load_csv(dir.path().join("text.csv")).unwrap_err();
    assert!(err.to_string().contains("'x' is not a number"));
    assert_eq!(err.kind(), ErrorKind::Data);

    let err = Dataset::load_csv(dir.path().join("ragged.csv")).unwrap_err();
    assert!(err.to_string().contains("row 1 has 2 columns"));
}

#[test]
fn test_load_csv_rejects_empty_inner_field() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "gap.csv", "1,,3\n4,5,\n");
    let err = Dataset::load_csv(dir.path().join("gap.csv")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);
    assert!(err.to_string().contains(":1: column 2 is empty"), "{err}");
}

#[test]
fn test_load_csv_ignores_trailing_comma() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "trailing.csv", "1,2,3,\n4,5,6,\n");
    let data = Dataset::load_csv(dir.path().join("trailing.csv")).unwrap();
    assert_eq!(data.num_columns(), 3);
    assert_eq!(data.targets(), [3.0, 6.0]);
}

#[test]
fn test_load_missing_file_is_filesystem_error() {
    let err = Dataset::load_csv("/nonexistent/none-train-0.csv").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Filesystem);
}

#[test]
fn test_write_csv_formats_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    Dataset::from_rows(vec![vec![1.0, 0.25, -0.0], vec![0.5, 2.0, 10.0]])
        .unwrap()
        .write_csv(&path)
        .unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "1,0.25,0\n0.5,2,10\n");
    assert_eq!(format_value(0.1), "0.1");
}

// ============================================================================
// Folds and catalog
// ============================================================================

#[test]
fn test_fold_discovery_stops_at_first_gap() {
    let dir = tempfile::tempdir().unwrap();
    for i in [0, 1, 3] {
        write(dir.path(), &format!("ccn-train-{i}.csv"), "1,2\n");
        write(dir.path(), &format!("ccn-test-{i}.csv"), "1,2\n");
    }
    let folds = FoldSet::discover(dir.path(), "ccn", 5).unwrap();
    assert_eq!(folds.name(), "ccn");
    assert_eq!(folds.folds().len(), 2);
    assert_eq!(folds.files().count(), 4);
}

#[test]
fn test_fold_discovery_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(FoldSet::discover(dir.path(), "ccn", 5).is_err());
    write(dir.path(), "ccn-train-0.csv", "1,2\n");
    let err = FoldSet::discover(dir.path(), "ccn", 5).unwrap_err();
    assert!(err.to_string().contains("no matching test fold"));
}

#[test]
fn test_catalog_scan() {
    let dir = tempfile::tempdir().unwrap();
    let rows: String = (0..1503).map(|i| format!("{i},1,2,3,4,{i}\n")).collect();
    write(dir.path(), "airfoil-train-0.csv", &rows);
    write(dir.path(), "airfoil-test-0.csv", "0,1,2,3,4,5\n");
    write(dir.path(), "yacht-train-0.csv", "1,2,3,4,5,6,7\n");
    write(dir.path(), "notes.txt", "ignored");

    let catalog = DatasetCatalog::scan_dir(dir.path()).unwrap();
    assert_eq!(catalog.len(), 2);
    let airfoil = catalog.get("airfoil").unwrap();
    assert_eq!(airfoil.instances(), 1503);
    assert_eq!(airfoil.attributes(), 5);
    assert_eq!(catalog.get("yacht").unwrap().attributes(), 6);

    let text = catalog.to_toml().unwrap();
    #[derive(serde::Deserialize)]
    struct Grid {
        datasets: DatasetCatalog,
    }
    let parsed: Grid = toml::from_str(&text).unwrap();
    assert_eq!(parsed.datasets, catalog);
}

// ============================================================================
// Normalization and zero columns
// ============================================================================

#[test]
fn test_normalize_maps_training_onto_unit_interval() {
    let mut train =
        Dataset::from_rows(vec![vec![0.0, 10.0, 1.0], vec![5.0, 20.0, 3.0], vec![10.0, 15.0, 2.0]])
            .unwrap();
    let mut test = Dataset::from_rows(vec![vec![20.0, 10.0, 4.0]]).unwrap();

    let scaler = normalize_fold(&mut train, &mut test).unwrap();
    assert_eq!(scaler.min(), [0.0, 10.0, 1.0]);
    assert_eq!(scaler.range(), [10.0, 10.0, 2.0]);

    for column in 0..train.num_columns() {
        let values: Vec<f64> = train.column(column).collect();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(values.contains(&0.0) && values.contains(&1.0));
    }
    // test statistics do not influence the scaling
    assert_eq!(test.rows()[0], [2.0, 0.0, 1.5]);
}

#[test]
fn test_constant_column_cannot_be_normalized() {
    let train = Dataset::from_rows(vec![vec![1.0, 0.0, 1.0], vec![2.0, 0.0, 3.0]]).unwrap();
    let err = MinMaxScaler::fit(&train).unwrap_err();
    assert!(err.to_string().contains("column 1 is constant"));
}

#[test]
fn test_zero_columns_dropped_consistently() {
    let mut folds = vec![
        Dataset::from_rows(vec![vec![1.0, 0.0, 0.0, 5.0], vec![2.0, 0.0, 1.0, 6.0]]).unwrap(),
        Dataset::from_rows(vec![vec![3.0, 1.0, 0.0, 7.0]]).unwrap(),
    ];
    let removed = drop_zero_columns(&mut folds).unwrap();
    assert_eq!(removed, [1, 2]);
    assert!(folds.iter().all(|d| d.num_columns() == 2));
    assert_eq!(folds[1].rows()[0], [3.0, 7.0]);

    let mut stripped = folds.clone();
    assert!(drop_zero_columns(&mut stripped).unwrap().is_empty());
    assert_eq!(stripped, folds);
}

#[test]
fn test_zero_columns_inconsistent_counts() {
    let mut folds = vec![
        Dataset::from_rows(vec![vec![1.0, 2.0]]).unwrap(),
        Dataset::from_rows(vec![vec![1.0, 2.0, 3.0]]).unwrap(),
    ];
    assert!(drop_zero_columns(&mut folds).is_err());
}

// ============================================================================
// Synthetic datasets
// ============================================================================

#[test]
fn test_synthetic_dataset_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("salustowicz-2d.csv");
    let data = SyntheticFunction::Salustowicz2d
        .sample(&Sampling::Grid {
            lower: 0.05,
            upper: 10.0,
            points: 1000,
        })
        .unwrap();
    // floor(sqrt(1000)) = 31 points per dimension
    assert_eq!(data.num_instances(), 31 * 31);
    data.write_csv(&path).unwrap();

    let reloaded = Dataset::load_csv(&path).unwrap();
    assert_eq!(reloaded.num_instances(), data.num_instances());
    assert_eq!(reloaded.num_attributes(), 2);
}

#[test]
fn test_uniform_sampling_seed_changes_points() {
    let sample = |seed| {
        SyntheticFunction::Kotanchek
            .sample(&Sampling::Uniform {
                lower: 0.3,
                upper: 4.0,
                per_axis: 5,
                seed,
            })
            .unwrap()
    };
    assert_eq!(sample(7), sample(7));
    assert_ne!(sample(7), sample(8));
}

#[test]
fn test_empty_interval_rejected() {
    let err = SyntheticFunction::PolySine
        .sample(&Sampling::Uniform {
            lower: 1.0,
            upper: 1.0,
            per_axis: 5,
            seed: 1,
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);
}
