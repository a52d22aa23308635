//! Integration tests for the experiment configuration generator
//!
//! Every test writes into its own temporary directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use isr_expgen::dataset::{DatasetCatalog, DatasetInfo};
use isr_expgen::experiment::{
    resolve_config_file, Axis, AxisValue, Condition, ConfigRecord, ExclusionRule, Generator,
    GeneratorBuilder, Inheritance, JobSpec, NeighborhoodBinding,
};
use isr_expgen::{Error, ErrorKind};

fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path).unwrap()
}

fn baseline() -> ConfigRecord {
    ConfigRecord::from_pairs([("experiment.seed", "123456"), ("pop.size", "1000")]).unwrap()
}

fn scenario(dir: &Path) -> GeneratorBuilder {
    Generator::builder(dir)
        .axis(Axis::new("dataset", ["A", "B"]))
        .axis(Axis::new("scheme", ["pro", "sur"]))
        .baseline(baseline())
        .derive("dataset.name", "{dataset}-train")
        .derive("scheme", "{scheme}")
        .job(JobSpec::new("java -jar ISR.jar"))
}

/// Every regular file below `dir`, relative path → contents.
fn snapshot(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let bytes = fs::read(&path).unwrap();
                files.push((path.strip_prefix(dir).unwrap().to_path_buf(), bytes));
            }
        }
    }
    files.sort();
    files
}

// ============================================================================
// Scenario: {dataset: [A, B]} x {scheme: [pro, sur]}
// ============================================================================

#[test]
fn test_scenario_files_and_batch_order() {
    let dir = tempfile::tempdir().unwrap();
    let report = scenario(dir.path()).build().unwrap().generate().unwrap();

    assert_eq!(report.configs_written, 4);
    assert_eq!(report.excluded, 0);
    for id in ["A-pro", "A-sur", "B-pro", "B-sur"] {
        assert!(dir.path().join(format!("{id}.txt")).is_file(), "missing {id}");
    }

    let script = read(dir.path().join("run_all.sh"));
    let jobs: Vec<&str> = script.lines().filter(|l| l.starts_with("java")).collect();
    assert_eq!(jobs.len(), 4);
    for (job, id) in jobs.iter().zip(["A-pro", "A-sur", "B-pro", "B-sur"]) {
        let config = dir.path().join(format!("{id}.txt"));
        assert_eq!(
            *job,
            format!("java -jar ISR.jar -p {} > logs/{id}.log", config.display())
        );
    }
    assert!(script.starts_with("#!/bin/bash\n\n"));
}

#[test]
fn test_record_contents_merge_baseline_and_derived() {
    let dir = tempfile::tempdir().unwrap();
    scenario(dir.path()).build().unwrap().generate().unwrap();
    assert_eq!(
        read(dir.path().join("B-sur.txt")),
        "experiment.seed = 123456\npop.size = 1000\ndataset.name = B-train\nscheme = sur\n"
    );
}

#[test]
fn test_derived_key_overrides_baseline_in_place() {
    let dir = tempfile::tempdir().unwrap();
    scenario(dir.path())
        .derive("pop.size", "{number}00")
        .numbered(5)
        .build()
        .unwrap()
        .generate()
        .unwrap();
    assert_eq!(
        read(dir.path().join("5-A-pro.txt")).lines().nth(1),
        Some("pop.size = 500")
    );
}

// ============================================================================
// Cartesian completeness and exclusion
// ============================================================================

#[test]
fn test_cartesian_completeness() {
    let plan = Generator::builder("/unused")
        .axis(Axis::new("embedding", ["original", "isomap", "mds", "pca", "tsne"]))
        .axis(Axis::new("scheme", ["proximity-x", "surrounding-x", "remoteness-x"]))
        .axis(Axis::new("metric", ["0.1", "0.5", "1.0", "2.0"]))
        .job(JobSpec::new("engine"))
        .build()
        .unwrap()
        .plan()
        .unwrap();
    assert_eq!(plan.len(), 5 * 3 * 4);
    assert_eq!(plan.job_count(), plan.len());
    assert_eq!(plan.total_combinations(), 60);
}

#[test]
fn test_exclusion_removes_exact_count() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Generator::builder(dir.path())
        .axis(Axis::new("embedding", ["original", "isomap", "mds"]))
        .axis(Axis::new("dataset", ["airfoil", "keijzer-6", "keijzer-7"]))
        .exclude(ExclusionRule::all_of(
            "synthetic only in original space",
            [
                Condition::is_in("dataset", ["keijzer-6", "keijzer-7"]),
                Condition::not_in("embedding", ["original"]),
            ],
        ))
        .job(JobSpec::new("engine"))
        .build()
        .unwrap();

    let report = generator.generate().unwrap();
    assert_eq!(report.excluded, 4);
    assert_eq!(report.configs_written, 9 - 4);
    assert!(!dir.path().join("isomap-keijzer-6.txt").exists());
    assert!(dir.path().join("original-keijzer-6.txt").exists());

    let script = read(dir.path().join("run_all.sh"));
    assert_eq!(script.lines().filter(|l| l.starts_with("engine")).count(), 5);
}

#[test]
fn test_custom_exclusion_rule() {
    let plan = scenario(Path::new("/unused"))
        .exclude(ExclusionRule::custom("same initial", |c| {
            c.value("dataset").map(|d| d.to_lowercase()).as_deref() == Some("a")
                && c.value("scheme") == Some("pro")
        }))
        .build()
        .unwrap()
        .plan()
        .unwrap();
    assert_eq!(plan.len(), 3);
    assert_eq!(plan.experiments()[0].identifier(), "A-sur");
}

#[test]
fn test_exclusion_on_unknown_axis_rejected() {
    let err = scenario(Path::new("/unused"))
        .exclude(ExclusionRule::all_of(
            "typo",
            [Condition::is_in("datset", ["A"])],
        ))
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

// ============================================================================
// Identifiers
// ============================================================================

#[test]
fn test_identifier_uses_aliases_prefix_and_numbers() {
    let plan = Generator::builder("/unused")
        .prefix("05.07.2017")
        .numbered(1)
        .axis(Axis::new(
            "embedding",
            [AxisValue::aliased("original", "orig"), AxisValue::aliased("isomap", "imap")],
        ))
        .axis(Axis::new("metric", [AxisValue::aliased("euclidean", "euc")]))
        .derive("weights", "{embedding}/{metric}-{embedding.alias}")
        .job(JobSpec::new("engine"))
        .build()
        .unwrap()
        .plan()
        .unwrap();

    let first = &plan.experiments()[0];
    assert_eq!(first.identifier(), "05.07.2017-1-orig-euc");
    assert_eq!(first.record().get("weights"), Some("original/euclidean-orig"));
    assert_eq!(plan.experiments()[1].identifier(), "05.07.2017-2-imap-euc");
}

#[test]
fn test_identifiers_unique() {
    let plan = scenario(Path::new("/unused")).build().unwrap().plan().unwrap();
    let ids: HashSet<&str> = plan.experiments().iter().map(|e| e.identifier()).collect();
    assert_eq!(ids.len(), plan.len());
}

#[test]
fn test_alias_collision_fails_loudly() {
    let dir = tempfile::tempdir().unwrap();
    let err = Generator::builder(dir.path())
        .axis(Axis::new(
            "scheme",
            [
                AxisValue::aliased("remoteness-x", "rem"),
                AxisValue::aliased("remoteness-xy", "rem"),
            ],
        ))
        .job(JobSpec::new("engine"))
        .build()
        .unwrap()
        .generate()
        .unwrap_err();
    match err {
        Error::IdentifierCollision {
            identifier,
            first,
            second,
        } => {
            assert_eq!(identifier, "rem");
            assert_eq!(first, "scheme=remoteness-x");
            assert_eq!(second, "scheme=remoteness-xy");
        }
        other => panic!("expected a collision, got {other}"),
    }
    // nothing is written when planning fails
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

// ============================================================================
// Neighborhood size
// ============================================================================

fn catalog() -> DatasetCatalog {
    DatasetCatalog::from_entries([
        ("airfoil", DatasetInfo::new(1503, 5)),
        ("keijzer-6", DatasetInfo::new(50, 1)),
        ("concrete", DatasetInfo::new(1030, 8)),
    ])
}

#[test]
fn test_neighborhood_resolution_and_clamping() {
    let plan = Generator::builder("/unused")
        .axis(Axis::new("dataset", ["airfoil", "keijzer-6", "concrete"]))
        .axis(Axis::new("neighbors", ["k1pni", "kna", "7"]))
        .neighborhood(NeighborhoodBinding::new("neighbors").key("number.neighbors"), catalog())
        .derive("note", "k={k}")
        .job(JobSpec::new("engine"))
        .build()
        .unwrap()
        .plan()
        .unwrap();

    let sizes: Vec<Option<u64>> = plan.experiments().iter().map(|e| e.neighborhood()).collect();
    assert_eq!(
        sizes,
        [Some(15), Some(5), Some(7), Some(1), Some(1), Some(7), Some(10), Some(8), Some(7)]
    );
    let clamped = &plan.experiments()[3];
    assert_eq!(clamped.identifier(), "keijzer-6-k1pni");
    assert_eq!(clamped.record().get("number.neighbors"), Some("1"));
    assert_eq!(clamped.record().get("note"), Some("k=1"));
}

#[test]
fn test_neighborhood_in_identifier_collision_detected() {
    let err = Generator::builder("/unused")
        .axis(Axis::new("dataset", ["keijzer-6"]))
        .axis(Axis::new("neighbors", ["k1pni", "kna"]))
        .neighborhood(NeighborhoodBinding::new("neighbors").in_identifier(true), catalog())
        .job(JobSpec::new("engine"))
        .build()
        .unwrap()
        .plan()
        .unwrap_err();
    assert!(matches!(err, Error::IdentifierCollision { ref identifier, .. } if identifier == "keijzer-6-k1"));
}

#[test]
fn test_unknown_dataset_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let err = Generator::builder(dir.path())
        .axis(Axis::new("dataset", ["airfoil", "towerData"]))
        .axis(Axis::new("neighbors", ["k5pni"]))
        .neighborhood(NeighborhoodBinding::new("neighbors"), catalog())
        .job(JobSpec::new("engine"))
        .build()
        .unwrap()
        .generate()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    let message = err.to_string();
    assert!(message.contains("dataset=towerData, neighbors=k5pni"), "{message}");
    let cause = std::error::Error::source(&err).unwrap().to_string();
    assert!(cause.contains("'towerData'"), "{cause}");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_literal_sizes_need_no_catalog() {
    let plan = Generator::builder("/unused")
        .axis(Axis::new("dataset", ["unknown"]))
        .axis(Axis::new("neighbors", ["k5", "0"]))
        .neighborhood(NeighborhoodBinding::new("neighbors"), DatasetCatalog::default())
        .job(JobSpec::new("engine"))
        .build()
        .unwrap()
        .plan()
        .unwrap();
    assert_eq!(plan.experiments()[0].neighborhood(), Some(5));
    assert_eq!(plan.experiments()[1].neighborhood(), Some(1));
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn test_generation_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let generator = scenario(dir.path())
        .group_by("scheme")
        .manifest("manifest.json")
        .inheritance(Inheritance::parent_file("master.txt"))
        .build()
        .unwrap();

    generator.generate().unwrap();
    let first = snapshot(dir.path());
    generator.generate().unwrap();
    let second = snapshot(dir.path());
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

// ============================================================================
// Inheritance
// ============================================================================

#[test]
fn test_parent_references_exist_and_resolve() {
    let dir = tempfile::tempdir().unwrap();
    let report = scenario(dir.path())
        .inheritance(Inheritance::parent_file("master.txt"))
        .config_dir("config_files")
        .build()
        .unwrap()
        .generate()
        .unwrap();

    let master = dir.path().join("config_files/master.txt");
    assert_eq!(report.master_files, [master.clone()]);
    assert_eq!(read(&master), "experiment.seed = 123456\npop.size = 1000\n");

    for id in ["A-pro", "A-sur", "B-pro", "B-sur"] {
        let path = dir.path().join("config_files").join(format!("{id}.txt"));
        let record = ConfigRecord::read(&path).unwrap();
        let parent = record.parent().expect("parent key");
        assert!(Path::new(parent).is_file(), "{parent} does not exist");

        let resolved = resolve_config_file(&path).unwrap();
        assert_eq!(resolved.get("pop.size"), Some("1000"));
        assert_eq!(resolved.get("scheme"), Some(&id[2..]));
        assert_eq!(resolved.parent(), None);
    }
}

#[test]
fn test_parent_reference_template() {
    let plan = scenario(Path::new("/local"))
        .var("server", "/home/isr")
        .group_by("dataset")
        .inheritance(Inheritance::ParentFile {
            file_name: "master.txt".to_string(),
            reference: Some("{server}/exp/{group}/master.txt".to_string()),
        })
        .build()
        .unwrap()
        .plan()
        .unwrap();
    let record = plan.experiments()[2].record();
    assert_eq!(record.iter().next(), Some(("parent", "/home/isr/exp/B/master.txt")));
    assert_eq!(record.get("pop.size"), None);
}

#[test]
fn test_inline_records_are_self_contained() {
    let dir = tempfile::tempdir().unwrap();
    scenario(dir.path()).build().unwrap().generate().unwrap();
    let record = ConfigRecord::read(dir.path().join("A-pro.txt")).unwrap();
    assert_eq!(record.parent(), None);
    assert_eq!(resolve_config_file(dir.path().join("A-pro.txt")).unwrap(), record);
}

// ============================================================================
// Grouping, batch framing and manifest
// ============================================================================

#[test]
fn test_group_scripts_sum_to_record_count() {
    let dir = tempfile::tempdir().unwrap();
    let report = scenario(dir.path())
        .axis(Axis::new("metric", ["euc", "fra"]))
        .group_by("scheme")
        .group_by("metric")
        .build()
        .unwrap()
        .generate()
        .unwrap();

    assert_eq!(report.batch_scripts.len(), 4);
    let total: usize = report
        .batch_scripts
        .iter()
        .map(|p| read(p).lines().filter(|l| l.starts_with("java")).count())
        .sum();
    assert_eq!(total, report.configs_written);
    assert!(dir.path().join("pro-euc/A-pro-euc.txt").is_file());
    assert!(dir.path().join("sur-fra/run_all.sh").is_file());
}

#[test]
fn test_slurm_directives_and_notification() {
    let dir = tempfile::tempdir().unwrap();
    let job = JobSpec::new("java -Xmx8g -jar GSGP.jar")
        .directive("#SBATCH --nodelist <node>")
        .directive("#SBATCH --exclusive")
        .notify("someone@example.org")
        .log("out/{group}/{dataset}.txt")
        .unwrap();
    scenario(dir.path())
        .group_by("scheme")
        .job(job)
        .build()
        .unwrap()
        .generate()
        .unwrap();

    let script = read(dir.path().join("pro/run_all.sh"));
    let lines: Vec<&str> = script.lines().collect();
    assert_eq!(lines[..5], [
        "#!/bin/bash",
        "",
        "#SBATCH --nodelist <node>",
        "#SBATCH --exclusive",
        "",
    ]);
    assert_eq!(lines[5..7], ["mkdir -p out/pro", ""]);
    assert!(lines[7].ends_with("> out/pro/A.txt"));
    assert_eq!(lines.last(), Some(&"echo \"\" | mail -s pro someone@example.org"));
}

#[cfg(unix)]
#[test]
fn test_batch_script_mode() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    scenario(dir.path()).build().unwrap().generate().unwrap();
    let mode = fs::metadata(dir.path().join("run_all.sh"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o755);
}

#[cfg(unix)]
#[test]
fn test_generated_script_runs_and_writes_logs() {
    let dir = tempfile::tempdir().unwrap();
    scenario(dir.path())
        .job(JobSpec::new("echo"))
        .build()
        .unwrap()
        .generate()
        .unwrap();

    let status = std::process::Command::new("sh")
        .arg("run_all.sh")
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(status.success());
    let log = read(dir.path().join("logs/B-sur.log"));
    assert_eq!(log.trim(), format!("-p {}", dir.path().join("B-sur.txt").display()));
}

#[test]
fn test_manifest_lists_every_record() {
    let dir = tempfile::tempdir().unwrap();
    let report = scenario(dir.path())
        .numbered(1)
        .manifest("manifest.json")
        .build()
        .unwrap()
        .generate()
        .unwrap();

    let manifest: serde_json::Value =
        serde_json::from_str(&read(report.manifest.unwrap())).unwrap();
    let entries = manifest.as_array().unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[1]["identifier"], "2-A-sur");
    assert_eq!(entries[1]["number"], 2);
    assert_eq!(entries[1]["axes"]["scheme"], "sur");
    assert!(entries[1].get("group").is_none());
}

#[test]
fn test_output_directory_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a/b/c");
    scenario(&nested).config_dir("config_files").build().unwrap().generate().unwrap();
    assert!(nested.join("config_files/A-pro.txt").is_file());
    assert!(nested.join("run_all.sh").is_file());
}

#[test]
fn test_unwritable_output_is_filesystem_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    fs::write(&blocker, "not a directory").unwrap();
    let err = scenario(&blocker.join("out")).build().unwrap().generate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Filesystem);
}

// ============================================================================
// Build-time validation
// ============================================================================

#[test]
fn test_build_rejects_inconsistent_grids() {
    let job = || JobSpec::new("engine");

    // no axes
    assert!(Generator::builder("/x").job(job()).build().is_err());
    // no job
    assert!(Generator::builder("/x").axis(Axis::new("a", ["1"])).build().is_err());
    // duplicate axis
    assert!(Generator::builder("/x")
        .axis(Axis::new("a", ["1"]))
        .axis(Axis::new("a", ["2"]))
        .job(job())
        .build()
        .is_err());
    // group by unknown axis
    assert!(Generator::builder("/x")
        .axis(Axis::new("a", ["1"]))
        .group_by("b")
        .job(job())
        .build()
        .is_err());
    // derived key with the assignment separator
    assert!(Generator::builder("/x")
        .axis(Axis::new("a", ["1"]))
        .derive("bad = key", "{a}")
        .job(job())
        .build()
        .is_err());
    // {k} without a neighborhood binding
    let err = Generator::builder("/x")
        .axis(Axis::new("a", ["1"]))
        .derive("n", "{k}")
        .job(job())
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Template { .. }));
}
