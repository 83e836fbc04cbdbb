use std::fs;

use ccb_scenarios::{load_spec_from_path, save_spec_to_path, ProfileSpec, RandomWalkProfile};

fn small_spec() -> ProfileSpec {
    ProfileSpec {
        profile: RandomWalkProfile {
            min: 220.0,
            max: 600.0,
            max_step: 35.0,
            periods: 2,
            sub_periods: 6,
        },
        scenarios: 12,
        in_sample: 4,
        seed: Some(2),
    }
}

#[test]
fn yaml_spec_materializes_disjoint_sets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("study.yaml");
    fs::write(
        &path,
        r#"
seed: 2
scenarios: 12
in_sample: 4
profile:
  min: 220
  max: 600
  max_step: 35
  periods: 2
  sub_periods: 6
"#,
    )
    .unwrap();

    let spec = load_spec_from_path(&path).unwrap();
    assert_eq!(spec, small_spec());

    let study = spec.materialize().unwrap();
    assert_eq!(study.in_sample.scenario_count(), 4);
    assert_eq!(study.out_of_sample.scenario_count(), 8);
    assert_eq!(study.in_sample.samples_per_period(), 24);
    assert!(study.in_sample.shared_scenarios(&study.out_of_sample).is_empty());
    assert_eq!(study.in_sample.scenario_ids(), study.partition.in_sample());
    for h in 0..2 {
        assert!(study.in_sample.period_min(h) >= 220.0);
        assert!(study.out_of_sample.period_max(h) <= 600.0);
    }
}

#[test]
fn seeded_spec_is_reproducible() {
    let a = small_spec().materialize().unwrap();
    let b = small_spec().materialize().unwrap();
    assert_eq!(a.in_sample, b.in_sample);
    assert_eq!(a.partition, b.partition);
}

#[test]
fn json_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("study.json");
    save_spec_to_path(&small_spec(), &path).unwrap();
    assert_eq!(load_spec_from_path(&path).unwrap(), small_spec());
}

#[test]
fn invalid_spec_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yml");
    fs::write(&path, "scenarios: 3\nin_sample: 5\nseed: 1\n").unwrap();
    let err = load_spec_from_path(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("bad.yml"));
}
