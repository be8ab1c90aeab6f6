use std::fs;
use std::path::{Path, PathBuf};

use motion_lstm::{
    create_median_filtered_dataset, input_fn, run_epochs, Config, DataSplit, Estimator,
    ModelMetadata, OptimizerConfig,
};

/// Writes `n` two-channel recordings: "up" drifts upward, "down" drifts
/// downward, each with a few spikes the median filter has to absorb.
fn write_recordings(dir: &Path, n: usize) -> PathBuf {
    let mut index = String::from("Subject,Datafile,Label\n");
    for i in 0..n {
        let label = if i % 2 == 0 { "up" } else { "down" };
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        let len = 30 + (i * 7) % 20;
        let mut body = String::new();
        for t in 0..len {
            let spike = if t % 11 == 5 { 40.0 } else { 0.0 };
            let a = sign * t as f64 / len as f64 + spike;
            let b = ((t + i) as f64 * 0.3).sin();
            body.push_str(&format!("{},{}\n", a, b));
        }
        let file = format!("S{}/rec{}.csv", i % 3, i);
        fs::create_dir_all(dir.join(format!("S{}", i % 3))).unwrap();
        fs::write(dir.join(&file), body).unwrap();
        index.push_str(&format!("S{},{},{}\n", i % 3, file, label));
    }
    let path = dir.join("train.csv");
    fs::write(&path, index).unwrap();
    path
}

fn config() -> Config {
    let mut config = Config {
        layer_dim: 8,
        output_dim: 2,
        middle_size: 6,
        batch_size: 4,
        num_epochs: 15,
        optimizer: OptimizerConfig::Adam { learning_rate: 0.01, beta1: 0.9, beta2: 0.999, epsilon: 1e-8 },
        ..Config::default()
    };
    config.data.time_steps = 10;
    config.data.test_fraction = 0.25;
    config
}

#[test]
fn trains_from_csv_and_reports_bounded_accuracy() {
    let data_dir = tempfile::tempdir().unwrap();
    let model_dir = tempfile::tempdir().unwrap();
    let index = write_recordings(data_dir.path(), 24);
    let config = config();

    let ((train, test), labels) =
        create_median_filtered_dataset(&index, config.data.time_steps, config.data.test_fraction, config.seed)
            .unwrap();
    assert_eq!(labels.classes(), &["down", "up"]);
    assert_eq!((train.len(), test.len()), (18, 6));
    assert_eq!(train.features.shape(), (18, 10, 2));

    let metadata = ModelMetadata {
        description: None,
        time_steps: config.data.time_steps,
        labels,
        split: Some(DataSplit { seed: config.seed, test_fraction: config.data.test_fraction }),
    };
    let mut estimator = Estimator::new(model_dir.path(), &config, 2, metadata).unwrap();

    let before = estimator.evaluate(input_fn(&train.features, &train.labels, &config), "train").unwrap();
    let history = run_epochs(&mut estimator, &train, &test, &config, |_| {}).unwrap();
    let after = estimator.evaluate(input_fn(&train.features, &train.labels, &config), "train").unwrap();

    assert_eq!(history.len(), 15);
    assert!(history.iter().all(|s| (0.0..=1.0).contains(&s.val_accuracy)));
    assert!(after.loss < before.loss, "loss {} -> {}", before.loss, after.loss);
    // 18 samples in batches of 4 → 5 steps per epoch
    assert_eq!(estimator.global_step(), 75);

    // A fresh estimator in the same directory picks up where training stopped
    // and keeps the label names for prediction.
    let mut restored = Estimator::restore(model_dir.path()).unwrap();
    assert_eq!(restored.global_step(), 75);
    let predictions = restored.predict(&test.features).unwrap();
    assert_eq!(predictions.len(), 6);
    for p in &predictions {
        assert!(restored.metadata().label_name(p.class_id).is_some());
    }
}

#[test]
fn evaluation_rebuilds_the_training_split() {
    let data_dir = tempfile::tempdir().unwrap();
    let model_dir = tempfile::tempdir().unwrap();
    let index = write_recordings(data_dir.path(), 20);
    let config = Config { seed: 7, num_epochs: 1, ..config() };
    let split = DataSplit { seed: config.seed, test_fraction: config.data.test_fraction };

    let ((train, test), labels) =
        create_median_filtered_dataset(&index, config.data.time_steps, split.test_fraction, split.seed)
            .unwrap();
    let metadata = ModelMetadata {
        description: None,
        time_steps: config.data.time_steps,
        labels,
        split: Some(split),
    };
    let mut estimator = Estimator::new(model_dir.path(), &config, 2, metadata).unwrap();
    estimator.train(input_fn(&train.features, &train.labels, &config)).unwrap();

    // Evaluation starts from a default config whose seed differs from the
    // one used for training.
    let defaults = Config::default();
    assert_ne!(defaults.seed, config.seed);
    let restored = Estimator::restore(model_dir.path()).unwrap();
    let recorded = restored.metadata().data_split(DataSplit {
        seed: defaults.seed,
        test_fraction: defaults.data.test_fraction,
    });
    assert_eq!(recorded, split);

    let ((_, rebuilt), _) = create_median_filtered_dataset(
        &index,
        restored.metadata().time_steps,
        recorded.test_fraction,
        recorded.seed,
    )
    .unwrap();
    assert_eq!(rebuilt, test);
}

#[test]
fn bundled_config_matches_defaults() {
    let text = fs::read_to_string(Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/default.toml")).unwrap();
    assert_eq!(Config::from_toml_str(&text).unwrap(), Config::default());
}
