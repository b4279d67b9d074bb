//! End-to-end tests for loading, training, persisting and reloading

use storm_lib::pipeline::{
    evaluate, GbdtTrainer, PipelineSpec, PredictionEngine, Predictor, TrainerConfig,
};
use storm_lib::{Dataset, LoadOptions, ModelStore, StormError, StormField, StormRecord};
use tempfile::TempDir;

/// A few synthetic hurricane tracks in the input file layout
fn storm_tsv() -> String {
    let mut text = String::from("Latitude\tLongitude\tWindSpeed\tPressure\n");
    for storm in 0..3 {
        for step in 0..12 {
            let t = step as f32;
            let lat = 12.0 + storm as f32 * 1.5 + 0.9 * t;
            let lon = -35.0 - storm as f32 * 4.0 - 3.7 * t;
            let wind = 30.0 + 10.0 * t - storm as f32 * 5.0;
            let pressure = 1012.0 - 7.5 * t + storm as f32 * 2.0;
            text.push_str(&format!("{}\t{}\t{}\t{}\n", lat, lon, wind, pressure));
        }
    }
    text
}

fn load_sample(dir: &TempDir) -> Dataset {
    let path = dir.path().join("fakestorm.tsv");
    std::fs::write(&path, storm_tsv()).unwrap();
    Dataset::load(&path, &LoadOptions::default()).unwrap()
}

fn quick_trainer() -> GbdtTrainer {
    GbdtTrainer::new(TrainerConfig {
        iterations: 30,
        max_depth: 4,
        shrinkage: 0.2,
        min_leaf_size: 2,
    })
}

#[test]
fn test_loader_round_trip() {
    let dir = TempDir::new().unwrap();
    let dataset = load_sample(&dir);
    assert_eq!(dataset.len(), 36);

    let mut written: Vec<u8> = Vec::new();
    dataset
        .write_delimited(&mut written, &LoadOptions::default())
        .unwrap();
    let reloaded = Dataset::from_reader(written.as_slice(), &LoadOptions::default()).unwrap();

    for (a, b) in dataset.iter().zip(reloaded.iter()) {
        assert_eq!(a.columns(), b.columns());
    }
}

#[test]
fn test_model_round_trip_through_store() {
    let dir = TempDir::new().unwrap();
    let dataset = load_sample(&dir);
    let trainer = quick_trainer();
    let store = ModelStore::new();

    for target in [StormField::Latitude, StormField::Longitude] {
        let model = trainer
            .fit(&PipelineSpec::for_target(target), &dataset)
            .unwrap();
        let path = dir.path().join(format!("{}.bin", target));
        store.save(&model, dataset.schema(), &path).unwrap();

        let (reloaded, schema) = store.load(&path).unwrap();
        assert_eq!(&schema, dataset.schema());
        for record in dataset.iter() {
            let diff = (reloaded.predict(record) - model.predict(record)).abs();
            assert!(diff < 1e-4, "{} prediction drifted by {}", target, diff);
        }
    }
}

#[test]
fn test_fitting_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let dataset = load_sample(&dir);
    let spec = PipelineSpec::for_target(StormField::Longitude);

    let first = quick_trainer().fit(&spec, &dataset).unwrap();
    let second = quick_trainer().fit(&spec, &dataset).unwrap();
    assert_eq!(
        first.predict_many(dataset.records()),
        second.predict_many(dataset.records())
    );
}

#[test]
fn test_models_are_trained_independently() {
    let dir = TempDir::new().unwrap();
    let dataset = load_sample(&dir);
    let trainer = quick_trainer();

    let lat = trainer
        .fit(&PipelineSpec::for_target(StormField::Latitude), &dataset)
        .unwrap();
    let lon = trainer
        .fit(&PipelineSpec::for_target(StormField::Longitude), &dataset)
        .unwrap();

    assert_eq!(lat.target(), StormField::Latitude);
    assert_eq!(lon.target(), StormField::Longitude);
    assert!(lat.pipeline().feature_fields().contains(&StormField::Longitude));
    assert!(lon.pipeline().feature_fields().contains(&StormField::Latitude));

    // Refitting one model leaves the other untouched
    let before = lon.predict_many(dataset.records());
    let _refit = trainer
        .fit(&PipelineSpec::for_target(StormField::Latitude), &dataset)
        .unwrap();
    assert_eq!(before, lon.predict_many(dataset.records()));
}

#[test]
fn test_training_set_evaluation() {
    let dir = TempDir::new().unwrap();
    let dataset = load_sample(&dir);
    let model = quick_trainer()
        .fit(&PipelineSpec::for_target(StormField::Latitude), &dataset)
        .unwrap();

    let metrics = evaluate(&model, &dataset);
    assert_eq!(metrics.rows, dataset.len());
    assert!(metrics.root_mean_squared_error >= metrics.mean_absolute_error - 1e-9);
    assert!(metrics.r_squared > 0.0, "r_squared was {}", metrics.r_squared);
}

#[test]
fn test_single_row_dataset_trains_and_predicts() {
    let data = "Latitude\tLongitude\tWindSpeed\tPressure\n25.0\t-80.0\t150\t922\n";
    let dataset = Dataset::from_reader(data.as_bytes(), &LoadOptions::default()).unwrap();
    let trainer = GbdtTrainer::default();

    for target in [StormField::Latitude, StormField::Longitude] {
        let engine = PredictionEngine::new(
            trainer
                .fit(&PipelineSpec::for_target(target), &dataset)
                .unwrap(),
        );
        let result = engine.predict(&dataset.records()[0]).unwrap();
        assert_eq!(result.target, target);
    }
}

#[test]
fn test_malformed_row_produces_no_dataset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.tsv");
    std::fs::write(
        &path,
        "Latitude\tLongitude\tWindSpeed\tPressure\n20\t-70\t90\t960\nN/A\t-72\t95\t955\n",
    )
    .unwrap();

    let result = Dataset::load(&path, &LoadOptions::default());
    assert!(matches!(result, Err(StormError::Parse { line: 3, .. })));
}

#[test]
fn test_inference_on_last_known_point() {
    let dir = TempDir::new().unwrap();
    let dataset = load_sample(&dir);
    let trainer = quick_trainer();
    let store = ModelStore::new();

    let lat_path = dir.path().join("models").join("latmodel.bin");
    let lon_path = dir.path().join("models").join("lonmodel.bin");
    for (target, path) in [
        (StormField::Latitude, &lat_path),
        (StormField::Longitude, &lon_path),
    ] {
        let model = trainer
            .fit(&PipelineSpec::for_target(target), &dataset)
            .unwrap();
        store.save(&model, dataset.schema(), path).unwrap();
    }

    let last = StormRecord::new(25.0, -80.0, 150.0, 922.0);
    let lat_engine = PredictionEngine::new(store.load(&lat_path).unwrap().0);
    let lon_engine = PredictionEngine::new(store.load(&lon_path).unwrap().0);

    let lat = lat_engine.predict(&last).unwrap();
    let lon = lon_engine.predict(&last).unwrap();
    assert!(lat.predicted_value.is_finite());
    assert!(lon.predicted_value.is_finite());
    assert_eq!(lat.target, StormField::Latitude);
    assert_eq!(lon.target, StormField::Longitude);
}
