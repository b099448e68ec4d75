use depth_arm_tracker::arm::DEFAULT_MAX_MISSED_STEPS;
use depth_arm_tracker::config::{ArmConfig, PipelineConfig};
use depth_arm_tracker::io::{object_from_json, object_to_json, write_report};
use depth_arm_tracker::pipeline::Pipeline;
use depth_arm_tracker::types::{DepthFrame, DepthGrid, Intrinsics};

#[test]
fn test_config_json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let mut config = PipelineConfig::default();
    config.smoothing = 0.25;
    config.clustering.seed = Some(3);
    config.arms.push(ArmConfig {
        name: "left".to_string(),
        start_pos: [-0.2, 0.0, 0.4],
        ..Default::default()
    });

    object_to_json(&path, &config).unwrap();
    let loaded: PipelineConfig = object_from_json(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_config_uses_defaults() {
    let config: PipelineConfig = serde_json::from_str(
        r#"{
            "smoothing": 0.2,
            "segmentation": { "manhattan_radius": 3 },
            "arms": [{ "name": "left" }]
        }"#,
    )
    .unwrap();
    assert_eq!(config.smoothing, 0.2);
    assert_eq!(config.segmentation.manhattan_radius, 3);
    assert_eq!(config.segmentation.max_depth_delta, 0.05);
    assert_eq!(config.clustering.k, 12);
    assert_eq!(config.arms.len(), 1);
    assert_eq!(config.arms[0].name, "left");
    assert_eq!(config.arms[0].max_missed_steps, DEFAULT_MAX_MISSED_STEPS);
}

#[test]
fn test_missing_config_file() {
    let result: depth_arm_tracker::Result<PipelineConfig> =
        object_from_json("non_existent_path.json");
    assert!(matches!(result, Err(depth_arm_tracker::Error::Io(_))));
}

#[test]
fn test_estimates_serialize_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let empty = DepthGrid::zeros(4, 4, 0.001, Intrinsics::default()).unwrap();
    let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let estimate = pipeline.process_frame(&DepthFrame::new(5, empty)).unwrap();

    let json = serde_json::to_value(&estimate).unwrap();
    assert_eq!(json["time_ns"], 5);
    assert_eq!(json["clustered"], false);
    assert_eq!(json["arms"][0]["state"], "Acquiring");

    let report_path = dir.path().join("report.txt");
    write_report(&report_path, &[estimate]).unwrap();
    let report = std::fs::read_to_string(report_path).unwrap();
    assert!(report.contains("frames: 1"));
    assert!(report.contains("right:"));
    assert!(report.contains("mean bend angle: n/a"));
}
