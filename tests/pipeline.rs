//! End-to-end pipeline runs against fixture engines

mod common;

use std::path::{Path, PathBuf};
use common::{RecordingGenerator, WavEngine, test_config, write_wav};
use stemroute::{Pipeline, TaskRequest};
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    out: PathBuf,
    input: PathBuf,
    pipeline: Pipeline,
    engine_calls: common::Calls,
    prompts: common::Prompts,
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let out = config.paths.output_dir.clone();

    let engine = WavEngine::new(&out);
    let generator = RecordingGenerator::new(&out);
    let engine_calls = engine.calls.clone();
    let prompts = generator.prompts.clone();

    let input = dir.path().join("song.wav");
    write_wav(&input, 3.0);

    Harness {
        pipeline: Pipeline::new(config, Box::new(engine), Box::new(generator)),
        _dir: dir,
        out,
        input,
        engine_calls,
        prompts,
    }
}

fn files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_de_reverb() {
    let mut h = harness();
    let response = h.pipeline.handle(&TaskRequest::new("t1", "de_reverb").with_input(&h.input));

    assert!(response.success, "{:?}", response.error);
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["result"]["reverb"], h.out.join("t1_reverb.wav").to_string_lossy().into_owned());
    assert_eq!(json["result"]["noreverb"], h.out.join("t1_noreverb.wav").to_string_lossy().into_owned());
    assert_eq!(json["conversion_duration"], 2.0);
    assert_eq!(json["error"], serde_json::Value::Null);
}

#[test]
fn test_vocal_extractor_discards_nothing_it_expects() {
    let mut h = harness();
    let response = h.pipeline.handle(&TaskRequest::new("t2", "vocal_extractor").with_input(&h.input));

    assert!(response.success);
    let result = response.result.unwrap();
    assert_eq!(result.keys().collect::<Vec<_>>(), vec!["vocal", "instrumental"]);
    assert_eq!(files(&h.out), vec!["t2_instrumental.wav", "t2_vocals.wav"]);
}

#[test]
fn test_dual_extractor_one_file_per_stem() {
    let mut h = harness();
    let response = h
        .pipeline
        .handle(&TaskRequest::new("t3", "vocal_instrumental_extractor").with_input(&h.input));

    assert!(response.success, "{:?}", response.error);
    assert_eq!(h.engine_calls.lock().unwrap().len(), 2);
    assert_eq!(files(&h.out), vec!["t3_instrumental.wav", "t3_vocals.wav"]);
}

#[test]
fn test_lead_back_vocal_extractor() {
    let mut h = harness();
    let response = h
        .pipeline
        .handle(&TaskRequest::new("t4", "lead_back_vocal_extractor").with_input(&h.input));

    assert!(response.success, "{:?}", response.error);
    let calls = h.engine_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].1, h.out.join("t4_vocals.wav"));

    let result = response.result.unwrap();
    assert_eq!(result.get("vocal"), Some(h.out.join("t4_vocal_front.wav").as_path()));
    assert_eq!(result.get("back_vocal"), Some(h.out.join("t4_vocal_back.wav").as_path()));
    assert_eq!(result.get("instrumental"), Some(h.out.join("t4_instrumental.wav").as_path()));
    assert!(!h.out.join("t4_vocals.wav").exists());
}

#[test]
fn test_stem_extractor_with_four_stem_model() {
    let mut h = harness();
    let request = TaskRequest::new("t5", "stem_extractor")
        .with_input(&h.input)
        .with_model("stem_extractor", "htdemucs_ft.yaml");
    let response = h.pipeline.handle(&request);

    assert!(response.success);
    let json = serde_json::to_value(response.result.unwrap()).unwrap();
    assert_eq!(json.as_object().unwrap().len(), 6);
    assert!(json["guitar"].is_null());
    assert!(json["piano"].is_null());
    assert!(json["drums"].is_string());
}

#[test]
fn test_sound_creator() {
    let mut h = harness();
    let request = TaskRequest::new("s1", "sound_creator").with_prompt("rain on a tin roof", Some(5.0));
    let response = h.pipeline.handle(&request);

    assert!(response.success, "{:?}", response.error);
    assert_eq!(
        h.prompts.lock().unwrap().clone(),
        vec![("s1".to_string(), "rain on a tin roof".to_string(), 5.0)]
    );
    let result = response.result.unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.get("sound"), Some(h.out.join("s1_sound.mp3").as_path()));
    assert_eq!(response.conversion_duration, None);
    assert!(h.engine_calls.lock().unwrap().is_empty());
}

#[test]
fn test_failures_become_error_responses() {
    let mut h = harness();

    let response = h.pipeline.handle(&TaskRequest::new("t6", "2_step_vocal_extractor").with_input(&h.input));
    assert!(!response.success);
    assert!(response.error.unwrap().contains("Unsupported processing mode"));

    let text = h.input.with_extension("txt");
    std::fs::write(&text, b"").unwrap();
    let response = h.pipeline.handle(&TaskRequest::new("t7", "de_noise").with_input(&text));
    assert!(!response.success);
    assert!(response.error.unwrap().contains("Unsupported audio format"));

    let response = h.pipeline.handle(&TaskRequest::new("../t8", "de_noise").with_input(&h.input));
    assert!(!response.success);
    assert!(h.engine_calls.lock().unwrap().is_empty());
}
