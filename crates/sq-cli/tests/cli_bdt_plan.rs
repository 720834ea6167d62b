use std::path::PathBuf;
use std::process::{Command, Output};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sexaq"))
}

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..").canonicalize().unwrap()
}

fn run_plan(extra: &[&str]) -> Output {
    let cfg = repo_root().join("tests/fixtures/bdt.yaml");
    assert!(cfg.exists(), "missing fixture: {}", cfg.display());
    let cfg = cfg.to_string_lossy().into_owned();
    let mut args = vec!["bdt-plan", "--config", cfg.as_str()];
    args.extend_from_slice(extra);
    Command::new(bin_path())
        .args(&args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn stdout_json(out: &Output) -> serde_json::Value {
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).expect("stdout should be JSON")
}

#[test]
fn bdt_plan_renders_trainer_inputs() {
    let v = stdout_json(&run_plan(&[]));
    let plan = &v["plan"];
    assert_eq!(plan["dataset_dir"], "dataset_BDT_2016_fixture");
    assert_eq!(plan["tree"], "FlatTreeProducerBDT/FlatTree");
    assert_eq!(plan["factory_name"], "TMVAClassification");
    assert_eq!(plan["method_name"], "BDT");
    assert_eq!(plan["output_file"], "BDTOutput_2016__fixture.root");
    assert_eq!(
        plan["signal_cut"],
        "_S_charge == -1 && _S_lxy_interaction_vertex_beampipeCenter > 2.02 \
         && _S_lxy_interaction_vertex_beampipeCenter > 1.9 && _S_dxy_over_lxy < 0.5"
    );
    assert_eq!(plan["variables"].as_array().unwrap().len(), 19);
    assert!(plan["method_options"].as_str().unwrap().contains("NTrees=400"));
    assert!(v["split"].is_null());
    assert!(v["split_seed"].is_null());
}

#[test]
fn bdt_plan_split_is_seeded() {
    let a = stdout_json(&run_plan(&["--rows", "50", "--split-seed", "7"]));
    let b = stdout_json(&run_plan(&["--rows", "50", "--split-seed", "7"]));
    assert_eq!(a["split"], b["split"]);
    assert_eq!(a["split_seed"], 7);
    assert_eq!(a["split"]["train"].as_array().unwrap().len(), 40);
    assert_eq!(a["split"]["test"].as_array().unwrap().len(), 10);
}

#[test]
fn bdt_plan_missing_config_fails() {
    let out = Command::new(bin_path())
        .args(["bdt-plan", "--config", "/nonexistent/bdt.yaml"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to load training config"));
}
