use assert_cmd::Command;
use llfront::config::Config;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn sample(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("samples")
        .join(name)
}

fn llfront(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("llfront").expect("binary exists");
    cmd.current_dir(dir);
    cmd
}

fn parse_stdout(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout is JSON")
}

#[test]
fn writes_json_to_stdout() {
    let dir = tempdir().expect("tempdir");
    let assert = llfront(dir.path()).arg(sample("hello.ll")).assert().success();
    let json = parse_stdout(&assert.get_output().stdout);

    assert_eq!(json["dialect"], "new");
    assert_eq!(json["nodes"].as_array().map(Vec::len), Some(6));
    assert_eq!(json["nodes"][0]["intertype"], "type");
    assert_eq!(json["stubs"][0]["ident"], "@main");
    assert!(json.get("debug").is_none());
}

#[test]
fn reads_stdin() {
    let dir = tempdir().expect("tempdir");
    llfront(dir.path())
        .write_stdin("@x = global i32 7\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"globalVariable\""));
}

#[test]
fn writes_output_file() {
    let dir = tempdir().expect("tempdir");
    let output_path = dir.path().join("out.json");

    llfront(dir.path())
        .arg(sample("except.ll"))
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("4 deferred function(s)"));

    let text = fs::read_to_string(&output_path).expect("read output");
    let json: Value = serde_json::from_str(&text).expect("output is JSON");
    assert_eq!(json["dialect"], "old");
}

#[test]
fn eager_parses_bodies() {
    let dir = tempdir().expect("tempdir");
    let assert = llfront(dir.path())
        .arg(sample("hello.ll"))
        .arg("--eager")
        .assert()
        .success();
    let json = parse_stdout(&assert.get_output().stdout);
    assert_eq!(json["nodes"].as_array().map(Vec::len), Some(24));
    assert_eq!(json["stubs"].as_array().map(Vec::len), Some(0));
}

#[test]
fn expand_appends_deferred_bodies() {
    let dir = tempdir().expect("tempdir");
    let assert = llfront(dir.path())
        .arg(sample("hello.ll"))
        .arg("--expand")
        .assert()
        .success();
    let json = parse_stdout(&assert.get_output().stdout);
    let nodes = json["nodes"].as_array().expect("nodes");
    assert_eq!(nodes.len(), 24);
    assert_eq!(json["stubs"].as_array().map(Vec::len), Some(1));
    assert!(nodes.iter().any(|n| n["intertype"] == "switch"));
}

#[test]
fn dialect_override() {
    let dir = tempdir().expect("tempdir");
    let assert = llfront(dir.path())
        .arg(sample("hello.ll"))
        .arg("--dialect")
        .arg("old")
        .assert()
        .success();
    assert_eq!(parse_stdout(&assert.get_output().stdout)["dialect"], "old");
}

#[test]
fn rejects_unknown_dialect() {
    let dir = tempdir().expect("tempdir");
    llfront(dir.path())
        .arg(sample("hello.ll"))
        .arg("--dialect")
        .arg("ancient")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid dialect: ancient"));
}

#[test]
fn reports_inline_assembly() {
    let dir = tempdir().expect("tempdir");
    let input_path = dir.path().join("asm.ll");
    fs::write(
        &input_path,
        "define void @f() {\n  call void asm sideeffect \"nop\", \"\"()\n  ret void\n}\n",
    )
    .expect("write input");

    llfront(dir.path())
        .arg(&input_path)
        .arg("--eager")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("line 2: inline assembly cannot be translated"));
}

#[test]
fn config_file_is_applied() {
    let dir = tempdir().expect("tempdir");
    let config_path = dir.path().join("front.json");
    fs::write(&config_path, r#"{ "parse_function_bodies": true, "fake_x86_fp80": true }"#)
        .expect("write config");
    let input_path = dir.path().join("ld.ll");
    fs::write(&input_path, "@ld = global x86_fp80 0xK3FFF8000000000000000\n").expect("write input");

    let assert = llfront(dir.path())
        .arg(&input_path)
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success();
    let json = parse_stdout(&assert.get_output().stdout);
    assert_eq!(json["nodes"][0]["ty"], "double");
}

#[test]
fn default_config_is_discovered() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("llfront.config.json"),
        r#"{ "parse_function_bodies": true }"#,
    )
    .expect("write config");

    let assert = llfront(dir.path()).arg(sample("hello.ll")).assert().success();
    let json = parse_stdout(&assert.get_output().stdout);
    assert_eq!(json["stubs"].as_array().map(Vec::len), Some(0));
}

#[test]
fn reports_bad_config() {
    let dir = tempdir().expect("tempdir");
    let config_path = dir.path().join("broken.json");
    fs::write(&config_path, "{ not json").expect("write config");

    llfront(dir.path())
        .arg(sample("hello.ll"))
        .arg("--config")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config JSON"));
}

#[test]
fn json_tags_match_node_kinds() {
    let dir = tempdir().expect("tempdir");
    for name in ["hello.ll", "except.ll", "debug.ll"] {
        let text = fs::read_to_string(sample(name)).expect("read sample");
        let expected = llfront::intertype(&text, &Config::eager()).expect("library parse");

        let assert = llfront(dir.path()).arg(sample(name)).arg("--eager").assert().success();
        let json = parse_stdout(&assert.get_output().stdout);
        let nodes = json["nodes"].as_array().expect("nodes");
        assert_eq!(nodes.len(), expected.nodes.len(), "{}", name);
        for (node, want) in nodes.iter().zip(&expected.nodes) {
            assert_eq!(node["intertype"], want.intertype(), "{} line {}", name, want.line_num);
            assert_eq!(node["lineNum"], want.line_num);
            assert!(node.get("line_num").is_none());
        }
    }
}

#[test]
fn json_fields_are_camel_case() {
    let dir = tempdir().expect("tempdir");
    let assert = llfront(dir.path())
        .arg(sample("except.ll"))
        .arg("--eager")
        .assert()
        .success();
    let json = parse_stdout(&assert.get_output().stdout);
    let nodes = json["nodes"].as_array().expect("nodes");

    let invoke = nodes.iter().find(|n| n["intertype"] == "invoke").expect("invoke");
    assert_eq!(invoke["toLabel"], "%cont");
    assert_eq!(invoke["unwindLabel"], "%lpad");
    assert!(invoke["call"].get("functionType").is_some());

    let load = nodes.iter().find(|n| n["intertype"] == "load").expect("load");
    assert_eq!(load["valueType"], "i8*");
    assert!(load.get("value_type").is_none());

    assert!(nodes.iter().any(|n| n["intertype"] == "getelementptr"));
    assert!(nodes.iter().any(|n| n["intertype"] == "indirectbr"));
    assert!(nodes.iter().any(|n| n["intertype"] == "extractvalue"));
}
