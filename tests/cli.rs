use std::path::Path;
use std::process::{Command, Output};

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_xcresult-extract"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run xcresult-extract")
}

#[test]
fn test_no_arguments_prints_usage_and_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("USAGE: xcresult-extract"));
    assert!(!dir.path().join("data.txt").exists());
}

#[test]
fn test_invalid_project_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(
        dir.path(),
        &["-project", "Client.xcworkspace", "-scheme", "ClientTests", "test"],
    );
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Client.xcworkspace is not a valid project path"));
}

#[test]
fn test_missing_derived_data_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("xcresult-extract.toml"),
        "[derived_data]\nroot = \"./NoDerivedData\"\n",
    )
    .unwrap();
    let output = run_in(
        dir.path(),
        &["-project", "Client/Client.xcodeproj", "-scheme", "ClientTests"],
    );
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("NoDerivedData"));
}

#[cfg(unix)]
#[test]
fn test_extracts_with_stand_in_tool() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("Run-Perf.xcresult");
    std::fs::create_dir_all(&bundle).unwrap();

    // Stand-in for xcresulttool: the document for each id is a file in docs/.
    let docs = dir.path().join("docs");
    std::fs::create_dir_all(&docs).unwrap();
    std::fs::write(
        docs.join("root.json"),
        r#"{"actions": {"_values": [{
            "runDestination": {"targetDeviceRecord": {"modelUTI": {"_value": "com.apple.mac"}}},
            "actionResult": {"testsRef": {"id": {"_value": "tests"}}}
        }]}, "metrics": {"testsCount": {"_value": "1"}}}"#,
    )
    .unwrap();
    std::fs::write(
        docs.join("tests.json"),
        r#"{"summaries": {"_values": [{"testableSummaries": {"_values": [{"tests": {"_values": [{
            "subtests": {"_values": [{"subtests": {"_values": [{"subtests": {"_values": [
                {"summaryRef": {"id": {"_value": "sum1"}}}
            ]}}]}}]}}]}}]}}]}}"#,
    )
    .unwrap();
    std::fs::write(
        docs.join("sum1.json"),
        r#"{"identifier": {"_value": "Perf/testLaunch()"}, "duration": {"_value": "1.234"},
            "performanceMetrics": {"_values": [{"measurements": {"_values": [
                {"_value": "1.0"}, {"_value": "2.0"}, {"_value": "3.0"}
            ]}}]}}"#,
    )
    .unwrap();

    // Arguments arrive as: get --path <bundle> [--id <id>] --format json
    let script = r#"if [ "$4" = "--id" ]; then cat "docs/$5.json"; else cat docs/root.json; fi"#;
    let config = format!(
        "[xcresulttool]\ncommand = \"sh\"\nargs = [\"-c\", {script:?}, \"sh\"]\n"
    );
    std::fs::write(dir.path().join("xcresult-extract.toml"), config).unwrap();

    let bundle_arg = bundle.display().to_string();
    let output = run_in(
        dir.path(),
        &["-scheme", "Perf", "-resultBundlePath", &bundle_arg, "test"],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Number of Tests=1"));
    assert!(stdout.contains("com.apple.mac,Perf/testLaunch(),1.23,2.0"));

    let data = std::fs::read_to_string(dir.path().join("data.txt")).unwrap();
    assert_eq!(
        data,
        "[{'testName': 'Perf/testLaunch()', 'Duration': '1.23', 'Disk Local Writes': '2.0'}]"
    );
}
