use std::process::Command;

fn bin() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_payload-matrix"));
    command.env_remove("GITHUB_TOKEN").env("RUST_LOG", "error");
    command
}

#[test]
fn rejects_malformed_pull_request_reference() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let out_path = temp_dir.path().join("report.html");

    for pr in ["openshift/installer", "openshift/installer#abc", "installer#12", "a/b#0"] {
        let output = bin()
            .arg("--pr")
            .arg(pr)
            .arg("--out")
            .arg(&out_path)
            .output()
            .expect("run payload-matrix");
        assert!(!output.status.success(), "{pr} should be rejected");
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("--pr"), "stderr for {pr}: {stderr}");
    }
    assert!(!out_path.exists());
}

#[test]
fn requires_pull_request_reference() {
    let status = bin().status().expect("run payload-matrix");
    assert!(!status.success());
}

#[test]
fn unreadable_registry_fails_before_crawling() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let out_path = temp_dir.path().join("report.html");
    let output = bin()
        .arg("--pr")
        .arg("openshift/installer#7001")
        .arg("--variants")
        .arg(temp_dir.path().join("missing.tsv"))
        .arg("--out")
        .arg(&out_path)
        .output()
        .expect("run payload-matrix");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("variant registry"), "stderr: {stderr}");
    assert!(!out_path.exists());
}

#[test]
fn malformed_registry_fails_before_crawling() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let registry_path = temp_dir.path().join("variants.tsv");
    std::fs::write(&registry_path, "job\tvariant\nsome-job\tSome\n").expect("write registry");

    let output = bin()
        .arg("--pr")
        .arg("openshift/installer#7001")
        .arg("--variants")
        .arg(&registry_path)
        .arg("--out")
        .arg(temp_dir.path().join("report.html"))
        .output()
        .expect("run payload-matrix");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing column"), "stderr: {stderr}");
}

#[test]
fn help_lists_every_option() {
    let output = bin().arg("--help").output().expect("run payload-matrix");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in [
        "--pr",
        "--out",
        "--release",
        "--cache-dir",
        "--variants",
        "--format",
        "--jobs",
        "--timeout-secs",
    ] {
        assert!(stdout.contains(flag), "missing {flag} in help");
    }
}
