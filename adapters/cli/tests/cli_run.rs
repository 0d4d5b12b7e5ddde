use std::process::Command;

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_skyline-defence"))
}

#[test]
fn short_session_exits_cleanly() {
    let status = binary()
        .args(["--seed", "7", "--frames", "120", "--cities", "3"])
        .status()
        .expect("failed to launch skyline-defence");

    assert!(status.success(), "a short headless session should succeed");
}

#[test]
fn unreadable_settings_file_is_reported() {
    let output = binary()
        .args(["--frames", "1", "--settings", "/nonexistent/skyline.toml"])
        .output()
        .expect("failed to launch skyline-defence");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read settings file"), "{stderr}");
}
