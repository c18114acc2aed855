use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn kura_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("kura");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_content = format!(
        r#"[files]
catalog = "{root}/data/catalog.csv"
audit = "{root}/data/audit.csv"
history = "{root}/data/member_history.json"
"#,
        root = root.display()
    );

    let config_path = root.join("kura.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_kura(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = kura_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("--user")
        .arg("tester")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run kura binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn add_sample(config_path: &Path, name: &str, member: &str) {
    let (stdout, stderr, success) =
        run_kura(config_path, &["add", "--name", name, "--member", member]);
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
}

#[test]
fn test_init_creates_files() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_kura(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));

    assert!(tmp.path().join("data/catalog.csv").exists());
    assert!(tmp.path().join("data/audit.csv").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_kura(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_kura(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_add_then_list_shows_pending() {
    let (_tmp, config_path) = setup_test_env();

    add_sample(&config_path, "Daybreak", "Aya Sato");

    let (stdout, stderr, success) = run_kura(&config_path, &["list"]);
    assert!(success, "list failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("pending approval"));
    assert!(stdout.contains("Daybreak"));
    assert!(stdout.contains("Aya Sato"));
}

#[test]
fn test_add_requires_member() {
    let (tmp, config_path) = setup_test_env();

    let (_, stderr, success) =
        run_kura(&config_path, &["add", "--name", "Daybreak", "--member", " "]);
    assert!(!success, "add without member should fail");
    assert!(stderr.contains("required"));
    // Rejected operation writes nothing.
    assert!(!tmp.path().join("data/catalog.csv").exists());
}

#[test]
fn test_add_rejects_bad_ratio() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success) = run_kura(
        &config_path,
        &[
            "add",
            "--name",
            "Daybreak",
            "--member",
            "Aya",
            "--polish-ratio",
            "about 60",
        ],
    );
    assert!(!success, "non-numeric polish ratio should be rejected");
}

#[test]
fn test_add_appends_audit_entry() {
    let (_tmp, config_path) = setup_test_env();

    add_sample(&config_path, "Daybreak", "Aya Sato");

    let (stdout, _, success) = run_kura(&config_path, &["audit"]);
    assert!(success);
    assert!(stdout.contains("add"));
    assert!(stdout.contains("tester"));
    assert!(stdout.contains("Daybreak"));
}

#[test]
fn test_session_assignment_flow() {
    let (_tmp, config_path) = setup_test_env();

    add_sample(&config_path, "Daybreak", "Aya Sato");

    let (stdout, stderr, success) =
        run_kura(&config_path, &["session", "--id", "1", "--number", "第8回"]);
    assert!(success, "session failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("assigned session 8"));

    let (stdout, _, success) = run_kura(&config_path, &["list", "--session", "8"]);
    assert!(success);
    assert!(stdout.contains("Daybreak"));
    assert!(stdout.contains("session 8"));

    let (stdout, _, _) = run_kura(&config_path, &["audit"]);
    assert!(stdout.contains("update_session"));
    assert!(stdout.contains("session"));
}

#[test]
fn test_session_clear_returns_to_pending() {
    let (_tmp, config_path) = setup_test_env();

    add_sample(&config_path, "Daybreak", "Aya Sato");
    run_kura(&config_path, &["session", "--id", "1", "--number", "8"]);

    let (stdout, _, success) = run_kura(&config_path, &["session", "--id", "1", "--clear"]);
    assert!(success);
    assert!(stdout.contains("pending"));

    let (stdout, _, _) = run_kura(&config_path, &["list", "--session", "pending"]);
    assert!(stdout.contains("Daybreak"));
}

#[test]
fn test_delete_previews_without_yes() {
    let (tmp, config_path) = setup_test_env();

    add_sample(&config_path, "Daybreak", "Aya Sato");

    let (stdout, _, success) = run_kura(&config_path, &["delete", "--id", "1"]);
    assert!(success);
    assert!(stdout.contains("nothing deleted"));

    let catalog = fs::read_to_string(tmp.path().join("data/catalog.csv")).unwrap();
    assert!(catalog.contains("Daybreak"));

    let (stdout, _, success) = run_kura(&config_path, &["delete", "--id", "1", "--yes"]);
    assert!(success);
    assert!(stdout.contains("deleted 1 record(s)"));

    let catalog = fs::read_to_string(tmp.path().join("data/catalog.csv")).unwrap();
    assert!(!catalog.contains("Daybreak"));

    let (stdout, _, _) = run_kura(&config_path, &["audit"]);
    assert!(stdout.contains("delete"));
}

#[test]
fn test_import_guesses_mapping_and_derives_category() {
    let (tmp, config_path) = setup_test_env();

    let source = tmp.path().join("bottles.csv");
    fs::write(
        &source,
        "銘柄,会員氏名,在庫,純米,吟醸\n\
         Daybreak,Aya Sato,2,○,\n\
         Nightfall,Ken Mori,,,1\n",
    )
    .unwrap();

    let (stdout, stderr, success) =
        run_kura(&config_path, &["import", source.to_str().unwrap()]);
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("records written: 2"));
    assert!(stdout.contains("ok"));

    let catalog = fs::read_to_string(tmp.path().join("data/catalog.csv")).unwrap();
    let header = catalog.lines().next().unwrap();
    assert!(header.starts_with("id,name,category,quantity,updated_at"));
    assert!(catalog.contains("Daybreak"));
    assert!(catalog.contains("純米"));
    assert!(catalog.contains("吟醸"));
}

#[test]
fn test_import_dry_run_writes_nothing() {
    let (tmp, config_path) = setup_test_env();

    let source = tmp.path().join("bottles.csv");
    fs::write(&source, "銘柄,会員氏名\nDaybreak,Aya\n").unwrap();

    let (stdout, _, success) = run_kura(
        &config_path,
        &["import", source.to_str().unwrap(), "--dry-run"],
    );
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(!tmp.path().join("data/catalog.csv").exists());
}

#[test]
fn test_import_map_override() {
    let (tmp, config_path) = setup_test_env();

    let source = tmp.path().join("bottles.csv");
    fs::write(&source, "Bottle,Who\nDaybreak,Aya\n").unwrap();

    let (stdout, stderr, success) = run_kura(
        &config_path,
        &[
            "import",
            source.to_str().unwrap(),
            "--map",
            "name=Bottle",
            "--map",
            "member=Who",
        ],
    );
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("name"));

    let catalog = fs::read_to_string(tmp.path().join("data/catalog.csv")).unwrap();
    assert!(catalog.contains("Daybreak"));
    assert!(catalog.contains("Aya"));
}

#[test]
fn test_import_unreadable_file_is_single_error() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_kura(&config_path, &["import", "/nonexistent/bottles.csv"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read import file"));
}

#[test]
fn test_suggest_ranks_by_frequency() {
    let (_tmp, config_path) = setup_test_env();

    add_sample(&config_path, "Daybreak", "Aya");
    add_sample(&config_path, "Nightfall", "Aya");
    add_sample(&config_path, "Moonrise", "Ken");

    let (stdout, stderr, success) = run_kura(&config_path, &["suggest"]);
    assert!(success, "suggest failed: stdout={}, stderr={}", stdout, stderr);

    let aya = stdout.find("Aya").expect("Aya listed");
    let ken = stdout.find("Ken").expect("Ken listed");
    assert!(aya < ken, "most-used member should rank first: {}", stdout);
}

#[test]
fn test_corrupt_catalog_degrades_to_empty() {
    let (tmp, config_path) = setup_test_env();

    fs::create_dir_all(tmp.path().join("data")).unwrap();
    fs::write(tmp.path().join("data/catalog.csv"), "").unwrap();

    let (stdout, stderr, success) = run_kura(&config_path, &["list"]);
    assert!(success, "list over corrupt catalog should not crash");
    assert!(stdout.contains("no records to show"));
    // The degradation is loud.
    assert!(stderr.contains("catalog"), "expected warning, got: {}", stderr);
}

#[test]
fn test_resave_upgrades_old_file_shape() {
    let (tmp, config_path) = setup_test_env();

    fs::create_dir_all(tmp.path().join("data")).unwrap();
    fs::write(tmp.path().join("data/catalog.csv"), "name,id\nDaybreak,1\n").unwrap();

    let (stdout, _, success) = run_kura(&config_path, &["list", "--resave"]);
    assert!(success);
    assert!(stdout.contains("canonical schema"));

    let catalog = fs::read_to_string(tmp.path().join("data/catalog.csv")).unwrap();
    let header = catalog.lines().next().unwrap();
    assert!(header.starts_with("id,name,category,quantity"));

    let (stdout, _, _) = run_kura(&config_path, &["audit"]);
    assert!(stdout.contains("manual_save"));
}
