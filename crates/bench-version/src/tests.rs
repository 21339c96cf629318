use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use bench_core::{
    find_bench_error, Application, BenchConfig, BenchError, BenchLayout, OrchestrationContext,
    UpgradePolicy,
};
use bench_exec::{CommandOutput, RecordingRunner};
use semver::Version;

use super::*;

static TEST_BENCH_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

#[test]
fn major_bump_is_detected() {
    let transition = compare_versions("12.0.3", "13.1.0");
    assert!(transition.is_major);
    assert_eq!(transition.from, Some(Version::new(12, 0, 3)));
    assert_eq!(transition.to, Some(Version::new(13, 1, 0)));
}

#[test]
fn minor_bump_is_not_major() {
    let transition = compare_versions("12.0.3", "12.5.0");
    assert!(!transition.is_major);
    assert!(!compare_versions("13.0.0", "12.9.9").is_major);
}

#[test]
fn unparsable_versions_are_never_major() {
    let transition = compare_versions("develop", "13.0.0");
    assert!(!transition.is_major);
    assert_eq!(transition.from, None);
    assert!(!compare_versions("12.0.0", "").is_major);
}

#[test]
fn lenient_parse_accepts_wildcards_prefixes_and_short_versions() {
    assert_eq!(parse_lenient("v14.2"), Some(Version::new(14, 2, 0)));
    assert_eq!(parse_lenient("15"), Some(Version::new(15, 0, 0)));
    assert_eq!(parse_lenient("1.8.3.1"), Some(Version::new(1, 8, 3)));

    let develop = parse_lenient("13.x.x-develop").expect("must parse develop version");
    assert_eq!((develop.major, develop.minor, develop.patch), (13, 0, 0));
    assert_eq!(develop.pre.as_str(), "develop");

    assert_eq!(parse_lenient("version-15"), None);
    assert_eq!(parse_lenient("  "), None);
}

#[test]
fn node_backend_follows_threshold() {
    assert_eq!(select_node_backend("10.9.0-develop", "11.0.0"), NodeBackend::Npm);
    assert_eq!(select_node_backend("11.0.0-develop", "11.0.0"), NodeBackend::Yarn);
    assert_eq!(select_node_backend("11.x.x-develop", "11.0.0"), NodeBackend::Yarn);
    assert_eq!(select_node_backend("15.1.0", "11.0.0"), NodeBackend::Yarn);
    assert_eq!(select_node_backend("garbage", "11.0.0"), NodeBackend::Yarn);
}

#[test]
fn python_assignment_is_read_with_either_quote() {
    let source = "import frappe\n__version__ = '14.40.1'\n__title__ = \"Frappe\"\n";
    assert_eq!(
        read_python_assignment(source, "__version__").as_deref(),
        Some("14.40.1")
    );
    assert_eq!(
        read_python_assignment(source, "__title__").as_deref(),
        Some("Frappe")
    );
    assert_eq!(read_python_assignment(source, "develop_version"), None);
}

#[test]
fn core_node_version_prefers_develop_hook() {
    let root = scaffold_core("__version__ = \"14.0.0\"\n");
    let layout = BenchLayout::new(&root);
    let core = Application::new(&layout, "frappe");

    assert_eq!(
        core_node_version(&core).expect("must read version").as_deref(),
        Some("14.0.0")
    );

    fs::write(core.hooks_py_path(), "develop_version = \"15.x.x-develop\"\n")
        .expect("must write hooks");
    assert_eq!(
        core_node_version(&core).expect("must read version").as_deref(),
        Some("15.x.x-develop")
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn detect_upgrade_reads_remote_init_file() {
    let root = scaffold_core("__version__ = \"12.0.3\"\n");
    let layout = BenchLayout::new(&root);
    let runner = RecordingRunner::new()
        .respond("git remote", CommandOutput::with_stdout("origin\nupstream\n"))
        .respond("git rev-parse --abbrev-ref HEAD", CommandOutput::with_stdout("version-13\n"))
        .respond(
            "git show upstream/version-13:frappe/__init__.py",
            CommandOutput::with_stdout("__version__ = '13.1.0'\n"),
        );
    let ctx = context(&layout, &runner);

    let transition = detect_upgrade(&ctx).expect("must detect upgrade");

    assert!(transition.is_major);
    assert_eq!(transition.to_string(), "12.0.3 -> 13.1.0");
    assert_eq!(
        runner.count_matching("git fetch --no-tags upstream version-13"),
        1
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn detect_upgrade_treats_failed_fetch_as_minor() {
    let root = scaffold_core("__version__ = \"12.0.3\"\n");
    let layout = BenchLayout::new(&root);
    let runner = RecordingRunner::new()
        .respond("git remote", CommandOutput::with_stdout("upstream\n"))
        .respond("git rev-parse --abbrev-ref HEAD", CommandOutput::with_stdout("develop\n"))
        .respond("git fetch", CommandOutput::failure(128, "could not resolve host"));
    let ctx = context(&layout, &runner);

    let transition = detect_upgrade(&ctx).expect("failed fetch must not error");

    assert!(!transition.is_major);
    assert_eq!(transition.from, Some(Version::new(12, 0, 3)));
    assert_eq!(transition.to, None);
    assert_eq!(runner.count_matching("git show"), 0);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn detect_upgrade_without_core_checkout_is_unknown() {
    let root = test_bench_root();
    for folder in ["apps", "sites", "config/pids", "logs"] {
        fs::create_dir_all(root.join(folder)).expect("must create bench folder");
    }
    let layout = BenchLayout::new(&root);
    let runner = RecordingRunner::new();
    let ctx = context(&layout, &runner);

    let transition = detect_upgrade(&ctx).expect("must not fail");
    assert_eq!(transition, VersionTransition::unknown());
    assert!(runner.calls().is_empty());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn feasibility_requires_node_tooling_from_version_six() {
    let transition = compare_versions("5.4.0", "6.0.0");
    let bare = RecordingRunner::new().with_tools(["git", "python3"]);
    let err = validate_upgrade_feasible(&bare, &transition).expect_err("missing npm must fail");
    assert!(matches!(
        find_bench_error(&err),
        Some(BenchError::Environment(_))
    ));

    let node_only = RecordingRunner::new().with_tools(["nodejs"]);
    validate_upgrade_feasible(&node_only, &transition).expect("nodejs must be enough");

    let old_target = compare_versions("4.0.0", "5.0.0");
    validate_upgrade_feasible(&bare, &old_target).expect("pre-6 targets need no node");
    validate_upgrade_feasible(&bare, &VersionTransition::unknown())
        .expect("unknown target must not block");
}

fn context<'a>(layout: &BenchLayout, runner: &'a RecordingRunner) -> OrchestrationContext<'a> {
    OrchestrationContext::new(
        layout.clone(),
        BenchConfig::default(),
        UpgradePolicy::default(),
        runner,
    )
}

fn scaffold_core(init_source: &str) -> PathBuf {
    let root = test_bench_root();
    for folder in ["apps", "sites", "config/pids", "logs"] {
        fs::create_dir_all(root.join(folder)).expect("must create bench folder");
    }
    let app_root = root.join("apps").join("frappe");
    fs::create_dir_all(app_root.join(".git")).expect("must create git dir");
    fs::create_dir_all(app_root.join("frappe")).expect("must create module dir");
    fs::write(app_root.join("frappe").join("__init__.py"), init_source).expect("must write init");
    fs::write(root.join("sites").join("apps.txt"), "frappe\n").expect("must write apps.txt");
    root
}

fn test_bench_root() -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let counter = TEST_BENCH_ROOT_COUNTER.fetch_add(1, Ordering::SeqCst);
    path.push(format!(
        "bench-version-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        counter
    ));
    path
}
