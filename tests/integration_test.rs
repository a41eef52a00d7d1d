// tests/integration_test.rs
use std::fs;
use std::path::Path;
use std::process::Command;

use git2::Repository as Git2Repo;
use polyvers::analyzer::VersionResolver;
use polyvers::cli::{run_bump_workflow, run_status, BumpWorkflowArgs, StatusArgs};
use polyvers::config::Config;
use polyvers::domain::{Registry, Version, VersionBump};
use polyvers::git::{Git2Repository, Repository};
use polyvers::PolyversError;
use tempfile::TempDir;

fn init_repo() -> (TempDir, Git2Repo) {
    let dir = TempDir::new().unwrap();
    let repo = Git2Repo::init(dir.path()).unwrap();
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();
    (dir, repo)
}

fn commit_file(repo: &Git2Repo, name: &str, content: &str) -> git2::Oid {
    let workdir = repo.workdir().unwrap().to_path_buf();
    let path = workdir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = repo.signature().unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        &format!("update {}", name),
        &tree,
        &parents,
    )
    .unwrap()
}

fn tag_head(repo: &Git2Repo, name: &str) {
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    let signature = repo.signature().unwrap();
    repo.tag(name, head.as_object(), &signature, name, false)
        .unwrap();
}

fn tag_names(repo: &Git2Repo) -> Vec<String> {
    let mut names: Vec<String> = repo
        .tag_names(None)
        .unwrap()
        .iter()
        .flatten()
        .map(String::from)
        .collect();
    names.sort();
    names
}

fn registry(toml: &str) -> Registry {
    Registry::from_config(&Config::from_toml_str(toml).unwrap()).unwrap()
}

fn bump_args(kind: VersionBump, projects: &[&str], all: bool) -> BumpWorkflowArgs {
    BumpWorkflowArgs {
        kind,
        projects: projects.iter().map(|p| p.to_string()).collect(),
        all,
        dry_run: false,
        yes: true,
    }
}

const SINGLE_PROJECT: &str = r#"
[[projects]]
pname = "polyvers"

[[projects.engraves]]
globs = ["polyvers/__init__.py"]
"#;

/// polyvers-v1.0.0 followed by three unrelated commits
fn three_commits_ahead() -> (TempDir, Git2Repo) {
    let (dir, repo) = init_repo();
    commit_file(&repo, "polyvers/__init__.py", "__version__ = \"1.0.0\"\n");
    tag_head(&repo, "polyvers-v1.0.0");
    for i in 0..3 {
        commit_file(&repo, "README.md", &format!("change {}\n", i));
    }
    (dir, repo)
}

#[test]
fn test_status_three_commits_ahead() {
    let (dir, _git) = three_commits_ahead();
    let repo = Git2Repository::open(dir.path()).unwrap();
    let registry = registry(SINGLE_PROJECT);

    let entries = run_status(
        &repo,
        &registry,
        &StatusArgs {
            projects: vec![],
            describe: true,
        },
    )
    .unwrap();

    assert_eq!(entries.len(), 1);
    let state = &entries[0].state;
    assert_eq!(state.current, Some(Version::new(1, 0, 0)));
    assert_eq!(state.tag.as_deref(), Some("polyvers-v1.0.0"));
    assert_eq!(state.distance, 3);
    assert!(!state.is_dirty);

    let described = entries[0].described.as_ref().unwrap().to_string();
    assert!(described.starts_with("1.0.0+3.g"), "{}", described);
}

#[test]
fn test_patch_bump_engraves_commits_and_tags() {
    let (dir, git) = three_commits_ahead();
    let repo = Git2Repository::open(dir.path()).unwrap();
    let registry = registry(SINGLE_PROJECT);

    let result = run_bump_workflow(
        &repo,
        &registry,
        &bump_args(VersionBump::Patch, &["polyvers"], false),
        |_| panic!("confirmation skipped with yes"),
    )
    .unwrap();

    assert!(result.applied);
    assert_eq!(result.tags, vec!["polyvers-v1.0.1".to_string()]);
    assert!(result.commit.is_some());
    assert_eq!(
        fs::read_to_string(dir.path().join("polyvers/__init__.py")).unwrap(),
        "__version__ = \"1.0.1\"\n"
    );

    // The new tag sits on HEAD and the engraving is committed.
    let tag_oid = repo.find_tag_oid("polyvers-v1.0.1").unwrap();
    assert_eq!(tag_oid, repo.head_oid().unwrap());
    assert!(!repo.is_dirty(None).unwrap());

    let entries = run_status(&repo, &registry, &StatusArgs::default()).unwrap();
    assert_eq!(entries[0].state.current, Some(Version::new(1, 0, 1)));
    assert_eq!(entries[0].state.distance, 0);

    let head = git.head().unwrap().peel_to_commit().unwrap();
    assert!(head.message().unwrap().contains("polyvers 1.0.0 → 1.0.1"));
}

#[test]
fn test_shared_scheme_bumps_all_projects_in_one_commit() {
    let (dir, git) = init_repo();
    commit_file(&git, "a/__init__.py", "__version__ = '0.1.0'\n");
    commit_file(&git, "b/__init__.py", "__version__ = '0.1.0'\n");
    tag_head(&git, "a-v0.1.0");
    tag_head(&git, "b-v0.1.0");
    commit_file(&git, "a/module.py", "x = 1\n");

    let repo = Git2Repository::open(dir.path()).unwrap();
    let registry = registry(
        r#"
version_scheme = "shared"

[[projects]]
pname = "a"
basepath = "a"
[[projects.engraves]]
globs = ["__init__.py"]

[[projects]]
pname = "b"
basepath = "b"
[[projects.engraves]]
globs = ["__init__.py"]
"#,
    );

    let result = run_bump_workflow(
        &repo,
        &registry,
        &bump_args(VersionBump::Minor, &[], true),
        |_| Ok(true),
    )
    .unwrap();

    assert_eq!(result.files.len(), 2);
    assert_eq!(
        tag_names(&git),
        vec!["a-v0.1.0", "a-v0.2.0", "b-v0.1.0", "b-v0.2.0"]
    );
    let head = repo.head_oid().unwrap();
    assert_eq!(repo.find_tag_oid("a-v0.2.0").unwrap(), head);
    assert_eq!(repo.find_tag_oid("b-v0.2.0").unwrap(), head);
    for file in ["a/__init__.py", "b/__init__.py"] {
        assert_eq!(
            fs::read_to_string(dir.path().join(file)).unwrap(),
            "__version__ = '0.2.0'\n"
        );
    }
}

#[test]
fn test_shared_scheme_partial_target_writes_nothing() {
    let (dir, git) = init_repo();
    commit_file(&git, "a/__init__.py", "__version__ = '0.1.0'\n");
    tag_head(&git, "a-v0.1.0");
    tag_head(&git, "b-v0.1.0");
    let head_before = git.head().unwrap().target();

    let repo = Git2Repository::open(dir.path()).unwrap();
    let registry = registry(
        r#"
version_scheme = "shared"
[[projects]]
pname = "a"
basepath = "a"
[[projects]]
pname = "b"
basepath = "b"
"#,
    );

    let err = run_bump_workflow(
        &repo,
        &registry,
        &bump_args(VersionBump::Patch, &["a"], false),
        |_| Ok(true),
    )
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PolyversError>(),
        Some(PolyversError::VersionSkew(_))
    ));
    assert_eq!(git.head().unwrap().target(), head_before);
    assert_eq!(tag_names(&git), vec!["a-v0.1.0", "b-v0.1.0"]);
}

#[test]
fn test_missing_engrave_target_is_atomic() {
    let (dir, git) = init_repo();
    commit_file(&git, "pkg/__init__.py", "__version__ = \"2.0.0\"\n");
    tag_head(&git, "pkg-v2.0.0");
    let head_before = git.head().unwrap().target();

    let repo = Git2Repository::open(dir.path()).unwrap();
    let registry = registry(
        r#"
[[projects]]
pname = "pkg"
[[projects.engraves]]
globs = ["pkg/__init__.py", "pkg/missing.py"]
"#,
    );

    let err = run_bump_workflow(
        &repo,
        &registry,
        &bump_args(VersionBump::Major, &[], false),
        |_| Ok(true),
    )
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PolyversError>(),
        Some(PolyversError::EngraveTargetMissing { .. })
    ));
    assert_eq!(
        fs::read_to_string(dir.path().join("pkg/__init__.py")).unwrap(),
        "__version__ = \"2.0.0\"\n"
    );
    assert_eq!(git.head().unwrap().target(), head_before);
    assert_eq!(tag_names(&git), vec!["pkg-v2.0.0"]);
}

#[test]
fn test_existing_tag_is_rejected_before_writing() {
    let (dir, git) = init_repo();
    let released = commit_file(&git, "polyvers/__init__.py", "__version__ = \"1.0.0\"\n");
    tag_head(&git, "polyvers-v1.0.0");

    // A side commit, unreachable from HEAD, already carries the next tag.
    let parent = git.find_commit(released).unwrap();
    let signature = git.signature().unwrap();
    let side = git
        .commit(None, &signature, &signature, "side", &parent.tree().unwrap(), &[&parent])
        .unwrap();
    git.tag_lightweight("polyvers-v1.0.1", &git.find_object(side, None).unwrap(), false)
        .unwrap();

    let repo = Git2Repository::open(dir.path()).unwrap();
    let registry = registry(SINGLE_PROJECT);

    let err = run_bump_workflow(
        &repo,
        &registry,
        &bump_args(VersionBump::Patch, &[], false),
        |_| Ok(true),
    )
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PolyversError>(),
        Some(PolyversError::DuplicateTag(name)) if name == "polyvers-v1.0.1"
    ));
    assert_eq!(git.head().unwrap().target(), Some(released));
    assert_eq!(
        fs::read_to_string(dir.path().join("polyvers/__init__.py")).unwrap(),
        "__version__ = \"1.0.0\"\n"
    );
}

#[test]
fn test_dry_run_leaves_repository_untouched() {
    let (dir, git) = three_commits_ahead();
    let head_before = git.head().unwrap().target();
    let repo = Git2Repository::open(dir.path()).unwrap();
    let registry = registry(SINGLE_PROJECT);

    let mut args = bump_args(VersionBump::PreRelease(None), &[], false);
    args.dry_run = true;
    let result = run_bump_workflow(&repo, &registry, &args, |_| Ok(true)).unwrap();

    assert!(!result.applied);
    let planned = result.plan.get("polyvers").unwrap();
    assert_eq!(planned.new.to_string(), "1.0.1a0");
    assert_eq!(result.files.len(), 1);
    assert_eq!(git.head().unwrap().target(), head_before);
    assert_eq!(tag_names(&git), vec!["polyvers-v1.0.0"]);
    assert!(!repo.is_dirty(None).unwrap());
}

const TWO_PROJECTS: &str = r#"
[[projects]]
pname = "polyvers"

[[projects]]
pname = "pvlib"
basepath = "pvlib"
"#;

#[test]
fn test_status_describe_with_unreleased_project() {
    let (dir, git) = init_repo();
    commit_file(&git, "pvlib/setup.py", "version = '0.1.0'\n");
    tag_head(&git, "pvlib-v0.1.0");
    commit_file(&git, "README.md", "hello\n");

    let repo = Git2Repository::open(dir.path()).unwrap();
    let entries = run_status(
        &repo,
        &registry(TWO_PROJECTS),
        &StatusArgs {
            projects: vec![],
            describe: true,
        },
    )
    .unwrap();

    assert!(entries[0].state.is_unreleased());
    assert_eq!(entries[0].described, None);
    let described = entries[1].described.as_ref().unwrap().to_string();
    assert!(described.starts_with("0.1.0+1.g"), "{}", described);
}

#[test]
fn test_status_reports_tag_as_spelled_in_repository() {
    let (dir, git) = init_repo();
    commit_file(&git, "polyvers/__init__.py", "__version__ = \"1.0\"\n");
    tag_head(&git, "POLYVERS-V1.0");

    let repo = Git2Repository::open(dir.path()).unwrap();
    let entries = run_status(&repo, &registry(SINGLE_PROJECT), &StatusArgs::default()).unwrap();
    assert_eq!(entries[0].state.current, Some(Version::new(1, 0, 0)));
    assert_eq!(entries[0].state.tag.as_deref(), Some("POLYVERS-V1.0"));
    assert!(repo.find_tag_oid("POLYVERS-V1.0").unwrap().is_some());
}

#[test]
fn test_polytime_reports_head_commit_date() {
    let (dir, git) = init_repo();
    let head = commit_file(&git, "README.md", "hello\n");
    let seconds = git.find_commit(head).unwrap().time().seconds();

    let repo = Git2Repository::open(dir.path()).unwrap();
    let stamp = VersionResolver::new(&repo).polytime();
    let parsed = chrono::DateTime::parse_from_rfc2822(&stamp).unwrap();
    assert_eq!(parsed.timestamp(), seconds);
}

#[test]
fn test_first_release_from_untagged_history() {
    let (dir, git) = init_repo();
    commit_file(&git, "polyvers/__init__.py", "__version__ = \"0.0.0\"\n");
    commit_file(&git, "README.md", "hello\n");

    let repo = Git2Repository::open(dir.path()).unwrap();
    let registry = registry(SINGLE_PROJECT);

    let entries = run_status(&repo, &registry, &StatusArgs::default()).unwrap();
    assert!(entries[0].state.is_unreleased());
    assert_eq!(entries[0].state.distance, 2);

    let result = run_bump_workflow(
        &repo,
        &registry,
        &bump_args("0.1.0".parse().unwrap(), &[], false),
        |_| Ok(true),
    )
    .unwrap();
    assert_eq!(result.tags, vec!["polyvers-v0.1.0".to_string()]);
    assert_eq!(tag_names(&git), vec!["polyvers-v0.1.0"]);
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_polyvers"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("polyvers"));
    assert!(stdout.contains("status"));
    assert!(stdout.contains("bump"));
}

#[test]
fn test_cli_config_error_exit_code() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("polyvers.toml"), "[[projects]]\npname = \"-bad-\"\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_polyvers"))
        .args(["--config", "polyvers.toml", "status"])
        .current_dir(dir.path())
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("invalid project name"));
}

#[test]
fn test_cli_status_and_bump() {
    let (dir, git) = three_commits_ahead();
    fs::write(dir.path().join("polyvers.toml"), SINGLE_PROJECT).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_polyvers"))
        .args(["--config", "polyvers.toml", "status"])
        .current_dir(dir.path())
        .output()
        .expect("Failed to execute command");
    assert!(status.status.success());
    let stdout = String::from_utf8(status.stdout).unwrap();
    assert!(stdout.contains("polyvers-v1.0.0"));

    let described = Command::new(env!("CARGO_BIN_EXE_polyvers"))
        .args(["--config", "polyvers.toml", "status", "--describe", "--time"])
        .current_dir(dir.path())
        .output()
        .expect("Failed to execute command");
    assert!(described.status.success(), "{}", String::from_utf8_lossy(&described.stderr));
    let stdout = String::from_utf8(described.stdout).unwrap();
    assert!(stdout.contains("1.0.0+3.g"), "{}", stdout);
    assert!(stdout.contains("Last commit:"), "{}", stdout);

    let bump = Command::new(env!("CARGO_BIN_EXE_polyvers"))
        .args(["--config", "polyvers.toml", "bump", "minor", "--yes"])
        .current_dir(dir.path())
        .output()
        .expect("Failed to execute command");
    assert!(bump.status.success(), "{}", String::from_utf8_lossy(&bump.stderr));
    assert!(tag_names(&git).contains(&"polyvers-v1.1.0".to_string()));
}
