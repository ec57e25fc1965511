//! Shared fixture: a bare "remote" repository reachable through `file://`.
//!
//! Layout of the remote:
//!
//! - `master`: one commit adding `README.md` and `forms/a.json = "X"`
//! - `refs/changes/42/42/1`: a child of master changing `forms/a.json` to
//!   `"Y"` and adding `forms/b.json`

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;

use registry_vcs::core::types::{ChangeId, RefName, VersionName};
use registry_vcs::repo::{CommandExecutor, ExecutorSettings};
use registry_vcs::review::ChangeInfo;

pub const CHANGE_REF: &str = "refs/changes/42/42/1";
pub const BASE_TIME: i64 = 1_700_000_000;
pub const CHANGE_TIME: i64 = 1_700_086_400;

pub struct Remote {
    pub dir: TempDir,
}

impl Remote {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let bare = dir.path().join("registry.git");
        let seed = dir.path().join("seed");

        run_git(dir.path(), &["init", "--bare", bare.to_str().unwrap()], None);
        std::fs::create_dir_all(&seed).unwrap();
        run_git(&seed, &["init"], None);
        run_git(&seed, &["config", "user.email", "test@example.com"], None);
        run_git(&seed, &["config", "user.name", "Test User"], None);
        run_git(&seed, &["config", "commit.gpgsign", "false"], None);
        run_git(&seed, &["symbolic-ref", "HEAD", "refs/heads/master"], None);

        write(&seed, "README.md", "# Registry\n");
        write(&seed, "forms/a.json", "X");
        run_git(&seed, &["add", "."], None);
        run_git(&seed, &["commit", "-m", "Initial registry"], Some(BASE_TIME));

        run_git(&seed, &["remote", "add", "origin", bare.to_str().unwrap()], None);
        run_git(&seed, &["push", "origin", "master"], None);

        write(&seed, "forms/a.json", "Y");
        write(&seed, "forms/b.json", "new");
        run_git(&seed, &["add", "."], None);
        run_git(&seed, &["commit", "-m", "Edit forms"], Some(CHANGE_TIME));
        run_git(
            &seed,
            &["push", "origin", &format!("HEAD:{}", CHANGE_REF)],
            None,
        );

        Self { dir }
    }

    pub fn bare(&self) -> PathBuf {
        self.dir.path().join("registry.git")
    }

    pub fn url(&self) -> String {
        format!("file://{}", self.bare().display())
    }

    /// Commit a ref points at in the remote, if it exists.
    pub fn resolve(&self, refname: &str) -> Option<String> {
        let output = Command::new("git")
            .args(["--git-dir", self.bare().to_str().unwrap()])
            .args(["rev-parse", "--verify", "--quiet", refname])
            .output()
            .expect("git rev-parse failed");
        output
            .status
            .success()
            .then(|| String::from_utf8(output.stdout).unwrap().trim().to_string())
    }

    /// Commit `rev` resolves to in a working copy.
    pub fn rev_parse(workdir: &Path, rev: &str) -> String {
        let output = Command::new("git")
            .args(["rev-parse", "--verify", rev])
            .current_dir(workdir)
            .output()
            .expect("git rev-parse failed");
        assert!(output.status.success(), "cannot resolve {rev}");
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }

    /// An executor whose root is a fresh directory next to the remote.
    pub fn executor(&self, root: &Path) -> Arc<CommandExecutor> {
        let settings = ExecutorSettings::new(root, "master")
            .unwrap()
            .with_remote(self.url());
        Arc::new(CommandExecutor::new(settings))
    }
}

pub fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

pub fn run_git(dir: &Path, args: &[&str], time: Option<i64>) {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(dir);
    if let Some(secs) = time {
        let date = format!("@{} +0000", secs);
        cmd.env("GIT_AUTHOR_DATE", &date)
            .env("GIT_COMMITTER_DATE", &date);
    }
    let output = cmd.output().expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

pub fn v(name: &str) -> VersionName {
    VersionName::new(name).unwrap()
}

pub fn change_ref() -> RefName {
    RefName::new(CHANGE_REF).unwrap()
}

pub fn change_info() -> ChangeInfo {
    ChangeInfo {
        number: 42,
        change_id: ChangeId::new("I0123456789abcdef0123456789abcdef01234567").unwrap(),
        current_ref: change_ref(),
        subject: "Edit forms".into(),
    }
}
