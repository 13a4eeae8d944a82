//! Shared helpers for the specs

pub use predicates::prelude::*;

use assert_cmd::assert::Assert;
use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

pub const STATES: [&str; 5] = ["writing", "logged", "sending", "sent", "error"];

/// Path of the relay-agent binary, building it if this test run did not
fn agent_bin() -> &'static Path {
    static BIN: OnceLock<PathBuf> = OnceLock::new();
    BIN.get_or_init(|| {
        let exe = std::env::current_exe().unwrap();
        // target/<profile>/deps/specs-<hash>
        let profile_dir = exe.parent().and_then(Path::parent).unwrap();
        let bin = profile_dir.join(format!("relay-agent{}", std::env::consts::EXE_SUFFIX));
        if !bin.exists() {
            let status = std::process::Command::new(env!("CARGO"))
                .args(["build", "-p", "relay-agent", "--bin", "relay-agent"])
                .status()
                .unwrap();
            assert!(status.success(), "building relay-agent failed");
        }
        bin
    })
}

/// A scratch directory the agent runs in
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, rel: &str, content: &str) -> &Self {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
        self
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path().join(rel)).unwrap()
    }

    /// Files directly under `rel`, sorted
    pub fn list(&self, rel: &str) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.path().join(rel)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// A relay-agent command run from this workspace
    pub fn agent(&self) -> Agent {
        let mut cmd = Command::new(agent_bin());
        cmd.current_dir(self.path()).env_remove("RUST_LOG");
        Agent { cmd }
    }
}

pub struct Agent {
    cmd: Command,
}

impl Agent {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn stdin(mut self, input: &str) -> Self {
        self.cmd.write_stdin(input.to_string());
        self
    }

    pub fn passes(mut self) -> Outcome {
        Outcome(self.cmd.assert().success())
    }

    pub fn fails(mut self) -> Outcome {
        Outcome(self.cmd.assert().failure())
    }
}

pub struct Outcome(Assert);

impl Outcome {
    pub fn stdout_has(self, needle: &str) -> Self {
        Self(self.0.stdout(predicate::str::contains(needle)))
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        Self(self.0.stdout(predicate::str::contains(needle).not()))
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        Self(self.0.stderr(predicate::str::contains(needle)))
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.0.get_output().stdout).into_owned()
    }
}
