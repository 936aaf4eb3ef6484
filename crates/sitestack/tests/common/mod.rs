use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    /// Empty project with the folders the programs upload
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        for folder in ["www", "site", "api"] {
            let dir = root.path().join(folder);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("index.html"), "<h1>hello</h1>").unwrap();
        }
        Self { root }
    }

    pub fn write_stack_kdl(&self, content: &str) {
        fs::write(self.root.path().join("stack.kdl"), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_local_kdl(&self, content: &str) {
        fs::write(self.root.path().join("stack.local.kdl"), content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    #[allow(dead_code)]
    pub fn state_file(&self, stack: &str) -> PathBuf {
        self.root
            .path()
            .join(".sitestack")
            .join("stacks")
            .join(format!("{}.json", stack))
    }

    /// `sitestack` run inside the project, isolated from the caller's
    /// environment and global config
    pub fn command(&self) -> Command {
        isolated(self.root.path())
    }
}

#[allow(deprecated)]
pub fn isolated(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sitestack").unwrap();
    cmd.current_dir(dir)
        .env_remove("SITESTACK_PROJECT_ROOT")
        .env_remove("SITESTACK_STACK")
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env("HOME", dir)
        .env("NO_COLOR", "1");
    cmd
}
