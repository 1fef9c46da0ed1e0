#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use agentshare_core::schema::{DescriptorSource, SchemaRegistry};

/// Isolated home, repository and project trees under one temp dir.
pub struct Fixture {
    _temp: TempDir,
    pub root: PathBuf,
    pub home: PathBuf,
    pub repo: PathBuf,
    pub project: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        let repo = temp.path().join("repo");
        let project = temp.path().join("project");
        for dir in [&home, &repo, &project] {
            fs::create_dir_all(dir).unwrap();
        }
        fs::create_dir_all(project.join(".git")).unwrap();
        Self {
            root: temp.path().to_path_buf(),
            _temp: temp,
            home,
            repo,
            project,
        }
    }

    /// Create a detection directory under home, marking a platform installed.
    pub fn install(&self, home_relative: &str) -> PathBuf {
        let dir = self.home.join(home_relative);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn write_agent(&self, id: &str, content: &str) -> PathBuf {
        let path = self.repo.join("agents").join(id).join("agent.md");
        write(&path, content);
        path
    }

    pub fn write_skill(&self, id: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.repo.join("skills").join(id);
        for (name, content) in files {
            write(&dir.join(name), content);
        }
        dir
    }

    /// Write descriptor documents into a fresh directory and return it.
    pub fn descriptor_dir(&self, descriptors: &[(&str, &str)]) -> PathBuf {
        let dir = self.root.join("descriptors");
        fs::create_dir_all(&dir).unwrap();
        for (file_name, content) in descriptors {
            write(&dir.join(file_name), content);
        }
        dir
    }
}

pub fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

pub fn builtin_registry() -> SchemaRegistry {
    SchemaRegistry::load_from(vec![DescriptorSource::Builtin]).unwrap()
}

pub fn registry_from(dir: &Path) -> SchemaRegistry {
    SchemaRegistry::load_from(vec![DescriptorSource::Dir(dir.to_path_buf())]).unwrap()
}

pub const REVIEWER: &str = "---
name: reviewer
description: Reviews code
---

You review code.
";

/// Minimal markdown-agent platform rooted at `~/.<name>`.
pub fn simple_descriptor(name: &str, sort_order: i64) -> String {
    format!(
        r#"name = "{name}"
display_name = "{name}"
features = ["agents"]
sort_order = {sort_order}

[target_detection]
paths = ["~/.{name}"]

[outputs.agent_definition]
target = "agents/{{id}}.md"
frontmatter = ["name", "description"]
include_body = true

[project_paths]
agent_definition = ".{name}/agents"
"#
    )
}
