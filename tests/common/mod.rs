//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test project context
///
/// Creates a temporary directory for test projects and provides
/// utilities for setting up test scenarios.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a project with source and token directories and a config file
    pub fn with_config(config: &str) -> Self {
        let project = Self::new();
        project.create_file("tokens/colors.json", r##"{"primary": "#3366ff"}"##);
        project.create_file("src/theme.json", r#"{"extends": "tokens/colors.json"}"#);
        project.create_file("tokenforge.toml", config);
        project
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the test project
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Run the tokenforge binary in this project
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_tokenforge"))
            .current_dir(self.path())
            .args(args)
            .output()
            .expect("Failed to execute tokenforge")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Config whose commands write one file per platform and count invocations
pub const SAMPLE_CONFIG: &str = r#"
platforms = ["ios", "android", "web"]
mode = "development"

[commands]
ios = 'echo built >> build-log.txt && echo "struct Tokens {}" > "$TOKENFORGE_OUTPUT_DIR/Tokens.swift"'
android = 'echo built >> build-log.txt && echo "object Tokens" > "$TOKENFORGE_OUTPUT_DIR/Tokens.kt"'
web = 'echo built >> build-log.txt && echo ":root {}" > "$TOKENFORGE_OUTPUT_DIR/tokens.css"'
"#;

/// Config where the iOS command fails
pub const FAILING_IOS_CONFIG: &str = r#"
platforms = ["web", "ios", "android"]
parallel = false
stop_on_failure = true

[commands]
web = 'echo ":root {}" > "$TOKENFORGE_OUTPUT_DIR/tokens.css"'
ios = 'echo "swift generator crashed" >&2; exit 2'
android = 'echo "object Tokens" > "$TOKENFORGE_OUTPUT_DIR/Tokens.kt"'
"#;

/// Number of lines in a file, zero if it does not exist
pub fn line_count(project: &TestProject, name: &str) -> usize {
    if project.file_exists(name) {
        project.read_file(name).lines().count()
    } else {
        0
    }
}
