//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create a configurations command isolated to the test directory.
    ///
    /// Settings and log overrides from the outer environment are removed
    /// and colors are disabled.
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd =
            Command::cargo_bin("configurations").expect("failed to find configurations binary");
        cmd.env_remove("CONFIGURATIONS_SETTINGS");
        cmd.env_remove("CONFIGURATIONS_LOG");
        cmd.env("NO_COLOR", "1");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Shortcut for `configurations get`.
    pub fn get(&self, name: &str) -> Output {
        self.cmd()
            .args(["get", name])
            .output()
            .expect("failed to run configurations get")
    }

    /// Shortcut for `configurations get --as <coercion>`.
    pub fn get_as(&self, name: &str, coercion: &str) -> Output {
        self.cmd()
            .args(["get", name, "--as", coercion])
            .output()
            .expect("failed to run configurations get --as")
    }

    /// Shortcut for `configurations get --default`.
    pub fn get_or(&self, name: &str, default: &str) -> Output {
        self.cmd()
            .args(["get", name, "--default", default])
            .output()
            .expect("failed to run configurations get --default")
    }

    /// Shortcut for `configurations sources`.
    pub fn sources(&self) -> Output {
        self.cmd()
            .arg("sources")
            .output()
            .expect("failed to run configurations sources")
    }
}
