#![allow(dead_code)]

use std::path::Path;

use cmdrun::iterate::IterationOptions;
use cmdrun::types::CommandSpec;

/// Builder for `CommandSpec` to simplify test setup.
pub struct CommandSpecBuilder {
    spec: CommandSpec,
}

impl CommandSpecBuilder {
    pub fn new(executable: &str) -> Self {
        Self {
            spec: CommandSpec::new("test-command", "Test command", executable),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.spec.id = id.to_string();
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.spec.name = name.to_string();
        self
    }

    pub fn args(mut self, arguments: &str) -> Self {
        self.spec.arguments = arguments.to_string();
        self
    }

    pub fn shell(mut self, shell: &str) -> Self {
        self.spec.shell = Some(shell.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.spec.environment.insert(key.to_string(), value.to_string());
        self
    }

    pub fn dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.spec.working_directory = dir.as_ref().to_path_buf();
        self
    }

    pub fn iterative(mut self) -> Self {
        self.spec.iteration_enabled = true;
        self
    }

    pub fn confirm(mut self) -> Self {
        self.spec.require_confirmation = true;
        self
    }

    pub fn build(self) -> CommandSpec {
        self.spec
    }
}

/// Builder for `IterationOptions`.
#[derive(Default)]
pub struct IterationOptionsBuilder {
    options: IterationOptions,
}

impl IterationOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_errors(mut self, val: bool) -> Self {
        self.options.skip_errors = val;
        self
    }

    pub fn stop_on_first_failure(mut self, val: bool) -> Self {
        self.options.stop_on_first_failure = val;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options.max_depth = depth;
        self
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.options.include_patterns.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.options.exclude_patterns.push(pattern.to_string());
        self
    }

    pub fn include_root(mut self) -> Self {
        self.options.include_root_directory = true;
        self
    }

    pub fn build(self) -> IterationOptions {
        self.options
    }
}
