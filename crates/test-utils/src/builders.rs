#![allow(dead_code)]

use assetpipe::config::{ConfigFile, RawConfigFile, RawPathEntry, TransformConfig};
use assetpipe::types::{CommandMode, PathKey, TriggerWhileRunningBehaviour};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self
    }

    pub fn with_skip_unchanged(mut self, val: bool) -> Self {
        self.config.config.skip_unchanged = val;
        self
    }

    /// Override source and destination of one path key.
    pub fn with_paths(mut self, key: PathKey, src: &str, dest: &str) -> Self {
        let entry = self.config.paths.get_mut(key).get_or_insert_with(RawPathEntry::default);
        entry.src = Some(src.to_string());
        entry.dest = Some(dest.to_string());
        self
    }

    pub fn with_watch(mut self, key: PathKey, watch: &str) -> Self {
        let entry = self.config.paths.get_mut(key).get_or_insert_with(RawPathEntry::default);
        entry.watch = Some(watch.to_string());
        self
    }

    /// Per-file command for a category (`"script"`, `"style"`, ...).
    pub fn with_per_file_command(mut self, category: &str, cmd: &str, out_ext: Option<&str>) -> Self {
        self.config.transform.insert(
            category.to_string(),
            TransformConfig {
                mode: CommandMode::PerFile,
                cmd: cmd.to_string(),
                out_ext: out_ext.map(str::to_string),
            },
        );
        self
    }

    pub fn with_batch_command(mut self, category: &str, cmd: &str) -> Self {
        self.config.transform.insert(
            category.to_string(),
            TransformConfig {
                mode: CommandMode::Batch,
                cmd: cmd.to_string(),
                out_ext: None,
            },
        );
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.config.image.jpeg_quality = quality;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
