// src/config/validate.rs

use std::collections::BTreeMap;

use globset::Glob;

use crate::config::model::{
    default_path_entry, default_transform, ConfigFile, PathConfig, PathEntry, RawConfigFile,
    TransformConfig,
};
use crate::errors::{PipelineError, Result};
use crate::types::{Category, CommandMode, PathKey};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let paths = resolve_paths(&raw)?;
        let transforms = resolve_transforms(&raw)?;
        validate_icon_font(&raw)?;
        validate_image(&raw)?;

        Ok(ConfigFile::new_unchecked(
            raw.config,
            raw.server,
            paths,
            raw.icon_font,
            raw.image,
            transforms,
        ))
    }
}

/// Validate a raw config without keeping the result.
pub fn validate_config(raw: &RawConfigFile) -> Result<()> {
    ConfigFile::try_from(raw.clone()).map(|_| ())
}

/// Strip a leading `./` so patterns match root-relative paths.
pub fn normalize_pattern(pattern: &str) -> String {
    let mut s = pattern.trim().replace('\\', "/");
    while let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    s
}

fn resolve_paths(raw: &RawConfigFile) -> Result<PathConfig> {
    let mut entries = BTreeMap::new();

    for key in PathKey::ALL {
        let default = default_path_entry(key);
        let overrides = raw.paths.get(key);

        let src = overrides
            .and_then(|o| o.src.clone())
            .unwrap_or(default.src.clone());
        // A custom `src` without a custom `watch` watches the custom `src`.
        let watch = match overrides {
            Some(o) if o.watch.is_some() => o.watch.clone().unwrap_or_default(),
            Some(o) if o.src.is_some() => src.clone(),
            _ => default.watch.clone(),
        };
        let dest = overrides
            .and_then(|o| o.dest.clone())
            .unwrap_or(default.dest.clone());

        let entry = PathEntry {
            src: normalize_pattern(&src),
            watch: normalize_pattern(&watch),
            dest: normalize_pattern(&dest),
        };

        ensure_non_empty(key, "src", &entry.src)?;
        ensure_non_empty(key, "watch", &entry.watch)?;
        ensure_non_empty(key, "dest", &entry.dest)?;
        ensure_glob(key, "src", &entry.src)?;
        ensure_glob(key, "watch", &entry.watch)?;

        entries.insert(key, entry);
    }

    Ok(PathConfig::new_unchecked(entries))
}

fn ensure_non_empty(key: PathKey, field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(PipelineError::ConfigError(format!(
            "[paths.{}].{} must not be empty",
            key.key(),
            field
        )));
    }
    Ok(())
}

fn ensure_glob(key: PathKey, field: &str, pattern: &str) -> Result<()> {
    Glob::new(pattern).map_err(|e| {
        PipelineError::ConfigError(format!(
            "[paths.{}].{} is not a valid glob ({pattern}): {e}",
            key.key(),
            field
        ))
    })?;
    Ok(())
}

fn resolve_transforms(raw: &RawConfigFile) -> Result<BTreeMap<Category, TransformConfig>> {
    let mut transforms: BTreeMap<Category, TransformConfig> = Category::ALL
        .iter()
        .filter_map(|c| default_transform(*c).map(|t| (*c, t)))
        .collect();

    for (name, transform) in raw.transform.iter() {
        let category: Category = name
            .parse()
            .map_err(|e: String| PipelineError::ConfigError(format!("[transform.{name}]: {e}")))?;

        validate_transform(name, transform)?;
        transforms.insert(category, transform.clone());
    }

    Ok(transforms)
}

fn validate_transform(name: &str, transform: &TransformConfig) -> Result<()> {
    let cmd = transform.cmd.trim();
    if cmd.is_empty() {
        return Err(PipelineError::ConfigError(format!(
            "[transform.{name}].cmd must not be empty"
        )));
    }

    match transform.mode {
        CommandMode::Batch => {
            if cmd.contains("{input}") || cmd.contains("{output}") {
                return Err(PipelineError::ConfigError(format!(
                    "[transform.{name}] uses per-file placeholders but mode is \"batch\""
                )));
            }
        }
        CommandMode::PerFile => {
            if !cmd.contains("{input}") {
                return Err(PipelineError::ConfigError(format!(
                    "[transform.{name}] mode \"per_file\" requires an {{input}} placeholder"
                )));
            }
        }
    }

    if let Some(ext) = &transform.out_ext {
        if ext.is_empty() || ext.contains('/') || ext.starts_with('.') {
            return Err(PipelineError::ConfigError(format!(
                "[transform.{name}].out_ext must be a bare extension like \"css\" (got {ext:?})"
            )));
        }
    }

    Ok(())
}

fn validate_icon_font(raw: &RawConfigFile) -> Result<()> {
    let icon = &raw.icon_font;
    if icon.font_name.trim().is_empty() {
        return Err(PipelineError::ConfigError(
            "[icon_font].font_name must not be empty".to_string(),
        ));
    }
    if icon.class_name.trim().is_empty() {
        return Err(PipelineError::ConfigError(
            "[icon_font].class_name must not be empty".to_string(),
        ));
    }
    if char::from_u32(icon.start_codepoint).is_none() {
        return Err(PipelineError::ConfigError(format!(
            "[icon_font].start_codepoint {:#x} is not a valid code point",
            icon.start_codepoint
        )));
    }
    if icon.font_height == 0 {
        return Err(PipelineError::ConfigError(
            "[icon_font].font_height must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_image(raw: &RawConfigFile) -> Result<()> {
    let q = raw.image.jpeg_quality;
    if !(1..=100).contains(&q) {
        return Err(PipelineError::ConfigError(format!(
            "[image].jpeg_quality must be between 1 and 100 (got {q})"
        )));
    }
    Ok(())
}
