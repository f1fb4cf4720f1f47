//! Turns a configuration file into a validated [`GlobalConfig`]

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::keyfile::{KeyFile, ValueError};
use super::paths::{anchor, resolve_config_relative};
use super::*;

/// Load `config_file` (relative paths are anchored at `base`)
pub fn load_config(
    config_file: impl AsRef<Path>,
    base: impl AsRef<Path>,
) -> Result<GlobalConfig, ConfigError> {
    load_config_with(config_file, base, &LoadOptions::default())
}

pub fn load_config_with(
    config_file: impl AsRef<Path>,
    base: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<GlobalConfig, ConfigError> {
    let config_file = config_file.as_ref();
    if config_file.as_os_str().is_empty() {
        error!("Configuration file path not specified");
        return Err(ConfigError::EmptyPath);
    }
    let file = anchor(config_file, base.as_ref());

    let loader = Loader {
        file: &file,
        separator: options.list_separator,
    };
    loader.load().inspect_err(|e| error!("{}", e))
}

/// Properties from the `property` section
struct Properties {
    enabled: bool,
    object_ids: Vec<i32>,
    custom_lib_path: PathBuf,
    tensor_preparation_function_name: String,
}

/// Zone keys seen in an enabled group, before approaches are attached
struct ZoneGeometry {
    index: u32,
    key: String,
    points: Vec<Point>,
    color: ZoneColor,
}

struct Loader<'a> {
    file: &'a Path,
    separator: char,
}

impl Loader<'_> {
    fn load(&self) -> Result<GlobalConfig, ConfigError> {
        let key_file = KeyFile::open(self.file, self.separator).map_err(|e| ConfigError::File {
            file: self.file.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !key_file.has_group(PROPERTY_SECTION) {
            return Err(ConfigError::MissingSection {
                file: self.file.to_path_buf(),
                section: PROPERTY_SECTION.to_string(),
            });
        }

        let mut properties = None;
        let mut groups = Vec::new();
        let mut user_configs = Vec::new();

        for name in key_file.groups() {
            let name = name.as_str();
            info!("Group found {}", name);

            if name == PROPERTY_SECTION {
                properties = Some(self.parse_properties(&key_file, name)?);
            } else if let Some(suffix) = name.strip_prefix(SOURCE_SECTION_PREFIX) {
                let source_id = suffix.parse::<u64>().map_err(|_| {
                    self.range(
                        name,
                        name,
                        format!("must end in a non-negative source id, got '{}'", suffix),
                    )
                })?;
                debug!("parsing group index = {}", source_id);
                groups.push(self.parse_source(&key_file, name, source_id)?);
            } else if name == USER_CONFIGS_SECTION {
                user_configs = self.parse_user_configs(&key_file, name)?;
            } else {
                warn!("Group '{}' ignored", name);
            }
        }

        let properties = properties.ok_or_else(|| ConfigError::MissingSection {
            file: self.file.to_path_buf(),
            section: PROPERTY_SECTION.to_string(),
        })?;
        let total_zones = groups.iter().map(|g| g.zones.len()).sum();
        info!(
            "Parsed {} source group(s) with {} zone(s) in total from {}",
            groups.len(),
            total_zones,
            self.file.display()
        );

        Ok(GlobalConfig {
            config_file: self.file.canonicalize().unwrap_or_else(|_| self.file.to_path_buf()),
            enabled: properties.enabled,
            object_ids: properties.object_ids,
            custom_lib_path: properties.custom_lib_path,
            tensor_preparation_function_name: properties.tensor_preparation_function_name,
            groups,
            user_configs,
            total_zones,
        })
    }

    fn parse_properties(&self, key_file: &KeyFile, group: &str) -> Result<Properties, ConfigError> {
        let mut enabled = true;
        let mut object_ids = None;
        let mut custom_lib_path = None;
        let mut tensor_fn = None;

        for key in self.keys(key_file, group)? {
            let key = key.as_str();
            match key {
                KEY_ENABLE => {
                    enabled = self.value(group, key, key_file.boolean(group, key))?;
                    info!("Parsed {}={} in group '{}'", key, enabled, group);
                }
                KEY_OBJECT_IDS => {
                    let ids = self.value(group, key, key_file.integer_list(group, key))?;
                    info!("Parsed '{}={:?}' in group '{}'", key, ids, group);
                    object_ids = Some(ids);
                }
                KEY_CUSTOM_LIB_PATH => {
                    let raw = self.value(group, key, key_file.string(group, key))?;
                    let path = resolve_config_relative(self.file, &raw).map_err(|source| {
                        ConfigError::PathResolution {
                            file: self.file.to_path_buf(),
                            section: group.to_string(),
                            key: key.to_string(),
                            source,
                        }
                    })?;
                    info!("Parsed {}={} in group '{}'", key, path.display(), group);
                    custom_lib_path = Some(path);
                }
                KEY_TENSOR_PREPARATION_FUNCTION => {
                    let name = self.value(group, key, key_file.string(group, key))?;
                    info!("Parsed {}={} in group '{}'", key, name, group);
                    tensor_fn = Some(name);
                }
                other => debug!("Unknown key '{}' in group '{}'", other, group),
            }
        }

        let object_ids = self.required(group, KEY_OBJECT_IDS, object_ids)?;
        let custom_lib_path = self.required(group, KEY_CUSTOM_LIB_PATH, custom_lib_path)?;
        let tensor_preparation_function_name =
            self.required(group, KEY_TENSOR_PREPARATION_FUNCTION, tensor_fn)?;

        debug!(
            "Custom Lib = {}, Custom Tensor Preparation Function = {}",
            custom_lib_path.display(),
            tensor_preparation_function_name
        );

        Ok(Properties {
            enabled,
            object_ids,
            custom_lib_path,
            tensor_preparation_function_name,
        })
    }

    /// Parse one `source-<id>` group.
    ///
    /// Approaches are checked more strictly than the zone keys require on
    /// their own: a `zone_approach-<n>` below 0 is a range error, and every
    /// enabled zone needs the approach with its own index. A group whose
    /// zones only share some other approach key is rejected.
    fn parse_source(
        &self,
        key_file: &KeyFile,
        name: &str,
        source_id: u64,
    ) -> Result<ProcessingGroup, ConfigError> {
        let mut group = ProcessingGroup::new(source_id);
        let mut zone_ids = None;
        let mut remove_uncounted = None;
        let mut fcm_factor = None;
        let mut zone_keys = Vec::new();

        // Zone keys wait until `enable` is known, wherever it sits in the group.
        for key in self.keys(key_file, name)? {
            match key.as_str() {
                KEY_ENABLE => {
                    group.enabled = self.value(name, &key, key_file.boolean(name, &key))?;
                    info!("Parsed {}={} in group '{}'", key, group.enabled, name);
                }
                KEY_ZONE_IDS => {
                    let ids = self.value(name, &key, key_file.integer_list(name, &key))?;
                    info!("Parsed '{}={:?}' in group '{}'", key, ids, name);
                    zone_ids = Some(ids);
                }
                KEY_CUSTOM_INPUT_TRANSFORMATION_FUNCTION => {
                    let function = self.value(name, &key, key_file.string(name, &key))?;
                    info!("Parsed {}={} in group '{}'", key, function, name);
                    group.custom_transform_function_name = Some(function);
                }
                KEY_REMOVE_UNCOUNTED => {
                    let value = self.value(name, &key, key_file.boolean(name, &key))?;
                    info!("Parsed {}={} in group '{}'", key, value, name);
                    remove_uncounted = Some(value);
                }
                KEY_FCM_FACTOR => {
                    let value = self.value(name, &key, key_file.double(name, &key))?;
                    info!("Parsed {}={} in group '{}'", key, value, name);
                    fcm_factor = Some(value);
                }
                k if k.starts_with(KEY_ZONE_CORDS_PREFIX) || k.starts_with(KEY_ZONE_APPROACH_PREFIX) => {
                    zone_keys.push(k.to_string());
                }
                other => debug!("Unknown key '{}' in group '{}'", other, name),
            }
        }

        group.zone_ids = zone_ids.clone().unwrap_or_default();
        group.remove_uncounted = remove_uncounted.unwrap_or(false);
        group.fcm_factor = fcm_factor.unwrap_or(0.0);

        if !group.enabled {
            if !zone_keys.is_empty() {
                debug!("Skipping {} zone key(s) of disabled group '{}'", zone_keys.len(), name);
            }
            return Ok(group);
        }

        let mut geometries = Vec::new();
        for key in &zone_keys {
            if let Some(suffix) = key.strip_prefix(KEY_ZONE_CORDS_PREFIX) {
                let Some(index) = self.zone_index(name, key, suffix)? else {
                    continue;
                };
                geometries.push(self.parse_zone_cords(key_file, name, key, index)?);
            } else if let Some(suffix) = key.strip_prefix(KEY_ZONE_APPROACH_PREFIX) {
                let Some(index) = self.zone_index(name, key, suffix)? else {
                    continue;
                };
                let approach = self.value(name, key, key_file.integer(name, key))?;
                if approach < 0 {
                    return Err(self.range(name, key, format!("can have value >=0, got {}", approach)));
                }
                debug!("Parsing zone-approach zone_index = {} approach = {}", index, approach);
                group.zone_approaches.push(ZoneApproach { index, approach });
            }
        }

        self.required(name, KEY_ZONE_IDS, zone_ids)?;
        self.required(name, KEY_FCM_FACTOR, fcm_factor)?;
        if group.zone_approaches.is_empty() {
            return Err(self.incomplete(name, &format!("{}<n>", KEY_ZONE_APPROACH_PREFIX)));
        }
        self.required(name, KEY_REMOVE_UNCOUNTED, remove_uncounted)?;
        if geometries.is_empty() {
            return Err(self.incomplete(name, &format!("{}<n>", KEY_ZONE_CORDS_PREFIX)));
        }

        for geometry in geometries {
            let approach = group
                .zone_approaches
                .iter()
                .find(|a| a.index == geometry.index)
                .map(|a| a.approach)
                .ok_or_else(|| {
                    self.incomplete(name, &format!("{}{}", KEY_ZONE_APPROACH_PREFIX, geometry.index))
                })?;
            debug!("Zone {} of '{}' uses approach {}", geometry.key, name, approach);
            group.zones.push(Zone {
                index: geometry.index,
                points: geometry.points,
                color: geometry.color,
                approach,
            });
        }

        Ok(group)
    }

    /// `None` means the zone is dropped
    fn zone_index(&self, group: &str, key: &str, suffix: &str) -> Result<Option<u32>, ConfigError> {
        let index = suffix
            .trim()
            .parse::<i64>()
            .map_err(|_| self.range(group, key, format!("must end in a zone index, got '{}'", suffix)))?;
        if index < 0 {
            warn!(
                "'{}' in group '{}' has a negative zone index; only zone-0 will get used",
                key, group
            );
            return Ok(None);
        }
        u32::try_from(index)
            .map(Some)
            .map_err(|_| self.range(group, key, format!("zone index {} is too large", index)))
    }

    fn parse_zone_cords(
        &self,
        key_file: &KeyFile,
        group: &str,
        key: &str,
        index: u32,
    ) -> Result<ZoneGeometry, ConfigError> {
        let raw = self.value(group, key, key_file.integer_list(group, key))?;
        if raw.len() < COLOR_CHANNELS || (raw.len() - COLOR_CHANNELS) % 2 != 0 {
            return Err(ConfigError::MalformedZone {
                file: self.file.to_path_buf(),
                section: group.to_string(),
                key: key.to_string(),
                len: raw.len(),
            });
        }

        let (coords, channels) = raw.split_at(raw.len() - COLOR_CHANNELS);
        info!(
            "Parsing zone-cords zone_index = {} num-point = {} roilistlen = {}",
            index,
            coords.len() / 2,
            raw.len()
        );

        let points: Vec<Point> = coords
            .chunks_exact(2)
            .map(|pair| Point::new(pair[0], pair[1]))
            .inspect(|p| debug!("parsed Point x={} y={}", p.x, p.y))
            .collect();

        if let Some(bad) = channels.iter().find(|c| !(0..=255).contains(*c)) {
            return Err(self.range(
                group,
                key,
                format!("color channels must be within 0..=255, got {}", bad),
            ));
        }
        let color = ZoneColor::from_raw(channels[0], channels[1], channels[2]);

        Ok(ZoneGeometry {
            index,
            key: key.to_string(),
            points,
            color,
        })
    }

    fn parse_user_configs(
        &self,
        key_file: &KeyFile,
        group: &str,
    ) -> Result<Vec<(String, String)>, ConfigError> {
        debug!("Parsing User Configs");
        self.keys(key_file, group)?
            .into_iter()
            .map(|key| -> Result<(String, String), ConfigError> {
                let value = self.value(group, &key, key_file.string(group, &key))?;
                debug!("parsed user-config key = {} value = {}", key, value);
                Ok((key, value))
            })
            .collect()
    }

    fn keys(&self, key_file: &KeyFile, group: &str) -> Result<Vec<String>, ConfigError> {
        key_file.keys(group).map_err(|e| ConfigError::File {
            file: self.file.to_path_buf(),
            reason: format!("group '{}': {}", group, e),
        })
    }

    fn value<T>(&self, group: &str, key: &str, parsed: Result<T, ValueError>) -> Result<T, ConfigError> {
        parsed.map_err(|e| self.range(group, key, format!("is invalid: {}", e)))
    }

    fn required<T>(&self, group: &str, key: &str, value: Option<T>) -> Result<T, ConfigError> {
        value.ok_or_else(|| self.incomplete(group, key))
    }

    fn range(&self, group: &str, key: &str, reason: String) -> ConfigError {
        ConfigError::Range {
            file: self.file.to_path_buf(),
            section: group.to_string(),
            key: key.to_string(),
            reason,
        }
    }

    fn incomplete(&self, group: &str, key: &str) -> ConfigError {
        ConfigError::IncompleteProperty {
            file: self.file.to_path_buf(),
            section: group.to_string(),
            key: key.to_string(),
        }
    }
}
