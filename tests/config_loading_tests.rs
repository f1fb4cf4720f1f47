//! Configuration loading tests
//! Drives `load_config` against files written to temporary directories

use std::fs;
use std::path::{Path, PathBuf};

use gstzonepost::config::LoadOptions;
use gstzonepost::{load_config, load_config_with, ConfigErrorKind, GlobalConfig, Point};
use tempfile::TempDir;

const PROPERTY: &str = "\
[property]
enable=1
object_ids=1;2;3
custom-lib-path=../libs/custom_algo.so
custom-tensor-preparation-function=prepare_tensor
";

const SOURCE_0: &str = "\
[source-0]
enable=1
zone_ids=0;1
zone_cords-0=10;10;50;10;50;50;10;50;255;0;0
zone_approach-0=1
remove_uncounted=1
fcm_factor=1.5
";

/// Workspace with `configs/` for config files and `libs/custom_algo.so`
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("configs")).unwrap();
        fs::create_dir_all(dir.path().join("libs")).unwrap();
        fs::write(dir.path().join("libs/custom_algo.so"), b"").unwrap();
        Self { dir }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join("configs").join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn lib(&self) -> PathBuf {
        self.dir.path().join("libs/custom_algo.so").canonicalize().unwrap()
    }
}

fn load(path: &Path) -> GlobalConfig {
    load_config(path, "").unwrap()
}

fn error_kind(path: &Path) -> ConfigErrorKind {
    load_config(path, "").unwrap_err().kind()
}

mod parsing_tests {
    use super::*;

    #[test]
    fn test_reference_configuration() {
        let fx = Fixture::new();
        let path = fx.write(
            "zones.txt",
            &format!("{PROPERTY}\n{SOURCE_0}\n[user-configs1]\nsome-key=some-value\n"),
        );

        let config = load(&path);
        assert!(config.enabled);
        assert_eq!(config.object_ids, vec![1, 2, 3]);
        assert_eq!(config.custom_lib_path, fx.lib());
        assert_eq!(config.tensor_preparation_function_name, "prepare_tensor");
        assert_eq!(config.config_file, path.canonicalize().unwrap());
        assert_eq!(
            config.user_configs,
            vec![("some-key".to_string(), "some-value".to_string())]
        );

        assert_eq!(config.groups.len(), 1);
        let group = &config.groups[0];
        assert_eq!(group.source_id, 0);
        assert!(group.enabled);
        assert_eq!(group.zone_ids, vec![0, 1]);
        assert!(group.remove_uncounted);
        assert_eq!(group.fcm_factor, 1.5);
        assert!(group.custom_transform_function_name.is_none());

        assert_eq!(group.zones.len(), 1);
        let zone = &group.zones[0];
        assert_eq!(zone.index, 0);
        assert_eq!(zone.approach, 1);
        assert_eq!(
            zone.points,
            vec![
                Point::new(10, 10),
                Point::new(50, 10),
                Point::new(50, 50),
                Point::new(10, 50)
            ]
        );
        assert_eq!(zone.color.as_array(), [1.0, 0.0, 0.0]);
        assert_eq!(config.total_zones, 1);
    }

    #[test]
    fn test_zone_points_and_color_follow_raw_list() {
        let fx = Fixture::new();
        let path = fx.write(
            "zones.txt",
            &format!(
                "{PROPERTY}\n[source-3]\nenable=1\nzone_ids=7\n\
                 zone_cords-2=1;2;3;4;5;6;12;128;64\nzone_approach-2=0\n\
                 remove_uncounted=0\nfcm_factor=0.25\n\
                 custom-input-transformation-function=transform\n"
            ),
        );

        let config = load(&path);
        let group = &config.groups[0];
        assert_eq!(group.source_id, 3);
        assert_eq!(group.custom_transform_function_name.as_deref(), Some("transform"));

        let zone = group.zones.iter().find(|z| z.index == 2).unwrap();
        assert_eq!(zone.points.len(), 3);
        assert_eq!(
            zone.points,
            vec![Point::new(1, 2), Point::new(3, 4), Point::new(5, 6)]
        );
        assert_eq!(zone.color.red, 12.0 / 255.0);
        assert_eq!(zone.color.green, 128.0 / 255.0);
        assert_eq!(zone.color.blue, 64.0 / 255.0);
        assert_eq!(zone.approach, 0);
    }

    #[test]
    fn test_groups_keep_encounter_order() {
        let fx = Fixture::new();
        let group = |id: u64| {
            format!(
                "[source-{id}]\nenable=1\nzone_ids=0\nzone_cords-0=0;0;5;5;0;0;0\n\
                 zone_approach-0=1\nremove_uncounted=0\nfcm_factor=1\n"
            )
        };
        let path = fx.write(
            "zones.txt",
            &format!("{PROPERTY}\n{}\n{}\n{}", group(2), group(0), group(1)),
        );

        let config = load(&path);
        let ids: Vec<u64> = config.groups.iter().map(|g| g.source_id).collect();
        assert_eq!(ids, vec![2, 0, 1]);
        assert_eq!(config.total_zones, 3);
    }

    #[test]
    fn test_multiple_zones_keep_encounter_order() {
        let fx = Fixture::new();
        let path = fx.write(
            "zones.txt",
            &format!(
                "{PROPERTY}\n[source-0]\nenable=1\nzone_ids=0;1\n\
                 zone_cords-1=0;0;1;1;0;0;255\nzone_cords-0=5;5;6;6;0;255;0\n\
                 zone_approach-0=2\nzone_approach-1=3\n\
                 remove_uncounted=1\nfcm_factor=2\n"
            ),
        );

        let config = load(&path);
        let group = &config.groups[0];
        let zones: Vec<(u32, i32)> = group.zones.iter().map(|z| (z.index, z.approach)).collect();
        assert_eq!(zones, vec![(1, 3), (0, 2)]);
        assert_eq!(group.zone_approaches.len(), 2);
    }

    #[test]
    fn test_enable_may_follow_zone_keys() {
        let fx = Fixture::new();
        let path = fx.write(
            "zones.txt",
            &format!(
                "{PROPERTY}\n[source-0]\nzone_ids=0\nzone_cords-0=1;1;2;2;0;0;0\n\
                 zone_approach-0=1\nremove_uncounted=1\nfcm_factor=1\nenable=1\n"
            ),
        );

        let config = load(&path);
        assert!(config.groups[0].enabled);
        assert_eq!(config.groups[0].zones.len(), 1);
    }

    #[test]
    fn test_disabled_group_skips_zones_and_completeness() {
        let fx = Fixture::new();
        let path = fx.write(
            "zones.txt",
            &format!("{PROPERTY}\n[source-4]\nenable=0\nzone_cords-0=1;2;3\n"),
        );

        let config = load(&path);
        let group = &config.groups[0];
        assert_eq!(group.source_id, 4);
        assert!(!group.enabled);
        assert!(group.zones.is_empty());
        assert!(group.zone_approaches.is_empty());
        assert_eq!(config.total_zones, 0);
    }

    #[test]
    fn test_property_enable_zero_is_accepted() {
        let fx = Fixture::new();
        let path = fx.write("zones.txt", &PROPERTY.replace("enable=1", "enable=0"));
        assert!(!load(&path).enabled);
    }

    #[test]
    fn test_property_enable_defaults_to_true() {
        let fx = Fixture::new();
        let path = fx.write("zones.txt", &PROPERTY.replace("enable=1\n", ""));
        assert!(load(&path).enabled);
    }

    #[test]
    fn test_negative_zone_index_is_dropped() {
        let fx = Fixture::new();
        let path = fx.write(
            "zones.txt",
            &format!(
                "{PROPERTY}\n[source-0]\nenable=1\nzone_ids=0\n\
                 zone_cords-0=1;1;2;2;0;0;0\nzone_cords--1=3;3;4;4;0;0;0\n\
                 zone_approach-0=1\nzone_approach--1=2\n\
                 remove_uncounted=1\nfcm_factor=1\n"
            ),
        );

        let config = load(&path);
        let group = &config.groups[0];
        assert_eq!(group.zones.len(), 1);
        assert_eq!(group.zones[0].index, 0);
        assert_eq!(group.zone_approaches.len(), 1);
    }

    #[test]
    fn test_unknown_sections_are_ignored() {
        let fx = Fixture::new();
        let plain = fx.write("plain.txt", &format!("{PROPERTY}\n{SOURCE_0}"));
        let noisy = fx.write(
            "noisy.txt",
            &format!("{PROPERTY}\n[unrelated]\nfoo=bar\nenable=7\n\n{SOURCE_0}"),
        );

        let mut plain = load(&plain);
        let mut noisy = load(&noisy);
        plain.config_file = PathBuf::new();
        noisy.config_file = PathBuf::new();
        assert_eq!(plain, noisy);
    }

    #[test]
    fn test_reload_is_idempotent() {
        let fx = Fixture::new();
        let path = fx.write("zones.txt", &format!("{PROPERTY}\n{SOURCE_0}"));
        assert_eq!(load(&path), load(&path));
    }

    #[test]
    fn test_custom_separator() {
        let fx = Fixture::new();
        let text = format!("{PROPERTY}\n{SOURCE_0}").replace(';', ",");
        let path = fx.write("zones.txt", &text);

        let options = LoadOptions { list_separator: ',' };
        let config = load_config_with(&path, "", &options).unwrap();
        assert_eq!(config.object_ids, vec![1, 2, 3]);
        assert_eq!(config.groups[0].zones[0].points.len(), 4);

        // Same file with the default separator is rejected.
        assert_eq!(error_kind(&path), ConfigErrorKind::Range);
    }

    #[test]
    fn test_relative_config_path_uses_base() {
        let fx = Fixture::new();
        fx.write("zones.txt", &format!("{PROPERTY}\n{SOURCE_0}"));

        let config = load_config("configs/zones.txt", fx.dir.path()).unwrap();
        assert_eq!(config.custom_lib_path, fx.lib());
    }

    #[test]
    fn test_absolute_library_path() {
        let fx = Fixture::new();
        let text = PROPERTY.replace(
            "../libs/custom_algo.so",
            fx.lib().to_str().unwrap(),
        );
        let path = fx.write("zones.txt", &text);
        assert_eq!(load(&path).custom_lib_path, fx.lib());
    }
}

mod validation_tests {
    use super::*;

    #[test]
    fn test_empty_path() {
        assert_eq!(
            load_config("", "").unwrap_err().kind(),
            ConfigErrorKind::File
        );
    }

    #[test]
    fn test_missing_file() {
        let fx = Fixture::new();
        let err = load_config(fx.dir.path().join("configs/absent.txt"), "").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::File);
        assert!(err.to_string().contains("absent.txt"));
    }

    #[test]
    fn test_syntax_error() {
        let fx = Fixture::new();
        let path = fx.write("zones.txt", "enable=1\n[property]\n");
        assert_eq!(error_kind(&path), ConfigErrorKind::File);
    }

    #[test]
    fn test_missing_property_section() {
        let fx = Fixture::new();
        let path = fx.write("zones.txt", SOURCE_0);
        let err = load_config(&path, "").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::MissingSection);
        assert_eq!(err.section(), Some("property"));
    }

    #[test]
    fn test_library_path_is_required() {
        let fx = Fixture::new();
        let without = fx.write(
            "without.txt",
            &PROPERTY.replace("custom-lib-path=../libs/custom_algo.so\n", ""),
        );
        let err = load_config(&without, "").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::IncompleteProperty);
        assert_eq!(err.key(), Some("custom-lib-path"));

        let with = fx.write("with.txt", PROPERTY);
        assert!(load_config(&with, "").is_ok());
    }

    #[test]
    fn test_other_required_properties() {
        let fx = Fixture::new();
        for (line, key) in [
            ("object_ids=1;2;3\n", "object_ids"),
            (
                "custom-tensor-preparation-function=prepare_tensor\n",
                "custom-tensor-preparation-function",
            ),
        ] {
            let path = fx.write("zones.txt", &PROPERTY.replace(line, ""));
            let err = load_config(&path, "").unwrap_err();
            assert_eq!(err.kind(), ConfigErrorKind::IncompleteProperty);
            assert_eq!(err.key(), Some(key));
        }
    }

    #[test]
    fn test_enable_out_of_range() {
        let fx = Fixture::new();
        let in_property = fx.write("a.txt", &PROPERTY.replace("enable=1", "enable=2"));
        let err = load_config(&in_property, "").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Range);
        assert_eq!(err.section(), Some("property"));
        assert_eq!(err.key(), Some("enable"));

        let in_source = fx.write(
            "b.txt",
            &format!("{PROPERTY}\n{}", SOURCE_0.replace("enable=1", "enable=2")),
        );
        let err = load_config(&in_source, "").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Range);
        assert_eq!(err.section(), Some("source-0"));
    }

    #[test]
    fn test_non_numeric_values() {
        let fx = Fixture::new();
        for bad in ["fcm_factor=fast", "remove_uncounted=yes", "zone_approach-0=north"] {
            let key = bad.split('=').next().unwrap();
            let source = SOURCE_0
                .lines()
                .map(|l| if l.starts_with(&format!("{key}=")) { bad } else { l })
                .collect::<Vec<_>>()
                .join("\n");
            let path = fx.write("zones.txt", &format!("{PROPERTY}\n{source}\n"));
            let err = load_config(&path, "").unwrap_err();
            assert_eq!(err.kind(), ConfigErrorKind::Range, "{bad}");
            assert_eq!(err.key(), Some(key));
        }
    }

    #[test]
    fn test_negative_approach_rejected() {
        let fx = Fixture::new();
        let source = SOURCE_0.replace("zone_approach-0=1", "zone_approach-0=-1");
        let path = fx.write("zones.txt", &format!("{PROPERTY}\n{source}"));
        assert_eq!(error_kind(&path), ConfigErrorKind::Range);
    }

    #[test]
    fn test_malformed_zone_lengths() {
        let fx = Fixture::new();
        let with_cords = |cords: &str| {
            let source = SOURCE_0.replace("10;10;50;10;50;50;10;50;255;0;0", cords);
            fx.write("zones.txt", &format!("{PROPERTY}\n{source}"))
        };

        let err = load_config(with_cords("1;2;3;4"), "").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::MalformedZone);
        assert_eq!(err.key(), Some("zone_cords-0"));

        assert_eq!(error_kind(&with_cords("1;2")), ConfigErrorKind::MalformedZone);

        let config = load(&with_cords("1;2;3;4;0;0;0"));
        assert_eq!(config.groups[0].zones[0].points.len(), 2);
    }

    #[test]
    fn test_color_channel_out_of_range() {
        let fx = Fixture::new();
        let source = SOURCE_0.replace("255;0;0", "256;0;0");
        let path = fx.write("zones.txt", &format!("{PROPERTY}\n{source}"));
        assert_eq!(error_kind(&path), ConfigErrorKind::Range);
    }

    #[test]
    fn test_enabled_group_completeness() {
        let fx = Fixture::new();
        for (line, key) in [
            ("zone_ids=0;1\n", "zone_ids"),
            ("fcm_factor=1.5\n", "fcm_factor"),
            ("zone_approach-0=1\n", "zone_approach-<n>"),
            ("remove_uncounted=1\n", "remove_uncounted"),
            ("zone_cords-0=10;10;50;10;50;50;10;50;255;0;0\n", "zone_cords-<n>"),
        ] {
            let source = SOURCE_0.replace(line, "");
            let path = fx.write("zones.txt", &format!("{PROPERTY}\n{source}"));
            let err = load_config(&path, "").unwrap_err();
            assert_eq!(err.kind(), ConfigErrorKind::IncompleteProperty, "{key}");
            assert_eq!(err.section(), Some("source-0"));
            assert_eq!(err.key(), Some(key));
        }
    }

    #[test]
    fn test_zone_without_matching_approach() {
        let fx = Fixture::new();
        let source = SOURCE_0.replace("zone_approach-0=1", "zone_approach-5=1");
        let path = fx.write("zones.txt", &format!("{PROPERTY}\n{source}"));
        let err = load_config(&path, "").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::IncompleteProperty);
        assert_eq!(err.key(), Some("zone_approach-0"));
    }

    #[test]
    fn test_every_zone_needs_its_own_approach() {
        let fx = Fixture::new();
        let source = SOURCE_0.replace(
            "zone_approach-0=1",
            "zone_cords-1=0;0;5;5;0;0;0\nzone_approach-0=1",
        );
        let path = fx.write("zones.txt", &format!("{PROPERTY}\n{source}"));
        let err = load_config(&path, "").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::IncompleteProperty);
        assert_eq!(err.key(), Some("zone_approach-1"));
        assert!(err
            .to_string()
            .contains("property 'zone_approach-1' not set in group 'source-0'"));
    }

    #[test]
    fn test_string_values_decode_escapes() {
        let fx = Fixture::new();
        let text = PROPERTY.replace("prepare_tensor", "prepare\\stensor");
        let path = fx.write("zones.txt", &format!("{text}\n[user-configs1]\nlabel=two\\swords\n"));

        let config = load(&path);
        assert_eq!(config.tensor_preparation_function_name, "prepare tensor");
        assert_eq!(config.user_configs[0].1, "two words");
    }

    #[test]
    fn test_completeness_is_per_group() {
        let fx = Fixture::new();
        // source-1 relies on keys only source-0 provides.
        let path = fx.write(
            "zones.txt",
            &format!("{PROPERTY}\n{SOURCE_0}\n[source-1]\nenable=1\nzone_cords-0=1;1;2;2;0;0;0\n"),
        );
        let err = load_config(&path, "").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::IncompleteProperty);
        assert_eq!(err.section(), Some("source-1"));
    }

    #[test]
    fn test_invalid_source_suffix() {
        let fx = Fixture::new();
        let path = fx.write("zones.txt", &format!("{PROPERTY}\n[source-abc]\nenable=0\n"));
        assert_eq!(error_kind(&path), ConfigErrorKind::Range);
    }

    #[test]
    fn test_unresolvable_library_path() {
        let fx = Fixture::new();
        let path = fx.write(
            "zones.txt",
            &PROPERTY.replace("../libs/custom_algo.so", "../libs/missing.so"),
        );
        let err = load_config(&path, "").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::PathResolution);
        assert_eq!(err.key(), Some("custom-lib-path"));
        assert!(err.to_string().contains("missing.so"));
    }

    #[test]
    fn test_error_names_file_section_and_key() {
        let fx = Fixture::new();
        let path = fx.write(
            "zones.txt",
            &format!("{PROPERTY}\n{}", SOURCE_0.replace("enable=1", "enable=3")),
        );
        let message = load_config(&path, "").unwrap_err().to_string();
        assert!(message.contains("zones.txt"));
        assert!(message.contains("source-0"));
        assert!(message.contains("enable"));
    }
}
