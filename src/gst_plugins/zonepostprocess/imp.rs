//! ZonePostProcess GStreamer Element Implementation

use std::sync::{Arc, Mutex};

use gstreamer as gst;
use gstreamer::glib;
use gstreamer::prelude::*;
use gstreamer::subclass::prelude::*;
use gstreamer_base as gst_base;
use gstreamer_base::subclass::prelude::*;
use once_cell::sync::Lazy;

use crate::config::{ActiveConfig, GlobalConfig};
use crate::error::{PostProcessError, PostProcessResult};
use crate::library::{Batch, CustomLibrary, PassthroughLibrary, ProcessStatus};

static CAT: Lazy<gst::DebugCategory> = Lazy::new(|| {
    gst::DebugCategory::new(
        "zonepostprocess",
        gst::DebugColorFlags::empty(),
        Some("Zone post-processing"),
    )
});

const DEFAULT_UNIQUE_ID: u32 = 15;
const DEFAULT_GPU_ID: u32 = 0;

#[derive(Debug, Clone)]
struct Settings {
    unique_id: u32,
    enable: bool,
    gpu_id: u32,
    config_file: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            unique_id: DEFAULT_UNIQUE_ID,
            enable: true,
            gpu_id: DEFAULT_GPU_ID,
            config_file: None,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    batch_num: u64,
    /// Message of the last failed `config-file` load
    config_error: Option<String>,
}

#[derive(Default)]
pub struct ZonePostProcess {
    settings: Mutex<Settings>,
    state: Mutex<State>,
    config: ActiveConfig,
    library: Mutex<Option<Arc<dyn CustomLibrary>>>,
}

#[glib::object_subclass]
impl ObjectSubclass for ZonePostProcess {
    const NAME: &'static str = "GstZonePostProcess";
    type Type = super::ZonePostProcess;
    type ParentType = gst_base::BaseTransform;
}

impl ObjectImpl for ZonePostProcess {
    fn properties() -> &'static [glib::ParamSpec] {
        static PROPERTIES: Lazy<Vec<glib::ParamSpec>> = Lazy::new(|| {
            vec![
                glib::ParamSpecUInt::builder("unique-id")
                    .nick("Unique ID")
                    .blurb("Unique ID for the element. Can be used to identify output of the element")
                    .default_value(DEFAULT_UNIQUE_ID)
                    .build(),
                glib::ParamSpecBoolean::builder("enable")
                    .nick("Enable")
                    .blurb("Enable zone post-processing, or set in passthrough mode")
                    .default_value(true)
                    .mutable_ready()
                    .build(),
                glib::ParamSpecUInt::builder("gpu-id")
                    .nick("GPU Device ID")
                    .blurb("GPU device the custom library should run on")
                    .default_value(DEFAULT_GPU_ID)
                    .mutable_ready()
                    .build(),
                glib::ParamSpecString::builder("config-file")
                    .nick("Config File")
                    .blurb("Path to the zone configuration file")
                    .build(),
            ]
        });
        PROPERTIES.as_ref()
    }

    fn set_property(&self, _id: usize, value: &glib::Value, pspec: &glib::ParamSpec) {
        match pspec.name() {
            "unique-id" => {
                self.settings.lock().unwrap().unique_id = value.get().expect("type checked upstream");
            }
            "enable" => {
                self.settings.lock().unwrap().enable = value.get().expect("type checked upstream");
            }
            "gpu-id" => {
                self.settings.lock().unwrap().gpu_id = value.get().expect("type checked upstream");
            }
            "config-file" => {
                let path: Option<String> = value.get().expect("type checked upstream");
                self.settings.lock().unwrap().config_file = path.clone();

                let Some(path) = path.filter(|p| !p.is_empty()) else {
                    return;
                };
                // Fatal reporting is deferred to start(); a property setter cannot fail.
                let outcome = self.load_configuration(&path);
                let mut state = self.state.lock().unwrap();
                match outcome {
                    Ok(config) => {
                        gst::info!(
                            CAT,
                            imp = self,
                            "Successfully parsed config file {} ({} zones)",
                            config.config_file.display(),
                            config.total_zones
                        );
                        state.config_error = None;
                    }
                    Err(e) => {
                        gst::error!(CAT, imp = self, "{}", e);
                        state.config_error = Some(e.to_string());
                    }
                }
            }
            _ => unimplemented!(),
        }
    }

    fn property(&self, _id: usize, pspec: &glib::ParamSpec) -> glib::Value {
        let settings = self.settings.lock().unwrap();
        match pspec.name() {
            "unique-id" => settings.unique_id.to_value(),
            "enable" => settings.enable.to_value(),
            "gpu-id" => settings.gpu_id.to_value(),
            "config-file" => settings.config_file.to_value(),
            _ => unimplemented!(),
        }
    }
}

impl GstObjectImpl for ZonePostProcess {}

impl ElementImpl for ZonePostProcess {
    fn metadata() -> Option<&'static gst::subclass::ElementMetadata> {
        static ELEMENT_METADATA: Lazy<gst::subclass::ElementMetadata> = Lazy::new(|| {
            gst::subclass::ElementMetadata::new(
                "Zone Post Process",
                "Filter/Analyzer/Video",
                "Zone-based post-processing using custom algorithms for different streams",
                env!("CARGO_PKG_NAME"),
            )
        });
        Some(&*ELEMENT_METADATA)
    }

    fn pad_templates() -> &'static [gst::PadTemplate] {
        static PAD_TEMPLATES: Lazy<Vec<gst::PadTemplate>> = Lazy::new(|| {
            let caps = gst::Caps::new_any();
            vec![
                gst::PadTemplate::new(
                    "sink",
                    gst::PadDirection::Sink,
                    gst::PadPresence::Always,
                    &caps,
                )
                .unwrap(),
                gst::PadTemplate::new(
                    "src",
                    gst::PadDirection::Src,
                    gst::PadPresence::Always,
                    &caps,
                )
                .unwrap(),
            ]
        });

        PAD_TEMPLATES.as_ref()
    }
}

impl BaseTransformImpl for ZonePostProcess {
    const MODE: gst_base::subclass::BaseTransformMode =
        gst_base::subclass::BaseTransformMode::AlwaysInPlace;
    const PASSTHROUGH_ON_SAME_CAPS: bool = true;
    const TRANSFORM_IP_ON_PASSTHROUGH: bool = true;

    fn start(&self) -> Result<(), gst::ErrorMessage> {
        let settings = self.settings.lock().unwrap().clone();
        let config_file = settings.config_file.unwrap_or_default();
        if config_file.is_empty() {
            return Err(gst::error_msg!(
                gst::LibraryError::Settings,
                ("{}", PostProcessError::ConfigNotProvided)
            ));
        }

        if let Some(reason) = self.state.lock().unwrap().config_error.clone() {
            return Err(gst::error_msg!(
                gst::LibraryError::Settings,
                ("Configuration file parsing failed"),
                ["Config file path: {}: {}", config_file, reason]
            ));
        }

        let Some(config) = self.config.current() else {
            return Err(gst::error_msg!(
                gst::LibraryError::Settings,
                ("Configuration file parsing failed"),
                ["{}", PostProcessError::ConfigNotLoaded(config_file.into())]
            ));
        };

        for group in config.enabled_groups() {
            gst::debug!(
                CAT,
                imp = self,
                "source {}: {} zones, fcm_factor {}, remove_uncounted {}",
                group.source_id,
                group.zones.len(),
                group.fcm_factor,
                group.remove_uncounted
            );
        }
        gst::info!(
            CAT,
            imp = self,
            "Started with UID={} on GPU {}",
            settings.unique_id,
            settings.gpu_id
        );
        Ok(())
    }

    fn stop(&self) -> Result<(), gst::ErrorMessage> {
        self.state.lock().unwrap().batch_num = 0;
        gst::info!(CAT, imp = self, "Stopped");
        Ok(())
    }

    fn transform_ip(&self, _buf: &mut gst::BufferRef) -> Result<gst::FlowSuccess, gst::FlowError> {
        self.handle_buffer()
    }

    fn transform_ip_passthrough(
        &self,
        _buf: &gst::Buffer,
    ) -> Result<gst::FlowSuccess, gst::FlowError> {
        self.handle_buffer()
    }
}

impl ZonePostProcess {
    /// Buffer data is never modified, in passthrough mode or not
    fn handle_buffer(&self) -> Result<gst::FlowSuccess, gst::FlowError> {
        let Some(config) = self.config.current() else {
            gst::element_imp_error!(
                self,
                gst::LibraryError::Settings,
                ["Configuration file parsing failed"]
            );
            return Err(gst::FlowError::Error);
        };

        let batch_num = {
            let mut state = self.state.lock().unwrap();
            state.batch_num += 1;
            state.batch_num
        };

        if !self.settings.lock().unwrap().enable || !config.enabled {
            gst::debug!(CAT, imp = self, "zonepostprocess in passthrough mode");
            return Ok(gst::FlowSuccess::Ok);
        }

        let Some(library) = self.library.lock().unwrap().clone() else {
            return Ok(gst::FlowSuccess::Ok);
        };
        self.process_batch(library.as_ref(), &config, batch_num)
    }

    fn load_configuration(&self, path: &str) -> PostProcessResult<Arc<GlobalConfig>> {
        gst::info!(CAT, imp = self, "Loading configuration from: {}", path);
        let base = std::env::current_dir()?;
        let config = self.config.reload(path, base)?;

        let library = PassthroughLibrary::for_config(&config);
        gst::debug!(
            CAT,
            imp = self,
            "Custom library {} ({})",
            library.library_path().display(),
            library.name()
        );
        *self.library.lock().unwrap() = Some(Arc::new(library) as Arc<dyn CustomLibrary>);
        Ok(config)
    }

    fn process_batch(
        &self,
        library: &dyn CustomLibrary,
        config: &GlobalConfig,
        batch_num: u64,
    ) -> Result<gst::FlowSuccess, gst::FlowError> {
        // Plain buffers carry no per-source frame metadata, so the library
        // only sees the batch number and the active configuration.
        let batch = Batch::new(batch_num, &[], config);

        match library.process_tensor(&batch) {
            Ok(ProcessStatus::Processed { frames }) => {
                gst::trace!(CAT, imp = self, "batch {}: {} frames processed", batch_num, frames);
                Ok(gst::FlowSuccess::Ok)
            }
            Ok(ProcessStatus::Passthrough) => Ok(gst::FlowSuccess::Ok),
            Err(e) => {
                gst::element_imp_error!(
                    self,
                    gst::StreamError::Failed,
                    ("Custom library '{}' failed", library.name()),
                    ["batch {}: {}", batch_num, PostProcessError::from(e)]
                );
                Err(gst::FlowError::Error)
            }
        }
    }
}
