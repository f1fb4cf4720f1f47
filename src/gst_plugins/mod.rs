//! GStreamer plugin for zone post-processing

use gst::glib;
use gstreamer as gst;

pub mod zonepostprocess;

// Plugin registration following gstreamer-rs patterns
gst::plugin_define!(
    zonepost,
    env!("CARGO_PKG_DESCRIPTION"),
    plugin_init,
    env!("CARGO_PKG_VERSION"),
    "MIT",
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_REPOSITORY"),
    "2026-10-18"
);

fn plugin_init(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    zonepostprocess::register(plugin)
}
