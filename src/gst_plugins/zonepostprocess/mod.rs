//! ZonePostProcess GStreamer Element
//!
//! Loads a zone configuration from its `config-file` property and hands every
//! buffer to the configured custom library, passing the data through unchanged.

use gstreamer as gst;
use gstreamer::glib;
use gstreamer::prelude::*;

mod imp;

glib::wrapper! {
    pub struct ZonePostProcess(ObjectSubclass<imp::ZonePostProcess>)
        @extends gstreamer_base::BaseTransform, gst::Element, gst::Object;
}

// Registers the type within the plugin
pub fn register(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    gst::Element::register(
        Some(plugin),
        "zonepostprocess",
        gst::Rank::NONE,
        ZonePostProcess::static_type(),
    )
}
