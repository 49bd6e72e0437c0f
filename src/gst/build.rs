//! Pipeline constructors.
//!
//! ```text
//! source i:   rtspsrc ~~> queue ─► rtph264depay ─► h264parse ─► avdec_h264 ─► videoconvert
//!                          (probe on depay src: tracker.touch(i))  ─► videoscale ─► capsfilter
//!                                                                  ─► interpipesink(live_sink_i)
//!
//! fallback:   per source: videotestsrc(black) ─► videoconvert ─► videoscale ─► capsfilter
//!                                             ─► interpipesink(fallback_sink_i)
//!
//! aggregate:  per source: interpipesrc(listen-to) ─► [watchdog] ─► videoconvert ─► capsfilter(RGB)
//!                                                 ─► jpegenc ─► multifilesink(source_i/image_%05d.jpg)
//! ```
//!
//! Every constructor fails with a [`GraphError`] before any linking is
//! attempted once an element is missing.

use std::path::Path;
use std::sync::Arc;

use gstreamer as gst;
use gstreamer::prelude::*;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GraphError;
use crate::liveness::LivenessTracker;
use crate::sources::{Source, SourceSet};

/// Caps the aggregate encodes from.
const ENCODER_CAPS: &str = "video/x-raw,format=RGB";

fn make<'a>(factory: &'a str, name: &str) -> gst::ElementBuilder<'a> {
    gst::ElementFactory::make(factory).name(name)
}

fn built(
    factory: &str,
    name: &str,
    res: Result<gst::Element, gst::glib::BoolError>,
) -> Result<gst::Element, GraphError> {
    res.map_err(|e| GraphError::ElementCreation {
        factory: factory.to_string(),
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn element(factory: &str, name: &str) -> Result<gst::Element, GraphError> {
    built(factory, name, make(factory, name).build())
}

fn caps(s: &str) -> Result<gst::Caps, GraphError> {
    s.parse::<gst::Caps>().map_err(|e| GraphError::Init {
        reason: format!("invalid caps {s:?}: {e}"),
    })
}

fn add_and_link(
    pipeline: &gst::Pipeline,
    what: &str,
    chain: &[&gst::Element],
) -> Result<(), GraphError> {
    let link_err = |e: gst::glib::BoolError| GraphError::Link {
        what: what.to_string(),
        reason: e.to_string(),
    };
    pipeline.add_many(chain.iter().copied()).map_err(link_err)?;
    gst::Element::link_many(chain.iter().copied()).map_err(link_err)
}

/// Builds the ingestion pipeline of one source.
pub(crate) fn source_pipeline(
    source: &Source,
    cfg: &Config,
    tracker: Arc<LivenessTracker>,
) -> Result<gst::Pipeline, GraphError> {
    let i = source.index();
    let frame_caps = caps(&cfg.frame_caps)?;

    let rtspsrc = built(
        "rtspsrc",
        &format!("rtspsrc{i}"),
        make("rtspsrc", &format!("rtspsrc{i}"))
            .property("location", source.address())
            .property("do-rtsp-keep-alive", true)
            .build(),
    )?;
    let queue = element("queue", &format!("queue{i}"))?;
    let depay = element("rtph264depay", &format!("depay{i}"))?;
    let parse = element("h264parse", &format!("parse{i}"))?;
    let decode = element("avdec_h264", &format!("decode{i}"))?;
    let convert = element("videoconvert", &format!("src_convert{i}"))?;
    let scale = element("videoscale", &format!("src_scale{i}"))?;
    let filter = built(
        "capsfilter",
        &format!("src_filter{i}"),
        make("capsfilter", &format!("src_filter{i}"))
            .property("caps", &frame_caps)
            .build(),
    )?;
    let sink = built(
        "interpipesink",
        source.live_id(),
        make("interpipesink", source.live_id())
            .property("forward-eos", false)
            .property("sync", false)
            .property("drop", true)
            .property("forward-events", true)
            .build(),
    )?;

    let pipeline = gst::Pipeline::with_name(&format!("source-pipeline{i}"));
    pipeline.add(&rtspsrc).map_err(|e| GraphError::Link {
        what: format!("rtspsrc{i}"),
        reason: e.to_string(),
    })?;
    add_and_link(
        &pipeline,
        &format!("source {i}"),
        &[&queue, &depay, &parse, &decode, &convert, &scale, &filter, &sink],
    )?;

    // rtspsrc pads appear once the session is negotiated
    let queue_weak = queue.downgrade();
    rtspsrc.connect_pad_added(move |src, pad| {
        let Some(queue) = queue_weak.upgrade() else {
            return;
        };
        let Some(sink_pad) = queue.static_pad("sink") else {
            return;
        };
        if sink_pad.is_linked() {
            return;
        }
        match pad.link(&sink_pad) {
            Ok(_) => debug!(element = %src.name(), pad = %pad.name(), "rtsp pad linked"),
            Err(err) => warn!(element = %src.name(), ?err, "rtsp pad link failed"),
        }
    });

    let probe_pad = depay.static_pad("src").ok_or_else(|| GraphError::Link {
        what: format!("depay{i} src pad"),
        reason: "missing static pad".to_string(),
    })?;
    probe_pad.add_probe(gst::PadProbeType::BUFFER, move |_, _| {
        tracker.touch(i);
        gst::PadProbeReturn::Ok
    });

    Ok(pipeline)
}

/// Builds the synthetic feed generator with one branch per source.
pub(crate) fn fallback_pipeline(
    sources: &SourceSet,
    cfg: &Config,
) -> Result<gst::Pipeline, GraphError> {
    let frame_caps = caps(&cfg.frame_caps)?;
    let pipeline = gst::Pipeline::with_name("fallback-pipeline");

    for source in sources {
        let i = source.index();
        let testsrc = built(
            "videotestsrc",
            &format!("testsrc{i}"),
            make("videotestsrc", &format!("testsrc{i}"))
                .property("is-live", true)
                .property_from_str("pattern", "black")
                .build(),
        )?;
        let convert = element("videoconvert", &format!("fb_convert{i}"))?;
        let scale = element("videoscale", &format!("fb_scale{i}"))?;
        let filter = built(
            "capsfilter",
            &format!("fb_filter{i}"),
            make("capsfilter", &format!("fb_filter{i}"))
                .property("caps", &frame_caps)
                .build(),
        )?;
        let sink = built(
            "interpipesink",
            source.fallback_id(),
            make("interpipesink", source.fallback_id())
                .property("forward-eos", true)
                .property("sync", false)
                .build(),
        )?;
        add_and_link(
            &pipeline,
            &format!("fallback {i}"),
            &[&testsrc, &convert, &scale, &filter, &sink],
        )?;
    }
    Ok(pipeline)
}

/// Builds the aggregate. Returns the pipeline and its bridge endpoints by source index.
pub(crate) fn aggregate_pipeline(
    sources: &SourceSet,
    cfg: &Config,
) -> Result<(gst::Pipeline, Vec<gst::Element>), GraphError> {
    let encoder_caps = caps(ENCODER_CAPS)?;
    let pipeline = gst::Pipeline::with_name("aggregate-pipeline");
    let mut bridges = Vec::with_capacity(sources.len());

    for source in sources {
        let i = source.index();
        let dir = output_dir(&cfg.output_dir, i)?;
        let location = dir.join("image_%05d.jpg");

        let bridge = built(
            "interpipesrc",
            &format!("interpipesrc{i}"),
            make("interpipesrc", &format!("interpipesrc{i}"))
                .property("listen-to", source.live_id())
                .property("is-live", true)
                .property_from_str("stream-sync", "passthrough-ts")
                .property("emit-signals", true)
                .property("allow-renegotiation", true)
                .property("do-timestamp", true)
                .build(),
        )?;
        let watchdog = match cfg.watchdog() {
            Some(timeout) => Some(built(
                "watchdog",
                &format!("watchdog{i}"),
                make("watchdog", &format!("watchdog{i}"))
                    .property("timeout", i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX))
                    .build(),
            )?),
            None => None,
        };
        let convert = element("videoconvert", &format!("agg_convert{i}"))?;
        let filter = built(
            "capsfilter",
            &format!("agg_filter{i}"),
            make("capsfilter", &format!("agg_filter{i}"))
                .property("caps", &encoder_caps)
                .build(),
        )?;
        let encode = element("jpegenc", &format!("jpegenc{i}"))?;
        let sink = built(
            "multifilesink",
            &format!("image_sink{i}"),
            make("multifilesink", &format!("image_sink{i}"))
                .property("location", location.to_string_lossy().into_owned())
                .property("qos", true)
                .build(),
        )?;

        let mut chain: Vec<&gst::Element> = vec![&bridge];
        if let Some(w) = watchdog.as_ref() {
            chain.push(w);
        }
        chain.extend([&convert, &filter, &encode, &sink]);
        add_and_link(&pipeline, &format!("aggregate {i}"), &chain)?;
        bridges.push(bridge);
    }
    Ok((pipeline, bridges))
}

fn output_dir(root: &Path, index: usize) -> Result<std::path::PathBuf, GraphError> {
    let dir = root.join(format!("source_{index}"));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
