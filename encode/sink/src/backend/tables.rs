/*!
    Private option tables of the containers and encoders the memory backend
    simulates.
*/

use crate::options::{OptionKind, OptionSpec, OptionTable};

const MP4_FLAGS: &[&str] = &["faststart", "frag_keyframe", "empty_moov"];

const MP4_OPTIONS: OptionTable = OptionTable {
    name: "mp4",
    options: &[OptionSpec::new("movflags", OptionKind::Flags(MP4_FLAGS))],
};

const MPEGTS_OPTIONS: OptionTable = OptionTable {
    name: "mpegts",
    options: &[
        OptionSpec::new("mpegts_service_id", OptionKind::Int),
        OptionSpec::new("muxrate", OptionKind::Int),
    ],
};

const MATROSKA_OPTIONS: OptionTable = OptionTable {
    name: "matroska",
    options: &[OptionSpec::new("reserve_index_space", OptionKind::Int)],
};

const X264_OPTIONS: OptionTable = OptionTable {
    name: "libx264",
    options: &[
        OptionSpec::new("preset", OptionKind::String),
        OptionSpec::new("tune", OptionKind::String),
        OptionSpec::new("profile", OptionKind::String),
        OptionSpec::new("crf", OptionKind::Float),
        OptionSpec::new("x264opts", OptionKind::String),
    ],
};

const MPEG_VIDEO_OPTIONS: OptionTable = OptionTable {
    name: "mpegvideo",
    options: &[
        OptionSpec::new("mbd", OptionKind::Int),
        OptionSpec::new("trellis", OptionKind::Int),
    ],
};

const AAC_OPTIONS: OptionTable = OptionTable {
    name: "aac",
    options: &[OptionSpec::new("profile", OptionKind::String)],
};

/**
    Private options of the container `name`.
*/
pub(super) fn format_options(name: &str) -> OptionTable {
    match name {
        "mp4" | "mov" => MP4_OPTIONS,
        "mpegts" => MPEGTS_OPTIONS,
        "matroska" | "webm" => MATROSKA_OPTIONS,
        _ => OptionTable::EMPTY,
    }
}

/**
    Private options of the encoder `name`.
*/
pub(super) fn encoder_options(name: &str) -> OptionTable {
    match name {
        "libx264" => X264_OPTIONS,
        "mpeg4" | "mpeg2video" | "mpeg1video" => MPEG_VIDEO_OPTIONS,
        "aac" => AAC_OPTIONS,
        _ => OptionTable::EMPTY,
    }
}
