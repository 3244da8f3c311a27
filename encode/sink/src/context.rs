/*!
    Shared encode context: output format, streams, container lifecycle and
    the A/V skew tracker. The video and audio adapters drive it.
*/

use tracing::{debug, error, info, warn};

use encode_types::{Medium, Packet, Rational};

use crate::backend::{
    Backend, EncoderDescriptor, EncoderSetup, OptionScope, OutputFormat, StreamParams,
};
use crate::config::OutputTarget;
use crate::error::{Error, Result};
use crate::mux::{Mux, MuxState};
use crate::options::{Dictionary, apply_option_with};
use crate::presets;
use crate::sync::TimestampSync;
use crate::twopass::{self, TwoPassLog};

/**
    Frame rate used when neither an explicit nor a detected one is known.
    Small enough for the 16-bit time base fields of common containers.
*/
pub const FALLBACK_FRAME_RATE: Rational = Rational::new(24000, 1);

/**
    One allocated output stream.
*/
#[derive(Debug)]
pub(crate) struct StreamSlot {
    pub encoder: EncoderDescriptor,
    /// Options not yet consumed by the encoder.
    pub options: Dictionary,
    pub codec_time_base: Rational,
    pub stats_in: Option<Vec<u8>>,
    pub twopass: Option<TwoPassLog>,
}

pub(crate) struct EncodeContext<B: Backend> {
    pub target: OutputTarget,
    pub backend: B,
    pub sync: TimestampSync,
    pub mux: Mux,
    file: String,
    format: OutputFormat,
    format_options: Dictionary,
    video_encoder: Option<EncoderDescriptor>,
    audio_encoder: Option<EncoderDescriptor>,
    video: Option<StreamSlot>,
    audio: Option<StreamSlot>,
    time_base: Option<Rational>,
    detected_fps: Option<f64>,
}

impl<B: Backend> EncodeContext<B> {
    /**
        Resolve the output format and encoders. Returns `Ok(None)` when the
        target has no output file.
    */
    pub fn new(target: OutputTarget, mut backend: B) -> Result<Option<Self>> {
        let Some(file) = target.file.clone() else {
            return Ok(None);
        };

        let format = backend
            .guess_format(target.format.as_deref(), &file)
            .ok_or_else(|| {
                error!(format = ?target.format, %file, "format not found");
                Error::FormatNotFound {
                    name: target.format.clone(),
                    file: file.clone(),
                }
            })?;

        let mut format_options = Dictionary::new();
        for option in &target.format_options {
            let status = apply_option_with(&mut format_options, option, |key| {
                backend.find_option(OptionScope::Format(&format), key)
            });
            if !status.is_applied() {
                warn!(option = %option, %status, "could not set format option");
            }
        }

        let video_encoder = find_encoder(&mut backend, &target, &format, Medium::Video)?;
        let audio_encoder = find_encoder(&mut backend, &target, &format, Medium::Audio)?;

        info!(
            %file,
            format = %format.name,
            video = video_encoder.as_ref().map(|e| e.name.as_str()).unwrap_or("none"),
            audio = audio_encoder.as_ref().map(|e| e.name.as_str()).unwrap_or("none"),
            "encoding output initialized"
        );

        Ok(Some(Self {
            sync: TimestampSync::new(!target.copyts),
            target,
            backend,
            mux: Mux::default(),
            file,
            format,
            format_options,
            video_encoder,
            audio_encoder,
            video: None,
            audio: None,
            time_base: None,
            detected_fps: None,
        }))
    }

    pub fn format(&self) -> &OutputFormat {
        &self.format
    }

    pub fn encoder(&self, medium: Medium) -> Option<&EncoderDescriptor> {
        match medium {
            Medium::Video => self.video_encoder.as_ref(),
            Medium::Audio => self.audio_encoder.as_ref(),
        }
    }

    pub fn stream(&self, medium: Medium) -> Option<&StreamSlot> {
        match medium {
            Medium::Video => self.video.as_ref(),
            Medium::Audio => self.audio.as_ref(),
        }
    }

    fn stream_mut(&mut self, medium: Medium) -> Option<&mut StreamSlot> {
        match medium {
            Medium::Video => self.video.as_mut(),
            Medium::Audio => self.audio.as_mut(),
        }
    }

    pub fn has_stream(&self, medium: Medium) -> bool {
        self.stream(medium).is_some()
    }

    /**
        Shared time base, derived by the first stream allocation.
    */
    pub fn time_base(&self) -> Option<Rational> {
        self.time_base
    }

    pub fn set_detected_fps(&mut self, fps: f64) {
        self.detected_fps = (fps > 0.0).then_some(fps);
    }

    /**
        Fail once the session has been finished.
    */
    pub fn ensure_active(&self) -> Result<()> {
        if self.mux.state == MuxState::Finished {
            return Err(Error::Finished);
        }
        Ok(())
    }

    /**
        Time base the encoder of `medium` takes timestamps in.
    */
    pub fn codec_time_base(&self, medium: Medium) -> Rational {
        self.stream(medium)
            .map(|s| s.codec_time_base)
            .or(self.time_base)
            .unwrap_or(FALLBACK_FRAME_RATE.invert())
    }

    /**
        Time base the container writes `medium` in. Equal to the codec time
        base until the header is written.
    */
    pub fn stream_time_base(&self, medium: Medium) -> Rational {
        self.backend
            .stream_time_base(medium)
            .unwrap_or_else(|| self.codec_time_base(medium))
    }

    /**
        Add the stream for `medium` to the container and prepare its options.
    */
    pub fn alloc_stream(&mut self, medium: Medium) -> Result<()> {
        self.ensure_active()?;
        if !self.mux.state.accepts_streams() {
            error!(%medium, "stream added after the header was written");
            return Err(Error::StreamAfterHeader(medium));
        }
        if self.has_stream(medium) {
            error!(%medium, "stream already allocated");
            return Err(Error::DuplicateStream(medium));
        }
        let encoder = self.encoder(medium).cloned().ok_or_else(|| {
            error!(%medium, "no encoder available");
            Error::EncoderNotFound {
                medium,
                name: self.target.codec(medium).map(str::to_string),
            }
        })?;

        if self.time_base.is_none() {
            self.time_base = Some(self.derive_time_base());
        }

        self.backend.new_stream(&encoder).map_err(|e| {
            error!(%medium, error = %e, "could not add stream");
            Error::Media(e)
        })?;

        let backend = &self.backend;
        let find = |key: &str| backend.find_option(OptionScope::Encoder(&encoder), key);
        let mut options = Dictionary::new();

        if medium == Medium::Video {
            let (defaults, unknown) = presets::resolve(&encoder.name, &self.target.video_presets);
            for name in unknown {
                warn!(%medium, encoder = %encoder.name, preset = %name, "unknown preset");
            }
            for option in defaults {
                apply_option_with(&mut options, option, find);
            }
        }

        for option in self.target.codec_options(medium) {
            let status = apply_option_with(&mut options, option, find);
            if !status.is_applied() {
                warn!(%medium, option = %option, %status, "could not set option");
            }
        }

        if options.contains("global_quality") {
            apply_option_with(&mut options, "flags=+qscale", find);
        }
        if self.format.global_header {
            apply_option_with(&mut options, "flags=+global_header", find);
        }

        let setup = twopass::prepare(&self.file, medium, &mut options);

        // audio replaces this with 1/sample_rate when its encoder is opened
        let codec_time_base = self.time_base.unwrap_or(FALLBACK_FRAME_RATE.invert());

        info!(%medium, encoder = %encoder.name, "stream allocated");
        let slot = StreamSlot {
            encoder,
            options,
            codec_time_base,
            stats_in: setup.stats_in,
            twopass: setup.log,
        };
        match medium {
            Medium::Video => self.video = Some(slot),
            Medium::Audio => {
                self.audio = Some(slot);
                self.sync.set_audio_present(true);
            }
        }
        Ok(())
    }

    fn derive_time_base(&self) -> Rational {
        let fps = self.target.fps;
        let explicit = if fps == 0.0 {
            None
        } else {
            frame_rate(fps).or_else(|| {
                warn!(fps, "unusable frame rate, ignoring");
                None
            })
        };
        let detected = self
            .detected_fps
            .filter(|_| self.target.autofps && explicit.is_none())
            .and_then(|fps| match frame_rate(fps) {
                Some(rate) => {
                    info!(fps, %rate, "using autodetected frame rate");
                    Some(rate)
                }
                None => {
                    warn!(fps, "unusable detected frame rate, ignoring");
                    None
                }
            });
        let mut rate = explicit.or(detected).unwrap_or_else(|| {
            info!(rate = %FALLBACK_FRAME_RATE, "frame rate not specified, using fallback");
            FALLBACK_FRAME_RATE
        });

        if let Some(supported) = self
            .video_encoder
            .as_ref()
            .map(|e| e.supported_frame_rates.as_slice())
            .filter(|rates| !rates.is_empty())
        {
            if let Some(idx) = rate.nearest_index(supported) {
                if supported[idx] != rate {
                    info!(requested = %rate, chosen = %supported[idx], "snapped to supported frame rate");
                }
                rate = supported[idx];
            }
        }

        rate.checked_invert().unwrap_or(FALLBACK_FRAME_RATE.invert())
    }

    /**
        Open the encoder of an allocated stream with the raw input parameters.
    */
    pub fn open_stream(&mut self, params: StreamParams) -> Result<()> {
        self.ensure_active()?;
        let medium = params.medium();
        let codec_time_base = match params {
            StreamParams::Video(_) => self.codec_time_base(Medium::Video),
            StreamParams::Audio(info) => info.sample_time_base(),
        };
        let Some(slot) = self.stream_mut(medium) else {
            return Err(Error::NoStream(medium));
        };
        slot.codec_time_base = codec_time_base;

        let setup = EncoderSetup {
            params,
            time_base: codec_time_base,
            stats_in: slot.stats_in.take(),
        };
        let mut options = std::mem::take(&mut slot.options);
        let opened = self.backend.open_encoder(medium, &setup, &mut options);
        options.report_unconsumed(medium.as_str());

        opened.map_err(|e| {
            error!(%medium, error = %e, "could not open encoder");
            Error::Media(e)
        })?;
        debug!(%medium, time_base = %codec_time_base, "encoder opened");
        Ok(())
    }

    /**
        Open the sink and write the container header. Does nothing once the
        header is written.
    */
    pub fn start(&mut self) -> Result<()> {
        match self.mux.state {
            MuxState::Written => return Ok(()),
            MuxState::WritingHeader | MuxState::Failed => return Err(Error::HeaderFailed),
            MuxState::Finished => return Err(Error::Finished),
            MuxState::NotStarted => {}
        }
        self.mux.state = MuxState::WritingHeader;

        if !self.format.no_file {
            if let Err(e) = self.backend.open_sink(&self.file) {
                error!(file = %self.file, error = %e, "could not open output");
                self.mux.state = MuxState::Failed;
                return Err(Error::Media(e));
            }
        }

        self.mux.started_at = Some(std::time::Instant::now());

        let written = self.backend.write_header(&mut self.format_options);
        self.format_options.report_unconsumed("format");
        if let Err(e) = written {
            error!(file = %self.file, error = %e, "could not write header");
            self.mux.state = MuxState::Failed;
            return Err(Error::Media(e));
        }

        self.mux.state = MuxState::Written;
        info!(file = %self.file, format = %self.format.name, "header written");
        Ok(())
    }

    /**
        Write one packet to the container, rescaled to its stream time base.
    */
    pub fn write_packet(&mut self, mut packet: Packet) -> Result<()> {
        match self.mux.state {
            MuxState::Written => {}
            MuxState::Finished => return Err(Error::Finished),
            _ => {
                error!(medium = %packet.medium, "packet written before the header");
                return Err(Error::HeaderNotWritten);
            }
        }
        packet.rescale_to(self.stream_time_base(packet.medium));

        debug!(
            medium = %packet.medium,
            pts = ?packet.pts.map(|p| p.0),
            dts = ?packet.dts.map(|p| p.0),
            size = packet.size(),
            "writing packet"
        );
        self.mux.counters.record(&packet);
        self.backend.write_packet(packet).map_err(|e| {
            error!(error = %e, "error writing packet");
            Error::Media(e)
        })
    }

    /**
        Append pending first-pass statistics of `medium` to its log.
    */
    pub fn flush_stats(&mut self, medium: Medium) {
        if !self.stream(medium).is_some_and(|s| s.twopass.is_some()) {
            return;
        }
        if let Some(stats) = self.backend.stats_out(medium) {
            if let Some(log) = self.stream_mut(medium).and_then(|s| s.twopass.as_mut()) {
                log.write(&stats);
            }
        }
    }

    /**
        Write the trailer, close encoders and logs, then the sink. Trailer
        and close failures are logged. Does nothing the second time.
    */
    pub fn finish(&mut self) {
        if self.mux.state == MuxState::Finished {
            return;
        }

        if self.mux.state.is_written() {
            if let Err(e) = self.backend.write_trailer() {
                error!(error = %e, "could not write trailer");
            }
        }

        for medium in Medium::ALL {
            if !self.has_stream(medium) {
                continue;
            }
            self.flush_stats(medium);
            self.backend.close_encoder(medium);
            if let Some(log) = self.stream_mut(medium).and_then(|s| s.twopass.take()) {
                log.close();
            }
        }

        let counters = self.mux.counters;
        info!(bytes = counters.video_bytes, frames = counters.video_frames, "video out");
        info!(bytes = counters.audio_bytes, "audio out");

        if let Some(position) = self.backend.sink_position() {
            info!(bytes = counters.overhead(position), "muxing overhead");
            if let Err(e) = self.backend.close_sink() {
                error!(file = %self.file, error = %e, "could not close output");
            }
        }

        self.mux.state = MuxState::Finished;
    }
}

/**
    Frame rate for `fps` frames per second, bounded the way 1000/1001
    rates need. `None` when `fps` is not a positive finite value or has
    no nonzero approximation within the bound.
*/
fn frame_rate(fps: f64) -> Option<Rational> {
    if !fps.is_finite() || fps <= 0.0 {
        return None;
    }
    let bound = (fps * 1001.0 + 2.0).min(i32::MAX as f64) as i64;
    let rate = Rational::from_f64(fps, bound);
    (rate.num > 0).then_some(rate)
}

fn find_encoder<B: Backend>(
    backend: &mut B,
    target: &OutputTarget,
    format: &OutputFormat,
    medium: Medium,
) -> Result<Option<EncoderDescriptor>> {
    let requested = target.codec(medium);
    match backend.find_encoder(requested, format, medium) {
        Some(encoder) => Ok(Some(encoder)),
        None if requested.is_some() => {
            error!(%medium, codec = ?requested, "encoder not found");
            Err(Error::EncoderNotFound {
                medium,
                name: requested.map(str::to_string),
            })
        }
        None => {
            debug!(%medium, format = %format.name, "format has no default encoder");
            Ok(None)
        }
    }
}
