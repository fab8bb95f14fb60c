// SPDX-License-Identifier: GPL-3.0-only

//! Binding to the GStreamer playback engine.
//!
//! One [`Engine`] wraps one `gst_play::Play` pipeline, bound to a single
//! [`MediaSource`] for its whole life. The engine publishes, the UI
//! subscribes: every GStreamer signal and decoded video frame is forwarded
//! as a typed [`EngineEvent`] over a channel, and [`Engine::events`] turns
//! that channel into a toolkit subscription so events always land on the
//! UI loop. Nothing here blocks; commands are fire-and-forget against the
//! pipeline.

use std::sync::Arc;

use anyhow::{bail, Result};
use cosmic::iced::Subscription;
use futures::channel::mpsc;
use futures::lock::Mutex;
use futures::StreamExt;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_play as gst_play;
use gstreamer_video as gst_video;
use log::debug;
use url::Url;

/// What to play: a local file picked in the dialog, or a stream URL typed
/// into the control bar. Stream input is passed to the engine verbatim —
/// no URL-syntax validation happens on our side.
#[derive(Debug, Clone)]
pub enum MediaSource {
    File(Url),
    Stream(String),
}

impl MediaSource {
    /// Build a stream source from raw user input. `None` when the input is
    /// empty or whitespace-only — no handle is constructed for it.
    pub fn from_stream_input(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        (!trimmed.is_empty()).then(|| Self::Stream(trimmed.to_owned()))
    }

    pub fn uri(&self) -> &str {
        match self {
            Self::File(url) => url.as_str(),
            Self::Stream(raw) => raw,
        }
    }

    /// Short form for the header bar: file name if we have one, otherwise
    /// the raw URI.
    pub fn label(&self) -> &str {
        match self {
            Self::File(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| url.as_str()),
            Self::Stream(raw) => raw,
        }
    }
}

/// Playback state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Buffering,
    Paused,
    Playing,
}

/// One decoded video frame, already converted to tightly packed RGBA.
#[derive(Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Notifications from the engine, delivered onto the UI loop.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Total duration in seconds became known (or changed, for live
    /// streams). This is the readiness signal: it fires during the paused
    /// preroll, before playback first advances.
    DurationChanged(f64),
    /// Playback position in seconds.
    PositionUpdated(f64),
    StateChanged(PlaybackState),
    Frame(VideoFrame),
    EndOfStream,
    Error(String),
    Warning(String),
}

/// A playback pipeline bound to one media source.
///
/// Created fresh on every load and dropped on the next one; the previous
/// instance is stopped before being discarded so its decoder resources are
/// released first.
pub struct Engine {
    play: gst_play::Play,
    // Owns the signal handlers; dropping it would disconnect them.
    _adapter: gst_play::PlaySignalAdapter,
    events: Arc<Mutex<mpsc::UnboundedReceiver<EngineEvent>>>,
    generation: u64,
}

impl Engine {
    /// Build a pipeline for `source` and start a paused preroll, so the
    /// duration notification arrives before playback does.
    pub fn new(source: &MediaSource, generation: u64) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded();

        let play = gst_play::Play::new(None::<gst_play::PlayVideoRenderer>);
        let adapter = gst_play::PlaySignalAdapter::new(&play);

        let sender = tx.clone();
        adapter.connect_duration_changed(move |_, duration| {
            if let Some(duration) = duration {
                let _ = sender.unbounded_send(EngineEvent::DurationChanged(to_seconds(duration)));
            }
        });

        let sender = tx.clone();
        adapter.connect_position_updated(move |_, position| {
            if let Some(position) = position {
                let _ = sender.unbounded_send(EngineEvent::PositionUpdated(to_seconds(position)));
            }
        });

        let sender = tx.clone();
        adapter.connect_state_changed(move |_, state| {
            let state = match state {
                gst_play::PlayState::Buffering => PlaybackState::Buffering,
                gst_play::PlayState::Paused => PlaybackState::Paused,
                gst_play::PlayState::Playing => PlaybackState::Playing,
                _ => PlaybackState::Stopped,
            };
            let _ = sender.unbounded_send(EngineEvent::StateChanged(state));
        });

        let sender = tx.clone();
        adapter.connect_end_of_stream(move |_| {
            let _ = sender.unbounded_send(EngineEvent::EndOfStream);
        });

        let sender = tx.clone();
        adapter.connect_error(move |_, error, _details| {
            let _ = sender.unbounded_send(EngineEvent::Error(error.to_string()));
        });

        let sender = tx.clone();
        adapter.connect_warning(move |_, warning, _details| {
            let _ = sender.unbounded_send(EngineEvent::Warning(warning.to_string()));
        });

        let pipeline = play.pipeline();
        if pipeline.find_property("video-sink").is_none() {
            bail!("playback pipeline exposes no video-sink property");
        }
        pipeline.set_property("video-sink", &video_sink(tx));

        play.set_uri(Some(source.uri()));
        play.pause();

        Ok(Self {
            play,
            _adapter: adapter,
            events: Arc::new(Mutex::new(rx)),
            generation,
        })
    }

    pub fn play(&self) {
        self.play.play();
    }

    pub fn pause(&self) {
        self.play.pause();
    }

    /// Stop playback and return to the start of the media.
    pub fn stop(&self) {
        self.play.stop();
    }

    /// Seek to `target` seconds. Callers round to millisecond precision
    /// before getting here; the engine wants nanoseconds.
    pub fn seek(&self, target: f64) {
        let nanos = (target.max(0.0) * 1_000_000_000.0) as u64;
        self.play.seek(gst::ClockTime::from_nseconds(nanos));
    }

    pub fn set_volume(&self, volume: f64) {
        self.play.set_volume(volume.clamp(0.0, 1.0));
    }

    /// The engine's notification stream as a toolkit subscription, keyed on
    /// this instance's generation so a reload swaps subscriptions cleanly.
    pub fn events(&self) -> Subscription<EngineEvent> {
        let events = self.events.clone();
        cosmic::iced::subscription::unfold(("flicks-engine", self.generation), events, {
            |events| async move {
                let next = events.lock().await.next().await;
                match next {
                    Some(event) => (event, events),
                    // Channel closed: the engine is gone. Park until the
                    // runtime drops this subscription with it.
                    None => futures::future::pending().await,
                }
            }
        })
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        debug!("dropping playback engine (generation {})", self.generation);
        self.play.stop();
    }
}

/// An appsink that hands every decoded frame to the UI as tightly packed
/// RGBA. playbin converts into the requested caps itself, so no extra
/// elements are needed in front of it.
fn video_sink(tx: mpsc::UnboundedSender<EngineEvent>) -> gst_app::AppSink {
    let appsink = gst_app::AppSink::builder()
        .caps(
            &gst_video::VideoCapsBuilder::new()
                .format(gst_video::VideoFormat::Rgba)
                .build(),
        )
        .max_buffers(2)
        .drop(true)
        .build();

    appsink.set_callbacks(
        gst_app::AppSinkCallbacks::builder()
            .new_sample(move |sink| {
                let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                if let Some(frame) = frame_from_sample(&sample) {
                    let _ = tx.unbounded_send(EngineEvent::Frame(frame));
                }
                Ok(gst::FlowSuccess::Ok)
            })
            .build(),
    );

    appsink
}

fn frame_from_sample(sample: &gst::Sample) -> Option<VideoFrame> {
    let caps = sample.caps()?;
    let info = gst_video::VideoInfo::from_caps(caps).ok()?;
    let buffer = sample.buffer()?;
    let frame = gst_video::VideoFrameRef::from_buffer_ref_readable(buffer, &info).ok()?;

    let data = frame.plane_data(0).ok()?;
    let width = info.width();
    let height = info.height();
    let stride = frame.plane_stride()[0] as usize;
    let row = width as usize * 4;

    // Strides can carry padding past the visible row; the image widget
    // wants tightly packed pixels.
    let pixels = if stride == row {
        data.to_vec()
    } else {
        let mut packed = Vec::with_capacity(row * height as usize);
        for line in data.chunks_exact(stride).take(height as usize) {
            packed.extend_from_slice(&line[..row]);
        }
        packed
    };

    Some(VideoFrame {
        width,
        height,
        pixels,
    })
}

fn to_seconds(time: gst::ClockTime) -> f64 {
    time.nseconds() as f64 / 1_000_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sources_pass_the_url_through() {
        let url = Url::parse("file:///home/me/clip.mp4").unwrap();
        let source = MediaSource::File(url);
        assert_eq!(source.uri(), "file:///home/me/clip.mp4");
        assert_eq!(source.label(), "clip.mp4");
    }

    #[test]
    fn stream_sources_are_verbatim() {
        let source = MediaSource::Stream("http://example.com/live.m3u8".into());
        assert_eq!(source.uri(), "http://example.com/live.m3u8");
        assert_eq!(source.label(), "http://example.com/live.m3u8");
    }

    #[test]
    fn blank_stream_input_is_rejected() {
        assert!(MediaSource::from_stream_input("").is_none());
        assert!(MediaSource::from_stream_input("   \t ").is_none());
    }

    #[test]
    fn stream_input_is_trimmed_not_validated() {
        let source = MediaSource::from_stream_input("  rtsp://cam/1  ").unwrap();
        assert_eq!(source.uri(), "rtsp://cam/1");
    }

    #[test]
    fn clock_times_convert_to_seconds() {
        assert_eq!(to_seconds(gst::ClockTime::from_mseconds(1500)), 1.5);
        assert_eq!(to_seconds(gst::ClockTime::ZERO), 0.0);
    }
}
