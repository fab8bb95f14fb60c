// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use cosmic::app::{Command, Core};
use cosmic::dialog::file_chooser::{self, FileFilter};
use cosmic::iced::alignment::{Horizontal, Vertical};
use cosmic::iced::{Alignment, ContentFit, Length, Subscription};
use cosmic::widget::{self, button, image, menu, text, Column, Container, Row};
use cosmic::{cosmic_theme, theme, Application, ApplicationExt, Apply, Element};
use log::{error, info, warn};
use url::Url;

use crate::engine::{Engine, EngineEvent, MediaSource, PlaybackState};
use crate::fl;
use crate::scrubber::Scrubber;
use crate::time;

const REPOSITORY: &str = "https://github.com/flicksplayer/flicks";

/// Data passed in before the application starts.
#[derive(Debug, Clone, Default)]
pub struct Flags {
    /// File path or stream URL from the command line, opened on startup.
    pub initial: Option<String>,
}

/// This is the struct that represents your application.
/// It is used to define the data that will be used by your application.
pub struct Flicks {
    /// Application state which is managed by the COSMIC runtime.
    core: Core,
    /// Display a context drawer with the designated page if defined.
    context_page: ContextPage,
    /// Key bindings for the application's menu bar.
    key_binds: HashMap<menu::KeyBind, MenuAction>,
    /// The active playback engine. Absent until the first load; every load
    /// stops and replaces it.
    engine: Option<Engine>,
    /// What the active engine is playing.
    source: Option<MediaSource>,
    /// Bumped on every load so the engine subscription gets a fresh identity.
    generation: u64,
    /// Contents of the stream-URL field.
    stream_url: String,
    /// Volume in [0, 1]. Retained in the view even with no engine so the
    /// next load starts at the chosen level.
    volume: f64,
    /// Last position reported by the engine, in seconds.
    position: f64,
    /// Total duration in seconds; zero until the media is ready.
    duration: f64,
    playback: PlaybackState,
    scrubber: Scrubber,
    /// Latest decoded frame for the video surface.
    video_frame: Option<image::Handle>,
    time_label: String,
    /// Visible error banner, dismissable.
    error: Option<String>,
}

/// Messages that the application can receive.
#[derive(Debug, Clone)]
pub enum Message {
    OpenFile,
    Selected(Url),
    Cancelled,
    OpenError(Arc<file_chooser::Error>),
    OpenInitial(String),
    StreamUrlChanged(String),
    LoadStream,
    Play,
    Pause,
    Stop,
    VolumeChanged(f64),
    SeekChanged(f64),
    SeekReleased,
    Engine(EngineEvent),
    DismissError,
    ToggleContextPage(ContextPage),
    LaunchUrl(String),
}

/// Identifies a context page to display in the context drawer.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ContextPage {
    #[default]
    About,
}

impl ContextPage {
    fn title(&self) -> String {
        match self {
            Self::About => fl!("about"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MenuAction {
    About,
    OpenFile,
}

impl menu::action::MenuAction for MenuAction {
    type Message = Message;

    fn message(&self) -> Self::Message {
        match self {
            MenuAction::About => Message::ToggleContextPage(ContextPage::About),
            MenuAction::OpenFile => Message::OpenFile,
        }
    }
}

impl Application for Flicks {
    type Executor = cosmic::executor::Default;

    type Flags = Flags;

    type Message = Message;

    const APP_ID: &'static str = "io.github.flicksplayer.Flicks";

    fn core(&self) -> &Core {
        &self.core
    }

    fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }

    /// This is the entry point of your application, it is where you initialize your application.
    fn init(core: Core, flags: Self::Flags) -> (Self, Command<Self::Message>) {
        let mut app = Flicks {
            core,
            context_page: ContextPage::default(),
            key_binds: HashMap::new(),
            engine: None,
            source: None,
            generation: 0,
            stream_url: String::new(),
            volume: 0.5,
            position: 0.0,
            duration: 0.0,
            playback: PlaybackState::Stopped,
            scrubber: Scrubber::default(),
            video_frame: None,
            time_label: time::format_time(0.0, 0.0),
            error: None,
        };

        let mut commands = vec![app.set_window_title(fl!("app-title"))];

        if let Some(target) = flags.initial {
            commands.push(cosmic::command::future(async move {
                Message::OpenInitial(target)
            }));
        }

        (app, Command::batch(commands))
    }

    /// Elements to pack at the start of the header bar.
    fn header_start(&self) -> Vec<Element<Self::Message>> {
        let menu_bar = menu::bar(vec![
            menu::Tree::with_children(
                menu::root(fl!("file")),
                menu::items(
                    &self.key_binds,
                    vec![menu::Item::Button(fl!("choose-file"), MenuAction::OpenFile)],
                ),
            ),
            menu::Tree::with_children(
                menu::root(fl!("view")),
                menu::items(
                    &self.key_binds,
                    vec![menu::Item::Button(fl!("about"), MenuAction::About)],
                ),
            ),
        ]);

        vec![menu_bar.into()]
    }

    /// Engine notifications are marshaled onto the UI loop here; there is no
    /// other path by which the engine's threads touch view state.
    fn subscription(&self) -> Subscription<Self::Message> {
        match &self.engine {
            Some(engine) => engine.events().map(Message::Engine),
            None => Subscription::none(),
        }
    }

    /// The video surface above, the control bar below, and an error banner
    /// on top when something went wrong.
    fn view(&self) -> Element<Self::Message> {
        let cosmic_theme::Spacing {
            space_xxs, space_s, ..
        } = theme::active().cosmic().spacing;

        let mut col = Column::new().spacing(space_xxs);

        if let Some(error) = &self.error {
            let banner = Row::new()
                .spacing(space_s)
                .align_items(Alignment::Center)
                .push(text(format!("{}: {error}", fl!("playback-error"))).width(Length::Fill))
                .push(button(text(fl!("dismiss"))).on_press(Message::DismissError));

            col = col.push(Container::new(banner).padding(space_xxs).width(Length::Fill));
        }

        col = col.push(self.video_surface());
        col = col.push(self.control_bar(space_xxs));

        col.into()
    }

    /// Application messages are handled here. The application state can be modified based on
    /// what message was received. Commands may be returned for asynchronous execution on a
    /// background thread managed by the application's executor.
    fn update(&mut self, message: Self::Message) -> Command<Self::Message> {
        match message {
            // Creates a new open dialog.
            Message::OpenFile => {
                return cosmic::command::future(async move {
                    #[cfg(feature = "rfd")]
                    let filter = FileFilter::new(fl!("choose-file-title"))
                        .extension("mp4")
                        .extension("mp3")
                        .extension("avi")
                        .extension("mkv");

                    #[cfg(feature = "xdg-portal")]
                    let filter = FileFilter::new(fl!("choose-file-title"))
                        .glob("*.mp4")
                        .glob("*.mp3")
                        .glob("*.avi")
                        .glob("*.mkv");

                    let dialog = file_chooser::open::Dialog::new()
                        .title(fl!("choose-file-title"))
                        .filter(filter);

                    match dialog.open_file().await {
                        Ok(response) => Message::Selected(response.url().to_owned()),

                        Err(file_chooser::Error::Cancelled) => Message::Cancelled,

                        Err(why) => Message::OpenError(Arc::new(why)),
                    }
                });
            }

            Message::Selected(url) => {
                return self.load(MediaSource::File(url));
            }

            Message::Cancelled => {}

            Message::OpenError(why) => {
                error!("file dialog failed: {why}");
                self.error = Some(why.to_string());
            }

            Message::OpenInitial(target) => {
                let path = Path::new(&target);
                let source = if path.is_file() {
                    let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
                    match Url::from_file_path(&absolute) {
                        Ok(url) => MediaSource::File(url),
                        Err(()) => MediaSource::Stream(target),
                    }
                } else {
                    MediaSource::Stream(target)
                };
                return self.load(source);
            }

            Message::StreamUrlChanged(value) => {
                self.stream_url = value;
            }

            Message::LoadStream => match MediaSource::from_stream_input(&self.stream_url) {
                Some(source) => return self.load(source),
                None => {
                    warn!("ignoring empty stream URL");
                    self.error = Some(fl!("invalid-url"));
                }
            },

            Message::Play => {
                if let Some(engine) = &self.engine {
                    engine.play();
                }
            }

            Message::Pause => {
                if let Some(engine) = &self.engine {
                    engine.pause();
                }
            }

            Message::Stop => {
                if let Some(engine) = &self.engine {
                    engine.stop();
                    // gst-play rewinds to the start on stop; mirror it.
                    self.position = 0.0;
                    self.scrubber.sync_position(0.0);
                    self.time_label = time::format_time(0.0, self.duration);
                }
            }

            Message::VolumeChanged(volume) => {
                self.volume = volume;
                if let Some(engine) = &self.engine {
                    engine.set_volume(volume);
                }
            }

            Message::SeekChanged(value) => {
                let target = self.scrubber.drag_to(value);
                if let Some(engine) = &self.engine {
                    engine.seek(target);
                }
            }

            Message::SeekReleased => {
                let target = self.scrubber.release();
                if let Some(engine) = &self.engine {
                    engine.seek(target);
                }
            }

            Message::Engine(event) => self.on_engine_event(event),

            Message::DismissError => {
                self.error = None;
            }

            Message::ToggleContextPage(context_page) => {
                if self.context_page == context_page {
                    // Close the context drawer if the toggled context page is the same.
                    self.core.window.show_context = !self.core.window.show_context;
                } else {
                    // Open the context drawer to display the requested context page.
                    self.context_page = context_page;
                    self.core.window.show_context = true;
                }

                // Set the title of the context drawer.
                self.set_context_title(context_page.title());
            }

            Message::LaunchUrl(url) => {
                let _result = open::that_detached(url);
            }
        }
        Command::none()
    }

    /// Display a context drawer if the context page is requested.
    fn context_drawer(&self) -> Option<Element<Self::Message>> {
        if !self.core.window.show_context {
            return None;
        }

        Some(match self.context_page {
            ContextPage::About => self.about(),
        })
    }
}

impl Flicks {
    /// The about page for this app.
    pub fn about(&self) -> Element<Message> {
        let cosmic_theme::Spacing { space_xxs, .. } = theme::active().cosmic().spacing;

        let icon = widget::svg(widget::svg::Handle::from_memory(
            &include_bytes!("../res/icons/hicolor/scalable/apps/io.github.flicksplayer.Flicks.svg")
                [..],
        ));

        let title = widget::text::title3(fl!("app-title"));

        let link = widget::button::link(REPOSITORY)
            .on_press(Message::LaunchUrl(REPOSITORY.to_string()))
            .padding(0);

        widget::column()
            .push(icon)
            .push(title)
            .push(link)
            .align_items(Alignment::Center)
            .spacing(space_xxs)
            .into()
    }

    /// Stop and discard the active engine, then start a fresh one for
    /// `source`. The stop happens before the replacement is constructed so
    /// the old pipeline releases its decoding resources first.
    fn load(&mut self, source: MediaSource) -> Command<Message> {
        if let Some(previous) = self.engine.take() {
            previous.stop();
        }

        self.generation += 1;
        self.scrubber.reset();
        self.position = 0.0;
        self.duration = 0.0;
        self.playback = PlaybackState::Stopped;
        self.video_frame = None;
        self.error = None;
        self.time_label = time::format_time(0.0, 0.0);

        info!("loading {}", source.uri());

        match Engine::new(&source, self.generation) {
            Ok(engine) => {
                engine.set_volume(self.volume);
                self.engine = Some(engine);
            }
            Err(why) => {
                error!("could not create a playback engine: {why:#}");
                self.error = Some(why.to_string());
            }
        }

        let window_title = format!("{} — {}", fl!("app-title"), source.label());
        self.set_header_title(source.label().to_owned());
        self.source = Some(source);
        self.set_window_title(window_title)
    }

    fn on_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::DurationChanged(duration) => {
                info!("media ready, duration {}", time::format_duration(duration));
                self.duration = duration;
                self.scrubber.set_max(duration);
                self.time_label = time::format_time(self.position, duration);
            }

            EngineEvent::PositionUpdated(position) => {
                self.position = position;
                // Applied only while the user is not dragging the scrubber,
                // so the feedback cannot fight the drag.
                if self.scrubber.sync_position(position) {
                    self.time_label = time::format_time(position, self.duration);
                }
            }

            EngineEvent::StateChanged(state) => {
                self.playback = state;
            }

            EngineEvent::Frame(frame) => {
                self.video_frame = Some(image::Handle::from_pixels(
                    frame.width,
                    frame.height,
                    frame.pixels,
                ));
            }

            EngineEvent::EndOfStream => {
                info!("end of stream");
                if let Some(engine) = &self.engine {
                    engine.stop();
                }
                self.position = 0.0;
                self.scrubber.sync_position(0.0);
                self.time_label = time::format_time(0.0, self.duration);
            }

            EngineEvent::Error(why) => {
                let what = self
                    .source
                    .as_ref()
                    .map_or("<no media>", MediaSource::uri);
                error!("playback of {what} failed: {why}");
                self.error = Some(why);
            }

            EngineEvent::Warning(why) => {
                warn!("playback warning: {why}");
            }
        }
    }

    /// The region the engine renders into; shows a status line until video
    /// frames arrive (and for audio-only media, which never sends any).
    fn video_surface(&self) -> Element<Message> {
        match &self.video_frame {
            Some(frame) => Container::new(
                widget::image(frame.clone())
                    .content_fit(ContentFit::Contain)
                    .width(Length::Fill)
                    .height(Length::Fill),
            )
            .width(Length::Fill)
            .height(Length::Fill)
            .into(),

            None => {
                let status = if self.engine.is_none() {
                    fl!("no-media")
                } else if self.playback == PlaybackState::Buffering {
                    fl!("buffering")
                } else if self.duration <= 0.0 {
                    fl!("loading")
                } else {
                    fl!("audio-only")
                };

                widget::text::title4(status)
                    .apply(widget::container)
                    .width(Length::Fill)
                    .height(Length::Fill)
                    .align_x(Horizontal::Center)
                    .align_y(Vertical::Center)
                    .into()
            }
        }
    }

    /// Bottom control bar: file and stream loading, transport, volume,
    /// seek, and the elapsed/total readout.
    fn control_bar(&self, spacing: u16) -> Element<Message> {
        // The range is degenerate before the duration is known; keep the
        // slider renderable with a dummy upper bound.
        let seek_max = self.scrubber.max().max(1.0);

        let controls = Row::new()
            .spacing(spacing)
            .align_items(Alignment::Center)
            .push(button(text(fl!("choose-file"))).on_press(Message::OpenFile))
            .push(
                widget::text_input(fl!("stream-placeholder"), &self.stream_url)
                    .on_input(Message::StreamUrlChanged)
                    .on_submit(Message::LoadStream)
                    .width(Length::Fixed(180.0)),
            )
            .push(button(text(fl!("load-stream"))).on_press(Message::LoadStream))
            .push(button(text(fl!("play"))).on_press(Message::Play))
            .push(button(text(fl!("pause"))).on_press(Message::Pause))
            .push(button(text(fl!("stop"))).on_press(Message::Stop))
            .push(
                widget::slider(0.0..=1.0, self.volume, Message::VolumeChanged)
                    .step(0.01)
                    .width(Length::Fixed(100.0)),
            )
            .push(
                widget::slider(0.0..=seek_max, self.scrubber.value(), Message::SeekChanged)
                    .on_release(Message::SeekReleased)
                    .step(0.1)
                    .width(Length::Fill),
            )
            .push(text(self.time_label.as_str()));

        Container::new(controls)
            .width(Length::Fill)
            .padding(spacing)
            .into()
    }
}
