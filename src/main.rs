// SPDX-License-Identifier: GPL-3.0-only

use clap::{Arg, Command};
use gstreamer as gst;
use log::info;
use tracing_subscriber::EnvFilter;

use app::{Flags, Flicks};

/// The `app` module is used by convention to indicate the main component of our application.
mod app;
mod engine;
mod i18n;
mod scrubber;
mod time;

fn main() -> cosmic::iced::Result {
    // The fmt subscriber also captures records emitted through the `log`
    // macros used throughout the crate.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flicks=info")),
        )
        .init();

    let matches = Command::new("flicks")
        .about("A no-frills desktop media player")
        .arg(
            Arg::new("MEDIA")
                .help("A media file or stream URL to open on startup")
                .index(1),
        )
        .get_matches();
    let initial = matches.value_of("MEDIA").map(String::from);

    let requested_languages = i18n_embed::DesktopLanguageRequester::requested_languages();
    i18n::init(&requested_languages);

    gst::init().expect("GStreamer init failed");
    info!("flicks v{}", env!("CARGO_PKG_VERSION"));

    let settings = cosmic::app::Settings::default().size(cosmic::iced::Size::new(800.0, 600.0));
    cosmic::app::run::<Flicks>(settings, Flags { initial })
}
