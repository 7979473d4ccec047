use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use tracing::info;

use crate::audio::RodioPlayer;
use crate::config;
use crate::mpris::spawn_mpris;
use crate::session::TransportCommand;

mod control;
mod event_loop;
mod settings;
mod startup;

pub use control::ControlCmd;
pub use event_loop::{EventLoop, Flow, TICK};
pub use settings::load_settings;
pub use startup::{Services, build, catalog_loader, position_stores};

/// Options the binary passes in on top of the settings file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Scan this directory instead of the configured catalog.
    pub music_dir: Option<PathBuf>,
    /// Start playing this media id once the catalog is ready.
    pub play: Option<String>,
    pub mpris: bool,
}

/// Run the player daemon until a client asks it to quit.
pub fn run(settings: &config::Settings, opts: RunOptions) -> anyhow::Result<()> {
    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();

    let events_tx = control_tx.clone();
    let player = RodioPlayer::spawn(
        move |ev| {
            let _ = events_tx.send(ControlCmd::Player(ev));
        },
        Duration::from_millis(settings.playback.quit_fade_out_ms),
    )?;

    let services = build(settings, Box::new(player), position_stores(settings));
    services.connection.connect(Box::new(control_tx.clone()));

    if opts.mpris {
        let quit_tx = control_tx.clone();
        spawn_mpris(services.connection.clone(), move || {
            let _ = quit_tx.send(ControlCmd::Quit);
        });
    }

    let loader = catalog_loader(settings, opts.music_dir.as_deref());
    let event_loop = EventLoop::new(
        services.session,
        services.source.clone(),
        loader,
        control_tx.clone(),
        control_rx,
    );
    event_loop.start_catalog_load()?;

    if let Some(id) = opts.play {
        let tx = control_tx.clone();
        services.source.when_ready(move |ok| {
            if ok {
                let _ = tx.send(ControlCmd::Transport(TransportCommand::PlayFromId(id)));
            }
        });
    }

    info!("rondo running");
    let session = event_loop.run();
    services.connection.disconnect();
    // Dropping the session drops the player, which fades out and closes
    // the output.
    drop(session);
    Ok(())
}
