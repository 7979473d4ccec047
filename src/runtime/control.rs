use std::sync::mpsc::Sender;

use crate::error::Result;
use crate::hub::CommandSink;
use crate::library::TrackRecord;
use crate::session::{CallState, FocusChange, PlayerEvent, TransportCommand};

/// Everything the dispatch thread reacts to.
#[derive(Debug)]
pub enum ControlCmd {
    Transport(TransportCommand),
    /// Outcome of a catalog load run on the loader thread.
    CatalogLoaded(Result<Vec<TrackRecord>>),
    /// Rescan the catalog.
    Reload,
    Player(PlayerEvent),
    Focus(FocusChange),
    Call(CallState),
    BecomingNoisy,
    Quit,
}

impl CommandSink for Sender<ControlCmd> {
    fn send(&self, cmd: TransportCommand) -> bool {
        Sender::send(self, ControlCmd::Transport(cmd)).is_ok()
    }
}
