//! Opening and decoding a track into a `rodio` sink.

use std::fs::File;
use std::io::BufReader;
use std::time::Duration;

use rodio::source::SkipDuration;
use rodio::{Decoder, OutputStream, Sink, Source};

use crate::error::{Error, Result};

/// Decode the file at `locator`, skipping to `start_at`.
pub(super) fn decode_at(
    locator: &str,
    start_at: Duration,
) -> Result<SkipDuration<Decoder<BufReader<File>>>> {
    let file = File::open(locator).map_err(|e| Error::Playback(format!("{locator}: {e}")))?;
    let decoder = Decoder::new(BufReader::new(file))
        .map_err(|e| Error::Playback(format!("{locator}: {e}")))?;
    // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
    Ok(decoder.skip_duration(start_at))
}

/// Create a paused `Sink` for `locator` that starts playback at `start_at`.
pub(super) fn open_sink_at(stream: &OutputStream, locator: &str, start_at: Duration) -> Result<Sink> {
    let source = decode_at(locator, start_at)?;
    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.pause();
    Ok(sink)
}
