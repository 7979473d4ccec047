use super::browse::ALBUMS_ROOT;
use super::media_id::{extract_music_id, hierarchy};
use super::model::TrackRecord;

/// Playlist for an item picked from an album: every track of the same
/// album, ordered by track number (catalog order among equal numbers).
pub fn build_playlist(item: &TrackRecord, catalog: &[TrackRecord]) -> Vec<TrackRecord> {
    let mut album: Vec<TrackRecord> = catalog
        .iter()
        .filter(|t| t.album == item.album)
        .cloned()
        .collect();
    album.sort_by_key(|t| t.track_number);
    album
}

/// Resolve a (possibly hierarchical) media id to the track id and the
/// playlist it should play in. Ids under an album node get the album
/// playlist; everything else plays in catalog order.
pub fn resolve_playlist(media_id: &str, catalog: &[TrackRecord]) -> Option<(String, Vec<TrackRecord>)> {
    let track_id = extract_music_id(media_id).unwrap_or(media_id);
    let item = catalog.iter().find(|t| t.id == track_id)?;

    let from_album = hierarchy(media_id).first() == Some(&ALBUMS_ROOT) && extract_music_id(media_id).is_some();
    let playlist = if from_album {
        build_playlist(item, catalog)
    } else {
        catalog.to_vec()
    };
    Some((track_id.to_string(), playlist))
}
