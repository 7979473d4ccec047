//! Hierarchy-aware media ids.
//!
//! Ids have the form `category/value|musicId`: the category path tells a
//! controller where a track was picked from, so the same track can be
//! queued differently from "Albums/Alpha" and from "Recommended".

use crate::error::{Error, Result};

pub const CATEGORY_SEPARATOR: char = '/';
pub const LEAF_SEPARATOR: char = '|';

fn is_valid_category(category: &str) -> bool {
    !category.contains(CATEGORY_SEPARATOR) && !category.contains(LEAF_SEPARATOR)
}

/// Join `categories` and an optional leaf `music_id` into a media id.
pub fn create_media_id(music_id: Option<&str>, categories: &[&str]) -> Result<String> {
    if let Some(bad) = categories.iter().find(|c| !is_valid_category(c)) {
        return Err(Error::InvalidMediaId(format!("invalid category: {bad}")));
    }
    let mut id = categories.join(&CATEGORY_SEPARATOR.to_string());
    if let Some(music_id) = music_id {
        id.push(LEAF_SEPARATOR);
        id.push_str(music_id);
    }
    Ok(id)
}

/// The track id after the leaf separator, if this id names a track.
pub fn extract_music_id(media_id: &str) -> Option<&str> {
    media_id
        .find(LEAF_SEPARATOR)
        .map(|pos| &media_id[pos + LEAF_SEPARATOR.len_utf8()..])
}

/// Category path of `media_id`, without the leaf.
pub fn hierarchy(media_id: &str) -> Vec<&str> {
    let path = match media_id.find(LEAF_SEPARATOR) {
        Some(pos) => &media_id[..pos],
        None => media_id,
    };
    path.split(CATEGORY_SEPARATOR).collect()
}

/// The second hierarchy level (`Alpha` in `Albums/Alpha`), when exactly two exist.
pub fn category_value(media_id: &str) -> Option<&str> {
    match hierarchy(media_id).as_slice() {
        [_, value] => Some(*value),
        _ => None,
    }
}

pub fn is_browsable(media_id: &str) -> bool {
    !media_id.contains(LEAF_SEPARATOR)
}

/// Parent id: a leaf's parent is its category path; a top-level category's
/// parent is `root`.
pub fn parent_media_id(media_id: &str, root: &str) -> Result<String> {
    let levels = hierarchy(media_id);
    if !is_browsable(media_id) {
        return create_media_id(None, &levels);
    }
    if levels.len() <= 1 {
        return Ok(root.to_string());
    }
    create_media_id(None, &levels[..levels.len() - 1])
}

/// Escape characters that would break a media id path (`%`, `/`, `|`).
pub fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            CATEGORY_SEPARATOR => out.push_str("%2F"),
            LEAF_SEPARATOR => out.push_str("%7C"),
            c => out.push(c),
        }
    }
    out
}
