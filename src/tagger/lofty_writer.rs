//! Tag writer backed by lofty.
//!
//! Works across the container formats the fetcher can produce (ID3 for mp3,
//! MP4 atoms for m4a, Vorbis comments for opus/flac) without per-format
//! branching.

use std::path::Path;

use anyhow::{Context, Result};
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use tracing::debug;

use super::{TagSet, TagWriter};

pub struct LoftyTagWriter;

impl TagWriter for LoftyTagWriter {
    fn write_tags(&self, path: &Path, tags: &TagSet) -> Result<()> {
        let mut tagged = Probe::open(path)
            .with_context(|| format!("Failed to open {:?} for tagging", path))?
            .read()
            .with_context(|| format!("Failed to read audio file {:?}", path))?;

        let tag = match tagged.primary_tag_mut() {
            Some(tag) => tag,
            None => {
                // Freshly transcoded files may carry no tag at all yet.
                let tag_type = tagged.primary_tag_type();
                tagged.insert_tag(Tag::new(tag_type));
                tagged
                    .primary_tag_mut()
                    .expect("tag was inserted right above")
            }
        };

        if let Some(title) = &tags.title {
            tag.set_title(title.clone());
        }
        if let Some(artist) = &tags.artist {
            tag.set_artist(artist.clone());
        }
        if let Some(album) = &tags.album {
            tag.set_album(album.clone());
        }
        if let Some(album_artist) = &tags.album_artist {
            tag.insert_text(ItemKey::AlbumArtist, album_artist.clone());
        }
        if let Some(track_number) = tags.track_number {
            tag.set_track(track_number);
        }

        tag.save_to_path(path, WriteOptions::default())
            .with_context(|| format!("Failed to write tags to {:?}", path))?;

        debug!("Tagged {:?}", path);
        Ok(())
    }
}
