//! Tag writer trait and tag models.
//!
//! The tag writer embeds artist/album metadata into downloaded files. A
//! failing tag write is never fatal to a download; callers surface it as a
//! warning and keep the file.

mod lofty_writer;

pub use lofty_writer::LoftyTagWriter;

use std::path::Path;

/// Tags to embed in one audio file. Fields left as None are not touched.
#[derive(Debug, Clone, Default)]
pub struct TagSet {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub track_number: Option<u32>,
}

/// Collaborator that embeds a [`TagSet`] into a file on disk.
pub trait TagWriter: Send + Sync {
    fn write_tags(&self, path: &Path, tags: &TagSet) -> anyhow::Result<()>;
}

/// Recover a track number from an `NN - Title.ext` file name prefix.
///
/// Album downloads are written with a numeric index prefix; this reads it
/// back so the number can be embedded as a proper tag.
pub fn track_number_from_file_name(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let prefix = stem.split(" - ").next()?;
    prefix.parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_track_number_from_prefixed_name() {
        assert_eq!(
            track_number_from_file_name(&PathBuf::from("/x/03 - Song Title.m4a")),
            Some(3)
        );
        assert_eq!(
            track_number_from_file_name(&PathBuf::from("12 - A - B.mp3")),
            Some(12)
        );
    }

    #[test]
    fn test_track_number_absent_for_plain_names() {
        assert_eq!(
            track_number_from_file_name(&PathBuf::from("/x/Song Title.m4a")),
            None
        );
        assert_eq!(
            track_number_from_file_name(&PathBuf::from("/x/Dash - But No Number.m4a")),
            None
        );
    }
}
