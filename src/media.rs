//! Media type detection from file names

/// Kind of playable media
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Video => "Video",
            MediaKind::Audio => "Audio",
        }
    }
}

/// Lowercased extension of a file name, without the dot
///
/// Returns `None` for names without an extension and for dotfiles like `.nfo`.
pub fn extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Classify a file name by extension. Unknown extensions are not playable.
pub fn classify(file_name: &str) -> Option<MediaKind> {
    let ext = extension(file_name)?;

    let kind = match ext.as_str() {
        "mp4" | "m4v" | "mkv" | "avi" | "mov" | "ts" | "m2ts" | "mts" | "mpg" | "mpeg" | "wmv"
        | "flv" | "ogv" | "webm" | "3gp" | "rmvb" | "vob" | "iso" => MediaKind::Video,

        "mp3" | "flac" | "wav" | "m4a" | "aac" | "ogg" | "oga" | "wma" | "opus" | "aiff"
        | "aif" | "ape" | "dsf" | "alac" => MediaKind::Audio,

        _ => return None,
    };

    Some(kind)
}
