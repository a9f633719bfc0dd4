use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Coarse content category.  Advisory only: never consulted when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum FileType {
    Image   = 0,
    Audio   = 1,
    Mesh    = 2,
    Script  = 3,
    Unknown = 4,
}

impl FileType {
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(FileType::Image),
            1 => Some(FileType::Audio),
            2 => Some(FileType::Mesh),
            3 => Some(FileType::Script),
            4 => Some(FileType::Unknown),
            _ => None,
        }
    }

    /// Classify by lowercase extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg"                 => FileType::Image,
            "mp3" | "ogg" | "wav" | "flac"         => FileType::Audio,
            "obj" | "fbx" | "gltf" | "glb"         => FileType::Mesh,
            "lua" | "py" | "txt" | "json" | "ini"  => FileType::Script,
            _                                      => FileType::Unknown,
        }
    }

    pub fn classify(name: &str) -> Self {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(FileType::Unknown)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileType::Image   => "Image",
            FileType::Audio   => "Audio",
            FileType::Mesh    => "Mesh",
            FileType::Script  => "Script",
            FileType::Unknown => "Unknown",
        })
    }
}
