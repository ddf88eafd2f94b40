use mime::Mime;
use thiserror::Error;

/// 10 MiB
pub const MAX_THUMBNAIL_BYTES: u64 = 10 << 20;
/// 1 GiB
pub const MAX_VIDEO_BYTES: u64 = 1 << 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaTypeError {
    #[error("missing content type")]
    Missing,
    #[error("malformed content type: {0}")]
    Malformed(String),
    #[error("content type {0} is not allowed")]
    NotAllowed(String),
}

/// Which asset slot of a video an upload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Thumbnail,
    Video,
}

impl AssetKind {
    /// Name of the multipart form field carrying the file part.
    pub fn form_field(self) -> &'static str {
        match self {
            AssetKind::Thumbnail => "thumbnail",
            AssetKind::Video => "video",
        }
    }

    pub fn max_bytes(self) -> u64 {
        match self {
            AssetKind::Thumbnail => MAX_THUMBNAIL_BYTES,
            AssetKind::Video => MAX_VIDEO_BYTES,
        }
    }

    /// Parses a declared content type and checks it against this kind's allow-list.
    ///
    /// Thumbnails accept `image/jpeg` and `image/png`; videos accept any
    /// `video/*` subtype. Parameters such as `; charset=...` are ignored.
    pub fn validate(self, declared: Option<&str>) -> Result<MediaType, MediaTypeError> {
        let media_type = MediaType::parse(declared.ok_or(MediaTypeError::Missing)?)?;
        let parsed = media_type.mime();
        let allowed = match self {
            AssetKind::Thumbnail => {
                parsed.type_() == mime::IMAGE
                    && (parsed.subtype() == mime::JPEG || parsed.subtype() == mime::PNG)
            }
            AssetKind::Video => parsed.type_() == "video",
        };
        if allowed {
            Ok(media_type)
        } else {
            Err(MediaTypeError::NotAllowed(media_type.essence()))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaType(Mime);

impl MediaType {
    pub fn parse(raw: &str) -> Result<Self, MediaTypeError> {
        raw.trim()
            .parse::<Mime>()
            .map(Self)
            .map_err(|_| MediaTypeError::Malformed(raw.to_string()))
    }

    pub fn mime(&self) -> &Mime {
        &self.0
    }

    /// `type/subtype` without parameters.
    pub fn essence(&self) -> String {
        self.0.essence_str().to_string()
    }

    /// File extension used for storage keys, derived from the subtype.
    pub fn extension(&self) -> String {
        self.0
            .subtype()
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect()
    }
}
