//! Output containers and the ffmpeg encoder arguments that go with them

use clap::ValueEnum;
use serde::Serialize;

/// Container written for every mixed track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp3,
    M4a,
    Ogg,
    Flac,
}

impl OutputFormat {
    /// Canonical file extension (without the dot)
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::M4a => "m4a",
            OutputFormat::Ogg => "ogg",
            OutputFormat::Flac => "flac",
        }
    }

    /// Encoder used when no codec is given explicitly
    pub fn default_encoding(self) -> AudioEncoding {
        match self {
            // q=2 is roughly 190-220 kbps VBR
            OutputFormat::Mp3 => AudioEncoding::new("libmp3lame", Quality::Vbr(2)),
            OutputFormat::M4a => AudioEncoding::new("aac", Quality::Bitrate(256)),
            OutputFormat::Ogg => AudioEncoding::new("libvorbis", Quality::Vbr(6)),
            OutputFormat::Flac => AudioEncoding::new("flac", Quality::Default),
        }
    }

    /// Tag-container arguments needed for the copied metadata to be readable
    pub fn tag_args(self) -> &'static [&'static str] {
        match self {
            // ID3v2.3 is what most players and car stereos understand
            OutputFormat::Mp3 => &["-id3v2_version", "3"],
            OutputFormat::M4a | OutputFormat::Ogg | OutputFormat::Flac => &[],
        }
    }
}

/// Encoder quality setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// `-q:a <n>`
    Vbr(u8),
    /// `-b:a <n>k`
    Bitrate(u32),
    /// Let the encoder pick (lossless codecs)
    Default,
}

/// Codec identifier plus quality
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioEncoding {
    pub codec: String,
    pub quality: Quality,
}

impl AudioEncoding {
    pub fn new(codec: impl Into<String>, quality: Quality) -> Self {
        Self {
            codec: codec.into(),
            quality,
        }
    }

    /// Valid VBR range for encoders we know about
    pub fn vbr_range(&self) -> Option<(u8, u8)> {
        match self.codec.as_str() {
            "libmp3lame" => Some((0, 9)),
            "libvorbis" => Some((0, 10)),
            "aac" | "libfdk_aac" => Some((1, 5)),
            _ => None,
        }
    }

    pub fn ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec!["-c:a".to_string(), self.codec.clone()];
        match self.quality {
            Quality::Vbr(q) => {
                args.push("-q:a".to_string());
                args.push(q.to_string());
            }
            Quality::Bitrate(kbps) => {
                args.push("-b:a".to_string());
                args.push(format!("{}k", kbps));
            }
            Quality::Default => {}
        }
        args
    }
}

/// How tags travel from the primary track to the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetadataPolicy {
    /// Copy all tags from input 0 (the primary track)
    pub copy_from_primary: bool,
}

impl Default for MetadataPolicy {
    fn default() -> Self {
        Self {
            copy_from_primary: true,
        }
    }
}

impl MetadataPolicy {
    pub fn ffmpeg_args(&self, format: OutputFormat) -> Vec<String> {
        let source = if self.copy_from_primary { "0" } else { "-1" };
        let mut args = vec!["-map_metadata".to_string(), source.to_string()];
        args.extend(format.tag_args().iter().map(|s| s.to_string()));
        args
    }
}
