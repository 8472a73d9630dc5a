//! Audio and video conversions through ffmpeg.
//!
//! Each conversion type is an argument template with `{input}` and
//! `{output}` placeholders, run by [`ConversionExecutor`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::converter::Converter;
use crate::error::ConversionError;
use crate::executor::{ConversionExecutor, ExecutionParams};
use crate::kind::ConversionKind;
use crate::tools::FFMPEG;

const MP3_TO_WAV: &[&str] = &[
    "-y", "-hide_banner", "-nostdin", "-loglevel", "error", "-i", "{input}", "-vn", "-c:a",
    "pcm_s16le", "{output}",
];

const WAV_TO_MP3: &[&str] = &[
    "-y", "-hide_banner", "-nostdin", "-loglevel", "error", "-i", "{input}", "-vn", "-c:a",
    "libmp3lame", "-q:a", "2", "{output}",
];

const MP4_TO_AVI: &[&str] = &[
    "-y", "-hide_banner", "-nostdin", "-loglevel", "error", "-i", "{input}", "-c:v", "mpeg4",
    "-q:v", "5", "-c:a", "libmp3lame", "-q:a", "4", "{output}",
];

const AVI_TO_MP4: &[&str] = &[
    "-y", "-hide_banner", "-nostdin", "-loglevel", "error", "-i", "{input}", "-c:v", "libx264",
    "-preset", "veryfast", "-crf", "23", "-pix_fmt", "yuv420p", "-c:a", "aac", "-b:a", "192k",
    "-movflags", "+faststart", "{output}",
];

const MP4_TO_MP3: &[&str] = &[
    "-y", "-hide_banner", "-nostdin", "-loglevel", "error", "-i", "{input}", "-vn", "-c:a",
    "libmp3lame", "-q:a", "2", "{output}",
];

/// ffmpeg arguments for a media conversion type, `None` for the others.
pub fn args_template(kind: ConversionKind) -> Option<&'static [&'static str]> {
    match kind {
        ConversionKind::Mp3ToWav => Some(MP3_TO_WAV),
        ConversionKind::WavToMp3 => Some(WAV_TO_MP3),
        ConversionKind::Mp4ToAvi => Some(MP4_TO_AVI),
        ConversionKind::AviToMp4 => Some(AVI_TO_MP4),
        ConversionKind::Mp4ToMp3 => Some(MP4_TO_MP3),
        _ => None,
    }
}

/// Runs one ffmpeg invocation per file.
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    /// Resolved ffmpeg executable; `None` when it could not be found.
    program: Option<PathBuf>,
    /// Argument template.
    args_template: &'static [&'static str],
    /// Per-invocation timeout.
    timeout_seconds: u64,
    executor: ConversionExecutor,
}

impl FfmpegConverter {
    /// Build the converter for `kind`. Returns `None` if `kind` is not a
    /// media conversion.
    pub fn for_kind(
        kind: ConversionKind,
        program: Option<PathBuf>,
        timeout_seconds: u64,
    ) -> Option<Self> {
        Some(Self {
            program,
            args_template: args_template(kind)?,
            timeout_seconds,
            executor: ConversionExecutor::new(),
        })
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &'static str {
        FFMPEG
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| ConversionError::ToolNotFound {
                tool: FFMPEG.to_string(),
            })?;

        let params = ExecutionParams {
            tool: FFMPEG.to_string(),
            program: program.clone(),
            args: ConversionExecutor::substitute_args(self.args_template, input, output),
            timeout_seconds: self.timeout_seconds,
            output_path: output.to_path_buf(),
        };

        self.executor.execute(&params).await
    }
}
