//! [`MediaFetcher`] backed by the `yt-dlp` command line tool.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::{FetchError, MediaFetcher, MediaInfo};
use crate::config::FetcherConfig;
use crate::secrets::expand_home;

/// Lines of stderr kept in a failure message.
const STDERR_TAIL_LINES: usize = 5;

pub struct YtDlpFetcher {
    binary: String,
    ffmpeg_location: Option<PathBuf>,
}

impl YtDlpFetcher {
    pub fn new(config: &FetcherConfig) -> Self {
        Self {
            binary: expand_home(&config.binary),
            ffmpeg_location: config
                .tools_path
                .as_deref()
                .filter(|p| !p.is_empty())
                .map(|p| PathBuf::from(expand_home(p))),
        }
    }

    fn base_args(&self, audio_only: bool) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["--no-playlist", "--ignore-config", "--restrict-filenames"]
            .iter()
            .map(OsString::from)
            .collect();

        if let Some(location) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(location.into());
        }

        if audio_only {
            args.extend(
                [
                    "-f",
                    "bestaudio/best",
                    "-x",
                    "--audio-format",
                    "mp3",
                    "--audio-quality",
                    "192K",
                ]
                .iter()
                .map(OsString::from),
            );
        } else {
            args.extend(["-f", "best[ext=mp4]"].iter().map(OsString::from));
        }

        args
    }

    fn run(&self, args: Vec<OsString>) -> Result<Output, FetchError> {
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|e| FetchError::Spawn {
                binary: self.binary.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(FetchError::Failed {
                status: output.status.to_string(),
                stderr: stderr_tail(&output),
            });
        }
        Ok(output)
    }
}

fn stderr_tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

impl MediaFetcher for YtDlpFetcher {
    fn probe(&self, url: &str, audio_only: bool) -> Result<MediaInfo, FetchError> {
        let mut args = self.base_args(audio_only);
        args.push("--dump-json".into());
        args.push("--".into());
        args.push(url.into());

        let output = self.run(args)?;
        let mut info: MediaInfo = serde_json::from_slice(&output.stdout)?;

        // Audio is converted after download, so the reported container is not
        // what ends up on disk.
        if audio_only {
            info.ext = Some("mp3".to_string());
        }
        Ok(info)
    }

    fn fetch(&self, url: &str, audio_only: bool, dest: &Path) -> Result<(), FetchError> {
        let stem = dest
            .file_stem()
            .ok_or_else(|| FetchError::MissingOutput(dest.to_path_buf()))?;
        let dir = dest.parent().unwrap_or_else(|| Path::new("."));

        let mut pattern = dir.join(stem).into_os_string();
        pattern.push(".%(ext)s");

        let mut args = self.base_args(audio_only);
        args.push("-o".into());
        args.push(pattern);
        args.push("--".into());
        args.push(url.into());

        self.run(args)?;

        if dest.exists() {
            return Ok(());
        }

        // The extractor may pick a different extension than the probe reported.
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.file_stem() == Some(stem) {
                log::warn!(
                    "Fetcher wrote {:?} instead of {:?}, renaming",
                    path.file_name(),
                    dest.file_name()
                );
                std::fs::rename(&path, dest)?;
                return Ok(());
            }
        }

        Err(FetchError::MissingOutput(dest.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_as_strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_video_args() {
        let fetcher = YtDlpFetcher::new(&FetcherConfig::default());
        let args = args_as_strings(&fetcher.base_args(false));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--restrict-filenames".to_string()));
        assert!(args.windows(2).any(|w| w == ["-f", "best[ext=mp4]"]));
        assert!(!args.contains(&"--ffmpeg-location".to_string()));
    }

    #[test]
    fn test_audio_args_with_ffmpeg_location() {
        let fetcher = YtDlpFetcher::new(&FetcherConfig {
            binary: "yt-dlp".to_string(),
            tools_path: Some("/opt/ffmpeg/bin".to_string()),
        });
        let args = args_as_strings(&fetcher.base_args(true));
        assert!(args.windows(2).any(|w| w == ["-f", "bestaudio/best"]));
        assert!(args.windows(2).any(|w| w == ["--audio-format", "mp3"]));
        assert!(args
            .windows(2)
            .any(|w| w == ["--ffmpeg-location", "/opt/ffmpeg/bin"]));
        assert!(args.contains(&"-x".to_string()));
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let fetcher = YtDlpFetcher::new(&FetcherConfig {
            binary: "/definitely/not/yt-dlp".to_string(),
            tools_path: None,
        });
        let err = fetcher.probe("http://example.com/v", false).unwrap_err();
        assert!(matches!(err, FetchError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_failed_with_stderr() {
        let fetcher = YtDlpFetcher::new(&FetcherConfig {
            binary: "false".to_string(),
            tools_path: None,
        });
        let err = fetcher.probe("http://example.com/v", false).unwrap_err();
        assert!(matches!(err, FetchError::Failed { .. }));
    }
}
