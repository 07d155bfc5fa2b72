//! Asset locations and their resolution to local files.
//!
//! Callers describe audio, images and subtitles as a plain path, an
//! HTTP(S) URL or a `data:` URI. Each location is parsed once into an
//! [`AssetRef`] and resolved by [`AssetResolver::resolve`]; nothing past
//! this module looks at location strings.

use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose};
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::common::progress::create_spinner;
use crate::reel::error::{ReelError, ReelResult};
use crate::reel::logging::log_event;
use crate::ui::prelude::{Level, OutputFormat, get_output_format};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef {
    /// File already on this machine
    Local(PathBuf),
    /// HTTP(S) URL to download
    Remote(String),
    /// Bytes carried inline by a `data:` URI
    Embedded { mime: Option<String>, data: Vec<u8> },
}

impl AssetRef {
    /// Parse a location; relative local paths are joined to `base_dir`.
    pub fn parse(location: &str, base_dir: &Path) -> ReelResult<Self> {
        let trimmed = location.trim();
        if trimmed.is_empty() {
            return Err(resolve_error(location, "empty location"));
        }

        let lowered = trimmed.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            return Ok(AssetRef::Remote(trimmed.to_string()));
        }
        if lowered.starts_with("data:") {
            return parse_data_uri(trimmed);
        }

        let raw = trimmed.strip_prefix("file://").unwrap_or(trimmed);
        let expanded = PathBuf::from(shellexpand::tilde(raw).as_ref());
        let path = if expanded.is_absolute() {
            expanded
        } else {
            base_dir.join(expanded)
        };
        Ok(AssetRef::Local(path))
    }

    pub fn describe(&self) -> String {
        match self {
            AssetRef::Local(path) => path.display().to_string(),
            AssetRef::Remote(url) => url.clone(),
            AssetRef::Embedded { mime, data } => format!(
                "embedded {} ({} bytes)",
                mime.as_deref().unwrap_or("data"),
                data.len()
            ),
        }
    }
}

fn resolve_error(location: &str, message: impl Into<String>) -> ReelError {
    // Data URIs can be huge; keep messages readable
    let shown: String = location.chars().take(64).collect();
    ReelError::AssetResolve {
        location: shown,
        message: message.into(),
    }
}

fn parse_data_uri(uri: &str) -> ReelResult<AssetRef> {
    let rest = &uri["data:".len()..];
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| resolve_error(uri, "data URI is missing ','"))?;

    let mut params = meta.split(';');
    let mime = params
        .next()
        .map(str::trim)
        .filter(|m| m.contains('/'))
        .map(str::to_ascii_lowercase);
    let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let data = if is_base64 {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|err| resolve_error(uri, format!("invalid base64 payload: {err}")))?
    } else {
        urlencoding::decode_binary(payload.as_bytes()).into_owned()
    };

    if data.is_empty() {
        return Err(resolve_error(uri, "data URI carries no bytes"));
    }

    Ok(AssetRef::Embedded { mime, data })
}

/// File extension for a mime type.
fn extension_for_mime(mime: Option<&str>) -> &'static str {
    match mime {
        Some("image/png") => "png",
        Some("image/jpeg") | Some("image/jpg") => "jpg",
        Some("image/webp") => "webp",
        Some("image/gif") => "gif",
        Some("audio/mpeg") | Some("audio/mp3") => "mp3",
        Some("audio/wav") | Some("audio/x-wav") | Some("audio/wave") => "wav",
        Some("audio/ogg") => "ogg",
        Some("audio/mp4") | Some("audio/aac") | Some("audio/x-m4a") => "m4a",
        Some("application/x-subrip") | Some("text/srt") => "srt",
        Some("text/plain") => "txt",
        _ => "bin",
    }
}

/// Extension taken from the last path segment of a URL.
fn extension_for_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = path.split_once("://").map_or(path, |(_, rest)| rest);
    let Some((_, last)) = after_scheme.rsplit_once('/') else {
        return "bin".to_string();
    };
    match last.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => "bin".to_string(),
    }
}

fn url_digest(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    format!("{:x}", digest)[..16].to_string()
}

/// Materializes asset locations as local files inside the working directory.
///
/// Files the resolver creates are tracked so the pipeline can remove them.
pub struct AssetResolver {
    work_dir: PathBuf,
    client: reqwest::Client,
    created: Vec<PathBuf>,
}

impl AssetResolver {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            client: reqwest::Client::new(),
            created: Vec::new(),
        }
    }

    /// Local path for `asset`. `stem` names files written for embedded data
    /// and must be unique per scene and role.
    pub async fn resolve(&mut self, asset: &AssetRef, stem: &str) -> ReelResult<PathBuf> {
        match asset {
            AssetRef::Local(path) => Ok(path.clone()),
            AssetRef::Remote(url) => self.download(url).await,
            AssetRef::Embedded { mime, data } => {
                let path = self
                    .work_dir
                    .join(format!("{stem}.{}", extension_for_mime(mime.as_deref())));
                tokio::fs::write(&path, data).await?;
                self.created.push(path.clone());
                log_event(
                    Level::Debug,
                    "reel.assets.embedded",
                    format!("Decoded {} bytes into {}", data.len(), path.display()),
                );
                Ok(path)
            }
        }
    }

    async fn download(&mut self, url: &str) -> ReelResult<PathBuf> {
        let target = self
            .work_dir
            .join(format!("remote-{}.{}", url_digest(url), extension_for_url(url)));
        if self.created.contains(&target) && target.exists() {
            return Ok(target);
        }

        let spinner = matches!(get_output_format(), OutputFormat::Text)
            .then(|| create_spinner(format!("Downloading {url}")));

        let result = self.fetch_to(url, &target).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        result?;

        self.created.push(target.clone());
        log_event(
            Level::Info,
            "reel.assets.downloaded",
            format!("Downloaded {} to {}", url, target.display()),
        );
        Ok(target)
    }

    async fn fetch_to(&self, url: &str, target: &Path) -> ReelResult<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| resolve_error(url, err.to_string()))?;

        let partial = target.with_extension("part");
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&partial).await;
                    return Err(resolve_error(url, err.to_string()));
                }
            };
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&partial, target).await?;
        Ok(())
    }

    /// Files written by this resolver so far.
    pub fn created_files(&self) -> &[PathBuf] {
        &self.created
    }

    /// Remove every file this resolver wrote.
    pub fn cleanup(&mut self) {
        for path in self.created.drain(..) {
            let _ = std::fs::remove_file(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_locations() {
        let base = Path::new("/project");
        assert_eq!(
            AssetRef::parse("https://cdn.example.com/a.mp3", base).unwrap(),
            AssetRef::Remote("https://cdn.example.com/a.mp3".to_string())
        );
        assert_eq!(
            AssetRef::parse("img/a.png", base).unwrap(),
            AssetRef::Local(PathBuf::from("/project/img/a.png"))
        );
        assert_eq!(
            AssetRef::parse("/abs/a.png", base).unwrap(),
            AssetRef::Local(PathBuf::from("/abs/a.png"))
        );
        assert_eq!(
            AssetRef::parse("file:///abs/b.png", base).unwrap(),
            AssetRef::Local(PathBuf::from("/abs/b.png"))
        );
    }

    #[test]
    fn decodes_base64_data_uri() {
        let asset = AssetRef::parse("data:image/png;base64,aGVsbG8=", Path::new(".")).unwrap();
        assert_eq!(
            asset,
            AssetRef::Embedded {
                mime: Some("image/png".to_string()),
                data: b"hello".to_vec(),
            }
        );
    }

    #[test]
    fn decodes_percent_encoded_data_uri() {
        let asset = AssetRef::parse(
            "data:text/plain,1%0A00%3A00%3A00%2C000",
            Path::new("."),
        )
        .unwrap();
        let AssetRef::Embedded { data, .. } = asset else {
            panic!("expected embedded asset");
        };
        assert_eq!(data, b"1\n00:00:00,000");
    }

    #[test]
    fn rejects_broken_data_uris() {
        assert!(AssetRef::parse("data:image/png;base64", Path::new(".")).is_err());
        assert!(AssetRef::parse("data:image/png;base64,@@@", Path::new(".")).is_err());
        assert!(AssetRef::parse("data:,", Path::new(".")).is_err());
        assert!(AssetRef::parse("   ", Path::new(".")).is_err());
    }

    #[test]
    fn url_extensions() {
        assert_eq!(extension_for_url("https://x.io/a/b/voice.MP3?sig=1"), "mp3");
        assert_eq!(extension_for_url("https://x.io/render"), "bin");
        assert_eq!(extension_for_url("https://x.io"), "bin");
        assert_eq!(extension_for_url("https://x.io/a/.hidden"), "bin");
    }

    #[test]
    fn digest_is_stable_and_short() {
        assert_eq!(url_digest("https://a"), url_digest("https://a"));
        assert_ne!(url_digest("https://a"), url_digest("https://b"));
        assert_eq!(url_digest("https://a").len(), 16);
    }

    #[tokio::test]
    async fn embedded_assets_are_written_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = AssetResolver::new(dir.path());
        let asset = AssetRef::Embedded {
            mime: Some("audio/mpeg".to_string()),
            data: vec![1, 2, 3],
        };
        let path = resolver.resolve(&asset, "scene-1-audio").await.unwrap();
        assert_eq!(path, dir.path().join("scene-1-audio.mp3"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        assert_eq!(resolver.created_files().len(), 1);

        resolver.cleanup();
        assert!(!path.exists());
        assert!(resolver.created_files().is_empty());
    }

    #[tokio::test]
    async fn local_assets_pass_through_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = AssetResolver::new(dir.path());
        let asset = AssetRef::Local(PathBuf::from("/does/not/matter.png"));
        let path = resolver.resolve(&asset, "x").await.unwrap();
        assert_eq!(path, PathBuf::from("/does/not/matter.png"));
        assert!(resolver.created_files().is_empty());
    }
}
