use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// One scene as supplied by the caller. Only the first image is rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneInput {
    #[serde(alias = "groupId")]
    pub group_id: String,
    #[serde(default)]
    pub title: String,
    /// Narration audio location (path, URL or data URI)
    #[serde(alias = "audioLocation")]
    pub audio: String,
    /// Duration estimate from the audio producer, used when probing fails
    #[serde(default, alias = "durationHint")]
    pub duration_hint: f64,
    #[serde(default, alias = "narrativeText")]
    pub narrative_text: Option<String>,
    /// Existing SRT document location; its timing is recomputed
    #[serde(default, alias = "existingSubtitleLocation")]
    pub subtitle: Option<String>,
    #[serde(default, alias = "imageLocations")]
    pub images: Vec<String>,
}

impl SceneInput {
    /// Name used in messages and errors.
    pub fn label(&self) -> &str {
        if self.group_id.trim().is_empty() {
            &self.title
        } else {
            &self.group_id
        }
    }
}

/// Ordered list of scenes making up one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub title: Option<String>,
    /// Final video path, relative to the manifest
    #[serde(default)]
    pub output: Option<PathBuf>,
    pub scenes: Vec<SceneInput>,
    /// Directory relative asset paths resolve against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let mut manifest = match extension.as_deref() {
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            _ => Self::from_json(&contents),
        }
        .with_context(|| format!("Failed to parse manifest {}", path.display()))?;

        manifest.base_dir = base_dir;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    fn validate(&self) -> Result<()> {
        if self.scenes.is_empty() {
            bail!("Manifest lists no scenes");
        }
        for (order, scene) in self.scenes.iter().enumerate() {
            if scene.label().trim().is_empty() {
                bail!("Scene #{} has neither a group id nor a title", order + 1);
            }
            if scene.audio.trim().is_empty() {
                bail!("Scene '{}' has no audio location", scene.label());
            }
        }
        Ok(())
    }

    /// Output path from the manifest, resolved against its directory.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.output.as_ref().map(|out| {
            if out.is_absolute() {
                out.clone()
            } else {
                self.base_dir.join(out)
            }
        })
    }

    /// Find a scene by group id, or by its 1-based position.
    pub fn find_scene(&self, key: &str) -> Option<(usize, &SceneInput)> {
        if let Some(found) = self
            .scenes
            .iter()
            .enumerate()
            .find(|(_, scene)| scene.group_id == key)
        {
            return Some(found);
        }
        let position: usize = key.parse().ok()?;
        let order = position.checked_sub(1)?;
        self.scenes.get(order).map(|scene| (order, scene))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "title": "Harbour",
        "output": "out/harbour.mp4",
        "scenes": [
            {
                "groupId": "intro",
                "title": "Intro",
                "audioLocation": "audio/intro.mp3",
                "durationHint": 10.0,
                "narrativeText": "The harbour wakes.",
                "imageLocations": ["img/intro.png", "img/unused.png"]
            },
            {
                "group_id": "outro",
                "audio": "https://example.com/outro.mp3",
                "subtitle": "outro.srt",
                "images": ["img/outro.png"]
            }
        ]
    }"#;

    #[test]
    fn parses_camel_and_snake_case_fields() {
        let manifest = Manifest::from_json(JSON).unwrap();
        assert_eq!(manifest.scenes.len(), 2);
        let intro = &manifest.scenes[0];
        assert_eq!(intro.group_id, "intro");
        assert_eq!(intro.duration_hint, 10.0);
        assert_eq!(intro.images.len(), 2);
        let outro = &manifest.scenes[1];
        assert_eq!(outro.duration_hint, 0.0);
        assert_eq!(outro.subtitle.as_deref(), Some("outro.srt"));
        assert!(outro.narrative_text.is_none());
    }

    #[test]
    fn loads_yaml_and_resolves_output_against_manifest_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reel.yaml");
        fs::write(
            &path,
            "output: final.mp4\nscenes:\n  - group_id: a\n    audio: a.mp3\n    images: [a.png]\n",
        )
        .unwrap();
        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.base_dir, dir.path());
        assert_eq!(manifest.output_path().unwrap(), dir.path().join("final.mp4"));
    }

    #[test]
    fn rejects_empty_scene_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reel.json");
        fs::write(&path, r#"{"scenes": []}"#).unwrap();
        assert!(Manifest::load(&path).is_err());
    }

    #[test]
    fn finds_scenes_by_id_or_position() {
        let manifest = Manifest::from_json(JSON).unwrap();
        assert_eq!(manifest.find_scene("outro").unwrap().0, 1);
        assert_eq!(manifest.find_scene("1").unwrap().1.group_id, "intro");
        assert!(manifest.find_scene("0").is_none());
        assert!(manifest.find_scene("missing").is_none());
    }
}
