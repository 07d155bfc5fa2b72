//! Whole-manifest rendering: every scene in order, then concatenation.

mod report;

use std::path::{Path, PathBuf};

use crate::reel::assets::{AssetRef, AssetResolver};
use crate::reel::compose::{ResolvedScene, SceneComposer, SceneVideoSegment};
use crate::reel::concat::{FinalVideo, SegmentConcatenator};
use crate::reel::config::ReelConfig;
use crate::reel::error::{ReelError, ReelResult};
use crate::reel::logging::log_event;
use crate::reel::manifest::{Manifest, SceneInput};
use crate::reel::support::ffmpeg::FfmpegRunner;
use crate::ui::prelude::Level;

pub(crate) use report::{ReportLine, emit_report, emit_summary};

const MAX_TOKEN_ID_CHARS: usize = 32;

/// File-name-safe form of a group id.
pub fn sanitize_id(group_id: &str) -> String {
    let sanitized: String = group_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_TOKEN_ID_CHARS)
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "scene".to_string()
    } else {
        sanitized
    }
}

/// File-name token for one scene attempt: `<order>-<group id>-<random hex>`.
pub fn scene_token(order: usize, group_id: &str) -> String {
    format!(
        "{:03}-{}-{:08x}",
        order + 1,
        sanitize_id(group_id),
        rand::random::<u32>()
    )
}

pub struct ReelPipeline<'a> {
    runner: &'a dyn FfmpegRunner,
    config: &'a ReelConfig,
    work_dir: PathBuf,
    verbose: bool,
}

impl<'a> ReelPipeline<'a> {
    pub fn new(runner: &'a dyn FfmpegRunner, config: &'a ReelConfig, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            config,
            work_dir: work_dir.into(),
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Render every scene of `manifest` and join them into `output`.
    ///
    /// The first failing scene aborts the run; segments already produced stay
    /// on disk.
    pub async fn render(&self, manifest: &Manifest, output: &Path) -> ReelResult<FinalVideo> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let mut resolver = AssetResolver::new(&self.work_dir);
        let mut segments = Vec::with_capacity(manifest.scenes.len());

        log_event(
            Level::Info,
            "reel.render.start",
            format!(
                "Rendering {} scenes from {}",
                manifest.scenes.len(),
                manifest.title.as_deref().unwrap_or("manifest")
            ),
        );

        for (order, scene) in manifest.scenes.iter().enumerate() {
            let token = scene_token(order, &scene.group_id);
            let segment_path = self.work_dir.join(format!("{token}.mp4"));
            let result = self
                .render_scene_with(&mut resolver, manifest, order, scene, &token, &segment_path)
                .await;
            self.release_assets(&mut resolver);
            segments.push(result?);
        }

        let final_video = SegmentConcatenator::new(self.runner, &self.work_dir)
            .with_timeout(self.config.ffmpeg_timeout())
            .verbose(self.verbose)
            .concat(segments, output)
            .await?;

        if !self.config.keep_segments {
            for segment in &final_video.segments {
                let _ = tokio::fs::remove_file(&segment.path).await;
            }
        }

        Ok(final_video)
    }

    /// Render one scene to `output` without concatenating.
    pub async fn render_scene(
        &self,
        manifest: &Manifest,
        order: usize,
        output: &Path,
    ) -> ReelResult<SceneVideoSegment> {
        let scene = manifest
            .scenes
            .get(order)
            .ok_or_else(|| ReelError::scene(&format!("#{}", order + 1), "no such scene"))?;
        tokio::fs::create_dir_all(&self.work_dir).await?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut resolver = AssetResolver::new(&self.work_dir);
        let token = scene_token(order, &scene.group_id);
        let result = self
            .render_scene_with(&mut resolver, manifest, order, scene, &token, output)
            .await;
        self.release_assets(&mut resolver);
        result
    }

    async fn render_scene_with(
        &self,
        resolver: &mut AssetResolver,
        manifest: &Manifest,
        order: usize,
        scene: &SceneInput,
        token: &str,
        output: &Path,
    ) -> ReelResult<SceneVideoSegment> {
        let resolved = self
            .resolve_scene(resolver, &manifest.base_dir, order, scene, token)
            .await?;

        SceneComposer::new(self.runner, self.config, &self.work_dir)
            .verbose(self.verbose)
            .compose(scene, &resolved, output)
            .await
    }

    async fn resolve_scene(
        &self,
        resolver: &mut AssetResolver,
        base_dir: &Path,
        order: usize,
        scene: &SceneInput,
        token: &str,
    ) -> ReelResult<ResolvedScene> {
        let label = scene.label();
        let image_location = scene
            .images
            .first()
            .ok_or_else(|| ReelError::scene(label, "no image locations"))?;
        if scene.images.len() > 1 {
            log_event(
                Level::Debug,
                "reel.render.extra_images",
                format!(
                    "Scene '{}' lists {} images; only the first is used",
                    label,
                    scene.images.len()
                ),
            );
        }

        let audio = resolve_location(resolver, label, &scene.audio, base_dir, &format!("{token}-audio")).await?;
        let image = resolve_location(resolver, label, image_location, base_dir, &format!("{token}-image")).await?;
        let subtitle = match &scene.subtitle {
            Some(location) if !location.trim().is_empty() => Some(
                resolve_location(resolver, label, location, base_dir, &format!("{token}-subtitle")).await?,
            ),
            _ => None,
        };

        Ok(ResolvedScene {
            order,
            token: token.to_string(),
            audio,
            image,
            subtitle,
        })
    }

    fn release_assets(&self, resolver: &mut AssetResolver) {
        if self.config.keep_segments {
            return;
        }
        let count = resolver.created_files().len();
        resolver.cleanup();
        if count > 0 {
            log_event(
                Level::Debug,
                "reel.render.assets_removed",
                format!("Removed {count} resolved asset files"),
            );
        }
    }
}

async fn resolve_location(
    resolver: &mut AssetResolver,
    label: &str,
    location: &str,
    base_dir: &Path,
    stem: &str,
) -> ReelResult<PathBuf> {
    let asset = AssetRef::parse(location, base_dir).map_err(|err| in_scene(label, err))?;
    let path = resolver
        .resolve(&asset, stem)
        .await
        .map_err(|err| in_scene(label, err))?;
    log_event(
        Level::Debug,
        "reel.render.asset",
        format!("{} -> {}", asset.describe(), path.display()),
    );
    Ok(path)
}

/// Attach the scene label to errors that do not already carry one.
fn in_scene(label: &str, err: ReelError) -> ReelError {
    match err {
        ReelError::MissingAsset { .. } | ReelError::Scene { .. } => err,
        other => ReelError::scene(label, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reel::support::testing::ScriptedRunner;
    use std::fs;

    fn write(dir: &Path, name: &str) {
        fs::write(dir.join(name), name).unwrap();
    }

    fn scene(id: &str, audio: &str, image: &str, text: &str) -> SceneInput {
        SceneInput {
            group_id: id.to_string(),
            title: String::new(),
            audio: audio.to_string(),
            duration_hint: 3.0,
            narrative_text: Some(text.to_string()),
            subtitle: None,
            images: vec![image.to_string()],
        }
    }

    fn manifest(dir: &Path, scenes: Vec<SceneInput>) -> Manifest {
        Manifest {
            title: Some("test".to_string()),
            output: None,
            scenes,
            base_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn tokens_are_ordered_sanitized_and_unique() {
        let a = scene_token(0, "intro scene/1");
        let b = scene_token(0, "intro scene/1");
        assert!(a.starts_with("001-intro_scene_1-"), "{a}");
        assert_eq!(a.len(), "001-intro_scene_1-".len() + 8);
        assert_ne!(a, b);
        assert!(scene_token(11, "").starts_with("012-scene-"));
        assert!(scene_token(0, "???").starts_with("001-scene-"));
    }

    #[tokio::test]
    async fn renders_scenes_in_order_and_cleans_up_segments() {
        let assets = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        for name in ["a.mp3", "b.mp3", "c.mp3", "img.png"] {
            write(assets.path(), name);
        }
        let manifest = manifest(
            assets.path(),
            vec![
                scene("first", "a.mp3", "img.png", "Scene one speaks."),
                scene("second", "b.mp3", "img.png", "Scene two speaks."),
                scene("third", "c.mp3", "img.png", "Scene three speaks."),
            ],
        );
        let runner = ScriptedRunner::new().probing(4.0);
        let config = ReelConfig::default();
        let pipeline = ReelPipeline::new(&runner, &config, work.path());
        let output = assets.path().join("final.mp4");

        let video = pipeline.render(&manifest, &output).await.unwrap();

        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "segment:a.mp3|segment:b.mp3|segment:c.mp3"
        );
        let ids: Vec<_> = video.segments.iter().map(|s| s.group_id.as_str()).collect();
        assert_eq!(ids, ["first", "second", "third"]);
        assert_eq!(video.total_duration(), 12.0);
        assert_eq!(runner.records().len(), 4);
        assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_image_stops_before_later_scenes() {
        let assets = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        for name in ["a.mp3", "b.mp3", "c.mp3", "img.png"] {
            write(assets.path(), name);
        }
        let manifest = manifest(
            assets.path(),
            vec![
                scene("first", "a.mp3", "img.png", "One."),
                scene("second", "b.mp3", "missing.png", "Two."),
                scene("third", "c.mp3", "img.png", "Three."),
            ],
        );
        let runner = ScriptedRunner::new().probing(2.0);
        let config = ReelConfig::default();
        let pipeline = ReelPipeline::new(&runner, &config, work.path());

        let err = pipeline
            .render(&manifest, &assets.path().join("final.mp4"))
            .await
            .unwrap_err();

        match err {
            ReelError::MissingAsset { scene, path } => {
                assert_eq!(scene, "second");
                assert_eq!(path, assets.path().join("missing.png"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        let records = runner.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].args.iter().any(|a| a.ends_with("a.mp3")));
        assert!(!records.iter().any(|r| r.args.iter().any(|a| a.ends_with("c.mp3"))));
        // The first segment is left for inspection
        let leftovers: Vec<_> = fs::read_dir(work.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers.len(), 1);
        assert!(leftovers[0].starts_with("001-first-"));
        assert!(!assets.path().join("final.mp4").exists());
    }

    #[tokio::test]
    async fn embedded_assets_are_removed_after_each_scene() {
        let assets = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write(assets.path(), "img.png");
        let manifest = manifest(
            assets.path(),
            vec![scene(
                "inline",
                "data:audio/mpeg;base64,aGVsbG8=",
                "img.png",
                "Inline audio.",
            )],
        );
        let runner = ScriptedRunner::new().probing(1.5).watching(work.path());
        let config = ReelConfig {
            keep_segments: false,
            ..ReelConfig::default()
        };
        let pipeline = ReelPipeline::new(&runner, &config, work.path());
        let output = assets.path().join("one.mp4");

        let segment = pipeline.render_scene(&manifest, 0, &output).await.unwrap();

        assert_eq!(segment.duration_seconds, 1.5);
        let watched = &runner.records()[0].watched;
        assert!(
            watched
                .iter()
                .any(|(name, body)| name.ends_with("-audio.mp3") && body == "hello")
        );
        assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
        assert!(output.exists());
    }

    #[tokio::test]
    async fn keep_segments_leaves_work_files() {
        let assets = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        for name in ["a.mp3", "img.png"] {
            write(assets.path(), name);
        }
        let manifest = manifest(assets.path(), vec![scene("only", "a.mp3", "img.png", "Hi.")]);
        let runner = ScriptedRunner::new().probing(2.0);
        let config = ReelConfig {
            keep_segments: true,
            ..ReelConfig::default()
        };
        let pipeline = ReelPipeline::new(&runner, &config, work.path());

        let video = pipeline
            .render(&manifest, &assets.path().join("final.mp4"))
            .await
            .unwrap();
        assert!(video.segments[0].path.exists());
    }

    #[tokio::test]
    async fn unresolvable_asset_names_its_scene() {
        let assets = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        write(assets.path(), "img.png");
        let manifest = manifest(
            assets.path(),
            vec![scene(
                "harbour-dawn",
                "data:audio/mpeg;base64,@@@",
                "img.png",
                "Broken audio.",
            )],
        );
        let runner = ScriptedRunner::new().probing(2.0);
        let config = ReelConfig::default();
        let pipeline = ReelPipeline::new(&runner, &config, work.path());

        let err = pipeline
            .render(&manifest, &assets.path().join("final.mp4"))
            .await
            .unwrap_err();

        match &err {
            ReelError::Scene { scene, message } => {
                assert_eq!(scene, "harbour-dawn");
                assert!(message.contains("data:audio/mpeg;base64,@@@"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("harbour-dawn"));
        assert!(runner.records().is_empty());
    }

    #[tokio::test]
    async fn scene_without_images_is_rejected() {
        let assets = tempfile::tempdir().unwrap();
        write(assets.path(), "a.mp3");
        let mut only = scene("bare", "a.mp3", "x.png", "Text.");
        only.images.clear();
        let manifest = manifest(assets.path(), vec![only]);
        let runner = ScriptedRunner::new().probing(2.0);
        let config = ReelConfig::default();
        let pipeline = ReelPipeline::new(&runner, &config, assets.path().join("work"));

        let err = pipeline
            .render_scene(&manifest, 0, &assets.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no image locations"));
        assert!(runner.records().is_empty());
    }
}
