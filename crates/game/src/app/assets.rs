use std::path::{Path, PathBuf};

use image::ImageReader;
use skirmish_engine::{AssetError, AssetKind, AssetProvider, ImageHandle};
use tracing::debug;

pub(crate) struct LoadedImage {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) rgba: Vec<u8>,
}

/// Resolves art from PNG files under the asset directory. A stage folder
/// (`stage_2/boss.png`) wins over the shared fallback (`boss.png`).
pub(crate) struct PngAssetProvider {
    assets_dir: PathBuf,
    images: Vec<LoadedImage>,
}

impl PngAssetProvider {
    pub(crate) fn new(assets_dir: PathBuf) -> Self {
        Self {
            assets_dir,
            images: Vec::new(),
        }
    }

    /// Drops every image handed out so far. Old handles resolve to nothing.
    pub(crate) fn clear(&mut self) {
        self.images.clear();
    }

    pub(crate) fn image(&self, handle: ImageHandle) -> Option<&LoadedImage> {
        self.images.get(handle.0 as usize)
    }

    fn candidate_paths(&self, stage: Option<u32>, kind: AssetKind) -> Vec<PathBuf> {
        let file_name = format!("{}.png", kind.as_token());
        let mut candidates = Vec::with_capacity(2);
        if let Some(stage) = stage {
            candidates.push(
                self.assets_dir
                    .join(format!("stage_{stage}"))
                    .join(&file_name),
            );
        }
        candidates.push(self.assets_dir.join(file_name));
        candidates
    }
}

impl AssetProvider for PngAssetProvider {
    fn generate(
        &mut self,
        prompt: &str,
        kind: AssetKind,
    ) -> Result<Option<ImageHandle>, AssetError> {
        let stage = stage_from_prompt(prompt);
        let Some(path) = self
            .candidate_paths(stage, kind)
            .into_iter()
            .find(|path| path.is_file())
        else {
            debug!(prompt, kind = %kind, "asset_not_found");
            return Ok(None);
        };

        let image = load_image_rgba(&path).map_err(|source| AssetError::Load {
            kind,
            location: path.display().to_string(),
            source,
        })?;
        let handle = ImageHandle(self.images.len() as u32);
        debug!(
            prompt,
            kind = %kind,
            path = %path.display(),
            width = image.width,
            height = image.height,
            "asset_loaded"
        );
        self.images.push(image);
        Ok(Some(handle))
    }
}

fn load_image_rgba(
    path: &Path,
) -> Result<LoadedImage, Box<dyn std::error::Error + Send + Sync>> {
    let decoded = ImageReader::open(path)?.decode()?;
    let image = decoded.to_rgba8();
    Ok(LoadedImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

/// Prompts look like `stage 3 boss`.
fn stage_from_prompt(prompt: &str) -> Option<u32> {
    let mut words = prompt.split_whitespace();
    match (words.next(), words.next()) {
        (Some("stage"), Some(number)) => number.parse().ok(),
        _ => None,
    }
}
