// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::info;

use crate::{
  catalog::ClassCatalog,
  model::Detection,
  output::{Overlay, Render, RenderError},
};

pub struct SaveImageFileOutput {
  path: PathBuf,
  label_enabled: bool,
  overlay: Overlay,
}

impl SaveImageFileOutput {
  pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, RenderError> {
    Ok(Self {
      path: path.as_ref().to_path_buf(),
      label_enabled: true,
      overlay: Overlay::new()?,
    })
  }

  pub fn with_label(mut self, label_enabled: bool) -> Self {
    self.label_enabled = label_enabled;
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn save_image(&self, image: &RgbImage) -> Result<(), RenderError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(&self.path)?;
    info!("保存图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render for SaveImageFileOutput {
  type Error = RenderError;

  fn render_result(
    &self,
    mut image: RgbImage,
    detections: &[Detection],
    catalog: &ClassCatalog,
  ) -> Result<(), Self::Error> {
    self
      .overlay
      .annotate(&mut image, detections, catalog, self.label_enabled)?;
    self.save_image(&image)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_save_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/out/result.png");
    let output = SaveImageFileOutput::new(&path).unwrap().with_label(false);

    let detections = [Detection {
      bbox: [1.0, 1.0, 4.0, 4.0],
      class_index: 0,
      score: 0.3,
    }];
    let catalog = ClassCatalog::from(vec!["cat".to_string()]);
    output
      .render_result(RgbImage::new(8, 8), &detections, &catalog)
      .unwrap();

    let saved = image::open(&path).unwrap().to_rgb8();
    assert_eq!(saved.dimensions(), (8, 8));
    assert_eq!(saved.get_pixel(1, 1).0, [255, 0, 0]);
  }

  #[test]
  fn test_unwritable_path_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    // 父路径是一个普通文件，无法创建目录
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();
    let output = SaveImageFileOutput::new(blocker.join("result.png")).unwrap();

    let result = output.render_result(RgbImage::new(4, 4), &[], &ClassCatalog::default());
    assert!(matches!(result, Err(RenderError::IoError(_))));
  }
}
