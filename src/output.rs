// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output.rs - 输出定义
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

use std::path::Path;

use image::RgbImage;
use thiserror::Error;

use crate::{catalog::CatalogError, model::Detection};

pub use crate::catalog::ClassCatalog;

pub trait Render {
  type Error;
  fn render_result(
    &self,
    image: RgbImage,
    detections: &[Detection],
    catalog: &ClassCatalog,
  ) -> Result<(), Self::Error>;
}

pub mod draw;
mod save_image_file;

pub use self::draw::Overlay;
pub use self::save_image_file::SaveImageFileOutput;

#[derive(Error, Debug)]
pub enum RenderError {
  #[error("无法加载字体: {0}")]
  Font(#[from] ab_glyph::InvalidFont),
  #[error("检测结果与类别表不匹配: {0}")]
  Catalog(#[from] CatalogError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像保存错误: {0}")]
  Save(#[from] image::ImageError),
}

/// 在图像上绘制检测结果并保存到 `output_path`
pub fn render<P: AsRef<Path>>(
  image: RgbImage,
  detections: &[Detection],
  catalog: &ClassCatalog,
  output_path: P,
  label_enabled: bool,
) -> Result<(), RenderError> {
  SaveImageFileOutput::new(output_path)?
    .with_label(label_enabled)
    .render_result(image, detections, catalog)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_render_without_label() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result.jpg");
    let detections = [Detection {
      bbox: [2.0, 3.0, 10.0, 6.0],
      class_index: 0,
      score: 0.5,
    }];
    let catalog = ClassCatalog::from(vec!["dog".to_string()]);

    render(RgbImage::new(16, 16), &detections, &catalog, &path, false).unwrap();

    let saved = image::open(&path).unwrap().to_rgb8();
    assert_eq!(saved.dimensions(), (16, 16));
  }

  #[test]
  fn test_render_unknown_extension_is_save_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result.unknown");
    let result = render(RgbImage::new(4, 4), &[], &ClassCatalog::default(), &path, true);
    assert!(matches!(result, Err(RenderError::Save(_))));
  }
}
