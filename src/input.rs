// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input.rs - 图像文件输入与预处理
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  frame::{InterleavedFrame, PlanarFrame},
  tensor::{Tensor, TensorError},
};

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("无法打开图像 {}: {source}", .path.display())]
  IoError {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("图像解码失败 {}: {source}", .path.display())]
  ImageLoadError {
    path: PathBuf,
    source: image::ImageError,
  },
  #[error("图像数据错误: {0}")]
  Layout(#[from] TensorError),
}

/// 预处理结果：原图用于渲染，张量用于推理
#[derive(Debug, Clone)]
pub struct PreparedImage {
  pub image: RgbImage,
  pub tensor: Tensor,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImagePreprocessor;

impl ImagePreprocessor {
  /// 解码图像，归一化到 [0, 1]，并重排为 (3, H, W)
  ///
  /// 返回的张量未绑定设备，设备与精度转换由调用方负责。
  pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<PreparedImage, DecodeError> {
    let path = path.as_ref();
    info!("读取图像: {}", path.display());

    let reader = ImageReader::open(path).map_err(|source| {
      error!("无法打开图像: {}", source);
      DecodeError::IoError {
        path: path.to_path_buf(),
        source,
      }
    })?;
    let reader = reader.with_guessed_format().map_err(|source| DecodeError::IoError {
      path: path.to_path_buf(),
      source,
    })?;
    let image = reader.decode().map_err(|source| {
      error!("图像解码失败: {}", source);
      DecodeError::ImageLoadError {
        path: path.to_path_buf(),
        source,
      }
    })?;

    let image = image.to_rgb8();
    let tensor = self.to_tensor(&image)?;
    Ok(PreparedImage { image, tensor })
  }

  pub fn to_tensor(&self, image: &RgbImage) -> Result<Tensor, DecodeError> {
    let (width, height) = image.dimensions();
    debug!("图像尺寸: {}x{}", width, height);

    let hwc = InterleavedFrame::from_pixels(image.as_raw(), height as usize, width as usize)?;
    let chw = PlanarFrame::from(&hwc);
    Ok(chw.into_tensor())
  }
}
