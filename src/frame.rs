// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - HWC / CHW 帧定义
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

use crate::tensor::{Tensor, TensorError};

pub const RGB_CHANNELS: usize = 3;

/// 8 位像素到单位区间的缩放系数，与模型训练时的归一化一致
pub const PIXEL_SCALE: f32 = 1.0 / 255.0;

fn check_len(data: &[f32], height: usize, width: usize) -> Result<(), TensorError> {
  let expected = RGB_CHANNELS * height * width;
  if data.len() != expected {
    return Err(TensorError::ShapeMismatch {
      shape: vec![height, width, RGB_CHANNELS],
      expected,
      actual: data.len(),
    });
  }
  Ok(())
}

/// 交错排列 (H, W, C) 的浮点帧，解码器的原生顺序
#[derive(Debug, Clone, PartialEq)]
pub struct InterleavedFrame {
  data: Box<[f32]>,
  height: usize,
  width: usize,
}

impl InterleavedFrame {
  pub fn from_vec(data: Vec<f32>, height: usize, width: usize) -> Result<Self, TensorError> {
    check_len(&data, height, width)?;
    Ok(Self {
      data: data.into_boxed_slice(),
      height,
      width,
    })
  }

  /// 将 8 位像素缩放到 [0, 1]
  pub fn from_pixels(pixels: &[u8], height: usize, width: usize) -> Result<Self, TensorError> {
    let data = pixels.iter().map(|&v| v as f32 * PIXEL_SCALE).collect();
    Self::from_vec(data, height, width)
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn as_hwc(&self) -> &[f32] {
    &self.data
  }
}

/// 通道优先 (C, H, W) 的浮点帧，模型需要的顺序
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarFrame {
  data: Box<[f32]>,
  height: usize,
  width: usize,
}

impl PlanarFrame {
  pub fn from_vec(data: Vec<f32>, height: usize, width: usize) -> Result<Self, TensorError> {
    check_len(&data, height, width)?;
    Ok(Self {
      data: data.into_boxed_slice(),
      height,
      width,
    })
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn as_chw(&self) -> &[f32] {
    &self.data
  }

  pub fn into_tensor(self) -> Tensor {
    let shape = [RGB_CHANNELS, self.height, self.width];
    // 长度已在构造时校验
    match Tensor::from_f32(self.data.into_vec(), &shape) {
      Ok(tensor) => tensor,
      Err(e) => unreachable!("{}", e),
    }
  }
}

impl From<&InterleavedFrame> for PlanarFrame {
  fn from(frame: &InterleavedFrame) -> Self {
    let (height, width, channels) = (frame.height(), frame.width(), frame.channels());
    let src = frame.as_hwc();
    let mut data = vec![0f32; src.len()];

    for c in 0..channels {
      for h in 0..height {
        for w in 0..width {
          data[c * height * width + h * width + w] = src[h * width * channels + w * channels + c];
        }
      }
    }

    Self {
      data: data.into_boxed_slice(),
      height,
      width,
    }
  }
}

impl From<&PlanarFrame> for InterleavedFrame {
  fn from(frame: &PlanarFrame) -> Self {
    let (height, width, channels) = (frame.height(), frame.width(), frame.channels());
    let src = frame.as_chw();
    let mut data = vec![0f32; src.len()];

    for h in 0..height {
      for w in 0..width {
        for c in 0..channels {
          data[h * width * channels + w * channels + c] = src[c * height * width + h * width + w];
        }
      }
    }

    Self {
      data: data.into_boxed_slice(),
      height,
      width,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn synthetic(height: usize, width: usize) -> InterleavedFrame {
    let data = (0..height * width * RGB_CHANNELS)
      .map(|i| i as f32 * 0.5)
      .collect();
    InterleavedFrame::from_vec(data, height, width).unwrap()
  }

  #[test]
  fn test_permutation_round_trip() {
    let hwc = synthetic(5, 7);
    let chw = PlanarFrame::from(&hwc);
    let back = InterleavedFrame::from(&chw);
    assert_eq!(back, hwc);
  }

  #[test]
  fn test_permutation_moves_channels_to_planes() {
    // 2x1 图像: 像素0 = (1,2,3), 像素1 = (4,5,6)
    let hwc = InterleavedFrame::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 1).unwrap();
    let chw = PlanarFrame::from(&hwc);
    assert_eq!(chw.as_chw(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
  }

  #[test]
  fn test_from_pixels_scale() {
    let frame = InterleavedFrame::from_pixels(&[0, 51, 255], 1, 1).unwrap();
    assert_eq!(frame.as_hwc(), &[0.0, 51.0 * PIXEL_SCALE, 255.0 * PIXEL_SCALE]);
    assert!((frame.as_hwc()[2] - 1.0).abs() <= f32::EPSILON);
  }

  #[test]
  fn test_into_tensor_shape() {
    let tensor = PlanarFrame::from(&synthetic(4, 6)).into_tensor();
    assert_eq!(tensor.shape(), &[3, 4, 6]);
    assert_eq!(tensor.device(), None);
  }

  #[test]
  fn test_length_check() {
    assert!(PlanarFrame::from_vec(vec![0.0; 10], 2, 2).is_err());
  }
}
