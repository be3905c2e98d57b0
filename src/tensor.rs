// 该文件是 Shanan （山南西风） 项目的一部分。
// src/tensor.rs - 张量与模型输入批次
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

use half::f16;
use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;

use crate::device::{Device, InferenceConfig, Precision};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
  #[error("数据长度不匹配: 形状 {shape:?} 期望长度 {expected}, 实际长度 {actual}")]
  ShapeMismatch {
    shape: Vec<usize>,
    expected: usize,
    actual: usize,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
  Full(Box<[f32]>),
  Half(Box<[f16]>),
}

impl TensorData {
  fn len(&self) -> usize {
    match self {
      TensorData::Full(data) => data.len(),
      TensorData::Half(data) => data.len(),
    }
  }
}

/// 拥有连续内存的浮点张量，带有形状、精度和设备标记
///
/// 设备为 `None` 表示尚未分配到任何执行设备（预处理的输出）。
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
  data: TensorData,
  shape: Vec<usize>,
  device: Option<Device>,
}

impl Tensor {
  pub fn from_f32(data: Vec<f32>, shape: &[usize]) -> Result<Self, TensorError> {
    Self::new(TensorData::Full(data.into_boxed_slice()), shape)
  }

  pub fn new(data: TensorData, shape: &[usize]) -> Result<Self, TensorError> {
    let expected = shape.iter().product::<usize>();
    if data.len() != expected {
      return Err(TensorError::ShapeMismatch {
        shape: shape.to_vec(),
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      data,
      shape: shape.to_vec(),
      device: None,
    })
  }

  /// [0, 1) 均匀分布的随机张量
  pub fn rand(shape: &[usize], seed: u64) -> Self {
    let mut rng = StdRng::seed_from_u64(seed);
    let numel = shape.iter().product::<usize>();
    let data: Vec<f32> = (0..numel).map(|_| rng.r#gen::<f32>()).collect();
    Self {
      data: TensorData::Full(data.into_boxed_slice()),
      shape: shape.to_vec(),
      device: None,
    }
  }

  pub fn shape(&self) -> &[usize] {
    &self.shape
  }

  pub fn numel(&self) -> usize {
    self.data.len()
  }

  pub fn precision(&self) -> Precision {
    match self.data {
      TensorData::Full(_) => Precision::Full,
      TensorData::Half(_) => Precision::Half,
    }
  }

  pub fn device(&self) -> Option<Device> {
    self.device
  }

  pub fn data(&self) -> &TensorData {
    &self.data
  }

  pub fn to_device(mut self, device: Device) -> Self {
    self.device = Some(device);
    self
  }

  pub fn to_precision(self, precision: Precision) -> Self {
    let data = match (self.data, precision) {
      (TensorData::Full(data), Precision::Half) => {
        TensorData::Half(data.iter().map(|&v| f16::from_f32(v)).collect())
      }
      (TensorData::Half(data), Precision::Full) => {
        TensorData::Full(data.iter().map(|v| v.to_f32()).collect())
      }
      (data, _) => data,
    };
    Self { data, ..self }
  }

  /// 按推理配置设置设备与精度
  pub fn prepare_for(self, config: &InferenceConfig) -> Self {
    self
      .to_device(config.device)
      .to_precision(config.precision)
  }

  pub fn to_f32_vec(&self) -> Vec<f32> {
    match &self.data {
      TensorData::Full(data) => data.to_vec(),
      TensorData::Half(data) => data.iter().map(|v| v.to_f32()).collect(),
    }
  }
}

/// 模型输入批次，本项目中长度固定为 1
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInputBatch {
  tensors: Vec<Tensor>,
}

impl ModelInputBatch {
  pub fn single(tensor: Tensor) -> Self {
    Self {
      tensors: vec![tensor],
    }
  }

  pub fn tensors(&self) -> &[Tensor] {
    &self.tensors
  }

  pub fn len(&self) -> usize {
    self.tensors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tensors.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_shape_mismatch() {
    let result = Tensor::from_f32(vec![0.0; 5], &[3, 2]);
    assert_eq!(
      result,
      Err(TensorError::ShapeMismatch {
        shape: vec![3, 2],
        expected: 6,
        actual: 5
      })
    );
  }

  #[test]
  fn test_rand_in_unit_range() {
    let tensor = Tensor::rand(&[3, 4, 5], 7);
    assert_eq!(tensor.numel(), 60);
    assert!(tensor.to_f32_vec().iter().all(|v| (0.0..1.0).contains(v)));
    assert_eq!(tensor, Tensor::rand(&[3, 4, 5], 7));
  }

  #[test]
  fn test_prepare_for_accelerator() {
    let config = InferenceConfig::for_device(Device::Cuda(0));
    let tensor = Tensor::from_f32(vec![0.0, 0.5, 1.0], &[3])
      .unwrap()
      .prepare_for(&config);
    assert_eq!(tensor.device(), Some(Device::Cuda(0)));
    assert_eq!(tensor.precision(), Precision::Half);
    // 这些值在半精度下可以精确表示
    assert_eq!(tensor.to_f32_vec(), vec![0.0, 0.5, 1.0]);
  }

  #[test]
  fn test_prepare_for_cpu_keeps_full_precision() {
    let tensor = Tensor::from_f32(vec![0.25; 4], &[2, 2])
      .unwrap()
      .to_precision(Precision::Half)
      .prepare_for(&InferenceConfig::default());
    assert_eq!(tensor.device(), Some(Device::Cpu));
    assert_eq!(tensor.precision(), Precision::Full);
  }
}
