// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/torchscript.rs - TorchScript 模型后端
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

use tch::{CModule, Cuda, IValue, Kind, TchError};
use tracing::debug;

use crate::{
  device::{Device, InferenceConfig, Precision},
  model::{Artifact, IndexTensor, LoadArtifact, LoadError, OutputValue},
  tensor::{ModelInputBatch, Tensor, TensorData},
};

/// libtorch 是否检测到可用的 CUDA 设备
pub fn accelerator_available() -> bool {
  let available = Cuda::is_available();
  debug!(
    "CUDA 可用: {} (设备数量: {})",
    available,
    if available { Cuda::device_count() } else { 0 }
  );
  available
}

fn tch_device(device: Device) -> tch::Device {
  match device {
    Device::Cpu => tch::Device::Cpu,
    Device::Cuda(index) => tch::Device::Cuda(index),
  }
}

fn tch_kind(precision: Precision) -> Kind {
  match precision {
    Precision::Full => Kind::Float,
    Precision::Half => Kind::Half,
  }
}

pub struct TorchScriptArtifact {
  module: CModule,
  device: Device,
  precision: Precision,
}

impl LoadArtifact for TorchScriptArtifact {
  fn load(path: &Path, config: &InferenceConfig) -> Result<Self, LoadError> {
    let mut module = CModule::load_on_device(path, tch_device(config.device))
      .map_err(|e| LoadError::new(path, e.to_string()))?;
    module.to(tch_device(config.device), tch_kind(config.precision), false);
    module.set_eval();

    Ok(Self {
      module,
      device: config.device,
      precision: config.precision,
    })
  }
}

impl Artifact for TorchScriptArtifact {
  type Input = Vec<tch::Tensor>;
  type Output = IValue;
  type Error = TchError;

  fn device(&self) -> Device {
    self.device
  }

  fn precision(&self) -> Precision {
    self.precision
  }

  fn prepare(&self, batch: &ModelInputBatch) -> Result<Self::Input, Self::Error> {
    batch.tensors().iter().map(to_tch_tensor).collect()
  }

  fn forward(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    // 模型的输入是 List[Tensor]，浅拷贝只共享存储，不复制数据
    let images = input.iter().map(tch::Tensor::shallow_clone).collect();
    let output = tch::no_grad(|| self.module.forward_is(&[IValue::TensorList(images)]))?;
    if let Device::Cuda(index) = self.device {
      // CUDA 调用是异步的，等待计算完成后再返回
      Cuda::synchronize(index as i64);
    }
    Ok(output)
  }

  fn decode(&self, output: Self::Output) -> Result<OutputValue, Self::Error> {
    from_ivalue(output)
  }
}

fn to_tch_tensor(tensor: &Tensor) -> Result<tch::Tensor, TchError> {
  let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
  let device = tch_device(tensor.device().unwrap_or(Device::Cpu));
  let host = match tensor.data() {
    TensorData::Full(data) => tch::Tensor::from_slice(&data[..]),
    TensorData::Half(data) => tch::Tensor::from_slice(&data[..]),
  };
  Ok(host.f_view(shape.as_slice())?.f_to_device(device)?)
}

fn from_tch_tensor(tensor: &tch::Tensor) -> Result<OutputValue, TchError> {
  let shape: Vec<usize> = tensor.size().iter().map(|&d| d as usize).collect();
  let host = tensor.f_to_device(tch::Device::Cpu)?.f_reshape([-1])?;

  match tensor.kind() {
    Kind::Float | Kind::Double | Kind::Half | Kind::BFloat16 => {
      let data = Vec::<f32>::try_from(&host.f_to_kind(Kind::Float)?)?;
      let converted = Tensor::from_f32(data, &shape)
        .map_err(|e| TchError::Convert(e.to_string()))?
        .to_device(Device::Cpu);
      Ok(OutputValue::Tensor(converted))
    }
    _ => {
      let data = Vec::<i64>::try_from(&host.f_to_kind(Kind::Int64)?)?;
      Ok(OutputValue::IndexTensor(IndexTensor {
        data: data.into_boxed_slice(),
        shape,
      }))
    }
  }
}

fn from_ivalue(value: IValue) -> Result<OutputValue, TchError> {
  let converted = match value {
    IValue::None => OutputValue::None,
    IValue::Bool(v) => OutputValue::Bool(v),
    IValue::Int(v) => OutputValue::Int(v),
    IValue::Double(v) => OutputValue::Double(v),
    IValue::String(v) => OutputValue::String(v),
    IValue::Tensor(t) => from_tch_tensor(&t)?,
    IValue::Tuple(items) => OutputValue::Tuple(from_ivalues(items)?),
    IValue::GenericList(items) => OutputValue::List(from_ivalues(items)?),
    IValue::TensorList(items) => OutputValue::List(
      items
        .iter()
        .map(from_tch_tensor)
        .collect::<Result<Vec<_>, _>>()?,
    ),
    IValue::IntList(items) => OutputValue::List(items.into_iter().map(OutputValue::Int).collect()),
    IValue::DoubleList(items) => {
      OutputValue::List(items.into_iter().map(OutputValue::Double).collect())
    }
    IValue::BoolList(items) => OutputValue::List(items.into_iter().map(OutputValue::Bool).collect()),
    IValue::StringList(items) => {
      OutputValue::List(items.into_iter().map(OutputValue::String).collect())
    }
    IValue::GenericDict(items) => OutputValue::Dict(
      items
        .into_iter()
        .map(|(k, v)| Ok((from_ivalue(k)?, from_ivalue(v)?)))
        .collect::<Result<Vec<_>, TchError>>()?,
    ),
    IValue::Object(_) => {
      return Err(TchError::Convert(
        "模型输出中包含不支持的 Object 类型".to_string(),
      ));
    }
  };
  Ok(converted)
}

fn from_ivalues(items: Vec<IValue>) -> Result<Vec<OutputValue>, TchError> {
  items.into_iter().map(from_ivalue).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_half_output_decodes_as_full_precision() {
    let half = tch::Tensor::from_slice(&[0.25f32, 0.5, 0.75, 1.0])
      .reshape([1, 4])
      .to_kind(Kind::Half);
    let converted = from_tch_tensor(&half).unwrap();
    match converted {
      OutputValue::Tensor(tensor) => {
        assert_eq!(tensor.precision(), Precision::Full);
        assert_eq!(tensor.shape(), &[1, 4]);
        assert_eq!(tensor.to_f32_vec(), vec![0.25, 0.5, 0.75, 1.0]);
      }
      other => panic!("unexpected {}", other.kind()),
    }
  }

  #[test]
  fn test_labels_decode_as_index_tensor() {
    let labels = tch::Tensor::from_slice(&[3i64, 0]);
    assert_eq!(
      from_tch_tensor(&labels).unwrap(),
      OutputValue::IndexTensor(IndexTensor {
        data: vec![3, 0].into_boxed_slice(),
        shape: vec![2],
      })
    );
  }

  #[test]
  fn test_to_tch_tensor_keeps_shape_and_kind() {
    let tensor = Tensor::from_f32(vec![0.5; 12], &[3, 2, 2])
      .unwrap()
      .prepare_for(&InferenceConfig::default())
      .to_precision(Precision::Half);
    let converted = to_tch_tensor(&tensor).unwrap();
    assert_eq!(converted.size(), vec![3, 2, 2]);
    assert_eq!(converted.kind(), Kind::Half);
    assert_eq!(converted.device(), tch::Device::Cpu);
  }
}
