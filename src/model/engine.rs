// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/engine.rs - 推理引擎
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

use std::{path::Path, time::Duration};

use tracing::{debug, error, info};

use crate::{
  device::InferenceConfig,
  model::{Artifact, InferenceError, LoadArtifact, LoadError, ModelOutput, extract},
  tensor::{ModelInputBatch, Tensor},
  utils::timed,
};

const WARM_UP_SEED: u64 = 0x5348_414e;

/// 持有已加载模型的推理引擎，绑定一个设备与一种精度
pub struct InferenceEngine<A> {
  artifact: A,
  config: InferenceConfig,
}

impl<A: LoadArtifact> InferenceEngine<A> {
  pub fn load<P: AsRef<Path>>(path: P, config: InferenceConfig) -> Result<Self, LoadError> {
    let path = path.as_ref();
    info!(">>> 加载模型: {}", path.display());

    if !path.is_file() {
      error!(">>> 模型文件不存在: {}", path.display());
      return Err(LoadError::new(path, "文件不存在或不是普通文件"));
    }

    let artifact = A::load(path, &config).inspect_err(|e| error!(">>> 模型加载失败: {}", e))?;
    info!(">>> 模型加载完成 ({}, {})", artifact.device(), artifact.precision());
    Ok(Self::new(artifact, config))
  }
}

impl<A: Artifact> InferenceEngine<A> {
  pub fn new(artifact: A, config: InferenceConfig) -> Self {
    Self { artifact, config }
  }

  pub fn config(&self) -> &InferenceConfig {
    &self.config
  }

  pub fn artifact(&self) -> &A {
    &self.artifact
  }

  /// 用随机输入执行一次推理，吸收首次运行的初始化开销，结果丢弃
  pub fn warm_up(&self) -> Result<(), InferenceError> {
    info!(">>> 使用空白图像预热一次");
    let dummy = Tensor::rand(&self.config.warm_up_shape, WARM_UP_SEED).prepare_for(&self.config);
    let (result, elapsed) = timed(|| -> Result<_, InferenceError> {
      let input = self.prepare(&ModelInputBatch::single(dummy))?;
      self.infer(&input)
    });
    result?;
    debug!("预热完成，耗时: {:.2?}", elapsed);
    Ok(())
  }

  /// 校验批次并将其放到模型所在的设备上
  pub fn prepare(&self, batch: &ModelInputBatch) -> Result<A::Input, InferenceError> {
    self.check_batch(batch)?;
    self.artifact.prepare(batch).map_err(|e| {
      error!("输入迁移失败: {}", e);
      InferenceError::Runtime(e.to_string())
    })
  }

  /// 执行一次前向推理并解码输出
  pub fn infer(&self, input: &A::Input) -> Result<ModelOutput, InferenceError> {
    self.infer_timed(input).map(|(output, _)| output)
  }

  /// 同 [`Self::infer`]，额外返回仅包含前向推理本身的耗时
  pub fn infer_timed(&self, input: &A::Input) -> Result<(ModelOutput, Duration), InferenceError> {
    let (raw, elapsed) = timed(|| self.artifact.forward(input));
    let raw = raw.map_err(|e| {
      error!("推理失败: {}", e);
      InferenceError::Runtime(e.to_string())
    })?;
    let value = self
      .artifact
      .decode(raw)
      .map_err(|e| InferenceError::Runtime(e.to_string()))?;
    let output = extract(value, self.config.box_format)?;
    Ok((output, elapsed))
  }

  /// 每个输入张量的精度与设备都必须与模型一致
  fn check_batch(&self, batch: &ModelInputBatch) -> Result<(), InferenceError> {
    if batch.is_empty() {
      return Err(InferenceError::EmptyBatch);
    }

    let expected_device = self.artifact.device();
    let expected_precision = self.artifact.precision();
    for (index, tensor) in batch.tensors().iter().enumerate() {
      if tensor.precision() != expected_precision {
        return Err(InferenceError::PrecisionMismatch {
          index,
          expected: expected_precision,
          actual: tensor.precision(),
        });
      }
      if tensor.device() != Some(expected_device) {
        return Err(InferenceError::DeviceMismatch {
          index,
          expected: expected_device,
          actual: tensor.device(),
        });
      }
    }
    Ok(())
  }
}
