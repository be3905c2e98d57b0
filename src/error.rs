// 该文件是 Shanan （山南西风） 项目的一部分。
// src/error.rs - 流水线错误分类
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

use thiserror::Error;

use crate::{
  catalog::CatalogError,
  input::DecodeError,
  model::{InferenceError, LoadError},
  output::RenderError,
};

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("配置错误: {0}")]
  Config(#[from] CatalogError),
  #[error(transparent)]
  Load(#[from] LoadError),
  #[error("输入错误: {0}")]
  Decode(#[from] DecodeError),
  #[error("推理错误: {0}")]
  Inference(#[from] InferenceError),
  #[error("渲染错误: {0}")]
  Render(#[from] RenderError),
}

impl PipelineError {
  /// 进程退出码，成功为 0
  pub fn exit_code(&self) -> u8 {
    match self {
      PipelineError::Config(_) => 2,
      PipelineError::Load(_) => 3,
      PipelineError::Decode(_) => 4,
      PipelineError::Inference(_) => 5,
      PipelineError::Render(_) => 6,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::PathBuf;

  #[test]
  fn test_exit_codes_are_non_zero() {
    let errors = [
      PipelineError::from(CatalogError::Empty(PathBuf::from("coco.names"))),
      PipelineError::from(LoadError::new("yolov5s.torchscript.pt", "missing")),
      PipelineError::from(InferenceError::EmptyBatch),
    ];
    let codes: Vec<u8> = errors.iter().map(PipelineError::exit_code).collect();
    assert_eq!(codes, vec![2, 3, 5]);
  }
}
