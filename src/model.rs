// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型
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

use thiserror::Error;

use crate::{
  device::{Device, InferenceConfig, Precision},
  tensor::{ModelInputBatch, Tensor},
};

/// 推理运行时加载的模型
///
/// 加载完成后模型不可变，所有推理都只借用 `&self`。
/// 一次推理分为三步：`prepare` 把输入放到执行设备上，`forward` 只做前向计算，
/// `decode` 把运行时的原生输出转换为 [`OutputValue`]。
pub trait Artifact {
  /// 已位于执行设备上的输入，可重复用于多次前向计算
  type Input;
  /// 运行时原生的输出
  type Output;
  type Error: std::fmt::Display;

  fn device(&self) -> Device;
  fn precision(&self) -> Precision;
  fn prepare(&self, batch: &ModelInputBatch) -> Result<Self::Input, Self::Error>;
  fn forward(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
  fn decode(&self, output: Self::Output) -> Result<OutputValue, Self::Error>;
}

pub trait LoadArtifact: Artifact + Sized {
  /// 反序列化模型，迁移到配置的设备与精度，并切换到推理模式
  fn load(path: &Path, config: &InferenceConfig) -> Result<Self, LoadError>;
}

/// 整数张量，用于类别标签等输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTensor {
  pub data: Box<[i64]>,
  pub shape: Vec<usize>,
}

/// 运行时返回的通用结构化结果
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
  None,
  Bool(bool),
  Int(i64),
  Double(f64),
  String(String),
  Tensor(Tensor),
  IndexTensor(IndexTensor),
  Tuple(Vec<OutputValue>),
  List(Vec<OutputValue>),
  Dict(Vec<(OutputValue, OutputValue)>),
}

impl OutputValue {
  pub fn kind(&self) -> &'static str {
    match self {
      OutputValue::None => "None",
      OutputValue::Bool(_) => "Bool",
      OutputValue::Int(_) => "Int",
      OutputValue::Double(_) => "Double",
      OutputValue::String(_) => "String",
      OutputValue::Tensor(_) => "Tensor",
      OutputValue::IndexTensor(_) => "IndexTensor",
      OutputValue::Tuple(_) => "Tuple",
      OutputValue::List(_) => "List",
      OutputValue::Dict(_) => "Dict",
    }
  }

  /// 按字符串键查找字典项
  pub fn get(&self, key: &str) -> Option<&OutputValue> {
    match self {
      OutputValue::Dict(items) => items.iter().find_map(|(k, v)| match k {
        OutputValue::String(name) if name == key => Some(v),
        _ => None,
      }),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  /// [x, y, width, height]，原图像素坐标
  pub bbox: [f32; 4],
  pub class_index: usize,
  pub score: f32,
}

/// 在引擎边界解码一次的模型输出
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
  /// 输出元组的第一个元素，按原样保留
  pub raw: OutputValue,
  pub detections: Vec<Detection>,
}

#[derive(Error, Debug)]
#[error("模型加载错误 {}: {message}", .path.display())]
pub struct LoadError {
  pub path: PathBuf,
  pub message: String,
}

impl LoadError {
  pub fn new<P: AsRef<Path>>(path: P, message: impl Into<String>) -> Self {
    Self {
      path: path.as_ref().to_path_buf(),
      message: message.into(),
    }
  }
}

#[derive(Error, Debug, PartialEq)]
pub enum ExtractError {
  #[error("模型输出应为元组，实际为 {0}")]
  NotATuple(&'static str),
  #[error("模型输出元组至少需要 2 个元素，实际为 {0}")]
  NotEnoughElements(usize),
  #[error("{what} 类型错误，实际为 {found}")]
  UnexpectedValue {
    what: &'static str,
    found: &'static str,
  },
  #[error("检测结果缺少字段: {0}")]
  MissingKey(&'static str),
  #[error("字段 {key} 形状错误: {shape:?}")]
  BadShape { key: &'static str, shape: Vec<usize> },
  #[error("检测字段长度不一致: boxes={boxes}, labels={labels}, scores={scores}")]
  LengthMismatch {
    boxes: usize,
    labels: usize,
    scores: usize,
  },
  #[error("类别索引无效: {0}")]
  InvalidClassIndex(f64),
}

#[derive(Error, Debug)]
pub enum InferenceError {
  #[error("输入批次为空")]
  EmptyBatch,
  #[error("第 {index} 个输入精度 {actual} 与模型精度 {expected} 不一致")]
  PrecisionMismatch {
    index: usize,
    expected: Precision,
    actual: Precision,
  },
  #[error("第 {index} 个输入设备 {actual:?} 与模型设备 {expected} 不一致")]
  DeviceMismatch {
    index: usize,
    expected: Device,
    actual: Option<Device>,
  },
  #[error("推理运行时错误: {0}")]
  Runtime(String),
  #[error("模型输出解析错误: {0}")]
  Extract(#[from] ExtractError),
}

mod engine;
mod extract;
#[cfg(feature = "torchscript")]
pub mod torchscript;

pub use self::engine::InferenceEngine;
pub use self::extract::extract;
