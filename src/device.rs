// 该文件是 Shanan （山南西风） 项目的一部分。
// src/device.rs - 推理设备与精度选择
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

use std::fmt;

use tracing::info;

/// 预热输入的默认形状 (C, H, W)
pub const DEFAULT_WARM_UP_SHAPE: [usize; 3] = [3, 416, 320];

/// 执行设备
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
  Cpu,
  Cuda(usize),
}

impl Device {
  pub fn is_accelerator(&self) -> bool {
    matches!(self, Device::Cuda(_))
  }
}

impl fmt::Display for Device {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Device::Cpu => write!(f, "cpu"),
      Device::Cuda(index) => write!(f, "cuda:{}", index),
    }
  }
}

/// 数值精度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
  /// 32 位浮点
  Full,
  /// 16 位浮点
  Half,
}

impl Precision {
  /// 加速器上使用半精度，通用处理器上使用全精度
  pub fn for_device(device: Device) -> Self {
    if device.is_accelerator() {
      Precision::Half
    } else {
      Precision::Full
    }
  }
}

impl fmt::Display for Precision {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Precision::Full => write!(f, "f32"),
      Precision::Half => write!(f, "f16"),
    }
  }
}

/// 检测框坐标格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxFormat {
  /// (x1, y1, x2, y2)，torchvision 的约定
  #[default]
  Xyxy,
  /// (x, y, width, height)
  Xywh,
}

/// 仅当请求加速且加速器可用时才选择加速器
pub fn select_device(prefer_accelerator: bool, accelerator_available: bool) -> Device {
  if prefer_accelerator && accelerator_available {
    info!(">>> 使用 GPU 模式");
    Device::Cuda(0)
  } else {
    if prefer_accelerator {
      info!(">>> 未检测到可用的 GPU，回退到 CPU 模式");
    } else {
      info!(">>> 使用 CPU 模式");
    }
    Device::Cpu
  }
}

/// 推理配置，启动时创建一次，显式传递给各个阶段
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceConfig {
  pub device: Device,
  pub precision: Precision,
  pub warm_up_shape: [usize; 3],
  pub box_format: BoxFormat,
  /// 计时前是否先用真实输入再跑一次
  pub warm_up_on_input: bool,
}

impl Default for InferenceConfig {
  fn default() -> Self {
    Self::for_device(Device::Cpu)
  }
}

impl InferenceConfig {
  pub fn for_device(device: Device) -> Self {
    Self {
      device,
      precision: Precision::for_device(device),
      warm_up_shape: DEFAULT_WARM_UP_SHAPE,
      box_format: BoxFormat::default(),
      warm_up_on_input: true,
    }
  }

  pub fn select(prefer_accelerator: bool, accelerator_available: bool) -> Self {
    Self::for_device(select_device(prefer_accelerator, accelerator_available))
  }

  pub fn with_warm_up_shape(mut self, shape: [usize; 3]) -> Self {
    self.warm_up_shape = shape;
    self
  }

  pub fn with_box_format(mut self, box_format: BoxFormat) -> Self {
    self.box_format = box_format;
    self
  }

  pub fn with_warm_up_on_input(mut self, enabled: bool) -> Self {
    self.warm_up_on_input = enabled;
    self
  }
}
