// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;

use crate::{device::InferenceConfig, task::PipelineOptions};

/// 基于 LibTorch 的 YOLOv5 推理
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// TorchScript 模型文件路径 (yolov5.torchscript.pt)
  #[arg(long, value_name = "FILE")]
  pub checkpoint: PathBuf,

  /// 待检测的图像
  #[arg(long, value_name = "SOURCE")]
  pub input_source: PathBuf,

  /// 类别名称文件，每行一个类别
  #[arg(long, value_name = "FILE")]
  pub labelmap: PathBuf,

  /// 结果图像保存路径
  #[arg(long, default_value = "output.jpg", value_name = "OUTPUT")]
  pub output: PathBuf,

  /// 启用 CUDA 设备
  #[arg(long, default_value_t = false)]
  pub gpu: bool,

  /// 输出每个检测结果
  #[arg(long, default_value_t = false)]
  pub view_img: bool,

  /// 不绘制类别与分数标签
  #[arg(long, default_value_t = false)]
  pub no_label: bool,
}

impl Args {
  pub fn into_options(self, accelerator_available: bool) -> PipelineOptions {
    PipelineOptions {
      checkpoint: self.checkpoint,
      input: self.input_source,
      labelmap: self.labelmap,
      output: self.output,
      label_enabled: !self.no_label,
      view_img: self.view_img,
      config: InferenceConfig::select(self.gpu, accelerator_available),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::device::{Device, Precision};

  #[test]
  fn test_parse_flags() {
    let args = Args::parse_from([
      "shanan-torch",
      "--checkpoint",
      "yolov5s.torchscript.pt",
      "--input-source",
      "zidane.jpg",
      "--labelmap",
      "coco.names",
      "--gpu",
    ]);
    assert!(args.gpu);
    assert!(!args.view_img);
    assert_eq!(args.output, PathBuf::from("output.jpg"));

    let options = args.into_options(false);
    assert_eq!(options.config.device, Device::Cpu);
    assert_eq!(options.config.precision, Precision::Full);
    assert!(options.label_enabled);
  }

  #[test]
  fn test_gpu_flag_maps_to_half_precision_accelerator() {
    let args = Args::parse_from([
      "shanan-torch",
      "--checkpoint",
      "yolov5s.torchscript.pt",
      "--input-source",
      "bus.jpg",
      "--labelmap",
      "coco.names",
      "--output",
      "out/bus.png",
      "--gpu",
      "--view-img",
      "--no-label",
    ]);
    let options = args.into_options(true);
    assert_eq!(options.config.device, Device::Cuda(0));
    assert_eq!(options.config.precision, Precision::Half);
    assert_eq!(options.input, PathBuf::from("bus.jpg"));
    assert_eq!(options.output, PathBuf::from("out/bus.png"));
    assert!(options.view_img);
    assert!(!options.label_enabled);
  }
}
