// 该文件是 Shanan （山南西风） 项目的一部分。
// src/main.rs - 项目主程序
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

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use shanan_torch::{
  args::Args,
  model::torchscript::{TorchScriptArtifact, accelerator_available},
  task::run_pipeline,
};

fn main() -> ExitCode {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.checkpoint.display());
  info!("输入来源: {}", args.input_source.display());
  info!("类别文件: {}", args.labelmap.display());
  info!("输出路径: {}", args.output.display());

  let options = args.into_options(accelerator_available());

  match run_pipeline::<TorchScriptArtifact>(&options) {
    Ok(report) => {
      info!(
        "预处理 {:.2?}，推理 {:.2?}，检测 {} 个对象",
        report.preprocess,
        report.inference,
        report.detections.len()
      );
      match report.render_error {
        Some(e) => {
          error!("结果图像未保存: {}", e);
          ExitCode::from(shanan_torch::error::PipelineError::from(e).exit_code())
        }
        None => ExitCode::SUCCESS,
      }
    }
    Err(e) => {
      error!(">>> {}", e);
      ExitCode::from(e.exit_code())
    }
  }
}
