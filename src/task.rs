// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 单张图像推理任务
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

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use tracing::{error, info};

use crate::{
  catalog::ClassCatalog,
  device::InferenceConfig,
  error::PipelineError,
  input::{ImagePreprocessor, PreparedImage},
  model::{Artifact, Detection, InferenceEngine, LoadArtifact},
  output::{Render, RenderError, SaveImageFileOutput},
  tensor::ModelInputBatch,
  utils::timed,
};

pub trait Task<A, O>: Sized {
  type Error;
  fn run_task(
    self,
    engine: &InferenceEngine<A>,
    catalog: &ClassCatalog,
    output: O,
  ) -> Result<InferenceReport, Self::Error>;
}

/// 一次推理的结果与耗时
#[derive(Debug)]
pub struct InferenceReport {
  /// 解码、归一化、重排与设备迁移的耗时
  pub preprocess: Duration,
  /// 仅前向推理本身的耗时
  pub inference: Duration,
  pub detections: Vec<Detection>,
  /// 渲染失败不影响检测结果
  pub render_error: Option<RenderError>,
}

/// 预热、计时预处理、计时推理、渲染
pub struct OneShotTask {
  input: PathBuf,
  view_img: bool,
}

impl OneShotTask {
  pub fn new<P: AsRef<Path>>(input: P) -> Self {
    Self {
      input: input.as_ref().to_path_buf(),
      view_img: false,
    }
  }

  pub fn with_view_img(mut self, view_img: bool) -> Self {
    self.view_img = view_img;
    self
  }
}

impl<A, O> Task<A, O> for OneShotTask
where
  A: Artifact,
  O: Render<Error = RenderError>,
{
  type Error = PipelineError;

  fn run_task(
    self,
    engine: &InferenceEngine<A>,
    catalog: &ClassCatalog,
    output: O,
  ) -> Result<InferenceReport, Self::Error> {
    info!("开始任务...");
    engine.warm_up()?;

    let config = engine.config();
    // 预处理计时包含设备迁移
    let (prepared, preprocess) = timed(|| -> Result<_, PipelineError> {
      let PreparedImage { image, tensor } = ImagePreprocessor.load(&self.input)?;
      let batch = ModelInputBatch::single(tensor.prepare_for(config));
      let input = engine.prepare(&batch)?;
      Ok((image, input))
    });
    let (image, input) = prepared?;
    info!(">>> 预处理耗时: {:.2?}", preprocess);

    if config.warm_up_on_input {
      engine.infer(&input)?;
    }

    let (output_value, inference) = engine.infer_timed(&input)?;
    info!(">>> 推理耗时: {:.2?}", inference);

    let detections = output_value.detections;
    info!(">>> 检测到 {} 个对象", detections.len());
    if self.view_img {
      for det in &detections {
        let name = catalog.name(det.class_index).unwrap_or("<unknown>");
        info!(
          "  - {}: {:.2} at ({:.0}, {:.0}, {:.0}x{:.0})",
          name, det.score, det.bbox[0], det.bbox[1], det.bbox[2], det.bbox[3]
        );
      }
    }

    let render_error = output
      .render_result(image, &detections, catalog)
      .inspect_err(|e| error!("渲染失败: {}", e))
      .err();

    info!("任务完成");
    Ok(InferenceReport {
      preprocess,
      inference,
      detections,
      render_error,
    })
  }
}

/// 流水线参数
#[derive(Debug, Clone)]
pub struct PipelineOptions {
  pub checkpoint: PathBuf,
  pub input: PathBuf,
  pub labelmap: PathBuf,
  pub output: PathBuf,
  pub label_enabled: bool,
  pub view_img: bool,
  pub config: InferenceConfig,
}

/// 按顺序加载类别表与模型，然后执行单张图像任务
///
/// 类别表或模型加载失败时直接返回，不会读取输入图像。
pub fn run_pipeline<A: LoadArtifact>(
  options: &PipelineOptions,
) -> Result<InferenceReport, PipelineError> {
  let catalog = ClassCatalog::load(&options.labelmap)?;
  let engine = InferenceEngine::<A>::load(&options.checkpoint, options.config.clone())?;
  let output = SaveImageFileOutput::new(&options.output)?.with_label(options.label_enabled);

  OneShotTask::new(&options.input)
    .with_view_img(options.view_img)
    .run_task(&engine, &catalog, output)
}
