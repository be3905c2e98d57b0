// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/extract.rs - 从模型输出中提取检测结果
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

use tracing::debug;

use crate::{
  device::BoxFormat,
  model::{Detection, ExtractError, ModelOutput, OutputValue},
};

const BOXES_KEY: &str = "boxes";
const LABELS_KEY: &str = "labels";
const SCORES_KEY: &str = "scores";

/// 将模型输出元组解码为检测结果
///
/// 元组第二个元素是逐图像的检测字典列表，每个字典包含 `boxes` (N, 4)、
/// `labels` (N) 与 `scores` (N)。不做阈值过滤、坐标缩放或 NMS。
pub fn extract(output: OutputValue, box_format: BoxFormat) -> Result<ModelOutput, ExtractError> {
  let elements = match output {
    OutputValue::Tuple(elements) | OutputValue::List(elements) => elements,
    other => return Err(ExtractError::NotATuple(other.kind())),
  };
  if elements.len() < 2 {
    return Err(ExtractError::NotEnoughElements(elements.len()));
  }

  let mut elements = elements.into_iter();
  let raw = elements.next().unwrap_or(OutputValue::None);
  let per_image = match elements.next() {
    Some(OutputValue::List(items)) | Some(OutputValue::Tuple(items)) => items,
    Some(other) => {
      return Err(ExtractError::UnexpectedValue {
        what: "检测结果列表",
        found: other.kind(),
      });
    }
    None => return Err(ExtractError::NotEnoughElements(1)),
  };

  let mut detections = Vec::new();
  for record in per_image.iter() {
    extract_record(record, box_format, &mut detections)?;
  }

  debug!("解析得到 {} 个检测结果", detections.len());
  Ok(ModelOutput { raw, detections })
}

fn extract_record(
  record: &OutputValue,
  box_format: BoxFormat,
  detections: &mut Vec<Detection>,
) -> Result<(), ExtractError> {
  if !matches!(record, OutputValue::Dict(_)) {
    return Err(ExtractError::UnexpectedValue {
      what: "单张图像的检测结果",
      found: record.kind(),
    });
  }

  let boxes = float_values(record, BOXES_KEY)?;
  let labels = float_values(record, LABELS_KEY)?;
  let scores = float_values(record, SCORES_KEY)?;

  let (box_data, box_shape) = boxes;
  let count = match box_shape.as_slice() {
    [n, 4] => *n,
    [0] => 0,
    _ => {
      return Err(ExtractError::BadShape {
        key: BOXES_KEY,
        shape: box_shape,
      });
    }
  };
  if labels.0.len() != count || scores.0.len() != count {
    return Err(ExtractError::LengthMismatch {
      boxes: count,
      labels: labels.0.len(),
      scores: scores.0.len(),
    });
  }

  for ((coords, &label), &score) in box_data.chunks_exact(4).zip(&labels.0).zip(&scores.0) {
    if label < 0.0 || label.fract() != 0.0 {
      return Err(ExtractError::InvalidClassIndex(label));
    }
    let [x1, y1, c2, c3] = [coords[0], coords[1], coords[2], coords[3]].map(|v| v as f32);
    let bbox = match box_format {
      BoxFormat::Xywh => [x1, y1, c2, c3],
      BoxFormat::Xyxy => [x1, y1, c2 - x1, c3 - y1],
    };
    detections.push(Detection {
      bbox,
      class_index: label as usize,
      score: score as f32,
    });
  }
  Ok(())
}

/// 读取字典字段，整数与浮点张量统一为 f64
fn float_values(
  record: &OutputValue,
  key: &'static str,
) -> Result<(Vec<f64>, Vec<usize>), ExtractError> {
  match record.get(key) {
    Some(OutputValue::Tensor(tensor)) => Ok((
      tensor.to_f32_vec().into_iter().map(f64::from).collect(),
      tensor.shape().to_vec(),
    )),
    Some(OutputValue::IndexTensor(tensor)) => Ok((
      tensor.data.iter().map(|&v| v as f64).collect(),
      tensor.shape.clone(),
    )),
    Some(other) => Err(ExtractError::UnexpectedValue {
      what: key,
      found: other.kind(),
    }),
    None => Err(ExtractError::MissingKey(key)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{model::IndexTensor, tensor::Tensor};

  fn key(name: &str) -> OutputValue {
    OutputValue::String(name.to_string())
  }

  fn record(boxes: Vec<f32>, labels: Vec<i64>, scores: Vec<f32>) -> OutputValue {
    let n = labels.len();
    OutputValue::Dict(vec![
      (
        key("boxes"),
        OutputValue::Tensor(Tensor::from_f32(boxes, &[n, 4]).unwrap()),
      ),
      (
        key("labels"),
        OutputValue::IndexTensor(IndexTensor {
          data: labels.into_boxed_slice(),
          shape: vec![n],
        }),
      ),
      (
        key("scores"),
        OutputValue::Tensor(Tensor::from_f32(scores, &[n]).unwrap()),
      ),
    ])
  }

  fn output(records: Vec<OutputValue>) -> OutputValue {
    OutputValue::Tuple(vec![OutputValue::Dict(vec![]), OutputValue::List(records)])
  }

  #[test]
  fn test_extract_copies_records_in_order() {
    let boxes = vec![
      1.0, 2.0, 3.0, 4.0, //
      10.0, 20.0, 30.0, 40.0, //
      5.5, 6.5, 7.5, 8.5,
    ];
    let out = extract(
      output(vec![record(boxes, vec![2, 0, 7], vec![0.25, 0.5, 0.75])]),
      BoxFormat::Xywh,
    )
    .unwrap();

    assert_eq!(out.raw, OutputValue::Dict(vec![]));
    assert_eq!(
      out.detections,
      vec![
        Detection {
          bbox: [1.0, 2.0, 3.0, 4.0],
          class_index: 2,
          score: 0.25
        },
        Detection {
          bbox: [10.0, 20.0, 30.0, 40.0],
          class_index: 0,
          score: 0.5
        },
        Detection {
          bbox: [5.5, 6.5, 7.5, 8.5],
          class_index: 7,
          score: 0.75
        },
      ]
    );
  }

  #[test]
  fn test_extract_converts_xyxy() {
    let out = extract(
      output(vec![record(
        vec![10.0, 10.0, 60.0, 40.0],
        vec![1],
        vec![0.9],
      )]),
      BoxFormat::Xyxy,
    )
    .unwrap();
    assert_eq!(out.detections[0].bbox, [10.0, 10.0, 50.0, 30.0]);
  }

  #[test]
  fn test_extract_empty_detections() {
    let out = extract(output(vec![record(vec![], vec![], vec![])]), BoxFormat::Xyxy).unwrap();
    assert!(out.detections.is_empty());
  }

  #[test]
  fn test_extract_requires_two_elements() {
    let result = extract(
      OutputValue::Tuple(vec![OutputValue::Dict(vec![])]),
      BoxFormat::Xyxy,
    );
    assert_eq!(result, Err(ExtractError::NotEnoughElements(1)));

    let tensor = Tensor::from_f32(vec![0.0], &[1]).unwrap();
    let result = extract(OutputValue::Tensor(tensor), BoxFormat::Xyxy);
    assert_eq!(result, Err(ExtractError::NotATuple("Tensor")));
  }

  #[test]
  fn test_extract_length_mismatch() {
    let mut bad = record(vec![0.0; 8], vec![0, 1], vec![0.5, 0.5]);
    if let OutputValue::Dict(items) = &mut bad {
      items[2].1 = OutputValue::Tensor(Tensor::from_f32(vec![0.5], &[1]).unwrap());
    }
    let result = extract(output(vec![bad]), BoxFormat::Xyxy);
    assert_eq!(
      result,
      Err(ExtractError::LengthMismatch {
        boxes: 2,
        labels: 2,
        scores: 1
      })
    );
  }

  #[test]
  fn test_extract_missing_key() {
    let bad = OutputValue::Dict(vec![]);
    let result = extract(output(vec![bad]), BoxFormat::Xyxy);
    assert_eq!(result, Err(ExtractError::MissingKey("boxes")));
  }

  #[test]
  fn test_extract_negative_label() {
    let result = extract(
      output(vec![record(vec![0.0; 4], vec![-1], vec![0.5])]),
      BoxFormat::Xyxy,
    );
    assert_eq!(result, Err(ExtractError::InvalidClassIndex(-1.0)));
  }
}
