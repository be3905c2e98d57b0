// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};

use crate::{
  catalog::{CatalogError, ClassCatalog},
  model::Detection,
  output::RenderError,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_MARGIN: i32 = 5;
const BOX_THICKNESS: i32 = 2;
const BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const TEXT_COLOR: [u8; 3] = [255, 255, 255]; // 白色

static FONT_DATA: &[u8] = include_bytes!("../../assets/font.ttf");

pub struct Overlay {
  font: FontRef<'static>,
  font_size: f32,
  box_color: Rgb<u8>,
  text_color: Rgb<u8>,
}

impl Overlay {
  pub fn new() -> Result<Self, RenderError> {
    let font = FontRef::try_from_slice(FONT_DATA)?;
    Ok(Self {
      font,
      font_size: LABEL_FONT_SIZE,
      box_color: Rgb(BOX_COLOR),
      text_color: Rgb(TEXT_COLOR),
    })
  }

  /// 标签文本 `"<类别名> <分数>"`，分数保留两位小数
  pub fn label_for(detection: &Detection, catalog: &ClassCatalog) -> Result<String, CatalogError> {
    let name = catalog.name(detection.class_index)?;
    Ok(format!("{} {:.2}", name, detection.score))
  }

  /// 绘制所有检测框；任何一个类别索引越界都会在修改图像前返回错误
  pub fn annotate(
    &self,
    image: &mut RgbImage,
    detections: &[Detection],
    catalog: &ClassCatalog,
    label_enabled: bool,
  ) -> Result<(), RenderError> {
    let labels = detections
      .iter()
      .map(|d| Self::label_for(d, catalog))
      .collect::<Result<Vec<_>, _>>()?;

    for (detection, label) in detections.iter().zip(labels) {
      let Some(rect) = box_rect(&detection.bbox, image.width(), image.height()) else {
        continue;
      };
      self.draw_box(image, rect);
      if label_enabled {
        self.draw_label(image, rect, &label);
      }
    }
    Ok(())
  }

  fn draw_box(&self, image: &mut RgbImage, rect: Rect) {
    // 边框宽度 2 像素，外沿与检测框重合
    for t in 0..BOX_THICKNESS {
      let width = rect.width() as i32 - 2 * t;
      let height = rect.height() as i32 - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let inner = Rect::at(rect.left() + t, rect.top() + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, inner, self.box_color);
    }
  }

  fn draw_label(&self, image: &mut RgbImage, rect: Rect, label: &str) {
    let scale = PxScale::from(self.font_size);
    let (text_width, text_height) = text_size(scale, &self.font, label);
    if text_width == 0 || text_height == 0 {
      return;
    }

    // 背景放在检测框上沿的正上方，超出图像顶部时向下收回
    let background_height = text_height as i32 + LABEL_MARGIN;
    let label_x = rect.left();
    let label_y = rect.top().saturating_sub(background_height).max(0);

    let background = Rect::at(label_x, label_y).of_size(text_width, background_height as u32);
    draw_filled_rect_mut(image, background, self.box_color);
    draw_text_mut(
      image,
      self.text_color,
      label_x,
      label_y,
      scale,
      &self.font,
      label,
    );
  }
}

/// 检测框在图像上的像素区域
///
/// 非有限坐标返回 `None`。边界被限制在图像外扩一个线宽的范围内，
/// 越出图像的边不会被画出，同时保证后续的整数运算不会溢出。
fn box_rect(bbox: &[f32; 4], image_width: u32, image_height: u32) -> Option<Rect> {
  if !bbox.iter().all(|v| v.is_finite()) {
    return None;
  }

  let [x, y, w, h] = bbox.map(f64::from);
  let margin = f64::from(BOX_THICKNESS);
  let clamp_x = |v: f64| v.round().clamp(-margin, f64::from(image_width) + margin) as i32;
  let clamp_y = |v: f64| v.round().clamp(-margin, f64::from(image_height) + margin) as i32;

  let (left, right) = (clamp_x(x), clamp_x(x + w));
  let (top, bottom) = (clamp_y(y), clamp_y(y + h));
  if right <= left || bottom <= top {
    return None;
  }
  Some(Rect::at(left, top).of_size((right - left) as u32, (bottom - top) as u32))
}
