// 该文件是 Shoushi （手势） 项目的一部分。
// src/postprocess/decode.rs - 预测行解码
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

use crate::{
  config::DetectConfig,
  detection::{BoundingBox, DetectionBox, ImageSize},
  label::LabelTable,
  tensor::BOX_ATTRIBUTES,
};

const OBJECTNESS_INDEX: usize = 4;

/// 模型输入坐标到源图像像素坐标的映射：`x_img = (x - pad_x) * scale_x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxMapping {
  pub scale_x: f32,
  pub scale_y: f32,
  pub pad_x: f32,
  pub pad_y: f32,
}

impl BoxMapping {
  /// 前处理直接拉伸到正方形输入
  pub fn stretch(image: ImageSize, input_size: u32) -> Self {
    let input = input_size as f32;
    Self {
      scale_x: image.width as f32 / input,
      scale_y: image.height as f32 / input,
      pad_x: 0.0,
      pad_y: 0.0,
    }
  }

  /// 前处理等比缩放后居中填充
  pub fn letterbox(image: ImageSize, input_size: u32) -> Self {
    let input = input_size as f32;
    let (w, h) = (image.width as f32, image.height as f32);
    let gain = (input / w).min(input / h);
    Self {
      scale_x: 1.0 / gain,
      scale_y: 1.0 / gain,
      pad_x: (input - w * gain) / 2.0,
      pad_y: (input - h * gain) / 2.0,
    }
  }

  pub fn for_config(image: ImageSize, config: &DetectConfig) -> Self {
    if config.letterbox {
      Self::letterbox(image, config.input_size)
    } else {
      Self::stretch(image, config.input_size)
    }
  }

  /// 中心点 + 宽高 -> 左上右下
  fn map_center_size(&self, cx: f32, cy: f32, w: f32, h: f32) -> BoundingBox {
    let cx = (cx - self.pad_x) * self.scale_x;
    let cy = (cy - self.pad_y) * self.scale_y;
    let half_w = w * self.scale_x / 2.0;
    let half_h = h * self.scale_y / 2.0;
    BoundingBox::new(cx - half_w, cy - half_h, cx + half_w, cy + half_h)
  }
}

/// 返回 (最佳类别索引, 最佳分数)；分数从 0 起比较，相等时保留较小索引
fn best_class(scores: &[f32]) -> (Option<usize>, f32) {
  scores
    .iter()
    .enumerate()
    .fold((None, 0.0), |(best_index, best_score), (index, &score)| {
      if score > best_score {
        (Some(index), score)
      } else {
        (best_index, best_score)
      }
    })
}

/// 解码单个预测行，不满足阈值或几何退化时返回 None
pub fn decode_row(
  row: &[f32],
  mapping: &BoxMapping,
  image: ImageSize,
  labels: &LabelTable,
  confidence_threshold: f32,
) -> Option<DetectionBox> {
  let objectness = row[OBJECTNESS_INDEX];
  if !(objectness > confidence_threshold) {
    return None;
  }

  let (class_index, class_score) = best_class(&row[BOX_ATTRIBUTES..]);
  let confidence = objectness * class_score;
  if !(confidence > confidence_threshold) {
    return None;
  }

  let raw = mapping.map_center_size(row[0], row[1], row[2], row[3]);
  if ![raw.left, raw.top, raw.right, raw.bottom]
    .iter()
    .all(|v| v.is_finite())
  {
    return None;
  }
  let bbox = BoundingBox::new(
    raw.left.max(0.0),
    raw.top.max(0.0),
    raw.right.min(image.width as f32),
    raw.bottom.min(image.height as f32),
  );
  if !(bbox.right > bbox.left && bbox.bottom > bbox.top) {
    return None;
  }

  let class_index = class_index.map_or(-1, |i| i as i32);
  Some(DetectionBox {
    bbox,
    confidence,
    class_index,
    class_name: labels.name(class_index).to_string(),
  })
}

/// 遍历预测优先排列的数据，按行序输出候选框
pub fn decode_predictions(
  rows: &[f32],
  attributes: usize,
  image: ImageSize,
  labels: &LabelTable,
  config: &DetectConfig,
) -> Vec<DetectionBox> {
  let mapping = BoxMapping::for_config(image, config);
  rows
    .chunks_exact(attributes)
    .filter_map(|row| decode_row(row, &mapping, image, labels, config.confidence_threshold))
    .collect()
}
