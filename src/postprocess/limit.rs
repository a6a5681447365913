// 该文件是 Shoushi （手势） 项目的一部分。
// src/postprocess/limit.rs - 结果数量限制
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

use crate::detection::DetectionBox;

/// 输入须已按置信度降序排列
pub fn limit_results(mut boxes: Vec<DetectionBox>, max_detections: usize) -> Vec<DetectionBox> {
  debug_assert!(
    boxes
      .windows(2)
      .all(|pair| pair[0].confidence >= pair[1].confidence)
  );
  boxes.truncate(max_detections);
  boxes
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detection::BoundingBox;

  fn boxes(confidences: &[f32]) -> Vec<DetectionBox> {
    confidences
      .iter()
      .enumerate()
      .map(|(i, &confidence)| DetectionBox {
        bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        confidence,
        class_index: i as i32,
        class_name: String::new(),
      })
      .collect()
  }

  #[test]
  fn truncates_to_max() {
    let limited = limit_results(boxes(&[0.9, 0.8, 0.7, 0.6, 0.5, 0.4]), 5);
    assert_eq!(limited.len(), 5);
    assert_eq!(limited.last().unwrap().confidence, 0.5);
  }

  #[test]
  fn fewer_than_max_is_untouched() {
    assert_eq!(limit_results(boxes(&[0.9, 0.8]), 5).len(), 2);
    assert!(limit_results(Vec::new(), 5).is_empty());
    assert!(limit_results(boxes(&[0.9]), 0).is_empty());
  }
}
