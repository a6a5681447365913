// 该文件是 Shoushi （手势） 项目的一部分。
// src/postprocess/nms.rs - 按类别的非极大值抑制
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

use std::collections::BTreeMap;

use crate::detection::DetectionBox;

/// 置信度降序的稳定排序
pub fn sort_by_confidence(boxes: &mut [DetectionBox]) {
  boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}

/// 每个类别内贪心保留高置信度框，抑制与其 IOU 超过阈值的后续框。
/// 结果按置信度降序排列，同分时保持输入顺序。
pub fn non_max_suppression(boxes: Vec<DetectionBox>, iou_threshold: f32) -> Vec<DetectionBox> {
  let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
  for (index, det) in boxes.iter().enumerate() {
    groups.entry(det.class_index).or_default().push(index);
  }

  let mut selected = Vec::with_capacity(boxes.len());
  for indices in groups.values_mut() {
    indices.sort_by(|&a, &b| boxes[b].confidence.total_cmp(&boxes[a].confidence));

    let mut active = vec![true; indices.len()];
    for i in 0..indices.len() {
      if !active[i] {
        continue;
      }
      let kept = &boxes[indices[i]].bbox;
      selected.push(indices[i]);

      for j in (i + 1)..indices.len() {
        if active[j] && kept.iou(&boxes[indices[j]].bbox) > iou_threshold {
          active[j] = false;
        }
      }
    }
  }

  let mut slots: Vec<Option<DetectionBox>> = boxes.into_iter().map(Some).collect();
  let mut result: Vec<DetectionBox> = selected
    .into_iter()
    .filter_map(|index| slots[index].take())
    .collect();
  sort_by_confidence(&mut result);
  result
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detection::BoundingBox;

  fn det(class_index: i32, confidence: f32, left: f32, top: f32, right: f32, bottom: f32) -> DetectionBox {
    DetectionBox {
      bbox: BoundingBox::new(left, top, right, bottom),
      confidence,
      class_index,
      class_name: format!("c{class_index}"),
    }
  }

  #[test]
  fn empty_input_gives_empty_output() {
    assert!(non_max_suppression(Vec::new(), 0.4).is_empty());
  }

  #[test]
  fn overlapping_same_class_is_suppressed() {
    // IOU = 0.6
    let boxes = vec![
      det(0, 0.85, 0.0, 0.0, 100.0, 100.0),
      det(0, 0.9, 0.0, 0.0, 100.0, 60.0),
    ];
    assert!((boxes[0].bbox.iou(&boxes[1].bbox) - 0.6).abs() < 1e-6);
    let kept = non_max_suppression(boxes, 0.4);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].confidence, 0.9);
  }

  #[test]
  fn overlapping_different_classes_are_kept() {
    let boxes = vec![
      det(0, 0.9, 0.0, 0.0, 100.0, 100.0),
      det(1, 0.8, 0.0, 0.0, 100.0, 100.0),
    ];
    let kept = non_max_suppression(boxes, 0.4);
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].class_index, 0);
    assert_eq!(kept[1].class_index, 1);
  }

  #[test]
  fn suppressed_box_does_not_suppress_others() {
    // b 被 a 抑制；c 只与 b 重叠，因此保留
    let boxes = vec![
      det(0, 0.9, 0.0, 0.0, 100.0, 100.0),
      det(0, 0.8, 30.0, 0.0, 130.0, 100.0),
      det(0, 0.7, 110.0, 0.0, 210.0, 100.0),
    ];
    let kept = non_max_suppression(boxes, 0.4);
    let confidences: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
    assert_eq!(confidences, vec![0.9, 0.7]);
  }

  #[test]
  fn iou_equal_to_threshold_is_kept() {
    // IOU = 50 / 150 = 1/3
    let boxes = vec![
      det(0, 0.9, 0.0, 0.0, 10.0, 10.0),
      det(0, 0.8, 5.0, 0.0, 15.0, 10.0),
    ];
    let threshold = boxes[0].bbox.iou(&boxes[1].bbox);
    assert_eq!(non_max_suppression(boxes, threshold).len(), 2);
  }

  #[test]
  fn equal_confidence_keeps_emission_order() {
    let boxes = vec![
      det(0, 0.5, 0.0, 0.0, 10.0, 10.0),
      det(0, 0.5, 1.0, 1.0, 11.0, 11.0),
      det(1, 0.5, 100.0, 100.0, 110.0, 110.0),
    ];
    let kept = non_max_suppression(boxes, 0.4);
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].bbox.left, 0.0);
    assert_eq!(kept[1].class_index, 1);
  }

  #[test]
  fn output_is_sorted_across_classes() {
    let boxes = vec![
      det(2, 0.4, 0.0, 0.0, 10.0, 10.0),
      det(0, 0.6, 20.0, 0.0, 30.0, 10.0),
      det(1, 0.95, 40.0, 0.0, 50.0, 10.0),
      det(0, 0.7, 60.0, 0.0, 70.0, 10.0),
    ];
    let kept = non_max_suppression(boxes, 0.4);
    let confidences: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
    assert_eq!(confidences, vec![0.95, 0.7, 0.6, 0.4]);
  }
}
