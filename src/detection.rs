// 该文件是 Shoushi （手势） 项目的一部分。
// src/detection.rs - 检测结果定义
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

use std::time::Duration;

use serde::Serialize;

/// 源图像尺寸（旋转之后、缩放之前）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageSize {
  pub width: u32,
  pub height: u32,
}

impl ImageSize {
  pub fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }
}

/// 源图像像素坐标下的边界框
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
  pub left: f32,
  pub top: f32,
  pub right: f32,
  pub bottom: f32,
}

impl BoundingBox {
  pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
    Self {
      left,
      top,
      right,
      bottom,
    }
  }

  pub fn width(&self) -> f32 {
    self.right - self.left
  }

  pub fn height(&self) -> f32 {
    self.bottom - self.top
  }

  pub fn area(&self) -> f32 {
    self.width() * self.height()
  }

  /// 交并比；并集面积为零时结果为 NaN，按 0 处理
  pub fn iou(&self, other: &BoundingBox) -> f32 {
    let inter_w = (self.right.min(other.right) - self.left.max(other.left)).max(0.0);
    let inter_h = (self.bottom.min(other.bottom) - self.top.max(other.top)).max(0.0);
    let intersection = inter_w * inter_h;
    let iou = intersection / (self.area() + other.area() - intersection);
    if iou.is_nan() { 0.0 } else { iou }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionBox {
  pub bbox: BoundingBox,
  /// objectness × 最佳类别分数
  pub confidence: f32,
  /// -1 表示没有任何类别得分
  pub class_index: i32,
  pub class_name: String,
}

/// 单帧的最终输出，交给渲染端
#[derive(Debug, Clone, Serialize)]
pub struct DetectReport {
  pub frame_index: u64,
  pub image: ImageSize,
  pub boxes: Box<[DetectionBox]>,
  /// 解码 + NMS 耗时
  #[serde(serialize_with = "serialize_millis")]
  pub elapsed: Duration,
}

impl DetectReport {
  pub fn empty(frame_index: u64, image: ImageSize, elapsed: Duration) -> Self {
    Self {
      frame_index,
      image,
      boxes: Box::new([]),
      elapsed,
    }
  }

  pub fn len(&self) -> usize {
    self.boxes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.boxes.is_empty()
  }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_f64(d.as_micros() as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn iou_of_identical_boxes_is_one() {
    let a = BoundingBox::new(10.0, 20.0, 50.0, 80.0);
    assert_eq!(a.iou(&a), 1.0);
  }

  #[test]
  fn iou_of_disjoint_boxes_is_zero() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
    assert_eq!(a.iou(&b), 0.0);
    // 仅共享一条边
    let c = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
    assert_eq!(a.iou(&c), 0.0);
  }

  #[test]
  fn iou_half_overlap() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
    let expected = 50.0 / 150.0;
    assert!((a.iou(&b) - expected).abs() < 1e-6);
    assert_eq!(a.iou(&b), b.iou(&a));
  }

  #[test]
  fn iou_of_zero_area_boxes_is_zero() {
    let a = BoundingBox::new(5.0, 5.0, 5.0, 5.0);
    assert_eq!(a.iou(&a), 0.0);
  }

  #[test]
  fn report_serializes_elapsed_as_millis() {
    let report = DetectReport::empty(3, ImageSize::new(640, 480), Duration::from_micros(1500));
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["frame_index"], 3);
    assert_eq!(value["image"]["width"], 640);
    assert_eq!(value["elapsed"], 1.5);
    assert!(value["boxes"].as_array().unwrap().is_empty());
  }
}
