// 该文件是 Shoushi （手势） 项目的一部分。
// src/postprocess/mod.rs - 后处理流水线
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

//! 原始张量 -> 反量化 -> 转置 -> 解码 -> NMS -> 截断

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::{
  config::DetectConfig,
  detection::{DetectionBox, ImageSize},
  label::LabelTable,
  tensor::{RawOutputTensor, TensorType},
};

mod decode;
mod layout;
mod limit;
mod nms;
mod quant;

pub use self::decode::{BoxMapping, decode_predictions, decode_row};
pub use self::layout::transpose_into;
pub use self::limit::limit_results;
pub use self::nms::{non_max_suppression, sort_by_confidence};
pub use self::quant::normalize_into;

#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
  #[error("不支持的张量类型: {0}")]
  UnsupportedTensorType(TensorType),
  #[error("uint8 张量缺少量化参数")]
  MissingQuantization,
}

/// 跨帧复用的中间缓冲区，模型加载后形状固定
#[derive(Debug, Default)]
struct Scratch {
  normalized: Vec<f32>,
  transposed: Vec<f32>,
}

pub struct PostProcessor {
  config: DetectConfig,
  labels: Arc<LabelTable>,
  scratch: Scratch,
}

impl PostProcessor {
  pub fn new(config: DetectConfig, labels: Arc<LabelTable>) -> Self {
    Self {
      config,
      labels,
      scratch: Scratch::default(),
    }
  }

  pub fn config(&self) -> &DetectConfig {
    &self.config
  }

  pub fn labels(&self) -> &Arc<LabelTable> {
    &self.labels
  }

  pub fn process(
    &mut self,
    tensor: &RawOutputTensor,
    image: ImageSize,
  ) -> Result<Vec<DetectionBox>, DecodeError> {
    let attributes = tensor.attributes();
    let predictions = tensor.predictions();

    normalize_into(tensor, &mut self.scratch.normalized)?;
    transpose_into(
      &self.scratch.normalized,
      attributes,
      predictions,
      &mut self.scratch.transposed,
    );

    let candidates = decode_predictions(
      &self.scratch.transposed,
      attributes,
      image,
      &self.labels,
      &self.config,
    );
    let num_candidates = candidates.len();

    let suppressed = non_max_suppression(candidates, self.config.iou_threshold);
    let num_suppressed = suppressed.len();

    let result = limit_results(suppressed, self.config.max_detections);
    debug!(
      "解码 {} 个预测 ({} 类): 候选 {} 个, NMS 后 {} 个, 输出 {} 个",
      predictions,
      tensor.num_classes(),
      num_candidates,
      num_suppressed,
      result.len()
    );

    Ok(result)
  }
}
