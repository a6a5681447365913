// 该文件是 Shoushi （手势） 项目的一部分。
// src/args.rs - 命令行参数
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{path::PathBuf, sync::Arc};

use tracing::info;
use url::Url;

use crate::{
  FromUrl,
  config::DetectConfig,
  engine::TensorReplayEngine,
  label::{LabelError, LabelTable},
  model::{Detector, DetectorBuilder},
};

/// 各个程序共用的检测参数，命令行中给出的值覆盖模型 URL 查询参数
#[derive(clap::Args, Debug, Clone)]
pub struct DetectArgs {
  /// 模型输出张量，例如 replay:///data/tensors.json?confidence=0.3
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 类别标签文件，每行一个
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, value_name = "THRESHOLD")]
  pub confidence: Option<f32>,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, value_name = "THRESHOLD")]
  pub iou: Option<f32>,

  /// 每帧最多保留的结果数
  #[arg(long, value_name = "COUNT")]
  pub max_detections: Option<usize>,

  /// 模型输入边长
  #[arg(long, value_name = "PIXELS")]
  pub input_size: Option<u32>,
}

impl DetectArgs {
  pub fn apply(&self, mut config: DetectConfig) -> DetectConfig {
    if let Some(v) = self.confidence {
      config = config.with_confidence_threshold(v);
    }
    if let Some(v) = self.iou {
      config = config.with_iou_threshold(v);
    }
    if let Some(v) = self.max_detections {
      config = config.with_max_detections(v);
    }
    if let Some(v) = self.input_size {
      config = config.with_input_size(v);
    }
    config
  }

  pub fn load_labels(&self) -> Result<Arc<LabelTable>, LabelError> {
    match &self.labels {
      Some(path) => {
        let labels = LabelTable::from_file(path)?;
        info!("载入 {} 个类别标签: {}", labels.len(), path.display());
        Ok(Arc::new(labels))
      }
      None => Ok(Arc::default()),
    }
  }

  pub fn build_detector<F>(&self) -> anyhow::Result<Detector<TensorReplayEngine, F>> {
    info!("模型路径: {}", self.model);
    let labels = self.load_labels()?;
    let detector = DetectorBuilder::from_url(&self.model)?
      .labels(labels)
      .config(|c| self.apply(c))
      .build::<F>()?;
    Ok(detector)
  }
}
