// 该文件是 Shoushi （手势） 项目的一部分。
// src/model.rs - 模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{cell::RefCell, fmt::Display, marker::PhantomData, sync::Arc, time::Instant};

use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl,
  config::{ConfigError, DetectConfig},
  detection::DetectReport,
  engine::{InferenceEngine, InferenceError, TensorReplayEngine},
  frame::SourceFrame,
  label::LabelTable,
  postprocess::{DecodeError, PostProcessor},
};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

impl<M: Model + ?Sized> Model for &M {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (**self).infer(input)
  }
}

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("推理失败: {0}")]
  Inference(#[from] InferenceError),
  #[error("解码失败: {0}")]
  Decode(#[from] DecodeError),
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("推理引擎错误: {0}")]
  Engine(#[from] InferenceError),
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
}

/// 推理引擎 + 后处理
pub struct Detector<E, F> {
  engine: E,
  postprocessor: RefCell<PostProcessor>,
  _phantom: PhantomData<fn(&F)>,
}

impl<E: InferenceEngine<F>, F> Detector<E, F> {
  pub fn new(engine: E, config: DetectConfig, labels: Arc<LabelTable>) -> Self {
    Self {
      engine,
      postprocessor: RefCell::new(PostProcessor::new(config, labels)),
      _phantom: PhantomData,
    }
  }

  pub fn config(&self) -> DetectConfig {
    *self.postprocessor.borrow().config()
  }
}

impl<E: InferenceEngine<F>, F: SourceFrame> Model for Detector<E, F> {
  type Input = F;
  type Output = DetectReport;
  type Error = DetectError;

  fn infer(&self, frame: &F) -> Result<DetectReport, DetectError> {
    debug!("执行模型推理: 第 {} 帧", frame.index());
    let tensor = self.engine.run(frame)?;

    let image = frame.size();
    let now = Instant::now();
    let boxes = self
      .postprocessor
      .borrow_mut()
      .process(&tensor, image)?;
    let elapsed = now.elapsed();

    Ok(DetectReport {
      frame_index: frame.index(),
      image,
      boxes: boxes.into_boxed_slice(),
      elapsed,
    })
  }
}

/// 任何失败都降级为本帧无检测结果，保证视频流继续
pub fn infer_or_empty<M, F>(model: &M, frame: &F) -> DetectReport
where
  M: Model<Input = F, Output = DetectReport>,
  M::Error: Display,
  F: SourceFrame,
{
  let now = Instant::now();
  model.infer(frame).unwrap_or_else(|e| {
    warn!("第 {} 帧处理失败, 本帧无检测结果: {}", frame.index(), e);
    DetectReport::empty(frame.index(), frame.size(), now.elapsed())
  })
}

pub struct DetectorBuilder {
  engine: TensorReplayEngine,
  config: DetectConfig,
  labels: Arc<LabelTable>,
}

impl FromUrl for DetectorBuilder {
  type Error = ModelError;

  /// `replay:///path/to/tensors.json?confidence=0.3&iou=0.4`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let config = DetectConfig::from_query(url)?;
    let engine = TensorReplayEngine::from_url(url)?;
    Ok(Self {
      engine,
      config,
      labels: Arc::default(),
    })
  }
}

impl DetectorBuilder {
  pub fn labels(mut self, labels: Arc<LabelTable>) -> Self {
    self.labels = labels;
    self
  }

  pub fn config(mut self, f: impl FnOnce(DetectConfig) -> DetectConfig) -> Self {
    self.config = f(self.config);
    self
  }

  pub fn build<F>(self) -> Result<Detector<TensorReplayEngine, F>, ModelError> {
    self.config.validate()?;
    info!(
      "后处理参数: 置信度阈值 {}, IOU 阈值 {}, 最多 {} 个结果, 输入尺寸 {}{}",
      self.config.confidence_threshold,
      self.config.iou_threshold,
      self.config.max_detections,
      self.config.input_size,
      if self.config.letterbox { " (letterbox)" } else { "" }
    );
    if self.labels.is_empty() {
      warn!("未加载类别标签, 所有结果将标记为 Unknown");
    }
    Ok(Detector::new(self.engine, self.config, self.labels))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    detection::ImageSize,
    frame::RgbFrame,
    tensor::{RawOutputTensor, TensorType},
  };

  fn scenario_a() -> RawOutputTensor {
    let row = [320.0, 320.0, 100.0, 100.0, 0.9, 0.1, 0.8, 0.05];
    RawOutputTensor::from_f32([1, 8, 1], &row).unwrap()
  }

  fn detector(engine: TensorReplayEngine) -> Detector<TensorReplayEngine, RgbFrame> {
    Detector::new(
      engine,
      DetectConfig::default(),
      Arc::new(LabelTable::from_names(["A", "B", "C"])),
    )
  }

  #[test]
  fn report_carries_frame_metadata() {
    let model = detector(TensorReplayEngine::from_tensors(vec![scenario_a()]).unwrap());
    let frame = RgbFrame::with_shape(640, 640).with_index(12, 0);
    let report = model.infer(&frame).unwrap();
    assert_eq!(report.frame_index, 12);
    assert_eq!(report.image, ImageSize::new(640, 640));
    assert_eq!(report.len(), 1);
    assert_eq!(report.boxes[0].class_name, "B");
  }

  #[test]
  fn failures_degrade_to_empty_report() {
    let bad = RawOutputTensor::new(TensorType::Int8, [1, 8, 1], None, vec![0u8; 8]).unwrap();
    let model = detector(TensorReplayEngine::from_tensors(vec![bad]).unwrap());
    let frame = RgbFrame::with_shape(4, 4).with_index(3, 0);
    assert!(matches!(model.infer(&frame), Err(DetectError::Decode(_))));
    let report = infer_or_empty(&model, &frame);
    assert!(report.is_empty());
    assert_eq!(report.frame_index, 3);

    let model = detector(
      TensorReplayEngine::from_tensors(vec![scenario_a()])
        .unwrap()
        .with_fail_every(1),
    );
    assert!(matches!(model.infer(&frame), Err(DetectError::Inference(_))));
    assert!(infer_or_empty(&model, &frame).is_empty());
  }

  #[test]
  fn builder_rejects_invalid_override() {
    let path = std::env::temp_dir().join(format!("shoushi-model-{}.json", std::process::id()));
    let record = crate::engine::RecordedTensor::from_tensor(&scenario_a());
    std::fs::write(&path, serde_json::to_string(&record).unwrap()).unwrap();

    let url = Url::parse(&format!("replay://{}?max_detections=2", path.display())).unwrap();
    let builder = DetectorBuilder::from_url(&url).unwrap();
    assert_eq!(builder.config.max_detections, 2);
    let result = builder
      .config(|c| c.with_iou_threshold(2.0))
      .build::<RgbFrame>();
    assert!(matches!(result, Err(ModelError::Config(_))));

    let detector = DetectorBuilder::from_url(&url)
      .unwrap()
      .build::<RgbFrame>()
      .unwrap();
    assert_eq!(detector.config().max_detections, 2);
    std::fs::remove_file(&path).unwrap();
  }
}
