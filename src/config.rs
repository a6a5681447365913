// 该文件是 Shoushi （手势） 项目的一部分。
// src/config.rs - 后处理参数配置
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

use std::str::FromStr;

use thiserror::Error;
use url::Url;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.4;
pub const DEFAULT_MAX_DETECTIONS: usize = 5;
pub const DEFAULT_INPUT_SIZE: u32 = 640;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("参数 {key} 的值无效: {value}")]
  InvalidValue { key: String, value: String },
  #[error("{0} 必须位于 [0, 1] 区间, 实际为 {1}")]
  OutOfRange(&'static str, f32),
  #[error("模型输入尺寸必须大于 0")]
  ZeroInputSize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectConfig {
  pub confidence_threshold: f32,
  pub iou_threshold: f32,
  pub max_detections: usize,
  /// 模型输入为正方形，边长
  pub input_size: u32,
  /// 前处理使用了等比缩放加填充
  pub letterbox: bool,
}

impl Default for DetectConfig {
  fn default() -> Self {
    Self {
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      max_detections: DEFAULT_MAX_DETECTIONS,
      input_size: DEFAULT_INPUT_SIZE,
      letterbox: false,
    }
  }
}

impl DetectConfig {
  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  pub fn with_max_detections(mut self, max: usize) -> Self {
    self.max_detections = max;
    self
  }

  pub fn with_input_size(mut self, size: u32) -> Self {
    self.input_size = size;
    self
  }

  pub fn with_letterbox(mut self, letterbox: bool) -> Self {
    self.letterbox = letterbox;
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    for (name, value) in [
      ("confidence_threshold", self.confidence_threshold),
      ("iou_threshold", self.iou_threshold),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfRange(name, value));
      }
    }
    if self.input_size == 0 {
      return Err(ConfigError::ZeroInputSize);
    }
    Ok(())
  }

  /// 从 URL 查询参数中覆盖默认值，例如
  /// `replay:///tmp/out.json?confidence=0.25&iou=0.5&max_detections=10`
  pub fn from_query(url: &Url) -> Result<Self, ConfigError> {
    let mut config = Self::default();
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "confidence" => config.confidence_threshold = parse_value(&key, &value)?,
        "iou" => config.iou_threshold = parse_value(&key, &value)?,
        "max_detections" => config.max_detections = parse_value(&key, &value)?,
        "input_size" => config.input_size = parse_value(&key, &value)?,
        "letterbox" => config.letterbox = value.is_empty() || parse_value(&key, &value)?,
        _ => {}
      }
    }
    config.validate()?;
    Ok(config)
  }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
  value.parse().map_err(|_| ConfigError::InvalidValue {
    key: key.to_string(),
    value: value.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_constants() {
    let config = DetectConfig::default();
    assert_eq!(config.confidence_threshold, 0.3);
    assert_eq!(config.iou_threshold, 0.4);
    assert_eq!(config.max_detections, 5);
    assert_eq!(config.input_size, 640);
    assert!(!config.letterbox);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn query_overrides_defaults() {
    let url = Url::parse(
      "replay:///tmp/a.json?confidence=0.25&iou=0.5&max_detections=10&input_size=320&letterbox",
    )
    .unwrap();
    let config = DetectConfig::from_query(&url).unwrap();
    assert_eq!(config.confidence_threshold, 0.25);
    assert_eq!(config.iou_threshold, 0.5);
    assert_eq!(config.max_detections, 10);
    assert_eq!(config.input_size, 320);
    assert!(config.letterbox);
  }

  #[test]
  fn query_rejects_bad_values() {
    let url = Url::parse("replay:///a.json?iou=abc").unwrap();
    assert_eq!(
      DetectConfig::from_query(&url),
      Err(ConfigError::InvalidValue {
        key: "iou".to_string(),
        value: "abc".to_string()
      })
    );

    let url = Url::parse("replay:///a.json?confidence=1.5").unwrap();
    assert_eq!(
      DetectConfig::from_query(&url),
      Err(ConfigError::OutOfRange("confidence_threshold", 1.5))
    );

    let url = Url::parse("replay:///a.json?input_size=0").unwrap();
    assert_eq!(
      DetectConfig::from_query(&url),
      Err(ConfigError::ZeroInputSize)
    );
  }
}
