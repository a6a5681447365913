// 该文件是 Shoushi （手势） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  path::{Path, PathBuf},
  sync::{Mutex, PoisonError},
};

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detection::DetectReport,
  frame::{RgbFrame, SourceFrame},
  output::Render,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
}

/// 记录格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
  /// 完整的 JSON 报告
  Json,
  /// 每行一个目标: `名称, 置信度, left, top, right, bottom`
  TextWithName,
  /// 同上，名称换成类别编号
  TextWithId,
}

#[derive(Serialize)]
struct FrameRecord<'a> {
  recorded_at: String,
  timestamp_ms: u64,
  #[serde(flatten)]
  report: &'a DetectReport,
}

/// `folder:///data/records?always&record=id`
///
/// 按 `YYYY/MM/DD` 分目录保存帧图像与检测记录。默认只记录有目标的帧。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  kind: RecordKind,
  frame_counters: Mutex<u16>,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let kind = uri
      .query_pairs()
      .find(|(k, _)| k == "record")
      .map_or(RecordKind::Json, |(_, v)| match v.as_ref() {
        "id" => RecordKind::TextWithId,
        "name" => RecordKind::TextWithName,
        _ => RecordKind::Json,
      });
    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput::new(uri.path(), kind).always(always))
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>, kind: RecordKind) -> Self {
    DirectoryRecordOutput {
      directory: directory.into(),
      kind,
      frame_counters: Mutex::new(0),
      always: false,
    }
  }

  pub fn always(mut self, always: bool) -> Self {
    self.always = always;
    self
  }

  fn frame_id(&self) -> u16 {
    let mut counter = self
      .frame_counters
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    *counter = counter.wrapping_add(1);
    *counter
  }

  /// 返回不带扩展名的记录路径
  fn frame_stem(&self, now: DateTime<Utc>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }

  fn write_record(
    &self,
    stem: &Path,
    frame: &RgbFrame,
    report: &DetectReport,
    now: DateTime<Utc>,
  ) -> Result<(), DirectoryRecordOutputError> {
    match self.kind {
      RecordKind::Json => {
        let record = FrameRecord {
          recorded_at: now.to_rfc3339(),
          timestamp_ms: frame.timestamp_ms(),
          report,
        };
        let file = std::fs::File::create(stem.with_extension("json"))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &record)?;
      }
      RecordKind::TextWithName | RecordKind::TextWithId => {
        let lines: Vec<String> = report
          .boxes
          .iter()
          .map(|item| {
            let name = match self.kind {
              RecordKind::TextWithId => item.class_index.to_string(),
              _ => item.class_name.clone(),
            };
            format!(
              "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}",
              name,
              item.confidence,
              item.bbox.left,
              item.bbox.top,
              item.bbox.right,
              item.bbox.bottom
            )
          })
          .collect();
        std::fs::write(stem.with_extension("txt"), lines.join("\n"))?;
      }
    }
    Ok(())
  }
}

impl Render<RgbFrame, DetectReport> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbFrame, result: &DetectReport) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      return Ok(());
    }

    let now = Utc::now();
    let stem = self.frame_stem(now)?;
    match frame.to_rgb_image() {
      Some(image) => image.save(stem.with_extension("png"))?,
      None => warn!("第 {} 帧无法转换为图像, 只保存记录", frame.index()),
    }
    self.write_record(&stem, frame, result, now)?;
    debug!("记录已保存: {}", stem.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::detection::{BoundingBox, DetectionBox, ImageSize};

  fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
      let path = entry.unwrap().path();
      if path.is_dir() {
        files.extend(files_under(&path));
      } else {
        files.push(path);
      }
    }
    files.sort();
    files
  }

  fn report() -> DetectReport {
    DetectReport {
      frame_index: 5,
      image: ImageSize::new(8, 6),
      boxes: vec![DetectionBox {
        bbox: BoundingBox::new(1.0, 1.0, 4.0, 5.0),
        confidence: 0.72,
        class_index: 1,
        class_name: "palm".to_string(),
      }]
      .into_boxed_slice(),
      elapsed: Duration::from_micros(1500),
    }
  }

  fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("shoushi-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
  }

  #[test]
  fn writes_json_and_image() {
    let dir = temp_dir("record-json");
    let url = Url::parse(&format!("folder://{}", dir.display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    let frame = RgbFrame::with_shape(8, 6).with_index(5, 200);

    output.render_result(&frame, &report()).unwrap();
    let empty = DetectReport::empty(6, ImageSize::new(8, 6), Duration::ZERO);
    output.render_result(&frame, &empty).unwrap();

    let files = files_under(&dir);
    assert_eq!(files.len(), 2);
    let json = files.iter().find(|p| p.extension().unwrap() == "json").unwrap();
    let value: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(json).unwrap()).unwrap();
    assert_eq!(value["frame_index"], 5);
    assert_eq!(value["timestamp_ms"], 200);
    assert_eq!(value["elapsed"], 1.5);
    assert_eq!(value["boxes"][0]["class_name"], "palm");
    assert!(files.iter().any(|p| p.extension().unwrap() == "png"));
    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn always_records_empty_frames_as_text() {
    let dir = temp_dir("record-text");
    let url = Url::parse(&format!("folder://{}?always&record=id", dir.display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert_eq!(output.kind, RecordKind::TextWithId);
    let frame = RgbFrame::with_shape(8, 6);

    output.render_result(&frame, &report()).unwrap();
    let empty = DetectReport::empty(6, ImageSize::new(8, 6), Duration::ZERO);
    output.render_result(&frame, &empty).unwrap();

    let texts: Vec<String> = files_under(&dir)
      .iter()
      .filter(|p| p.extension().unwrap() == "txt")
      .map(|p| std::fs::read_to_string(p).unwrap())
      .collect();
    assert_eq!(texts.len(), 2);
    assert!(texts.contains(&"1, 0.7200, 1.0000, 1.0000, 4.0000, 5.0000".to_string()));
    assert!(texts.contains(&String::new()));
    std::fs::remove_dir_all(&dir).unwrap();
  }
}
