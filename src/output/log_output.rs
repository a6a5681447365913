// 该文件是 Shoushi （手势） 项目的一部分。
// src/output/log_output.rs - 把检测结果写入日志
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::convert::Infallible;

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, detection::DetectReport, frame::SourceFrame, output::Render,
};

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// `log://` 逐框打印；`log://?summary` 只打印每帧的统计
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOutput {
  summary: bool,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch);
    }
    let summary = url.query_pairs().any(|(k, _)| k == "summary");
    Ok(LogOutput { summary })
  }
}

impl LogOutput {
  pub fn summary(mut self, summary: bool) -> Self {
    self.summary = summary;
    self
  }
}

impl<F: SourceFrame> Render<F, DetectReport> for LogOutput {
  type Error = Infallible;

  fn render_result(&self, frame: &F, result: &DetectReport) -> Result<(), Self::Error> {
    let size = frame.size();
    info!(
      "第 {} 帧 ({}x{}): {} 个目标, 后处理耗时 {:.2?}",
      result.frame_index,
      size.width,
      size.height,
      result.len(),
      result.elapsed
    );
    if self.summary {
      return Ok(());
    }
    for item in result.boxes.iter() {
      info!(
        "  - {} ({}): {:.2}% [{:.0}, {:.0}, {:.0}, {:.0}]",
        item.class_name,
        item.class_index,
        item.confidence * 100.0,
        item.bbox.left,
        item.bbox.top,
        item.bbox.right,
        item.bbox.bottom
      );
    }
    debug!("第 {} 帧输出完成", result.frame_index);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{detection::ImageSize, frame::RgbFrame};

  #[test]
  fn parses_summary_flag() {
    let output = LogOutput::from_url(&Url::parse("log://?summary").unwrap()).unwrap();
    assert!(output.summary);
    assert!(matches!(
      LogOutput::from_url(&Url::parse("folder:///tmp").unwrap()),
      Err(LogOutputError::SchemeMismatch)
    ));
  }

  #[test]
  fn renders_empty_report() {
    let frame = RgbFrame::with_shape(4, 4);
    let report = DetectReport::empty(0, ImageSize::new(4, 4), Default::default());
    assert!(LogOutput::default().render_result(&frame, &report).is_ok());
  }
}
