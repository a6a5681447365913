// 该文件是 Shoushi （手势） 项目的一部分。
// src/input/synthetic.rs - 按固定帧率产生空白帧的输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  collections::HashMap,
  thread,
  time::{Duration, Instant},
};

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{RgbFrame, Rotation},
  input::rotation_from_url,
};

#[derive(Error, Debug)]
pub enum SyntheticInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("帧尺寸无效, 期望形如 640x480: {0}")]
  InvalidSize(String),
  #[error("参数 {0} 的值无效: {1}")]
  InvalidValue(String, String),
  #[error("{0}")]
  InvalidRotation(String),
}

/// `blank://640x480?frames=100&fps=30&rotate=90`
///
/// 不指定 `frames` 时无限产生；不指定 `fps` 时不做节流。
pub struct SyntheticInput {
  width: u32,
  height: u32,
  rotation: Rotation,
  remaining: Option<u64>,
  interval: Option<Duration>,
  next_due: Option<Instant>,
  started: Instant,
  index: u64,
}

impl FromUrlWithScheme for SyntheticInput {
  const SCHEME: &'static str = "blank";
}

impl FromUrl for SyntheticInput {
  type Error = SyntheticInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SyntheticInputError::SchemeMismatch);
    }

    let size = url.host_str().unwrap_or_default();
    let (width, height) = size
      .split_once('x')
      .and_then(|(w, h)| Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)))
      .filter(|&(w, h)| w > 0 && h > 0)
      .ok_or_else(|| SyntheticInputError::InvalidSize(size.to_string()))?;

    let query: HashMap<_, _> = url.query_pairs().collect();
    let remaining = query
      .get("frames")
      .map(|v| {
        v.parse::<u64>()
          .map_err(|_| SyntheticInputError::InvalidValue("frames".into(), v.to_string()))
      })
      .transpose()?;
    let fps = query
      .get("fps")
      .map(|v| {
        v.parse::<f64>()
          .ok()
          .filter(|f| f.is_finite() && *f > 0.0)
          .ok_or_else(|| SyntheticInputError::InvalidValue("fps".into(), v.to_string()))
      })
      .transpose()?;
    let rotation = rotation_from_url(url).map_err(SyntheticInputError::InvalidRotation)?;

    debug!(
      "空白帧输入: {}x{}, 帧数 {:?}, 帧率 {:?}",
      width, height, remaining, fps
    );

    Ok(Self::new(width, height)
      .with_frames(remaining)
      .with_fps(fps)
      .with_rotation(rotation))
  }
}

impl SyntheticInput {
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      width,
      height,
      rotation: Rotation::None,
      remaining: None,
      interval: None,
      next_due: None,
      started: Instant::now(),
      index: 0,
    }
  }

  pub fn with_frames(mut self, frames: Option<u64>) -> Self {
    self.remaining = frames;
    self
  }

  pub fn with_fps(mut self, fps: Option<f64>) -> Self {
    self.interval = fps.map(|f| Duration::from_secs_f64(1.0 / f));
    self
  }

  pub fn with_rotation(mut self, rotation: Rotation) -> Self {
    self.rotation = rotation;
    self
  }
}

impl Iterator for SyntheticInput {
  type Item = RgbFrame;

  fn next(&mut self) -> Option<Self::Item> {
    if let Some(remaining) = self.remaining.as_mut() {
      if *remaining == 0 {
        return None;
      }
      *remaining -= 1;
    }

    if let Some(interval) = self.interval {
      let now = Instant::now();
      let due = self.next_due.unwrap_or(now);
      if due > now {
        thread::sleep(due - now);
      }
      self.next_due = Some(due.max(now) + interval);
    }

    let index = self.index;
    self.index += 1;
    let timestamp_ms = self.started.elapsed().as_millis() as u64;
    Some(
      RgbFrame::with_shape(self.width, self.height)
        .with_index(index, timestamp_ms)
        .rotate(self.rotation),
    )
  }
}
