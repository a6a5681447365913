// 该文件是 Shoushi （手势） 项目的一部分。
// src/frame.rs - RGB 帧定义
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

use crate::detection::ImageSize;

const RGB_CHANNELS: usize = 3;

/// 后处理只关心帧的尺寸和序号
pub trait SourceFrame {
  fn size(&self) -> ImageSize;
  fn index(&self) -> u64;
}

pub trait AsNhwcFrame {
  fn as_nhwc(&self) -> &[u8];
}

/// 顺时针旋转角度，输入源用它把帧转正
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
  #[default]
  None,
  Cw90,
  Cw180,
  Cw270,
}

impl FromStr for Rotation {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "0" => Ok(Rotation::None),
      "90" => Ok(Rotation::Cw90),
      "180" => Ok(Rotation::Cw180),
      "270" => Ok(Rotation::Cw270),
      _ => Err(format!("不支持的旋转角度: {}", s)),
    }
  }
}

/// 紧密排列的 RGB 帧（HWC）
#[derive(Debug, Clone)]
pub struct RgbFrame {
  data: Box<[u8]>,
  width: u32,
  height: u32,
  index: u64,
  timestamp_ms: u64,
}

impl RgbFrame {
  pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
    if data.len() != RGB_CHANNELS * width as usize * height as usize {
      panic!(
        "数据长度不匹配: 期望长度 {}, 实际长度 {}",
        RGB_CHANNELS * width as usize * height as usize,
        data.len()
      );
    }

    Self {
      data: data.into_boxed_slice(),
      width,
      height,
      index: 0,
      timestamp_ms: 0,
    }
  }

  pub fn with_shape(width: u32, height: u32) -> Self {
    let size = RGB_CHANNELS * width as usize * height as usize;
    Self::new(width, height, vec![0u8; size])
  }

  pub fn with_index(mut self, index: u64, timestamp_ms: u64) -> Self {
    self.index = index;
    self.timestamp_ms = timestamp_ms;
    self
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn timestamp_ms(&self) -> u64 {
    self.timestamp_ms
  }

  pub fn rotate(self, rotation: Rotation) -> Self {
    if rotation == Rotation::None {
      return self;
    }

    let (w, h) = (self.width as usize, self.height as usize);
    let (out_w, out_h) = match rotation {
      Rotation::Cw90 | Rotation::Cw270 => (h, w),
      _ => (w, h),
    };
    let mut data = vec![0u8; self.data.len()];

    for y in 0..h {
      for x in 0..w {
        let (nx, ny) = match rotation {
          Rotation::Cw90 => (h - 1 - y, x),
          Rotation::Cw180 => (w - 1 - x, h - 1 - y),
          Rotation::Cw270 => (y, w - 1 - x),
          Rotation::None => (x, y),
        };
        let src = (y * w + x) * RGB_CHANNELS;
        let dst = (ny * out_w + nx) * RGB_CHANNELS;
        data[dst..dst + RGB_CHANNELS].copy_from_slice(&self.data[src..src + RGB_CHANNELS]);
      }
    }

    Self {
      data: data.into_boxed_slice(),
      width: out_w as u32,
      height: out_h as u32,
      index: self.index,
      timestamp_ms: self.timestamp_ms,
    }
  }
}

impl SourceFrame for RgbFrame {
  fn size(&self) -> ImageSize {
    ImageSize::new(self.width, self.height)
  }

  fn index(&self) -> u64 {
    self.index
  }
}

impl AsNhwcFrame for RgbFrame {
  fn as_nhwc(&self) -> &[u8] {
    &self.data
  }
}

impl AsMut<[u8]> for RgbFrame {
  fn as_mut(&mut self) -> &mut [u8] {
    &mut self.data
  }
}

#[cfg(feature = "image")]
impl From<image::RgbImage> for RgbFrame {
  fn from(image: image::RgbImage) -> Self {
    let (width, height) = image.dimensions();
    RgbFrame::new(width, height, image.into_raw())
  }
}

#[cfg(feature = "image")]
impl RgbFrame {
  pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
    image::RgbImage::from_raw(self.width, self.height, self.data.to_vec())
  }
}
