// 该文件是 Shoushi （手势） 项目的一部分。
// src/tensor.rs - 模型输出张量与量化参数
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

use std::{fmt, str::FromStr};

use thiserror::Error;

/// 每个预测的固定属性数：cx, cy, w, h, objectness
pub const BOX_ATTRIBUTES: usize = 5;

#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
  #[error("张量形状无效: {0:?}, 期望 [1, A >= 5, P >= 1]")]
  InvalidShape([usize; 3]),
  #[error("张量数据长度不匹配: 期望 {expected} 字节, 实际 {actual} 字节")]
  SizeMismatch { expected: usize, actual: usize },
  #[error("量化缩放因子无效: {0}")]
  InvalidScale(f64),
  #[error("未知的张量类型: {0}")]
  UnknownType(String),
  #[error("{value} 不是合法的 {dtype} 元素")]
  InvalidElement { dtype: TensorType, value: f64 },
}

/// 推理引擎输出张量的元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorType {
  Float32,
  UInt8,
  Int8,
  Int32,
}

impl TensorType {
  pub fn element_size(self) -> usize {
    match self {
      TensorType::Float32 | TensorType::Int32 => 4,
      TensorType::UInt8 | TensorType::Int8 => 1,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      TensorType::Float32 => "float32",
      TensorType::UInt8 => "uint8",
      TensorType::Int8 => "int8",
      TensorType::Int32 => "int32",
    }
  }
}

impl fmt::Display for TensorType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TensorType {
  type Err = TensorError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "float32" | "f32" => Ok(TensorType::Float32),
      "uint8" | "u8" => Ok(TensorType::UInt8),
      "int8" | "i8" => Ok(TensorType::Int8),
      "int32" | "i32" => Ok(TensorType::Int32),
      _ => Err(TensorError::UnknownType(s.to_string())),
    }
  }
}

/// 仿射量化参数：`real = scale * (q - zero_point)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantization {
  scale: f64,
  zero_point: i32,
}

impl Quantization {
  pub fn new(scale: f64, zero_point: i32) -> Result<Self, TensorError> {
    if !(scale.is_finite() && scale > 0.0) {
      return Err(TensorError::InvalidScale(scale));
    }
    Ok(Self { scale, zero_point })
  }

  pub fn scale(&self) -> f64 {
    self.scale
  }

  pub fn zero_point(&self) -> i32 {
    self.zero_point
  }

  #[inline]
  pub fn dequantize(&self, value: u8) -> f32 {
    (self.scale * (value as i32 - self.zero_point) as f64) as f32
  }

  /// 反向映射，四舍五入并截断到 u8 范围
  pub fn quantize(&self, value: f32) -> u8 {
    let q = (value as f64 / self.scale).round() + self.zero_point as f64;
    q.clamp(u8::MIN as f64, u8::MAX as f64) as u8
  }
}

/// 形状为 `[1, A, P]` 的原始输出张量，按属性优先排列，数据为小端字节
#[derive(Debug, Clone)]
pub struct RawOutputTensor {
  dtype: TensorType,
  shape: [usize; 3],
  quantization: Option<Quantization>,
  data: Box<[u8]>,
}

impl RawOutputTensor {
  pub fn new(
    dtype: TensorType,
    shape: [usize; 3],
    quantization: Option<Quantization>,
    data: impl Into<Box<[u8]>>,
  ) -> Result<Self, TensorError> {
    let [batch, attributes, predictions] = shape;
    if batch != 1 || attributes < BOX_ATTRIBUTES || predictions == 0 {
      return Err(TensorError::InvalidShape(shape));
    }

    let data = data.into();
    let expected = attributes
      .checked_mul(predictions)
      .and_then(|n| n.checked_mul(dtype.element_size()))
      .ok_or(TensorError::InvalidShape(shape))?;
    if data.len() != expected {
      return Err(TensorError::SizeMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      dtype,
      shape,
      quantization,
      data,
    })
  }

  pub fn from_f32(shape: [usize; 3], values: &[f32]) -> Result<Self, TensorError> {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    Self::new(TensorType::Float32, shape, None, bytes)
  }

  pub fn from_u8(
    shape: [usize; 3],
    values: impl Into<Box<[u8]>>,
    quantization: Quantization,
  ) -> Result<Self, TensorError> {
    Self::new(TensorType::UInt8, shape, Some(quantization), values)
  }

  pub fn dtype(&self) -> TensorType {
    self.dtype
  }

  pub fn shape(&self) -> [usize; 3] {
    self.shape
  }

  pub fn attributes(&self) -> usize {
    self.shape[1]
  }

  pub fn predictions(&self) -> usize {
    self.shape[2]
  }

  pub fn num_classes(&self) -> usize {
    self.attributes() - BOX_ATTRIBUTES
  }

  pub fn quantization(&self) -> Option<Quantization> {
    self.quantization
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.data
  }

  /// 元素个数
  pub fn len(&self) -> usize {
    self.attributes() * self.predictions()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
