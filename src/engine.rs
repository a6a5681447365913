// 该文件是 Shoushi （手势） 项目的一部分。
// src/engine.rs - 推理引擎接口与张量回放
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

use std::{
  path::{Path, PathBuf},
  sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  tensor::{Quantization, RawOutputTensor, TensorError, TensorType},
};

/// 推理引擎：输入一帧，输出 `[1, A, P]` 张量。对后处理而言是不透明的。
pub trait InferenceEngine<F> {
  fn run(&self, frame: &F) -> Result<RawOutputTensor, InferenceError>;
}

#[derive(Error, Debug)]
pub enum InferenceError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("张量记录格式错误: {0}")]
  FormatError(#[from] serde_json::Error),
  #[error("张量错误: {0}")]
  TensorError(#[from] TensorError),
  #[error("没有可回放的张量: {0}")]
  NoTensors(String),
  #[error("推理失败: {0}")]
  Failure(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordedQuantization {
  pub scale: f64,
  pub zero_point: i32,
}

/// 张量的 JSON 记录格式，数据按属性优先排列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedTensor {
  pub dtype: String,
  pub shape: [usize; 3],
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub quantization: Option<RecordedQuantization>,
  pub data: Vec<f64>,
}

impl RecordedTensor {
  pub fn into_tensor(self) -> Result<RawOutputTensor, TensorError> {
    let dtype: TensorType = self.dtype.parse()?;
    let quantization = self
      .quantization
      .map(|q| Quantization::new(q.scale, q.zero_point))
      .transpose()?;

    let bytes: Vec<u8> = match dtype {
      TensorType::Float32 => self
        .data
        .iter()
        .flat_map(|&v| (v as f32).to_le_bytes())
        .collect(),
      TensorType::UInt8 => self
        .data
        .iter()
        .map(|&v| integral::<u8>(dtype, v))
        .collect::<Result<_, _>>()?,
      TensorType::Int8 => self
        .data
        .iter()
        .map(|&v| integral::<i8>(dtype, v).map(|v| v as u8))
        .collect::<Result<_, _>>()?,
      TensorType::Int32 => self
        .data
        .iter()
        .map(|&v| integral::<i32>(dtype, v))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flat_map(i32::to_le_bytes)
        .collect(),
    };

    RawOutputTensor::new(dtype, self.shape, quantization, bytes)
  }

  pub fn from_tensor(tensor: &RawOutputTensor) -> Self {
    let bytes = tensor.as_bytes();
    let data = match tensor.dtype() {
      TensorType::Float32 => bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
        .collect(),
      TensorType::UInt8 => bytes.iter().map(|&v| v as f64).collect(),
      TensorType::Int8 => bytes.iter().map(|&v| v as i8 as f64).collect(),
      TensorType::Int32 => bytes
        .chunks_exact(4)
        .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
        .collect(),
    };

    Self {
      dtype: tensor.dtype().as_str().to_string(),
      shape: tensor.shape(),
      quantization: tensor.quantization().map(|q| RecordedQuantization {
        scale: q.scale(),
        zero_point: q.zero_point(),
      }),
      data,
    }
  }
}

/// 整数类型的记录值必须是目标类型范围内的整数
fn integral<T: TryFrom<i64>>(dtype: TensorType, value: f64) -> Result<T, TensorError> {
  let invalid = TensorError::InvalidElement { dtype, value };
  if value.fract() != 0.0 {
    return Err(invalid);
  }
  T::try_from(value as i64).map_err(|_| invalid)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordFile {
  One(RecordedTensor),
  Many(Vec<RecordedTensor>),
}

/// 按顺序循环回放预先录制的输出张量，用于离线调试后处理
#[derive(Debug)]
pub struct TensorReplayEngine {
  tensors: Vec<RawOutputTensor>,
  calls: AtomicU64,
  fail_every: Option<u64>,
}

impl FromUrlWithScheme for TensorReplayEngine {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for TensorReplayEngine {
  type Error = InferenceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InferenceError::SchemeMismatch(url.scheme().to_string()));
    }

    let path = PathBuf::from(url.path());
    let fail_every = url
      .query_pairs()
      .find(|(k, _)| k == "fail_every")
      .and_then(|(_, v)| v.parse().ok())
      .filter(|&n: &u64| n > 0);

    let tensors = if path.is_dir() {
      let mut files: Vec<PathBuf> = std::fs::read_dir(&path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
      files.sort();
      let mut tensors = Vec::new();
      for file in files {
        tensors.extend(load_records(&file)?);
      }
      tensors
    } else {
      load_records(&path)?
    };

    if tensors.is_empty() {
      return Err(InferenceError::NoTensors(path.display().to_string()));
    }
    info!("载入 {} 个回放张量: {}", tensors.len(), path.display());

    Ok(Self {
      tensors,
      calls: AtomicU64::new(0),
      fail_every,
    })
  }
}

fn load_records(path: &Path) -> Result<Vec<RawOutputTensor>, InferenceError> {
  debug!("读取张量记录: {}", path.display());
  let file = std::fs::File::open(path)?;
  let record_file: RecordFile = serde_json::from_reader(std::io::BufReader::new(file))?;
  let records = match record_file {
    RecordFile::One(record) => vec![record],
    RecordFile::Many(records) => records,
  };
  records
    .into_iter()
    .map(|r| r.into_tensor().map_err(InferenceError::from))
    .collect()
}

impl TensorReplayEngine {
  pub fn from_tensors(tensors: Vec<RawOutputTensor>) -> Result<Self, InferenceError> {
    if tensors.is_empty() {
      return Err(InferenceError::NoTensors("<memory>".to_string()));
    }
    Ok(Self {
      tensors,
      calls: AtomicU64::new(0),
      fail_every: None,
    })
  }

  /// 每第 n 次调用返回推理失败，用来演练失败路径
  pub fn with_fail_every(mut self, n: u64) -> Self {
    self.fail_every = (n > 0).then_some(n);
    self
  }

  pub fn len(&self) -> usize {
    self.tensors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tensors.is_empty()
  }
}

impl<F> InferenceEngine<F> for TensorReplayEngine {
  fn run(&self, _frame: &F) -> Result<RawOutputTensor, InferenceError> {
    let call = self.calls.fetch_add(1, Ordering::Relaxed);
    if self.fail_every.is_some_and(|n| (call + 1) % n == 0) {
      return Err(InferenceError::Failure(format!("第 {} 次回放被注入失败", call + 1)));
    }
    let index = (call % self.tensors.len() as u64) as usize;
    Ok(self.tensors[index].clone())
  }
}
