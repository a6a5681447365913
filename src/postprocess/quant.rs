// 该文件是 Shoushi （手势） 项目的一部分。
// src/postprocess/quant.rs - 反量化
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

use crate::{
  postprocess::DecodeError,
  tensor::{RawOutputTensor, TensorType},
};

/// 将张量转换为稠密的 f32 数据写入 `output`，保持属性优先的排列
///
/// float32 原样拷贝；uint8 按 `scale * (v - zero_point)` 反量化；其余类型返回错误。
pub fn normalize_into(tensor: &RawOutputTensor, output: &mut Vec<f32>) -> Result<(), DecodeError> {
  output.clear();
  output.reserve(tensor.len());

  match tensor.dtype() {
    TensorType::Float32 => {
      output.extend(
        tensor
          .as_bytes()
          .chunks_exact(4)
          .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
      );
    }
    TensorType::UInt8 => {
      let quant = tensor
        .quantization()
        .ok_or(DecodeError::MissingQuantization)?;
      output.extend(tensor.as_bytes().iter().map(|&v| quant.dequantize(v)));
    }
    other => return Err(DecodeError::UnsupportedTensorType(other)),
  }

  Ok(())
}
