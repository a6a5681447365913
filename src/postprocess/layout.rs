// 该文件是 Shoushi （手势） 项目的一部分。
// src/postprocess/layout.rs - 属性优先到预测优先的转置
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

/// `[A][P]` -> `[P][A]`，满足 `output[p * A + a] == input[a * P + p]`
pub fn transpose_into(input: &[f32], attributes: usize, predictions: usize, output: &mut Vec<f32>) {
  debug_assert_eq!(input.len(), attributes * predictions);

  output.clear();
  output.resize(attributes * predictions, 0.0);

  for (a, plane) in input.chunks_exact(predictions).enumerate() {
    for (p, &value) in plane.iter().enumerate() {
      output[p * attributes + a] = value;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn transpose_moves_every_element() {
    let attributes = 6;
    let predictions = 4;
    let input: Vec<f32> = (0..attributes * predictions).map(|v| v as f32).collect();
    let mut output = Vec::new();
    transpose_into(&input, attributes, predictions, &mut output);

    for a in 0..attributes {
      for p in 0..predictions {
        assert_eq!(output[p * attributes + a], input[a * predictions + p]);
      }
    }
  }

  #[test]
  fn single_prediction_is_unchanged() {
    let input = [320.0, 320.0, 100.0, 100.0, 0.9, 0.1, 0.8, 0.05];
    let mut output = vec![1.0; 100];
    transpose_into(&input, 8, 1, &mut output);
    assert_eq!(output, input);
  }
}
