// 该文件是 Shoushi （手势） 项目的一部分。
// src/output/latest.rs - 最新结果槽
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
  convert::Infallible,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{detection::DetectReport, output::Render};

/// 只保留最近一次结果，后写入的覆盖先写入的。克隆体共享同一个槽，
/// 一端交给任务写入，另一端由界面读取。
#[derive(Debug, Clone, Default)]
pub struct LatestResult {
  slot: Arc<Mutex<Option<DetectReport>>>,
}

impl LatestResult {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Option<DetectReport>> {
    self.slot.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn get(&self) -> Option<DetectReport> {
    self.lock().clone()
  }

  pub fn take(&self) -> Option<DetectReport> {
    self.lock().take()
  }

  pub fn publish(&self, report: DetectReport) {
    *self.lock() = Some(report);
  }
}

impl<F> Render<F, DetectReport> for LatestResult {
  type Error = Infallible;

  fn render_result(&self, _frame: &F, result: &DetectReport) -> Result<(), Self::Error> {
    self.publish(result.clone());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detection::ImageSize;

  #[test]
  fn last_write_wins() {
    let latest = LatestResult::new();
    let reader = latest.clone();
    assert!(reader.get().is_none());

    for index in 0..3 {
      let report = DetectReport::empty(index, ImageSize::new(1, 1), Default::default());
      latest.render_result(&(), &report).unwrap();
    }
    assert_eq!(reader.get().map(|r| r.frame_index), Some(2));
    assert_eq!(reader.take().map(|r| r.frame_index), Some(2));
    assert!(latest.get().is_none());
  }
}
