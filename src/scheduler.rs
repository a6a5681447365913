// 该文件是 Shoushi （手势） 项目的一部分。
// src/scheduler.rs - 单槽帧调度
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

//! 同一时刻最多只有一帧在流水线中；忙时到达的帧直接丢弃，不排队。

use std::sync::{
  Arc,
  atomic::{AtomicBool, AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct SchedulerState {
  busy: AtomicBool,
  admitted: AtomicU64,
  dropped: AtomicU64,
}

#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
  state: Arc<SchedulerState>,
}

impl FrameScheduler {
  pub fn new() -> Self {
    Self::default()
  }

  /// 空闲时占用槽位并返回许可；许可被释放（含 panic 展开）时槽位自动归还
  pub fn try_admit(&self) -> Option<AdmissionPermit> {
    match self
      .state
      .busy
      .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
    {
      Ok(_) => {
        self.state.admitted.fetch_add(1, Ordering::Relaxed);
        Some(AdmissionPermit {
          state: Arc::clone(&self.state),
        })
      }
      Err(_) => {
        self.state.dropped.fetch_add(1, Ordering::Relaxed);
        None
      }
    }
  }

  /// 在许可内同步执行 `f`，忙时返回 None
  pub fn run<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
    let _permit = self.try_admit()?;
    Some(f())
  }

  pub fn is_busy(&self) -> bool {
    self.state.busy.load(Ordering::Acquire)
  }

  pub fn admitted(&self) -> u64 {
    self.state.admitted.load(Ordering::Relaxed)
  }

  pub fn dropped(&self) -> u64 {
    self.state.dropped.load(Ordering::Relaxed)
  }
}

#[must_use = "许可被丢弃时槽位立即释放"]
#[derive(Debug)]
pub struct AdmissionPermit {
  state: Arc<SchedulerState>,
}

impl Drop for AdmissionPermit {
  fn drop(&mut self) {
    self.state.busy.store(false, Ordering::Release);
  }
}
