// 该文件是 Shoushi （手势） 项目的一部分。
// src/task.rs - 任务流程
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
  fmt::Display,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc,
  },
  thread,
  time::{Duration, Instant},
};

use anyhow::bail;
use tracing::{debug, info, warn};

use crate::{
  detection::DetectReport,
  frame::SourceFrame,
  model::{Model, infer_or_empty},
  output::Render,
  scheduler::{AdmissionPermit, FrameScheduler},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 只处理第一帧；推理失败时输出空结果
pub struct OneShotTask;

impl<
  F: SourceFrame,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = DetectReport>,
  O: Render<F, DetectReport, Error = RE>,
> Task<I, M, O> for OneShotTask
where
  M::Error: Display,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = Instant::now();
    let result = infer_or_empty(&model, &frame);
    let elapsed = now.elapsed();
    info!("推理完成，{} 个目标，耗时: {:.2?}", result.len(), elapsed);
    output.render_result(&frame, &result)?;
    info!("渲染完成，总耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 对同一帧重复推理，统计去掉预热轮次之后的平均耗时
#[derive(Debug, Clone, Copy)]
pub struct RepeatShotTask {
  repeat: usize,
  warmup: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      repeat: 1000,
      warmup: 2,
    }
  }
}

impl RepeatShotTask {
  pub fn with_repeat(mut self, repeat: usize) -> Self {
    self.repeat = repeat;
    self
  }

  pub fn with_warmup(mut self, warmup: usize) -> Self {
    self.warmup = warmup;
    self
  }
}

impl<
  F: SourceFrame,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = DetectReport>,
  O: Render<F, DetectReport, Error = RE>,
> Task<I, M, O> for RepeatShotTask
where
  M::Error: Display,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    if self.repeat <= self.warmup {
      bail!(
        "重复次数 {} 必须大于预热次数 {}",
        self.repeat,
        self.warmup
      );
    }

    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let mut times = Vec::with_capacity(self.repeat);
    for i in 0..self.repeat {
      let now = Instant::now();
      let result = infer_or_empty(&model, &frame);
      let elapsed = now.elapsed();
      debug!("({})推理完成，耗时: {:.2?}", i, elapsed);
      output.render_result(&frame, &result)?;
      times.push(elapsed);
    }

    let measured = &times[self.warmup..];
    warn!(
      "平均推理时间: {:.2?} ({} 次, 跳过预热 {} 次)",
      measured.iter().sum::<Duration>() / measured.len() as u32,
      measured.len(),
      self.warmup
    );

    Ok(())
  }
}

/// 每秒窗口内的帧率统计
#[derive(Debug, Default, Clone)]
pub struct FpsMeter {
  window_start: Option<Instant>,
  frames: u32,
  fps: f64,
}

impl FpsMeter {
  const WINDOW: Duration = Duration::from_secs(1);

  pub fn new() -> Self {
    Self::default()
  }

  pub fn tick(&mut self) -> f64 {
    self.tick_at(Instant::now())
  }

  /// 记录一帧；窗口满一秒时刷新帧率并开启新窗口
  pub fn tick_at(&mut self, now: Instant) -> f64 {
    let start = *self.window_start.get_or_insert(now);
    self.frames += 1;
    let elapsed = now.saturating_duration_since(start);
    if elapsed >= Self::WINDOW {
      self.fps = self.frames as f64 / elapsed.as_secs_f64();
      self.frames = 0;
      self.window_start = Some(now);
    }
    self.fps
  }

  pub fn fps(&self) -> f64 {
    self.fps
  }
}

/// 实时任务：输入线程只负责取帧和准入，推理与渲染在工作线程完成。
/// 工作线程忙时到达的帧被直接丢弃。
#[derive(Debug, Default)]
pub struct LiveTask {
  frame_number: Option<usize>,
  interrupt: bool,
  scheduler: FrameScheduler,
}

impl LiveTask {
  /// 最多从输入读取的帧数（包括被丢弃的帧）
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 是否响应 Ctrl-C
  pub fn with_interrupt(mut self, interrupt: bool) -> Self {
    self.interrupt = interrupt;
    self
  }

  pub fn with_scheduler(mut self, scheduler: FrameScheduler) -> Self {
    self.scheduler = scheduler;
    self
  }

  fn install_interrupt(&self) -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    if !self.interrupt {
      return stop;
    }

    let flag = Arc::clone(&stop);
    let installed = ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      flag.store(true, Ordering::Release);
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    });
    if let Err(e) = installed {
      warn!("无法注册 Ctrl-C 处理: {}", e);
    }
    stop
  }
}

fn process_admitted<F, M, O>(rx: mpsc::Receiver<(F, AdmissionPermit)>, model: M, output: O)
where
  F: SourceFrame,
  M: Model<Input = F, Output = DetectReport>,
  M::Error: Display,
  O: Render<F, DetectReport>,
  O::Error: Display,
{
  let mut fps = FpsMeter::new();
  for (frame, permit) in rx {
    let report = infer_or_empty(&model, &frame);
    if let Err(e) = output.render_result(&frame, &report) {
      warn!("第 {} 帧渲染失败: {}", frame.index(), e);
    }
    let fps = fps.tick();
    info!(
      "第 {} 帧: {} 个目标, 后处理 {:.2?}, FPS {:.1}",
      frame.index(),
      report.len(),
      report.elapsed,
      fps
    );
    drop(permit);
  }
}

impl<F, I, M, O> Task<I, M, O> for LiveTask
where
  F: SourceFrame + Send,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = DetectReport> + Send,
  M::Error: Display,
  O: Render<F, DetectReport> + Send,
  O::Error: Display,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let stop = self.install_interrupt();
    let scheduler = self.scheduler.clone();

    thread::scope(|scope| -> anyhow::Result<()> {
      let (tx, rx) = mpsc::channel();
      let worker = thread::Builder::new()
        .name("shoushi-worker".to_string())
        .spawn_scoped(scope, move || process_admitted(rx, model, output))?;

      let mut received = 0;
      for frame in input {
        if stop.load(Ordering::Acquire) {
          warn!("中断信号接收，退出任务循环");
          break;
        }
        received += 1;

        match scheduler.try_admit() {
          Some(permit) => {
            if tx.send((frame, permit)).is_err() {
              warn!("工作线程已退出，停止取帧");
              break;
            }
          }
          None => debug!("流水线忙, 丢弃第 {} 帧", frame.index()),
        }

        if self.frame_number.is_some_and(|n| received >= n) {
          info!("达到指定帧数 {}, 退出任务循环", received);
          break;
        }
      }

      drop(tx);
      if worker.join().is_err() {
        bail!("工作线程异常退出");
      }
      Ok(())
    })?;

    info!(
      "任务完成，处理 {} 帧, 丢弃 {} 帧",
      scheduler.admitted(),
      scheduler.dropped()
    );
    Ok(())
  }
}
