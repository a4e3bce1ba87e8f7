//! 테스트 실행 로깅: [`LogSink`] 위의 direct/buffered 텍스트 로거
//!
//! [`Logger`]는 테스트 실행의 사람이 읽는 리포트(테스트/스테이지/스텝 배너,
//! 자유 텍스트, 데이터, 에러 체인)를 만듭니다. 두 가지 모드가 있습니다:
//!
//! - **direct**: 모든 항목을 즉시 싱크에 기록
//! - **buffered**: 소유자가 버퍼를 가져갈 때까지 메모리에 누적.
//!   동시 실행 스텝은 이 모드로 기록하고, 완료 후 메인 로그에 하나의
//!   연속된 블록으로 출력됩니다.
//!
//! 모든 항목은 운영자를 위한 `tracing` 이벤트로도 발행됩니다.

use std::error::Error as StdError;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::error::error_chain;
use crate::stage::Stage;

const TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f %d/%m/%Y";
const RULE: &str = "------------------------------------------------------------";

// ─── LogSink ─────────────────────────────────────────────────────────

/// 테스트 실행 로그의 출력 대상
///
/// `write`는 완전한 블록(`\n`으로 끝나는 한 줄 이상)을 받으며,
/// 한 블록을 다른 쓰기와 섞어서 기록하면 안 됩니다.
pub trait LogSink: Send + Sync {
    /// 텍스트 블록 추가
    fn write(&self, block: &str);

    /// 버퍼링된 출력 flush
    fn flush(&self) {}
}

/// 표준 출력에 로그 기록
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write(&self, block: &str) {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        if let Err(e) = handle.write_all(block.as_bytes()) {
            tracing::warn!(error = %e, "failed to write test log to stdout");
        }
    }

    fn flush(&self) {
        if let Err(e) = std::io::stdout().flush() {
            tracing::warn!(error = %e, "failed to flush stdout");
        }
    }
}

/// 파일에 로그 추가 기록
pub struct FileSink {
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    /// `path`를 추가 모드로 열고, 없으면 생성합니다.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl LogSink for FileSink {
    fn write(&self, block: &str) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writer.write_all(block.as_bytes()) {
            tracing::warn!(error = %e, "failed to write test log file");
        }
    }

    fn flush(&self) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writer.flush() {
            tracing::warn!(error = %e, "failed to flush test log file");
        }
    }
}

/// 메모리에 로그 보관. 복제본은 같은 저장소를 공유합니다.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    blocks: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    /// 빈 싱크 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 기록된 순서대로의 블록 목록
    pub fn blocks(&self) -> Vec<String> {
        self.blocks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 지금까지 기록된 모든 줄 (순서대로)
    pub fn lines(&self) -> Vec<String> {
        self.blocks()
            .iter()
            .flat_map(|block| block.lines().map(str::to_owned).collect::<Vec<_>>())
            .collect()
    }

    /// 전체 로그를 하나의 문자열로 반환
    pub fn contents(&self) -> String {
        self.blocks().concat()
    }
}

impl LogSink for MemorySink {
    fn write(&self, block: &str) {
        self.blocks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(block.to_owned());
    }
}

// ─── Logger ──────────────────────────────────────────────────────────

#[derive(Clone)]
enum Target {
    Direct(Arc<dyn LogSink>),
    Buffered(Arc<Mutex<String>>),
}

/// 테스트 실행 로거
///
/// 복제 비용이 낮으며, 복제본은 같은 싱크 또는 버퍼에 기록합니다.
#[derive(Clone)]
pub struct Logger {
    target: Target,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.target {
            Target::Direct(_) => "direct",
            Target::Buffered(_) => "buffered",
        };
        f.debug_struct("Logger").field("mode", &mode).finish()
    }
}

impl Logger {
    /// `sink`에 바로 기록하는 로거
    pub fn direct(sink: Arc<dyn LogSink>) -> Self {
        Self {
            target: Target::Direct(sink),
        }
    }

    /// 메모리에 항목을 누적하는 로거
    pub fn buffered() -> Self {
        Self {
            target: Target::Buffered(Arc::new(Mutex::new(String::new()))),
        }
    }

    /// 즉시 기록 대신 버퍼링하는지 여부
    pub fn is_buffered(&self) -> bool {
        matches!(self.target, Target::Buffered(_))
    }

    /// 버퍼를 비우고 그 내용을 반환합니다.
    ///
    /// direct 로거는 버퍼가 없으므로 빈 문자열을 반환합니다.
    pub fn take_buffer(&self) -> String {
        match &self.target {
            Target::Direct(_) => String::new(),
            Target::Buffered(buffer) => {
                std::mem::take(&mut *buffer.lock().unwrap_or_else(PoisonError::into_inner))
            }
        }
    }

    /// `block`을 하나의 단위로 기록 (예: 드레인된 동시 실행 스텝 로그)
    pub fn write_block(&self, block: &str) {
        if block.is_empty() {
            return;
        }
        match &self.target {
            Target::Direct(sink) => sink.write(block),
            Target::Buffered(buffer) => buffer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_str(block),
        }
    }

    pub fn test_start(&self, test_name: &str, at: DateTime<Local>) {
        tracing::info!(test = test_name, "test started");
        self.write_block(&format!(
            "{RULE}\nTest '{test_name}' started @ {}\n{RULE}\n",
            at.format(TIMESTAMP_FORMAT)
        ));
    }

    pub fn test_end(&self, test_name: &str, at: DateTime<Local>, passed: bool) {
        let verdict = if passed { "PASSED" } else { "FAILED" };
        if passed {
            tracing::info!(test = test_name, "test passed");
        } else {
            tracing::warn!(test = test_name, "test failed");
        }
        self.write_block(&format!(
            "{RULE}\nTest '{test_name}' {verdict} @ {}\n{RULE}\n",
            at.format(TIMESTAMP_FORMAT)
        ));
    }

    pub fn stage_start(&self, stage: Stage, at: DateTime<Local>) {
        tracing::info!(stage = %stage, "stage started");
        self.write_block(&format!(
            "Stage '{stage}' started @ {}\n",
            at.format(TIMESTAMP_FORMAT)
        ));
    }

    pub fn stage_end(&self, stage: Stage, at: DateTime<Local>) {
        tracing::info!(stage = %stage, "stage ended");
        self.write_block(&format!(
            "Stage '{stage}' ended @ {}\n",
            at.format(TIMESTAMP_FORMAT)
        ));
    }

    pub fn step_start(&self, step: &str, at: DateTime<Local>) {
        tracing::debug!(step, "step started");
        self.write_block(&format!(
            "Step '{step}' started @ {}\n",
            at.format(TIMESTAMP_FORMAT)
        ));
    }

    /// 워커 풀에 넘겨진 스텝의 디스패치 배너
    pub fn step_start_concurrent(&self, step: &str, at: DateTime<Local>) {
        tracing::debug!(step, "step dispatched concurrently");
        self.write_block(&format!(
            "Step '{step}' started concurrently @ {}\n",
            at.format(TIMESTAMP_FORMAT)
        ));
    }

    pub fn step_end(&self, step: &str, at: DateTime<Local>, elapsed: Duration) {
        tracing::debug!(step, elapsed_ms = elapsed.as_millis() as u64, "step ended");
        self.write_block(&format!(
            "Step '{step}' ended @ {} ({} ms)\n",
            at.format(TIMESTAMP_FORMAT),
            elapsed.as_millis()
        ));
    }

    pub fn info(&self, message: &str) {
        tracing::info!("{message}");
        self.write_block(&format!("Info: {message}\n"));
    }

    pub fn warning(&self, message: &str) {
        tracing::warn!("{message}");
        self.write_block(&format!("Warning: {message}\n"));
    }

    pub fn error(&self, message: &str) {
        tracing::error!("{message}");
        self.write_block(&format!("Error: {message}\n"));
    }

    /// 레이블이 붙은 데이터 기록 (예: 응답 본문)
    pub fn data(&self, description: &str, data: &str) {
        tracing::debug!(description, bytes = data.len(), "data logged");
        let mut block = format!("Data: {description}\n{data}");
        if !block.ends_with('\n') {
            block.push('\n');
        }
        self.write_block(&block);
    }

    /// 에러와 `source()` 체인의 모든 원인을 기록
    pub fn error_chain(&self, err: &(dyn StdError + 'static)) {
        let chain = error_chain(err);
        tracing::error!(error = %err, depth = chain.len(), "error logged");
        let mut block = String::new();
        for (depth, message) in chain.iter().enumerate() {
            if depth == 0 {
                block.push_str(&format!("Error: {message}\n"));
            } else {
                block.push_str(&format!("  caused by: {message}\n"));
            }
        }
        self.write_block(&block);
    }

    /// 하위 싱크 flush. 버퍼링 로거는 flush할 것이 없습니다.
    pub fn close(&self) {
        if let Target::Direct(sink) = &self.target {
            sink.flush();
        }
    }
}
