//! 二维码扫描
//!
//! 扫码被建模为可注入的异步能力。模拟实现等待固定时长后返回固定的医院信息，
//! 测试中可替换为立即返回的实现。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use zentri_core::{Result, ZentriError};

/// 模拟扫码的默认等待时间
pub const DEFAULT_SCAN_DELAY: Duration = Duration::from_millis(2000);

/// 模拟扫码读到的二维码内容
const SIMULATED_SCAN_JSON: &str =
    r#"{"hospital":"SMS Hospital","department":"Cardiology","location":"JLN Marg, Jaipur"}"#;

/// 二维码中的医院信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanPayload {
    pub hospital: String,
    pub department: String,
    pub location: String,
}

impl ScanPayload {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// 模拟扫码返回的固定内容
    pub fn sample() -> Self {
        Self {
            hospital: "SMS Hospital".to_string(),
            department: "Cardiology".to_string(),
            location: "JLN Marg, Jaipur".to_string(),
        }
    }
}

/// 扫码能力
#[async_trait]
pub trait QrScanner: Send + Sync {
    /// 扫描器名称
    fn name(&self) -> &str;

    /// 执行一次扫描
    async fn scan(&self) -> Result<ScanPayload>;
}

/// 模拟扫描器，等待固定时长后返回固定内容
#[derive(Debug, Clone)]
pub struct SimulatedScanner {
    delay: Duration,
}

impl SimulatedScanner {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for SimulatedScanner {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_DELAY)
    }
}

#[async_trait]
impl QrScanner for SimulatedScanner {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn scan(&self) -> Result<ScanPayload> {
        tracing::debug!("Simulated scan started, waiting {:?}", self.delay);
        tokio::time::sleep(self.delay).await;

        let payload = ScanPayload::from_json(SIMULATED_SCAN_JSON)?;
        tracing::info!("QR code detected: {} ({})", payload.hospital, payload.department);
        Ok(payload)
    }
}

/// 立即返回指定内容的扫描器
#[derive(Debug, Clone)]
pub struct FixedScanner {
    payload: ScanPayload,
}

impl FixedScanner {
    pub fn new(payload: ScanPayload) -> Self {
        Self { payload }
    }
}

#[async_trait]
impl QrScanner for FixedScanner {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn scan(&self) -> Result<ScanPayload> {
        Ok(self.payload.clone())
    }
}

/// 一次进行中的扫码
///
/// 会话被丢弃或取消时中止后台任务，结果被丢弃。需要在 tokio 运行时内创建。
#[derive(Debug)]
pub struct ScanSession {
    handle: Option<JoinHandle<Result<ScanPayload>>>,
}

impl ScanSession {
    pub fn start(scanner: Arc<dyn QrScanner>) -> Self {
        tracing::info!("Starting scan with {} scanner", scanner.name());
        let handle = tokio::spawn(async move { scanner.scan().await });
        Self {
            handle: Some(handle),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true)
    }

    /// 等待扫码结果
    pub async fn finish(mut self) -> Result<ScanPayload> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| ZentriError::Scanner("scan session already consumed".to_string()))?;

        handle
            .await
            .map_err(|e| ZentriError::Scanner(format!("scan task failed: {}", e)))?
    }

    /// 取消扫码
    pub fn cancel(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                tracing::debug!("Discarding pending scan");
            }
            handle.abort();
        }
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.abort();
    }
}
