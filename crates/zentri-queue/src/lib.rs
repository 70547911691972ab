//! # Zentri排队模块
//!
//! 提供门诊排队的完整流程，包括：
//! - 共享状态仓库：患者记录、候诊号计数器，所有修改经由 reducer
//! - 就诊状态机：候诊 → 就诊中 → 已完成，只允许前进
//! - 候诊位置推算：队列位置与预计等待时间
//! - 诊室控制台：叫号与结束就诊
//! - 挂号向导与扫码能力

pub mod console;
pub mod queue;
pub mod registration;
pub mod scanner;
pub mod state_machine;
pub mod store;

// 重新导出主要类型
pub use console::{ConsoleStats, ConsultationConsole, ConsultationNote, DoctorQueueView};
pub use queue::{
    estimated_wait_minutes, queue_status, queue_status_by_param, QueueStanding, QueueStatus,
    MINUTES_PER_PATIENT,
};
pub use registration::{RegistrationDraft, RegistrationStep, RegistrationWizard};
pub use scanner::{FixedScanner, QrScanner, ScanPayload, ScanSession, SimulatedScanner};
pub use state_machine::{ConsultationEvent, ConsultationStateMachine};
pub use store::{DispatchOutcome, IgnoreReason, QueueStore, StoreAction};
