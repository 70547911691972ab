//! 医生诊室控制台
//!
//! 按科室和医生展示候诊、就诊中和已完成的患者，并负责叫号和结束就诊

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zentri_core::{ConsultationRecord, PatientRecord, PatientStatus, Result, ZentriError};

use crate::queue::MINUTES_PER_PATIENT;
use crate::store::{DispatchOutcome, IgnoreReason, QueueStore, StoreAction};

/// 控制台统计
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsoleStats {
    pub waiting: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub estimated_total_wait_minutes: u32,
}

/// 某位医生的队列视图
#[derive(Debug, Clone)]
pub struct DoctorQueueView<'a> {
    pub department: &'a str,
    pub doctor: &'a str,
    pub waiting: Vec<&'a PatientRecord>,
    /// 同一医生可能在多家医院各有一位就诊中的患者
    pub in_progress: Vec<&'a PatientRecord>,
    pub completed: Vec<&'a PatientRecord>,
}

impl DoctorQueueView<'_> {
    pub fn stats(&self) -> ConsoleStats {
        ConsoleStats {
            waiting: self.waiting.len(),
            in_progress: self.in_progress.len(),
            completed: self.completed.len(),
            estimated_total_wait_minutes: self.waiting.len() as u32 * MINUTES_PER_PATIENT,
        }
    }
}

/// 就诊结束时填写的病历
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConsultationNote {
    pub diagnosis: String,
    pub notes: String,
    pub prescription: String,
    pub rating: Option<u8>,
}

impl ConsultationNote {
    pub fn validate(&self) -> Result<()> {
        if let Some(rating) = self.rating {
            if !(1..=5).contains(&rating) {
                return Err(ZentriError::Validation(format!(
                    "rating must be between 1 and 5, got {}",
                    rating
                )));
            }
        }
        Ok(())
    }
}

/// 诊室控制台
#[derive(Debug, Clone)]
pub struct ConsultationConsole {
    department: String,
    doctor: String,
}

impl ConsultationConsole {
    pub fn new(department: impl Into<String>, doctor: impl Into<String>) -> Self {
        Self {
            department: department.into(),
            doctor: doctor.into(),
        }
    }

    pub fn department(&self) -> &str {
        &self.department
    }

    pub fn doctor(&self) -> &str {
        &self.doctor
    }

    /// 切换科室和医生，只影响展示内容
    pub fn select(&mut self, department: impl Into<String>, doctor: impl Into<String>) {
        self.department = department.into();
        self.doctor = doctor.into();
        tracing::debug!("Console switched to {} / {}", self.department, self.doctor);
    }

    /// 当前医生的队列视图
    pub fn view<'a>(&'a self, store: &'a QueueStore) -> DoctorQueueView<'a> {
        let mut view = DoctorQueueView {
            department: &self.department,
            doctor: &self.doctor,
            waiting: Vec::new(),
            in_progress: Vec::new(),
            completed: Vec::new(),
        };

        for patient in store
            .patients()
            .iter()
            .filter(|p| p.is_seen_by(&self.department, &self.doctor))
        {
            match patient.status {
                PatientStatus::Waiting => view.waiting.push(patient),
                PatientStatus::InProgress => view.in_progress.push(patient),
                PatientStatus::Completed => view.completed.push(patient),
            }
        }

        view
    }

    /// 叫号
    ///
    /// 同一医生已有就诊中的患者时先将其结束，再让目标患者进入诊室，两步作为一次原子变更。
    pub fn grant_access(&self, store: &mut QueueStore, id: Uuid) -> DispatchOutcome {
        let Some(target) = store.patient(id) else {
            tracing::warn!("Grant access ignored: patient {} not found", id);
            return DispatchOutcome::Ignored(IgnoreReason::UnknownPatient(id));
        };

        let mut actions: Vec<StoreAction> = store
            .patients()
            .iter()
            .filter(|p| {
                p.id != id
                    && p.status == PatientStatus::InProgress
                    && p.is_seen_by(&target.department, &target.doctor)
            })
            .map(|p| StoreAction::SetPatientStatus {
                id: p.id,
                status: PatientStatus::Completed,
            })
            .collect();

        let auto_completed = actions.len();
        actions.push(StoreAction::SetPatientStatus {
            id,
            status: PatientStatus::InProgress,
        });

        let outcome = store.dispatch_batch(actions);
        if outcome.is_applied() {
            tracing::info!(
                "Granted access to patient {} ({} consultation(s) auto-completed)",
                id,
                auto_completed
            );
        }
        outcome
    }

    /// 结束就诊，对已完成的患者重复调用不产生变化
    pub fn complete_consultation(&self, store: &mut QueueStore, id: Uuid) -> DispatchOutcome {
        store.dispatch(StoreAction::SetPatientStatus {
            id,
            status: PatientStatus::Completed,
        })
    }

    /// 结束就诊并保存病历
    pub fn complete_with_record(
        &self,
        store: &mut QueueStore,
        id: Uuid,
        note: ConsultationNote,
    ) -> Result<DispatchOutcome> {
        note.validate()?;

        let record = ConsultationRecord {
            patient_id: id,
            diagnosis: note.diagnosis,
            notes: note.notes,
            prescription: note.prescription,
            rating: note.rating,
            recorded_at: Utc::now(),
        };

        Ok(store.dispatch_batch(vec![
            StoreAction::SetPatientStatus {
                id,
                status: PatientStatus::Completed,
            },
            StoreAction::AttachConsultation(record),
        ]))
    }
}
