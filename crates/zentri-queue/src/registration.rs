//! 挂号流程
//!
//! 三步挂号向导：个人信息 → 医院/科室/医生 → 预约日期和时间。
//! 每一步必填项齐全后才能前进，提交时生成患者记录并写入仓库。

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zentri_core::utils::generate_patient_id;
use zentri_core::{Gender, PatientIntake, ProviderTriple, Result, ZentriError};

use crate::scanner::ScanPayload;
use crate::store::{DispatchOutcome, QueueStore, StoreAction};

/// 挂号步骤
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RegistrationStep {
    PersonalInformation,
    CareProvider,
    Schedule,
}

impl RegistrationStep {
    pub const ALL: [RegistrationStep; 3] = [
        RegistrationStep::PersonalInformation,
        RegistrationStep::CareProvider,
        RegistrationStep::Schedule,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            RegistrationStep::PersonalInformation => "Personal Information",
            RegistrationStep::CareProvider => "Hospital & Department",
            RegistrationStep::Schedule => "Date & Time",
        }
    }

    pub fn next(&self) -> Option<RegistrationStep> {
        match self {
            RegistrationStep::PersonalInformation => Some(RegistrationStep::CareProvider),
            RegistrationStep::CareProvider => Some(RegistrationStep::Schedule),
            RegistrationStep::Schedule => None,
        }
    }

    pub fn previous(&self) -> Option<RegistrationStep> {
        match self {
            RegistrationStep::PersonalInformation => None,
            RegistrationStep::CareProvider => Some(RegistrationStep::PersonalInformation),
            RegistrationStep::Schedule => Some(RegistrationStep::CareProvider),
        }
    }
}

/// 挂号表单草稿
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistrationDraft {
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub contact: String,
    pub id_number: String,
    pub hospital: String,
    pub department: String,
    pub doctor: String,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<NaiveTime>,
}

impl RegistrationDraft {
    /// 指定步骤缺失的必填项
    pub fn missing_fields(&self, step: RegistrationStep) -> Vec<&'static str> {
        let mut missing = Vec::new();
        match step {
            RegistrationStep::PersonalInformation => {
                if self.name.trim().is_empty() {
                    missing.push("name");
                }
                if self.age.is_none() {
                    missing.push("age");
                }
                if self.gender.is_none() {
                    missing.push("gender");
                }
                if self.contact.trim().is_empty() {
                    missing.push("contact");
                }
                if self.id_number.trim().is_empty() {
                    missing.push("id_number");
                }
            }
            RegistrationStep::CareProvider => {
                if self.hospital.trim().is_empty() {
                    missing.push("hospital");
                }
                if self.department.trim().is_empty() {
                    missing.push("department");
                }
                if self.doctor.trim().is_empty() {
                    missing.push("doctor");
                }
            }
            RegistrationStep::Schedule => {
                if self.appointment_date.is_none() {
                    missing.push("appointment_date");
                }
                if self.appointment_time.is_none() {
                    missing.push("appointment_time");
                }
            }
        }
        missing
    }

    pub fn validate_step(&self, step: RegistrationStep) -> Result<()> {
        let missing = self.missing_fields(step);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ZentriError::Validation(format!(
                "{}: missing {}",
                step.title(),
                missing.join(", ")
            )))
        }
    }

    /// 转换为挂号信息，要求所有步骤均已填写
    pub fn to_intake(&self) -> Result<PatientIntake> {
        for step in RegistrationStep::ALL {
            self.validate_step(step)?;
        }

        let (Some(age), Some(gender), Some(appointment_date), Some(appointment_time)) = (
            self.age,
            self.gender,
            self.appointment_date,
            self.appointment_time,
        ) else {
            return Err(ZentriError::Validation("incomplete registration".to_string()));
        };

        Ok(PatientIntake {
            name: self.name.trim().to_string(),
            age,
            gender,
            contact: self.contact.trim().to_string(),
            id_number: self.id_number.trim().to_string(),
            provider: ProviderTriple::new(
                self.hospital.trim(),
                self.department.trim(),
                self.doctor.trim(),
            ),
            appointment_date,
            appointment_time,
        })
    }
}

/// 挂号向导
#[derive(Debug, Clone)]
pub struct RegistrationWizard {
    draft: RegistrationDraft,
    step: RegistrationStep,
}

impl RegistrationWizard {
    pub fn new() -> Self {
        Self {
            draft: RegistrationDraft::default(),
            step: RegistrationStep::PersonalInformation,
        }
    }

    /// 使用扫码结果预填医院和科室
    pub fn from_scan(payload: &ScanPayload) -> Self {
        let mut wizard = Self::new();
        wizard.prefill_from_scan(payload);
        wizard
    }

    pub fn prefill_from_scan(&mut self, payload: &ScanPayload) {
        self.draft.hospital = payload.hospital.clone();
        self.draft.department = payload.department.clone();
        tracing::debug!("Prefilled registration with {} / {}", payload.hospital, payload.department);
    }

    pub fn step(&self) -> RegistrationStep {
        self.step
    }

    pub fn draft(&self) -> &RegistrationDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut RegistrationDraft {
        &mut self.draft
    }

    /// 校验当前步骤并前进，最后一步校验通过后停留在原地
    pub fn next(&mut self) -> Result<RegistrationStep> {
        self.draft.validate_step(self.step)?;
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> RegistrationStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// 提交挂号，返回新患者的标识
    pub fn submit(self, store: &mut QueueStore) -> Result<Uuid> {
        let intake = self.draft.to_intake()?;
        store.catalog().validate_triple(&intake.provider)?;

        let id = generate_patient_id();
        match store.dispatch(StoreAction::AddPatient { id, intake }) {
            DispatchOutcome::Applied => Ok(id),
            DispatchOutcome::Ignored(reason) => Err(ZentriError::Validation(reason.to_string())),
        }
    }
}

impl Default for RegistrationWizard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zentri_core::PatientStatus;

    fn fill_personal(draft: &mut RegistrationDraft) {
        draft.name = "Ravi Meena".into();
        draft.age = Some(52);
        draft.gender = Some(Gender::Male);
        draft.contact = "9811111111".into();
        draft.id_number = "AADHAAR-1234".into();
    }

    fn fill_provider(draft: &mut RegistrationDraft) {
        draft.hospital = "SMS Hospital".into();
        draft.department = "Cardiology".into();
        draft.doctor = "Dr. Priya Agarwal".into();
    }

    fn fill_schedule(draft: &mut RegistrationDraft) {
        draft.appointment_date = NaiveDate::from_ymd_opt(2026, 10, 21);
        draft.appointment_time = NaiveTime::from_hms_opt(11, 15, 0);
    }

    #[test]
    fn test_next_blocks_on_missing_fields() {
        let mut wizard = RegistrationWizard::new();
        wizard.draft_mut().name = "Ravi Meena".into();

        let err = wizard.next().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("age"));
        assert!(message.contains("id_number"));
        assert!(!message.contains("name,"));
        assert_eq!(wizard.step(), RegistrationStep::PersonalInformation);
    }

    #[test]
    fn test_walk_steps() {
        let mut wizard = RegistrationWizard::new();
        fill_personal(wizard.draft_mut());
        assert_eq!(wizard.next().unwrap(), RegistrationStep::CareProvider);
        assert!(wizard.next().is_err());

        fill_provider(wizard.draft_mut());
        assert_eq!(wizard.next().unwrap(), RegistrationStep::Schedule);
        assert_eq!(wizard.back(), RegistrationStep::CareProvider);
        assert_eq!(wizard.next().unwrap(), RegistrationStep::Schedule);

        fill_schedule(wizard.draft_mut());
        assert_eq!(wizard.next().unwrap(), RegistrationStep::Schedule);
    }

    #[test]
    fn test_submit_adds_waiting_patient() {
        let mut store = QueueStore::default();
        let mut wizard = RegistrationWizard::new();
        fill_personal(wizard.draft_mut());
        fill_provider(wizard.draft_mut());
        fill_schedule(wizard.draft_mut());

        let id = wizard.submit(&mut store).unwrap();
        let patient = store.patient(id).unwrap();
        assert_eq!(patient.token_number, "Q001");
        assert_eq!(patient.status, PatientStatus::Waiting);
        assert_eq!(patient.doctor, "Dr. Priya Agarwal");
    }

    #[test]
    fn test_submit_rejects_incomplete_or_unknown_provider() {
        let mut store = QueueStore::default();

        let mut wizard = RegistrationWizard::new();
        fill_personal(wizard.draft_mut());
        assert!(matches!(wizard.submit(&mut store), Err(ZentriError::Validation(_))));

        let mut wizard = RegistrationWizard::new();
        fill_personal(wizard.draft_mut());
        fill_provider(wizard.draft_mut());
        fill_schedule(wizard.draft_mut());
        wizard.draft_mut().doctor = "Dr. Nobody".into();
        assert!(matches!(wizard.submit(&mut store), Err(ZentriError::Validation(_))));

        assert!(store.patients().is_empty());
        assert_eq!(store.current_token(), 1);
    }

    #[test]
    fn test_prefill_from_scan() {
        let wizard = RegistrationWizard::from_scan(&ScanPayload::sample());
        assert_eq!(wizard.draft().hospital, "SMS Hospital");
        assert_eq!(wizard.draft().department, "Cardiology");
        assert!(wizard.draft().doctor.is_empty());
    }
}
