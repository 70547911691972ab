//! 共享状态仓库
//!
//! 会话内唯一的数据来源：患者记录、候诊号计数器、诊疗记录和当前选择。
//! 所有修改都通过 [`StoreAction`] 进入 reducer，成功修改后递增版本号并通知订阅者。

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;
use uuid::Uuid;
use zentri_core::utils::format_token;
use zentri_core::{
    ConsultationRecord, PatientIntake, PatientRecord, PatientStatus, ProviderTriple,
    ReferenceCatalog,
};

use crate::state_machine::ConsultationStateMachine;

/// 仓库动作
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoreAction {
    AddPatient { id: Uuid, intake: PatientIntake },
    SetPatientStatus { id: Uuid, status: PatientStatus },
    SelectHospital(String),
    SelectDepartment(String),
    AttachConsultation(ConsultationRecord),
}

impl fmt::Display for StoreAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreAction::AddPatient { id, intake } => {
                write!(f, "add patient {} for {}", id, intake.provider)
            }
            StoreAction::SetPatientStatus { id, status } => {
                write!(f, "set patient {} to {}", id, status)
            }
            StoreAction::SelectHospital(name) => write!(f, "select hospital {}", name),
            StoreAction::SelectDepartment(name) => write!(f, "select department {}", name),
            StoreAction::AttachConsultation(record) => {
                write!(f, "attach consultation to patient {}", record.patient_id)
            }
        }
    }
}

/// 动作被忽略的原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreReason {
    UnknownPatient(Uuid),
    DuplicatePatient(Uuid),
    Unchanged { id: Uuid, status: PatientStatus },
    InvalidTransition { id: Uuid, from: PatientStatus, to: PatientStatus },
    ProviderBusy { id: Uuid, holder: Uuid },
    NotCompleted(Uuid),
    EmptyBatch,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::UnknownPatient(id) => write!(f, "patient {} not found", id),
            IgnoreReason::DuplicatePatient(id) => write!(f, "patient {} already registered", id),
            IgnoreReason::Unchanged { id, status } => {
                write!(f, "patient {} is already {}", id, status)
            }
            IgnoreReason::InvalidTransition { id, from, to } => {
                write!(f, "patient {} cannot move from {} to {}", id, from, to)
            }
            IgnoreReason::ProviderBusy { id, holder } => write!(
                f,
                "patient {} cannot start: patient {} is already in consultation",
                id, holder
            ),
            IgnoreReason::NotCompleted(id) => {
                write!(f, "patient {} has not completed a consultation", id)
            }
            IgnoreReason::EmptyBatch => write!(f, "batch contains no actions"),
        }
    }
}

/// 分发结果，仓库操作从不返回错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied,
    Ignored(IgnoreReason),
}

impl DispatchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, DispatchOutcome::Applied)
    }
}

/// 仓库状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreState {
    patients: Vec<PatientRecord>,
    current_token: u32,
    selected_hospital: Option<String>,
    selected_department: Option<String>,
    consultations: Vec<ConsultationRecord>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            patients: Vec::new(),
            current_token: 1,
            selected_hospital: None,
            selected_department: None,
            consultations: Vec::new(),
        }
    }
}

/// 排队仓库
#[derive(Debug)]
pub struct QueueStore {
    state: StoreState,
    catalog: ReferenceCatalog,
    state_machine: ConsultationStateMachine,
    revision: watch::Sender<u64>,
}

impl QueueStore {
    /// 使用指定参考目录创建仓库
    pub fn new(catalog: ReferenceCatalog) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: StoreState::default(),
            catalog,
            state_machine: ConsultationStateMachine::new(),
            revision,
        }
    }

    /// 分发单个动作
    pub fn dispatch(&mut self, action: StoreAction) -> DispatchOutcome {
        let summary = action.to_string();
        let outcome = self.apply(action);
        if outcome.is_applied() {
            self.publish();
            tracing::info!("Applied {}", summary);
        }
        outcome
    }

    /// 原子地分发一组动作
    ///
    /// 任一动作被忽略时整批回滚，订阅者最多收到一次变更。空批次视为被忽略。
    pub fn dispatch_batch(&mut self, actions: Vec<StoreAction>) -> DispatchOutcome {
        if actions.is_empty() {
            tracing::warn!("Ignored store batch: {}", IgnoreReason::EmptyBatch);
            return DispatchOutcome::Ignored(IgnoreReason::EmptyBatch);
        }

        let summaries: Vec<String> = actions.iter().map(ToString::to_string).collect();
        let snapshot = self.state.clone();
        for action in actions {
            if let DispatchOutcome::Ignored(reason) = self.apply(action) {
                self.state = snapshot;
                tracing::warn!("Batch rolled back: {}", reason);
                return DispatchOutcome::Ignored(reason);
            }
        }

        self.publish();
        tracing::info!("Applied batch: {}", summaries.join("; "));
        DispatchOutcome::Applied
    }

    /// 订阅版本变更
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// 当前版本号
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn patients(&self) -> &[PatientRecord] {
        &self.state.patients
    }

    pub fn patient(&self, id: Uuid) -> Option<&PatientRecord> {
        self.state.patients.iter().find(|p| p.id == id)
    }

    /// 下一个将被分配的序号
    pub fn current_token(&self) -> u32 {
        self.state.current_token
    }

    /// 下一个将被分配的候诊号
    pub fn next_token_number(&self) -> String {
        format_token(self.state.current_token)
    }

    pub fn selected_hospital(&self) -> Option<&str> {
        self.state.selected_hospital.as_deref()
    }

    pub fn selected_department(&self) -> Option<&str> {
        self.state.selected_department.as_deref()
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    pub fn consultations_for(&self, id: Uuid) -> Vec<&ConsultationRecord> {
        self.state
            .consultations
            .iter()
            .filter(|c| c.patient_id == id)
            .collect()
    }

    /// 三元组内正在就诊的患者
    pub fn in_progress_for(&self, provider: &ProviderTriple) -> Option<&PatientRecord> {
        self.state
            .patients
            .iter()
            .find(|p| p.status == PatientStatus::InProgress && p.is_in_queue(provider))
    }

    fn publish(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    fn apply(&mut self, action: StoreAction) -> DispatchOutcome {
        let outcome = match action {
            StoreAction::AddPatient { id, intake } => self.add_patient(id, intake),
            StoreAction::SetPatientStatus { id, status } => self.set_patient_status(id, status),
            StoreAction::SelectHospital(name) => {
                tracing::debug!("Selected hospital {}", name);
                self.state.selected_hospital = Some(name);
                DispatchOutcome::Applied
            }
            StoreAction::SelectDepartment(name) => {
                tracing::debug!("Selected department {}", name);
                self.state.selected_department = Some(name);
                DispatchOutcome::Applied
            }
            StoreAction::AttachConsultation(record) => self.attach_consultation(record),
        };

        if let DispatchOutcome::Ignored(reason) = &outcome {
            tracing::warn!("Ignored store action: {}", reason);
        }
        outcome
    }

    fn add_patient(&mut self, id: Uuid, intake: PatientIntake) -> DispatchOutcome {
        if self.patient(id).is_some() {
            return DispatchOutcome::Ignored(IgnoreReason::DuplicatePatient(id));
        }

        let token_number = format_token(self.state.current_token);
        let record = PatientRecord::from_intake(id, intake, token_number, Utc::now());

        tracing::debug!(
            "Registered patient {} as {} for {}",
            id,
            record.token_number,
            record.provider()
        );

        self.state.patients.push(record);
        self.state.current_token += 1;
        DispatchOutcome::Applied
    }

    fn set_patient_status(&mut self, id: Uuid, status: PatientStatus) -> DispatchOutcome {
        let Some(index) = self.state.patients.iter().position(|p| p.id == id) else {
            return DispatchOutcome::Ignored(IgnoreReason::UnknownPatient(id));
        };

        let current = self.state.patients[index].status;
        if current == status {
            return DispatchOutcome::Ignored(IgnoreReason::Unchanged { id, status });
        }

        if self.state_machine.check(current, status).is_err() {
            return DispatchOutcome::Ignored(IgnoreReason::InvalidTransition {
                id,
                from: current,
                to: status,
            });
        }

        // 同一三元组同一时间只允许一位患者就诊
        if status == PatientStatus::InProgress {
            let provider = self.state.patients[index].provider();
            if let Some(holder) = self.in_progress_for(&provider) {
                return DispatchOutcome::Ignored(IgnoreReason::ProviderBusy {
                    id,
                    holder: holder.id,
                });
            }
        }

        let patient = &mut self.state.patients[index];
        patient.status = status;
        tracing::debug!(
            "Updated patient {} ({}) status from {} to {}",
            id,
            patient.token_number,
            current,
            status
        );
        DispatchOutcome::Applied
    }

    fn attach_consultation(&mut self, record: ConsultationRecord) -> DispatchOutcome {
        let id = record.patient_id;
        match self.patient(id) {
            None => DispatchOutcome::Ignored(IgnoreReason::UnknownPatient(id)),
            Some(p) if p.status != PatientStatus::Completed => {
                DispatchOutcome::Ignored(IgnoreReason::NotCompleted(id))
            }
            Some(_) => {
                tracing::debug!("Attached consultation record to patient {}", id);
                self.state.consultations.push(record);
                DispatchOutcome::Applied
            }
        }
    }
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new(ReferenceCatalog::seeded())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use proptest::prelude::*;
    use zentri_core::utils::token_sequence;
    use zentri_core::Gender;

    pub(crate) fn intake_for(name: &str, hospital: &str, department: &str, doctor: &str) -> PatientIntake {
        PatientIntake {
            name: name.to_string(),
            age: 40,
            gender: Gender::Other,
            contact: "9000000000".to_string(),
            id_number: format!("ID-{}", name),
            provider: ProviderTriple::new(hospital, department, doctor),
            appointment_date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            appointment_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        }
    }

    pub(crate) fn cardiology(name: &str) -> PatientIntake {
        intake_for(name, "SMS Hospital", "Cardiology", "Dr. Rajesh Sharma")
    }

    pub(crate) fn register(store: &mut QueueStore, intake: PatientIntake) -> Uuid {
        let id = Uuid::new_v4();
        assert!(store.dispatch(StoreAction::AddPatient { id, intake }).is_applied());
        id
    }

    fn set(store: &mut QueueStore, id: Uuid, status: PatientStatus) -> DispatchOutcome {
        store.dispatch(StoreAction::SetPatientStatus { id, status })
    }

    #[test]
    fn test_add_patient_assigns_tokens() {
        let mut store = QueueStore::default();
        assert_eq!(store.next_token_number(), "Q001");

        let a = register(&mut store, cardiology("A"));
        let b = register(&mut store, cardiology("B"));

        assert_eq!(store.patient(a).unwrap().token_number, "Q001");
        assert_eq!(store.patient(b).unwrap().token_number, "Q002");
        assert_eq!(store.patient(b).unwrap().status, PatientStatus::Waiting);
        assert_eq!(store.current_token(), 3);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_duplicate_id_ignored() {
        let mut store = QueueStore::default();
        let id = register(&mut store, cardiology("A"));

        let outcome = store.dispatch(StoreAction::AddPatient { id, intake: cardiology("A again") });
        assert_eq!(outcome, DispatchOutcome::Ignored(IgnoreReason::DuplicatePatient(id)));
        assert_eq!(store.patients().len(), 1);
        assert_eq!(store.current_token(), 2);
    }

    #[test]
    fn test_unknown_patient_is_noop() {
        let mut store = QueueStore::default();
        register(&mut store, cardiology("A"));
        let before = store.patients().to_vec();
        let revision = store.revision();

        let missing = Uuid::new_v4();
        let outcome = set(&mut store, missing, PatientStatus::Completed);

        assert_eq!(outcome, DispatchOutcome::Ignored(IgnoreReason::UnknownPatient(missing)));
        assert_eq!(store.patients(), before.as_slice());
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_forward_only_transitions() {
        let mut store = QueueStore::default();
        let a = register(&mut store, cardiology("A"));

        assert!(matches!(
            set(&mut store, a, PatientStatus::Completed),
            DispatchOutcome::Ignored(IgnoreReason::InvalidTransition { .. })
        ));
        assert!(set(&mut store, a, PatientStatus::InProgress).is_applied());
        assert!(set(&mut store, a, PatientStatus::Completed).is_applied());
        assert!(matches!(
            set(&mut store, a, PatientStatus::Waiting),
            DispatchOutcome::Ignored(IgnoreReason::InvalidTransition { .. })
        ));
        assert_eq!(
            set(&mut store, a, PatientStatus::Completed),
            DispatchOutcome::Ignored(IgnoreReason::Unchanged { id: a, status: PatientStatus::Completed })
        );
        assert_eq!(store.patient(a).unwrap().status, PatientStatus::Completed);
    }

    #[test]
    fn test_single_in_progress_per_triple() {
        let mut store = QueueStore::default();
        let a = register(&mut store, cardiology("A"));
        let b = register(&mut store, cardiology("B"));
        let other = register(
            &mut store,
            intake_for("C", "Fortis Hospital", "Cardiology", "Dr. Rajesh Sharma"),
        );

        assert!(set(&mut store, a, PatientStatus::InProgress).is_applied());
        assert_eq!(
            set(&mut store, b, PatientStatus::InProgress),
            DispatchOutcome::Ignored(IgnoreReason::ProviderBusy { id: b, holder: a })
        );
        // 不同医院是另一条队列
        assert!(set(&mut store, other, PatientStatus::InProgress).is_applied());
        assert_eq!(store.patient(b).unwrap().status, PatientStatus::Waiting);
    }

    #[test]
    fn test_batch_is_atomic() {
        let mut store = QueueStore::default();
        let a = register(&mut store, cardiology("A"));
        let b = register(&mut store, cardiology("B"));
        let mut receiver = store.subscribe();
        let revision = store.revision();

        // 第二步无效，第一步必须回滚
        let outcome = store.dispatch_batch(vec![
            StoreAction::SetPatientStatus { id: a, status: PatientStatus::InProgress },
            StoreAction::SetPatientStatus { id: b, status: PatientStatus::Completed },
        ]);
        assert!(!outcome.is_applied());
        assert_eq!(store.patient(a).unwrap().status, PatientStatus::Waiting);
        assert_eq!(store.revision(), revision);
        assert!(!receiver.has_changed().unwrap());

        let outcome = store.dispatch_batch(vec![
            StoreAction::SetPatientStatus { id: a, status: PatientStatus::InProgress },
            StoreAction::SetPatientStatus { id: a, status: PatientStatus::Completed },
            StoreAction::SetPatientStatus { id: b, status: PatientStatus::InProgress },
        ]);
        assert!(outcome.is_applied());
        assert_eq!(store.revision(), revision + 1);
        assert!(receiver.has_changed().unwrap());
        assert_eq!(*receiver.borrow_and_update(), revision + 1);
    }

    #[test]
    fn test_empty_batch_is_ignored() {
        let mut store = QueueStore::default();
        let receiver = store.subscribe();
        let revision = store.revision();

        assert_eq!(
            store.dispatch_batch(Vec::new()),
            DispatchOutcome::Ignored(IgnoreReason::EmptyBatch)
        );
        assert_eq!(store.revision(), revision);
        assert!(!receiver.has_changed().unwrap());
    }

    #[test]
    fn test_rolled_back_batch_leaves_no_trace() {
        let mut store = QueueStore::default();
        let a = register(&mut store, cardiology("A"));
        let id = Uuid::new_v4();

        // 新患者先登记成功，随后一步无效，整批撤销且候诊号不被占用
        let outcome = store.dispatch_batch(vec![
            StoreAction::AddPatient { id, intake: cardiology("B") },
            StoreAction::SetPatientStatus { id: a, status: PatientStatus::Completed },
        ]);
        assert!(!outcome.is_applied());
        assert!(store.patient(id).is_none());
        assert_eq!(store.current_token(), 2);
        assert_eq!(store.revision(), 1);

        let action = StoreAction::SetPatientStatus { id: a, status: PatientStatus::InProgress };
        assert_eq!(action.to_string(), format!("set patient {} to in-progress", a));
    }

    #[test]
    fn test_selection_bookkeeping() {
        let mut store = QueueStore::default();
        store.dispatch(StoreAction::SelectHospital("SMS Hospital".into()));
        store.dispatch(StoreAction::SelectDepartment("Cardiology".into()));

        assert_eq!(store.selected_hospital(), Some("SMS Hospital"));
        assert_eq!(store.selected_department(), Some("Cardiology"));
        assert!(store.patients().is_empty());
    }

    #[test]
    fn test_attach_consultation_requires_completed() {
        let mut store = QueueStore::default();
        let a = register(&mut store, cardiology("A"));
        let record = ConsultationRecord {
            patient_id: a,
            diagnosis: "Stable angina".into(),
            notes: String::new(),
            prescription: "Aspirin".into(),
            rating: Some(5),
            recorded_at: Utc::now(),
        };

        assert_eq!(
            store.dispatch(StoreAction::AttachConsultation(record.clone())),
            DispatchOutcome::Ignored(IgnoreReason::NotCompleted(a))
        );

        set(&mut store, a, PatientStatus::InProgress);
        set(&mut store, a, PatientStatus::Completed);
        assert!(store.dispatch(StoreAction::AttachConsultation(record)).is_applied());
        assert_eq!(store.consultations_for(a).len(), 1);
    }

    proptest! {
        #[test]
        fn prop_tokens_strictly_increase(doctors in proptest::collection::vec(0usize..3, 1..40)) {
            let mut store = QueueStore::default();
            let names = ["Dr. Rajesh Sharma", "Dr. Priya Agarwal", "Dr. Amit Kumar"];

            for (i, d) in doctors.iter().enumerate() {
                let intake = intake_for(&format!("P{}", i), "SMS Hospital", "Cardiology", names[*d]);
                store.dispatch(StoreAction::AddPatient { id: Uuid::new_v4(), intake });
            }

            let sequences: Vec<u32> = store
                .patients()
                .iter()
                .map(|p| token_sequence(&p.token_number).unwrap())
                .collect();

            prop_assert_eq!(sequences.len(), doctors.len());
            prop_assert_eq!(sequences[0], 1);
            for pair in sequences.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
        }
    }
}
