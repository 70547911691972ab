//! 候诊位置推算
//!
//! 根据患者标识计算其在同一三元组候诊队列中的位置和预计等待时间

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zentri_core::utils::parse_patient_id;
use zentri_core::{PatientRecord, PatientStatus, Result, ZentriError};

use crate::store::QueueStore;

/// 每位患者的固定接诊时长（分钟）
pub const MINUTES_PER_PATIENT: u32 = 15;

/// 位于队首多少位以内时提示即将叫号
pub const NEAR_FRONT_THRESHOLD: usize = 3;

/// 患者在队列中的位置
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QueueStanding {
    Waiting {
        position: usize,
        waiting_total: usize,
        estimated_wait_minutes: u32,
    },
    InConsultation,
    Completed,
}

/// 患者候诊状态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueStatus {
    pub patient_id: Uuid,
    pub token_number: String,
    pub status: PatientStatus,
    pub standing: QueueStanding,
}

impl QueueStatus {
    /// 候诊位置，非候诊状态时为 `None`
    pub fn position(&self) -> Option<usize> {
        match self.standing {
            QueueStanding::Waiting { position, .. } => Some(position),
            _ => None,
        }
    }

    pub fn estimated_wait_minutes(&self) -> Option<u32> {
        match self.standing {
            QueueStanding::Waiting { estimated_wait_minutes, .. } => Some(estimated_wait_minutes),
            _ => None,
        }
    }

    /// 是否即将叫号
    pub fn is_near_front(&self) -> bool {
        self.position()
            .map(|p| p <= NEAR_FRONT_THRESHOLD)
            .unwrap_or(false)
    }

    /// 队列进度百分比
    pub fn progress_percent(&self) -> Option<f64> {
        match self.standing {
            QueueStanding::Waiting { position, waiting_total, .. } if waiting_total > 0 => {
                Some((waiting_total - position + 1) as f64 / waiting_total as f64 * 100.0)
            }
            _ => None,
        }
    }
}

/// 同一三元组的候诊集合，按挂号顺序排列
pub fn waiting_set<'a>(store: &'a QueueStore, target: &PatientRecord) -> Vec<&'a PatientRecord> {
    let provider = target.provider();
    store
        .patients()
        .iter()
        .filter(|p| p.status == PatientStatus::Waiting && p.is_in_queue(&provider))
        .collect()
}

/// 预计等待时间
pub fn estimated_wait_minutes(position: usize) -> u32 {
    position as u32 * MINUTES_PER_PATIENT
}

/// 计算患者候诊状态
pub fn queue_status(store: &QueueStore, id: Uuid) -> Result<QueueStatus> {
    let patient = store
        .patient(id)
        .ok_or_else(|| ZentriError::NotFound(format!("Patient {} not found", id)))?;

    let standing = match patient.status {
        PatientStatus::Waiting => {
            let waiting = waiting_set(store, patient);
            let position = waiting
                .iter()
                .position(|p| p.id == id)
                .map(|index| index + 1)
                .ok_or_else(|| ZentriError::NotFound(format!("Patient {} not in queue", id)))?;

            QueueStanding::Waiting {
                position,
                waiting_total: waiting.len(),
                estimated_wait_minutes: estimated_wait_minutes(position),
            }
        }
        PatientStatus::InProgress => QueueStanding::InConsultation,
        PatientStatus::Completed => QueueStanding::Completed,
    };

    tracing::debug!("Queue status for {}: {:?}", patient.token_number, standing);

    Ok(QueueStatus {
        patient_id: id,
        token_number: patient.token_number.clone(),
        status: patient.status,
        standing,
    })
}

/// 按路由参数计算候诊状态，格式错误的标识视为未找到
pub fn queue_status_by_param(store: &QueueStore, param: &str) -> Result<QueueStatus> {
    let id = parse_patient_id(param)?;
    queue_status(store, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{cardiology, intake_for, register};
    use crate::store::StoreAction;

    #[test]
    fn test_positions_follow_registration_order() {
        let mut store = QueueStore::default();
        let a = register(&mut store, cardiology("A"));
        let b = register(&mut store, cardiology("B"));

        let status_a = queue_status(&store, a).unwrap();
        assert_eq!(status_a.position(), Some(1));
        assert_eq!(status_a.estimated_wait_minutes(), Some(15));

        let status_b = queue_status(&store, b).unwrap();
        assert_eq!(status_b.position(), Some(2));
        assert_eq!(status_b.estimated_wait_minutes(), Some(30));
        assert_eq!(status_b.progress_percent(), Some(50.0));
    }

    #[test]
    fn test_other_queues_do_not_count() {
        let mut store = QueueStore::default();
        register(&mut store, intake_for("X", "SMS Hospital", "Cardiology", "Dr. Amit Kumar"));
        register(&mut store, intake_for("Y", "Fortis Hospital", "Cardiology", "Dr. Rajesh Sharma"));
        let a = register(&mut store, cardiology("A"));

        let status = queue_status(&store, a).unwrap();
        assert_eq!(
            status.standing,
            QueueStanding::Waiting {
                position: 1,
                waiting_total: 1,
                estimated_wait_minutes: 15
            }
        );
    }

    #[test]
    fn test_position_recomputed_after_call() {
        let mut store = QueueStore::default();
        let a = register(&mut store, cardiology("A"));
        let b = register(&mut store, cardiology("B"));

        store.dispatch(StoreAction::SetPatientStatus { id: a, status: PatientStatus::InProgress });

        assert_eq!(queue_status(&store, a).unwrap().standing, QueueStanding::InConsultation);
        assert_eq!(queue_status(&store, a).unwrap().position(), None);
        assert_eq!(queue_status(&store, b).unwrap().position(), Some(1));
    }

    #[test]
    fn test_position_counts_earlier_waiting_only() {
        let mut store = QueueStore::default();
        let ids: Vec<Uuid> = (0..5)
            .map(|i| register(&mut store, cardiology(&format!("P{}", i))))
            .collect();

        for (i, id) in ids.iter().enumerate() {
            let status = queue_status(&store, *id).unwrap();
            assert_eq!(status.position(), Some(i + 1));
            assert_eq!(status.estimated_wait_minutes(), Some((i as u32 + 1) * MINUTES_PER_PATIENT));
            assert_eq!(status.is_near_front(), i < NEAR_FRONT_THRESHOLD);
        }
    }

    #[test]
    fn test_not_found() {
        let mut store = QueueStore::default();
        register(&mut store, cardiology("A"));

        assert!(matches!(queue_status(&store, Uuid::new_v4()), Err(ZentriError::NotFound(_))));
        assert!(matches!(
            queue_status_by_param(&store, "stale-link"),
            Err(ZentriError::NotFound(_))
        ));
    }

    #[test]
    fn test_lookup_by_param() {
        let mut store = QueueStore::default();
        let a = register(&mut store, cardiology("A"));

        let status = queue_status_by_param(&store, &a.to_string()).unwrap();
        assert_eq!(status.token_number, "Q001");
    }
}
