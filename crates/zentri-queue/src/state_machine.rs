//! 就诊状态机
//!
//! 管理患者从候诊到就诊完成的状态转换

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use zentri_core::{PatientStatus, Result, ZentriError};

/// 就诊状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConsultationEvent {
    Called,   // 叫号进入诊室
    Finished, // 就诊结束
}

/// 就诊状态机
#[derive(Debug)]
pub struct ConsultationStateMachine {
    transitions: HashMap<(PatientStatus, ConsultationEvent), PatientStatus>,
}

impl ConsultationStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        // 只允许前进，不允许回退
        transitions.insert((PatientStatus::Waiting, ConsultationEvent::Called), PatientStatus::InProgress);
        transitions.insert((PatientStatus::InProgress, ConsultationEvent::Finished), PatientStatus::Completed);

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: PatientStatus, event: ConsultationEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: PatientStatus, event: ConsultationEvent) -> Result<PatientStatus> {
        match self.transitions.get(&(from, event)) {
            Some(to) => Ok(*to),
            None => Err(ZentriError::InvalidStateTransition {
                from: from.to_string(),
                to: format!("{:?}", event),
            }),
        }
    }

    /// 查找从 `from` 到 `to` 的事件
    pub fn event_between(&self, from: PatientStatus, to: PatientStatus) -> Option<ConsultationEvent> {
        self.transitions
            .iter()
            .find(|((state, _), target)| *state == from && **target == to)
            .map(|((_, event), _)| *event)
    }

    /// 校验目标状态是否可达
    pub fn check(&self, from: PatientStatus, to: PatientStatus) -> Result<()> {
        match self.event_between(from, to) {
            Some(_) => Ok(()),
            None => Err(ZentriError::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }

    /// 获取所有可能的状态
    pub fn get_all_states() -> Vec<PatientStatus> {
        vec![
            PatientStatus::Waiting,
            PatientStatus::InProgress,
            PatientStatus::Completed,
        ]
    }

    /// 获取状态的所有可能事件
    pub fn get_possible_events(&self, current_state: PatientStatus) -> Vec<ConsultationEvent> {
        self.transitions
            .keys()
            .filter(|(state, _)| *state == current_state)
            .map(|(_, event)| *event)
            .collect()
    }
}

impl Default for ConsultationStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
