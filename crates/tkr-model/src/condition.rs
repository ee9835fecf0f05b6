use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The only condition type a run carries.
pub const CONDITION_SUCCEEDED: &str = "Succeeded";

/// Tri-state condition value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        })
    }
}

/// Externally observed state of a run (or pipeline run) with a reason code.
///
/// `reason` and `message` are empty strings when unset and are then omitted from the
/// serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_transition_time: Option<OffsetDateTime>,
}

impl Condition {
    /// `Succeeded` condition with the given status, reason and message.
    pub fn succeeded<R, M>(status: ConditionStatus, reason: R, message: M) -> Self
    where
        R: Into<String>,
        M: Into<String>,
    {
        Self {
            type_: CONDITION_SUCCEEDED.to_string(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: None,
        }
    }

    /// `Succeeded` condition with no reason or message.
    pub fn bare(status: ConditionStatus) -> Self {
        Self::succeeded(status, "", "")
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }

    pub fn is_false(&self) -> bool {
        self.status == ConditionStatus::False
    }

    pub fn is_unknown(&self) -> bool {
        self.status == ConditionStatus::Unknown
    }

    /// Compare everything except the transition timestamp.
    pub fn same_state(&self, other: &Condition) -> bool {
        self.type_ == other.type_
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Ordered condition list holding at most one entry per type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(pub Vec<Condition>);

impl Conditions {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, type_: &str) -> Option<&Condition> {
        self.0.iter().find(|c| c.type_ == type_)
    }

    /// The `Succeeded` condition, if set.
    pub fn succeeded(&self) -> Option<&Condition> {
        self.get(CONDITION_SUCCEEDED)
    }

    /// Replace the condition of the same type, or append it.
    ///
    /// `last_transition_time` moves to `now` only when the status value changes.
    pub fn set(&mut self, mut cond: Condition, now: OffsetDateTime) {
        match self.0.iter_mut().find(|c| c.type_ == cond.type_) {
            Some(existing) => {
                cond.last_transition_time = if existing.status == cond.status {
                    existing.last_transition_time.or(Some(now))
                } else {
                    Some(now)
                };
                *existing = cond;
            }
            None => {
                cond.last_transition_time = Some(now);
                self.0.push(cond);
            }
        }
    }
}
