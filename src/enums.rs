use std::fmt;
use std::io::Write;
use std::str::FromStr;

use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// Enums stored as plain text columns. Each variant maps to exactly one
// lowercase (or display-case) string which is also its serde name.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash,
            serde::Serialize, serde::Deserialize,
            diesel::AsExpression, diesel::FromSqlRow,
        )]
        #[diesel(sql_type = diesel::sql_types::Text)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_owned(),
                    }),
                }
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let text = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                text.parse().map_err(Into::into)
            }
        }
    };
}

text_enum! {
    /// Staff role attached to every user account.
    Role {
        Doctor => "doctor",
        Lab => "lab",
        Ultrasound => "ultrasound",
        Receptionist => "receptionist",
        Emergency => "emergency",
        Admin => "admin",
    }
}

text_enum! {
    Sex {
        Male => "Male",
        Female => "Female",
    }
}

text_enum! {
    /// Registered patients are `Inactive` until their first visit.
    PatientStatus {
        Active => "active",
        Inactive => "inactive",
    }
}

text_enum! {
    VisitType {
        General => "general",
        Emergency => "emergency",
        Lab => "lab",
        Ultrasound => "ultrasound",
    }
}

text_enum! {
    /// Urgency attached to a doctor's queue entry.
    Priority {
        Emergency => "emergency",
        Urgent => "urgent",
        Normal => "normal",
    }
}

impl Priority {
    /// Serving rank, lowest first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Emergency => 1,
            Priority::Urgent => 2,
            Priority::Normal => 3,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

text_enum! {
    QueueStatus {
        Waiting => "waiting",
        InProgress => "in_progress",
        Completed => "completed",
    }
}

text_enum! {
    /// Ancillary department a doctor can refer a patient to.
    Department {
        Lab => "lab",
        Ultrasound => "ultrasound",
        Emergency => "emergency",
    }
}

text_enum! {
    ReferralStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
    }
}

impl ReferralStatus {
    /// Worklist rank used when listing a department's referrals.
    pub fn rank(self) -> u8 {
        match self {
            ReferralStatus::Pending => 1,
            ReferralStatus::InProgress => 2,
            ReferralStatus::Completed => 3,
        }
    }
}

text_enum! {
    /// Lifecycle of a lab request or ultrasound report.
    RequestStatus {
        Pending => "pending",
        Completed => "completed",
    }
}

/// A status column with a fixed, forward-only transition table.
pub trait Workflow: Copy + Eq + 'static {
    const TRANSITIONS: &'static [(Self, Self)];

    /// The only state from which `self` may be entered, if any.
    fn predecessor(self) -> Option<Self> {
        Self::TRANSITIONS
            .iter()
            .find(|(_, to)| *to == self)
            .map(|(from, _)| *from)
    }
}

impl Workflow for QueueStatus {
    const TRANSITIONS: &'static [(Self, Self)] = &[
        (QueueStatus::Waiting, QueueStatus::InProgress),
        (QueueStatus::InProgress, QueueStatus::Completed),
    ];
}

impl Workflow for ReferralStatus {
    const TRANSITIONS: &'static [(Self, Self)] = &[
        (ReferralStatus::Pending, ReferralStatus::InProgress),
        (ReferralStatus::InProgress, ReferralStatus::Completed),
    ];
}

impl Workflow for RequestStatus {
    const TRANSITIONS: &'static [(Self, Self)] = &[(RequestStatus::Pending, RequestStatus::Completed)];
}

impl QueueStatus {
    /// Waiting or in progress.
    pub const ACTIVE: [QueueStatus; 2] = [QueueStatus::Waiting, QueueStatus::InProgress];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_round_trips_for_every_variant() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(*role));
        }
        for status in QueueStatus::ALL {
            assert_eq!(status.as_str().parse::<QueueStatus>(), Ok(*status));
        }
    }

    #[test]
    fn unknown_text_is_rejected() {
        let err = "triage".parse::<Department>().unwrap_err();
        assert_eq!(err.kind, "Department");
        assert_eq!(err.to_string(), "unknown Department 'triage'");
    }

    #[test]
    fn serde_uses_column_text() {
        let json = serde_json::to_string(&QueueStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let sex: Sex = serde_json::from_str("\"Female\"").unwrap();
        assert_eq!(sex, Sex::Female);
    }

    #[test]
    fn priority_ranks_emergency_first() {
        assert!(Priority::Emergency.rank() < Priority::Urgent.rank());
        assert!(Priority::Urgent.rank() < Priority::Normal.rank());
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn queue_states_are_entered_from_one_state_only() {
        assert_eq!(QueueStatus::InProgress.predecessor(), Some(QueueStatus::Waiting));
        assert_eq!(QueueStatus::Completed.predecessor(), Some(QueueStatus::InProgress));
        assert_eq!(QueueStatus::Waiting.predecessor(), None);
    }

    #[test]
    fn predecessors_follow_the_table() {
        assert_eq!(ReferralStatus::InProgress.predecessor(), Some(ReferralStatus::Pending));
        assert_eq!(ReferralStatus::Completed.predecessor(), Some(ReferralStatus::InProgress));
        assert_eq!(ReferralStatus::Pending.predecessor(), None);
        assert_eq!(RequestStatus::Completed.predecessor(), Some(RequestStatus::Pending));
    }
}
