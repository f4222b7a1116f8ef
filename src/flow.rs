//! Patient flow ordering.
//!
//! Three lists decide who is seen next: the waiting list of registered but
//! unseen patients, the doctor's queue, and each department's referral
//! worklist. All three orders are stable sorts over rows already loaded from
//! the store, so rows with equal keys keep the order they were loaded in
//! (ascending id).

use chrono::NaiveDateTime;

use crate::enums::{Priority, ReferralStatus};
use crate::models::{DepartmentReferral, Patient, QueueEntry};

/// Anything that sits on the first-come-first-serve waiting list.
pub trait Registered {
    fn registered_at(&self) -> NaiveDateTime;
}

/// Anything that sits in the doctor's queue.
pub trait Queued {
    fn priority(&self) -> Priority;
    fn sent_at(&self) -> NaiveDateTime;
}

/// Anything that sits on a department worklist.
pub trait Referred {
    fn referral_status(&self) -> ReferralStatus;
    fn referred_at(&self) -> NaiveDateTime;
}

impl Registered for Patient {
    fn registered_at(&self) -> NaiveDateTime {
        self.date_registered
    }
}

impl Queued for QueueEntry {
    fn priority(&self) -> Priority {
        self.priority
    }

    fn sent_at(&self) -> NaiveDateTime {
        self.sent_at
    }
}

impl Referred for DepartmentReferral {
    fn referral_status(&self) -> ReferralStatus {
        self.status
    }

    fn referred_at(&self) -> NaiveDateTime {
        self.created_at
    }
}

/// Oldest registration first.
pub fn order_waiting_list<T: Registered>(mut patients: Vec<T>) -> Vec<T> {
    patients.sort_by_key(|p| p.registered_at());
    patients
}

/// Emergency before urgent before normal, then earliest arrival.
pub fn order_doctor_queue<T: Queued>(mut entries: Vec<T>) -> Vec<T> {
    entries.sort_by_key(|e| (e.priority().rank(), e.sent_at()));
    entries
}

/// Pending before in progress before completed, then oldest referral.
pub fn order_referrals<T: Referred>(mut referrals: Vec<T>) -> Vec<T> {
    referrals.sort_by_key(|r| (r.referral_status().rank(), r.referred_at()));
    referrals
}

/// Whole minutes between `since` and `now`, never negative.
pub fn minutes_waiting(since: NaiveDateTime, now: NaiveDateTime) -> i64 {
    (now - since).num_minutes().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Slot {
        name: &'static str,
        priority: Priority,
        at: NaiveDateTime,
    }

    impl Queued for Slot {
        fn priority(&self) -> Priority {
            self.priority
        }

        fn sent_at(&self) -> NaiveDateTime {
            self.at
        }
    }

    impl Registered for Slot {
        fn registered_at(&self) -> NaiveDateTime {
            self.at
        }
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn slot(name: &'static str, priority: Priority, at: NaiveDateTime) -> Slot {
        Slot { name, priority, at }
    }

    #[test]
    fn emergency_jumps_the_queue() {
        let queue = vec![
            slot("A", Priority::Normal, at(9, 0)),
            slot("B", Priority::Emergency, at(9, 5)),
            slot("C", Priority::Urgent, at(9, 2)),
        ];
        let names: Vec<_> = order_doctor_queue(queue).into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["B", "C", "A"]);
    }

    #[test]
    fn equal_priority_is_served_in_arrival_order() {
        let queue = vec![
            slot("late", Priority::Urgent, at(10, 30)),
            slot("early", Priority::Urgent, at(8, 15)),
            slot("tie-first", Priority::Normal, at(9, 0)),
            slot("tie-second", Priority::Normal, at(9, 0)),
        ];
        let names: Vec<_> = order_doctor_queue(queue).into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["early", "late", "tie-first", "tie-second"]);
    }

    #[test]
    fn waiting_list_is_first_come_first_serve() {
        let waiting = vec![
            slot("second", Priority::Normal, at(11, 0)),
            slot("first", Priority::Emergency, at(7, 45)),
            slot("third", Priority::Normal, at(16, 20)),
        ];
        let names: Vec<_> = order_waiting_list(waiting).into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn referral_worklist_puts_pending_first() {
        let base = DepartmentReferral {
            id: 0,
            patient_id: 1,
            visit_id: 1,
            from_doctor_id: 1,
            to_department: crate::enums::Department::Lab,
            status: ReferralStatus::Pending,
            notes: String::new(),
            created_at: at(9, 0),
            completed_at: None,
        };
        let rows = vec![
            DepartmentReferral { id: 1, status: ReferralStatus::Completed, created_at: at(8, 0), ..base.clone() },
            DepartmentReferral { id: 2, status: ReferralStatus::InProgress, created_at: at(8, 30), ..base.clone() },
            DepartmentReferral { id: 3, status: ReferralStatus::Pending, created_at: at(10, 0), ..base.clone() },
            DepartmentReferral { id: 4, status: ReferralStatus::Pending, created_at: at(9, 15), ..base },
        ];
        let ids: Vec<_> = order_referrals(rows).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, [4, 3, 2, 1]);
    }

    #[test]
    fn minutes_waiting_clamps_clock_skew() {
        assert_eq!(minutes_waiting(at(9, 0), at(9, 42)), 42);
        assert_eq!(minutes_waiting(at(9, 42), at(9, 0)), 0);
    }

    fn arb_priority() -> impl Strategy<Value = Priority> {
        prop_oneof![
            Just(Priority::Emergency),
            Just(Priority::Urgent),
            Just(Priority::Normal),
        ]
    }

    fn arb_slots() -> impl Strategy<Value = Vec<(Priority, i64)>> {
        prop::collection::vec((arb_priority(), 0i64..240), 0..40)
    }

    fn build(raw: &[(Priority, i64)]) -> Vec<(usize, Slot)> {
        raw.iter()
            .enumerate()
            .map(|(i, (p, offset))| (i, slot("x", *p, at(8, 0) + Duration::minutes(*offset))))
            .collect()
    }

    impl Queued for (usize, Slot) {
        fn priority(&self) -> Priority {
            self.1.priority
        }

        fn sent_at(&self) -> NaiveDateTime {
            self.1.at
        }
    }

    impl Registered for (usize, Slot) {
        fn registered_at(&self) -> NaiveDateTime {
            self.1.at
        }
    }

    proptest! {
        #[test]
        fn waiting_list_is_sorted_by_registration(raw in arb_slots()) {
            let ordered = order_waiting_list(build(&raw));
            prop_assert_eq!(ordered.len(), raw.len());
            for pair in ordered.windows(2) {
                prop_assert!(pair[0].1.at <= pair[1].1.at);
                if pair[0].1.at == pair[1].1.at {
                    prop_assert!(pair[0].0 < pair[1].0);
                }
            }
        }

        #[test]
        fn doctor_queue_respects_priority_then_arrival(raw in arb_slots()) {
            let ordered = order_doctor_queue(build(&raw));
            prop_assert_eq!(ordered.len(), raw.len());
            for pair in ordered.windows(2) {
                let (a, b) = (&pair[0].1, &pair[1].1);
                prop_assert!(a.priority.rank() <= b.priority.rank());
                if a.priority == b.priority {
                    prop_assert!(a.at <= b.at);
                    if a.at == b.at {
                        prop_assert!(pair[0].0 < pair[1].0);
                    }
                }
            }
        }
    }
}
