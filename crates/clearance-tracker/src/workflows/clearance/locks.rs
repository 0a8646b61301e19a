use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::domain::UserId;

/// Per-student mutual exclusion for read-modify-write sequences.
///
/// Two decisions for the same student run one after the other so each recomputes the
/// request from the latest stored snapshot. Different students never contend. A slot
/// lives only while some caller holds or waits on it.
#[derive(Debug, Default)]
pub(crate) struct StudentLocks {
    slots: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl StudentLocks {
    pub(crate) fn run<T>(&self, student: &UserId, critical: impl FnOnce() -> T) -> T {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(student.clone()).or_default().clone()
        };
        let result = {
            let _held = slot.lock().unwrap_or_else(PoisonError::into_inner);
            critical()
        };

        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Clones are only taken under the map lock, so two owners means the map and us.
        if Arc::strong_count(&slot) == 2 {
            slots.remove(student);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn serializes_work_for_the_same_student() {
        let locks = Arc::new(StudentLocks::default());
        let active = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let student = UserId("usr-lock".to_string());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let active = active.clone();
                let overlaps = overlaps.clone();
                let student = student.clone();
                thread::spawn(move || {
                    locks.run(&student, || {
                        if active.fetch_add(1, Ordering::SeqCst) > 0 {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        thread::yield_now();
                        active.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker finished");
        }
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn slots_are_released_once_idle() {
        let locks = Arc::new(StudentLocks::default());
        let handles: Vec<_> = (0..16)
            .map(|index| {
                let locks = locks.clone();
                thread::spawn(move || {
                    let student = UserId(format!("usr-{}", index % 4));
                    locks.run(&student, thread::yield_now);
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker finished");
        }

        locks.run(&UserId("usr-a".to_string()), || {
            assert_eq!(locks.slots.lock().expect("slots").len(), 1);
        });
        assert!(locks.slots.lock().expect("slots").is_empty());
    }

    #[test]
    fn returns_the_closure_result() {
        let locks = StudentLocks::default();
        let value = locks.run(&UserId("usr-a".to_string()), || 42);
        assert_eq!(value, 42);
    }
}
