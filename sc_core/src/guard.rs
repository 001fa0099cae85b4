//! Two-phase table-address acquisition (spec.md §5, §9).
//!
//! `sc_core` exclusively owns the parsed auxiliary tables; the raw word
//! buffers are conceptually shared with an external table service. The
//! protocol is release → manage → reacquire → rebuild-if-updated.
//! [`TableAddressGuard`] makes that ordering impossible to get wrong: it
//! releases on construction and reacquires on drop, reporting through
//! [`TableAddressGuard::updated`] whether the caller must rebuild
//! auxiliaries.

use sc_common::bus::{TableId, TableService};

/// RAII scope around one release/manage/reacquire cycle for a single
/// [`TableId`] (spec.md §9 "Two-phase table-address acquisition").
pub struct TableAddressGuard<'a> {
    service: &'a mut dyn TableService,
    table: TableId,
    updated: bool,
    reacquired: bool,
}

impl<'a> TableAddressGuard<'a> {
    /// Release `table` for the duration of the guard's scope.
    pub fn acquire(service: &'a mut dyn TableService, table: TableId) -> Self {
        service.release(table);
        Self {
            service,
            table,
            updated: false,
            reacquired: false,
        }
    }

    /// Reacquire now, instead of waiting for drop, and report whether the
    /// underlying buffer was updated while released.
    pub fn reacquire_now(&mut self) -> bool {
        if !self.reacquired {
            self.updated = self.service.reacquire(self.table);
            self.reacquired = true;
        }
        self.updated
    }
}

impl Drop for TableAddressGuard<'_> {
    fn drop(&mut self) {
        if !self.reacquired {
            self.updated = self.service.reacquire(self.table);
            self.reacquired = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_common::ids::AtsId;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct RecordingService {
        released: Rc<RefCell<Vec<TableId>>>,
        reacquired: Rc<RefCell<Vec<TableId>>>,
        report_updated: bool,
    }

    impl TableService for RecordingService {
        fn release(&mut self, table: TableId) {
            self.released.borrow_mut().push(table);
        }
        fn reacquire(&mut self, table: TableId) -> bool {
            self.reacquired.borrow_mut().push(table);
            self.report_updated
        }
        fn take_buffer(&mut self, _table: TableId) -> Vec<u32> {
            Vec::new()
        }
    }

    #[test]
    fn releases_on_construct_and_reacquires_on_drop() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let reacquired = Rc::new(RefCell::new(Vec::new()));
        let mut service = RecordingService {
            released: released.clone(),
            reacquired: reacquired.clone(),
            report_updated: true,
        };
        let table = TableId::Ats(AtsId::new(1).unwrap());
        {
            let _guard = TableAddressGuard::acquire(&mut service, table);
            assert_eq!(*released.borrow(), vec![table]);
            assert!(reacquired.borrow().is_empty());
        }
        assert_eq!(*reacquired.borrow(), vec![table]);
    }

    #[test]
    fn reacquire_now_reports_update_and_skips_double_reacquire() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let reacquired = Rc::new(RefCell::new(Vec::new()));
        let mut service = RecordingService {
            released,
            reacquired: reacquired.clone(),
            report_updated: true,
        };
        let table = TableId::Append;
        let mut guard = TableAddressGuard::acquire(&mut service, table);
        assert!(guard.reacquire_now());
        drop(guard);
        assert_eq!(*reacquired.borrow(), vec![table]);
    }
}
