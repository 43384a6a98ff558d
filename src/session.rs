use std::cell::Cell;
use uuid::Uuid;

/// Per-session execution state. Direct DML against auxiliary tables is
/// normally rejected by the analyzer; the rewrite pipeline raises the flag
/// around its own internally generated population INSERT.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    enable_aux_dml: Cell<bool>,
}

impl Session {
    pub fn new() -> Self {
        Session {
            id: Uuid::new_v4(),
            enable_aux_dml: Cell::new(false),
        }
    }

    pub fn aux_dml_allowed(&self) -> bool {
        self.enable_aux_dml.get()
    }

    /// Allow auxiliary-table DML until the returned guard drops. The saved
    /// value is restored on every exit path, including unwinding.
    pub fn allow_aux_dml(&self) -> AuxDmlGuard<'_> {
        let saved = self.enable_aux_dml.replace(true);
        AuxDmlGuard {
            session: self,
            saved,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

pub struct AuxDmlGuard<'a> {
    session: &'a Session,
    saved: bool,
}

impl Drop for AuxDmlGuard<'_> {
    fn drop(&mut self) {
        self.session.enable_aux_dml.set(self.saved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_restores_on_drop() {
        let session = Session::new();
        assert!(!session.aux_dml_allowed());
        {
            let _guard = session.allow_aux_dml();
            assert!(session.aux_dml_allowed());
        }
        assert!(!session.aux_dml_allowed());
    }

    #[test]
    fn test_nested_guards_restore_saved_value() {
        let session = Session::new();
        let outer = session.allow_aux_dml();
        {
            let _inner = session.allow_aux_dml();
            assert!(session.aux_dml_allowed());
        }
        // inner guard restores the outer "true", not the default
        assert!(session.aux_dml_allowed());
        drop(outer);
        assert!(!session.aux_dml_allowed());
    }

    #[test]
    fn test_guard_restores_on_unwind() {
        let session = Session::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = session.allow_aux_dml();
            panic!("analysis failed");
        }));
        assert!(result.is_err());
        assert!(!session.aux_dml_allowed());
    }
}
