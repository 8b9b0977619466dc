//! Panic backtraces for pool tasks
//!
//! `catch_unwind` only sees the payload after the stack is gone, so the
//! trace has to be taken inside the panic hook. The hook is installed once
//! and wraps whatever hook was there before. Panics on threads that are not
//! running a pool task go straight to the previous hook.

use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::sync::Once;

thread_local! {
    static IN_TASK: Cell<bool> = const { Cell::new(false) };
    static LAST_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

pub(crate) fn install_hook() {
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if IN_TASK.with(Cell::get) {
                let trace = format!("{}\n{}", info, Backtrace::force_capture());
                LAST_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            } else {
                previous(info);
            }
        }));
    });
}

/// Run `f` with panic traces recorded for this thread
pub(crate) fn capture<R>(f: impl FnOnce() -> R) -> R {
    LAST_TRACE.with(|slot| *slot.borrow_mut() = None);
    IN_TASK.with(|flag| flag.set(true));
    let result = f();
    IN_TASK.with(|flag| flag.set(false));
    result
}

/// Trace recorded by the last panic inside [`capture`] on this thread
pub(crate) fn take_last() -> Option<String> {
    LAST_TRACE.with(|slot| slot.borrow_mut().take())
}
