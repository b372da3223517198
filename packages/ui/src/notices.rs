use api::{Notice, NoticeLevel};
use dioxus::prelude::*;

#[derive(Clone, Debug, PartialEq)]
pub struct NoticeEntry {
    pub timestamp: String,
    pub notice: Notice,
}

#[derive(Clone, Debug, Default)]
pub struct NoticeLog {
    pub entries: Vec<NoticeEntry>,
    pub visible: bool,
}

impl NoticeLog {
    pub fn latest(&self) -> Option<&NoticeEntry> {
        self.entries.last()
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.notice.level == NoticeLevel::Error)
    }
}

pub fn use_notices() -> Signal<NoticeLog> {
    use_context::<Signal<NoticeLog>>()
}

/// Record a notice and open the panel for warnings and errors.
pub fn push_notice(log: &mut Signal<NoticeLog>, notice: Notice) {
    match notice.level {
        NoticeLevel::Error => tracing::error!("{}: {}", notice.title, notice.description),
        NoticeLevel::Warning => tracing::warn!("{}: {}", notice.title, notice.description),
        _ => tracing::info!("{}: {}", notice.title, notice.description),
    }
    let urgent = matches!(notice.level, NoticeLevel::Error | NoticeLevel::Warning);
    let mut log = log.write();
    log.entries.push(NoticeEntry {
        timestamp: current_time(),
        notice,
    });
    if urgent {
        log.visible = true;
    }
}

#[cfg(target_arch = "wasm32")]
fn current_time() -> String {
    let date = js_sys::Date::new_0();
    let h = date.get_hours();
    let m = date.get_minutes();
    let s = date.get_seconds();
    format!("{h:02}:{m:02}:{s:02}")
}

#[cfg(not(target_arch = "wasm32"))]
fn current_time() -> String {
    "00:00:00".to_string()
}
