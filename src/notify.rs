//! Side channel for recoverable failures that do not change a call's return
//! value (a failed search still returns an empty list).
use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    SearchDisabled,
    SearchFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn search_disabled() -> Self {
        Self {
            kind: NoticeKind::SearchDisabled,
            message: "Busca indisponível: chave da API do TMDb não configurada.".to_string(),
        }
    }

    pub fn search_failed() -> Self {
        Self {
            kind: NoticeKind::SearchFailed,
            message: "Não foi possível buscar resultados do TMDb. Verifique sua conexão."
                .to_string(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Collects notices for the duration of one request.
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Notice> {
        let mut guard = self.notices.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }
}

impl Notifier for NoticeLog {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notice);
    }
}
