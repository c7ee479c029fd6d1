use anyhow::{Context, Result};
use serde_json::Value;

use crate::boundary::BoundaryFault;
use crate::controller::PanelController;
use crate::models::payload_meta;
use crate::normalize::ADAPTER_VERSION;
use crate::panel::{Page, PanelStatus, status_label};

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticSnapshot {
    pub page: Page,
    pub status: PanelStatus,
    pub token: u64,
    pub request: Option<String>,
    pub error: Option<String>,
    pub last_updated: Option<String>,
    pub stale: bool,
    /// The payload's `raw.meta` (or `meta`) exactly as received.
    pub meta: Option<Value>,
    pub fault: Option<BoundaryFault>,
}

impl DiagnosticSnapshot {
    pub fn capture(panel: &PanelController, fault: Option<&BoundaryFault>) -> Self {
        let state = panel.state();
        Self {
            page: panel.page(),
            status: state.status,
            token: panel.latest_token(),
            request: panel.last_request().map(|r| r.describe()),
            error: state.error.clone(),
            last_updated: state
                .last_updated_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
            stale: state.stale,
            meta: state.visible().and_then(payload_meta).cloned(),
            fault: fault.cloned(),
        }
    }

    /// `key: value` rows for the meta object, values as compact JSON unless
    /// they are plain strings.
    pub fn meta_lines(&self) -> Vec<String> {
        let Some(Value::Object(map)) = &self.meta else {
            return Vec::new();
        };
        map.iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{k}: {s}"),
                other => format!("{k}: {other}"),
            })
            .collect()
    }

    pub fn to_text(&self) -> String {
        let mut lines = vec![
            format!("page: {}", self.page.label()),
            format!("status: {}", status_label(self.status)),
            format!("token: {}", self.token),
            format!("request: {}", self.request.as_deref().unwrap_or("-")),
            format!("last_updated: {}", self.last_updated.as_deref().unwrap_or("never")),
            format!("stale: {}", self.stale),
            format!("error: {}", self.error.as_deref().unwrap_or("-")),
            format!("adapter_version: {ADAPTER_VERSION}"),
        ];
        if let Some(meta) = &self.meta {
            let pretty = serde_json::to_string_pretty(meta).unwrap_or_else(|_| meta.to_string());
            lines.push(format!("meta: {pretty}"));
        }
        if let Some(fault) = &self.fault {
            lines.push(format!("render_fault: {}", fault.report()));
        }
        lines.join("\n")
    }
}

pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("open system clipboard")?;
    clipboard
        .set_text(text.to_string())
        .context("write diagnostics to clipboard")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clipboard_failures_carry_context() {
        // Headless runs have no clipboard; with one, the copy just succeeds.
        if let Err(err) = copy_to_clipboard("page: Narrative") {
            let chain = format!("{err:#}");
            assert!(
                chain.starts_with("open system clipboard")
                    || chain.starts_with("write diagnostics to clipboard"),
                "unexpected error chain: {chain}"
            );
        }
    }

    #[test]
    fn meta_lines_print_strings_bare() {
        let snapshot = DiagnosticSnapshot {
            page: Page::Narrative,
            status: PanelStatus::Ready,
            token: 3,
            request: None,
            error: None,
            last_updated: None,
            stale: false,
            meta: Some(serde_json::json!({"mode": "ai", "cache_ttl_s": 30})),
            fault: None,
        };
        assert_eq!(
            snapshot.meta_lines(),
            vec!["cache_ttl_s: 30".to_string(), "mode: ai".to_string()]
        );
    }
}
