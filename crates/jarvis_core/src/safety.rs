use crate::config::SafetyConfig;
use crate::decision::{Action, DangerReason, Decision};
use std::fmt;

// ============================================================================
// Denylist hit
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenylistHit {
    /// The denylist entry that matched.
    pub entry: String,
    /// The target string it matched in.
    pub target: String,
    pub reason: DangerReason,
}

impl fmt::Display for DenylistHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Denylisted ({:?}): '{}' matches '{}'",
            self.reason, self.target, self.entry
        )
    }
}

// ============================================================================
// SafetyPolicy
// ============================================================================

/// Screens directives against the dangerous-app and dangerous-website lists.
///
/// Both lists match by case-insensitive substring: `cmdline` and
/// `powershell7` are as dangerous as `cmd` and `powershell`.
pub struct SafetyPolicy {
    config: SafetyConfig,
}

impl SafetyPolicy {
    pub fn new(config: SafetyConfig) -> Self {
        Self { config }
    }

    pub fn check_app(&self, app_name: &str) -> Option<DenylistHit> {
        let lower = app_name.to_lowercase();
        self.config
            .dangerous_apps
            .iter()
            .find(|entry| !entry.is_empty() && lower.contains(&entry.to_lowercase()))
            .map(|entry| DenylistHit {
                entry: entry.clone(),
                target: app_name.to_string(),
                reason: DangerReason::DangerousApp,
            })
    }

    pub fn check_website(&self, website: &str) -> Option<DenylistHit> {
        let lower = website.to_lowercase();
        self.config
            .dangerous_websites
            .iter()
            .find(|entry| !entry.is_empty() && lower.contains(&entry.to_lowercase()))
            .map(|entry| DenylistHit {
                entry: entry.clone(),
                target: website.to_string(),
                reason: DangerReason::DangerousWebsite,
            })
    }

    /// Find the first denylist hit among the things this action would touch.
    pub fn screen(&self, action: &Action) -> Option<DenylistHit> {
        match action {
            Action::OpenApp { app_name } => app_name.as_deref().and_then(|a| self.check_app(a)),
            Action::OpenWebsite { website, url } => website
                .iter()
                .chain(url.iter())
                .find_map(|w| self.check_website(w)),
            Action::ExecuteCustom { actions, .. } => actions
                .iter()
                .find_map(|a| self.check_app(a).or_else(|| self.check_website(a))),
            Action::ControlWindow { window, .. } => self.check_app(window),
            Action::ConfirmDangerous { original, .. } => self.screen(original),
            Action::SearchWeb { .. }
            | Action::SendMessage { .. }
            | Action::PlayMusic { .. }
            | Action::SystemInfo { .. }
            | Action::CodeAssist { .. }
            | Action::AiFallback { .. }
            | Action::AskFollowup { .. } => None,
        }
    }

    /// Apply the denylist to a decision.
    ///
    /// Opening a denylisted app or site becomes `confirm_dangerous`; any
    /// other denylisted action keeps its action but must be confirmed.
    pub fn enforce(&self, decision: Decision) -> Decision {
        let Some(hit) = self.screen(&decision.action) else {
            return decision;
        };
        tracing::warn!(
            action = decision.action_name(),
            target = %hit.target,
            entry = %hit.entry,
            "Denylist match, confirmation required"
        );
        match decision.action {
            Action::OpenApp { .. } | Action::OpenWebsite { .. } => {
                let style = decision.style.clone();
                Decision::new(
                    Action::ConfirmDangerous {
                        target: hit.target,
                        reason: hit.reason,
                        original: Box::new(decision.action),
                    },
                    0.9,
                    true,
                )
                .with_style(style)
            }
            _ => Decision {
                requires_confirmation: true,
                ..decision
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SafetyPolicy {
        SafetyPolicy::new(SafetyConfig::default())
    }

    #[test]
    fn test_app_substring_match() {
        let p = policy();
        assert!(p.check_app("cmd").is_some());
        assert!(p.check_app("CMD.exe").is_some());
        assert!(p.check_app("windows powershell").is_some());
        for name in ["powershell7", "windowspowershell", "regedit32", "cmdline tool"] {
            let hit = p.check_app(name).unwrap();
            assert_eq!(hit.target, name);
            assert_eq!(hit.reason, DangerReason::DangerousApp);
        }
        assert!(p.check_app("chrome").is_none());
        assert!(p.check_app("notepad").is_none());
    }

    #[test]
    fn test_website_substring_match() {
        let p = policy();
        assert!(p.check_website("freevirusdownload.com").is_some());
        assert!(p.check_website("youtube").is_none());
    }

    #[test]
    fn test_open_dangerous_app_becomes_confirm() {
        let d = Decision::new(
            Action::OpenApp {
                app_name: Some("cmd".into()),
            },
            0.99,
            false,
        );
        let out = policy().enforce(d);
        assert_eq!(out.action_name(), "confirm_dangerous");
        assert!(out.requires_confirmation);
        match out.action {
            Action::ConfirmDangerous { reason, original, .. } => {
                assert_eq!(reason, DangerReason::DangerousApp);
                assert_eq!(original.name(), "open_app");
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_custom_command_with_dangerous_step_keeps_action() {
        let d = Decision::new(
            Action::ExecuteCustom {
                command_name: "cleanup".into(),
                actions: vec!["open powershell".into()],
            },
            0.95,
            false,
        );
        let out = policy().enforce(d);
        assert_eq!(out.action_name(), "execute_custom");
        assert!(out.requires_confirmation);
    }

    #[test]
    fn test_safe_decision_untouched() {
        let d = Decision::new(
            Action::OpenApp {
                app_name: Some("chrome".into()),
            },
            0.8,
            false,
        );
        let out = policy().enforce(d.clone());
        assert_eq!(out, d);
    }
}
