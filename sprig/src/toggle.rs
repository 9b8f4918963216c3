use serde::{Deserialize, Serialize};

use crate::catalog::ServiceName;
use crate::errors::SprigError;
use crate::status::DesiredStatus;

/// Outcome of a single toggle request, sent back to the UI as JSON.
///
/// `error` is true exactly when `message` carries text; the constructors are
/// the only way to build one and decoding re-checks the pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawToggleResult")]
pub struct ToggleResult {
    service: ServiceName,
    status: Option<DesiredStatus>,
    error: bool,
    message: Option<String>,
    enabled_svcs: Vec<ServiceName>,
    disabled_svcs: Vec<ServiceName>,
    events: Vec<String>,
}

impl ToggleResult {
    pub fn success(service: ServiceName, status: DesiredStatus) -> Self {
        Self {
            service,
            status: Some(status),
            error: false,
            message: None,
            enabled_svcs: Vec::new(),
            disabled_svcs: Vec::new(),
            events: Vec::new(),
        }
    }

    /// An error result. An empty message is replaced so the result never
    /// reports an error without text.
    pub fn failure(service: ServiceName, status: Option<DesiredStatus>, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = format!("Toggling {} failed", service);
        }

        Self {
            service,
            status,
            error: true,
            message: Some(message),
            enabled_svcs: Vec::new(),
            disabled_svcs: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn from_error(service: ServiceName, status: Option<DesiredStatus>, err: &SprigError) -> Self {
        Self::failure(service, status, err.user_message())
    }

    pub fn with_side_effects(
        mut self,
        enabled: Vec<ServiceName>,
        disabled: Vec<ServiceName>,
        events: Vec<String>,
    ) -> Self {
        self.enabled_svcs = enabled;
        self.disabled_svcs = disabled;
        self.events = events;
        self
    }

    pub fn service(&self) -> ServiceName {
        self.service
    }

    pub fn status(&self) -> Option<DesiredStatus> {
        self.status
    }

    pub fn is_error(&self) -> bool {
        self.error
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn enabled_svcs(&self) -> &[ServiceName] {
        &self.enabled_svcs
    }

    pub fn disabled_svcs(&self) -> &[ServiceName] {
        &self.disabled_svcs
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }
}

#[derive(Deserialize)]
struct RawToggleResult {
    service: ServiceName,
    status: Option<DesiredStatus>,
    error: bool,
    message: Option<String>,
    #[serde(default)]
    enabled_svcs: Vec<ServiceName>,
    #[serde(default)]
    disabled_svcs: Vec<ServiceName>,
    #[serde(default)]
    events: Vec<String>,
}

impl TryFrom<RawToggleResult> for ToggleResult {
    type Error = String;

    fn try_from(raw: RawToggleResult) -> Result<Self, Self::Error> {
        let has_message = raw.message.as_deref().is_some_and(|m| !m.is_empty());
        if raw.error != has_message {
            return Err(format!(
                "toggle result for '{}' has error={} but message={:?}",
                raw.service, raw.error, raw.message
            ));
        }

        Ok(ToggleResult {
            service: raw.service,
            status: raw.status,
            error: raw.error,
            message: raw.message,
            enabled_svcs: raw.enabled_svcs,
            disabled_svcs: raw.disabled_svcs,
            events: raw.events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn svc(name: &str) -> ServiceName {
        ServiceName::lookup(name).unwrap()
    }

    #[test]
    fn success_serializes_with_ui_field_names() {
        let result = ToggleResult::success(svc("nfs"), DesiredStatus::On);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "service": "nfs",
                "status": "on",
                "error": false,
                "message": null,
                "enabled_svcs": [],
                "disabled_svcs": [],
                "events": [],
            })
        );
    }

    #[test]
    fn failure_always_carries_a_message() {
        let result = ToggleResult::failure(svc("sshd"), None, "");
        assert!(result.is_error());
        assert_eq!(result.message(), Some("Toggling sshd failed"));
        assert_eq!(result.status(), None);
    }

    #[test]
    fn decoding_rejects_error_without_message() {
        let bad = json!({
            "service": "cifs", "status": "off", "error": true, "message": null,
            "enabled_svcs": [], "disabled_svcs": [], "events": [],
        });
        assert!(serde_json::from_value::<ToggleResult>(bad).is_err());

        let bad = json!({
            "service": "cifs", "status": "off", "error": false, "message": "stale",
        });
        assert!(serde_json::from_value::<ToggleResult>(bad).is_err());
    }

    #[test]
    fn decoding_keeps_side_effects() {
        let result = ToggleResult::success(svc("domaincontroller"), DesiredStatus::On).with_side_effects(
            vec![svc("ldap")],
            vec![],
            vec!["Started ldap, required by domaincontroller".into()],
        );
        let text = serde_json::to_string(&result).unwrap();
        let back: ToggleResult = serde_json::from_str(&text).unwrap();
        assert_eq!(back, result);
        assert_eq!(back.enabled_svcs(), &[svc("ldap")]);
    }
}
