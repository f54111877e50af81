//! Process-wide outbound network policy.
//!
//! Every provider consults [`check_outbound`] before sending a request, so
//! `WIKIFACTS_NETWORK_POLICY=deny` (or a scoped [`NetworkPolicyGuard`])
//! keeps a run fully offline.

use crate::errors::TransportError;
use std::sync::{Mutex, OnceLock};

pub const POLICY_ENV: &str = "WIKIFACTS_NETWORK_POLICY";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkPolicy {
    Allow,
    Deny(String),
}

fn state() -> &'static Mutex<NetworkPolicy> {
    static STATE: OnceLock<Mutex<NetworkPolicy>> = OnceLock::new();
    STATE.get_or_init(|| Mutex::new(NetworkPolicy::Allow))
}

/// Restores the previous policy on drop.
pub struct NetworkPolicyGuard {
    previous: NetworkPolicy,
}

impl NetworkPolicyGuard {
    pub fn set(policy: NetworkPolicy) -> Self {
        let mut s = state().lock().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut *s, policy);
        Self { previous }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self::set(NetworkPolicy::Deny(reason.into()))
    }
}

impl Drop for NetworkPolicyGuard {
    fn drop(&mut self) {
        let mut s = state().lock().unwrap_or_else(|e| e.into_inner());
        *s = self.previous.clone();
    }
}

pub fn check_outbound(target: &str) -> Result<(), TransportError> {
    match effective_policy() {
        NetworkPolicy::Allow => Ok(()),
        NetworkPolicy::Deny(reason) => Err(TransportError::Blocked {
            target: target.to_string(),
            reason,
        }),
    }
}

fn effective_policy() -> NetworkPolicy {
    if let Ok(raw) = std::env::var(POLICY_ENV) {
        if raw.trim().eq_ignore_ascii_case("deny") {
            return NetworkPolicy::Deny(format!("{POLICY_ENV}=deny"));
        }
    }
    state().lock().unwrap_or_else(|e| e.into_inner()).clone()
}
