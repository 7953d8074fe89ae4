use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::ports::{ProfileDirectory, StoreError};

pub const PROFILE_CREATE_PATH: &str = "/profile/create";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateDecision {
    Allow,
    Redirect(String),
}

/// Result of running an operation behind the gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Gated<T> {
    Proceeded(T),
    Redirected(String),
}

/// Blocks quote operations until the signed-in customer has a delivery profile.
pub struct ProfileGate {
    profiles: Arc<dyn ProfileDirectory>,
    redirect_target: String,
}

impl ProfileGate {
    pub fn new(profiles: Arc<dyn ProfileDirectory>) -> Self {
        Self { profiles, redirect_target: PROFILE_CREATE_PATH.to_string() }
    }

    pub fn with_redirect_target(mut self, target: impl Into<String>) -> Self {
        self.redirect_target = target.into();
        self
    }

    pub fn redirect_target(&self) -> &str {
        &self.redirect_target
    }

    /// Anonymous callers pass through; identity is enforced elsewhere.
    pub async fn check_profile_complete(
        &self,
        customer_id: Option<&CustomerId>,
    ) -> Result<GateDecision, StoreError> {
        let Some(customer_id) = customer_id else {
            return Ok(GateDecision::Allow);
        };

        match self.profiles.get_profile(customer_id).await? {
            Some(_) => Ok(GateDecision::Allow),
            None => Ok(GateDecision::Redirect(self.redirect_target.clone())),
        }
    }

    /// Runs `operation` only when the gate allows it.
    pub async fn guard<F, Fut, T, E>(
        &self,
        customer_id: Option<&CustomerId>,
        operation: F,
    ) -> Result<Gated<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<StoreError>,
    {
        match self.check_profile_complete(customer_id).await? {
            GateDecision::Allow => operation().await.map(Gated::Proceeded),
            GateDecision::Redirect(target) => Ok(Gated::Redirected(target)),
        }
    }
}
