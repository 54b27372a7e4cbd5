//! Consent gating for runs.
//!
//! A run awaits [`ConsentGate::consent_granted`] before it touches either
//! store. The gate is the only suspension point in a run.

use std::future::Future;

/// Answers whether the visitor has granted consent for audience matching.
pub trait ConsentGate {
    fn consent_granted(&self) -> impl Future<Output = bool> + Send;
}

/// A fixed consent answer, e.g. taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticConsent(pub bool);

impl StaticConsent {
    pub fn granted() -> Self {
        Self(true)
    }

    pub fn denied() -> Self {
        Self(false)
    }
}

impl ConsentGate for StaticConsent {
    fn consent_granted(&self) -> impl Future<Output = bool> + Send {
        let granted = self.0;
        async move { granted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_consent_answers() {
        assert!(StaticConsent::granted().consent_granted().await);
        assert!(!StaticConsent::denied().consent_granted().await);
    }
}
