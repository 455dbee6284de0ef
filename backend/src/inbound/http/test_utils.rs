//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use chrono::Utc;
use mockable::DefaultClock;
use uuid::Uuid;

use crate::domain::ports::{MockCreditLedger, MockMeteredAi, MockPantryAccess, MockRecipeBook};
use crate::domain::{UserId, Wallet};

use super::auth::{AuthConfig, JwtAuthenticator};
use super::state::{HttpState, HttpStatePorts};

const TEST_SECRET: &str = "handler-test-secret";

/// Mocked driving ports; set expectations, then call [`TestPorts::into_state`].
#[derive(Default)]
pub struct TestPorts {
    pub ledger: MockCreditLedger,
    pub ai: MockMeteredAi,
    pub pantries: MockPantryAccess,
    pub recipes: MockRecipeBook,
}

impl TestPorts {
    pub fn into_state(self) -> HttpState {
        HttpState::new(
            HttpStatePorts {
                ledger: Arc::new(self.ledger),
                ai: Arc::new(self.ai),
                pantries: Arc::new(self.pantries),
                recipes: Arc::new(self.recipes),
            },
            authenticator(),
        )
    }
}

/// Authenticator sharing the secret used by [`bearer`].
pub fn authenticator() -> Arc<JwtAuthenticator> {
    Arc::new(JwtAuthenticator::new(
        &AuthConfig::new(TEST_SECRET),
        Arc::new(DefaultClock),
    ))
}

/// `Authorization` header carrying a fresh token for `user`.
pub fn bearer(user: &UserId, roles: &[&str]) -> (&'static str, String) {
    let token = authenticator().issue(user, roles).expect("token signs");
    ("authorization", format!("Bearer {token}"))
}

/// Wallet snapshot with the given balance.
pub fn wallet(user_id: UserId, balance: i32) -> Wallet {
    let now = Utc::now();
    Wallet {
        id: Uuid::new_v4(),
        user_id,
        balance,
        created_at: now,
        updated_at: now,
    }
}
