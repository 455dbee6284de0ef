//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they depend only
//! on driving ports and stay testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{CreditLedger, MeteredAi, PantryAccess, RecipeBook};

use super::auth::JwtAuthenticator;

/// Parameter object bundling the port implementations used by handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub ledger: Arc<dyn CreditLedger>,
    pub ai: Arc<dyn MeteredAi>,
    pub pantries: Arc<dyn PantryAccess>,
    pub recipes: Arc<dyn RecipeBook>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub ledger: Arc<dyn CreditLedger>,
    pub ai: Arc<dyn MeteredAi>,
    pub pantries: Arc<dyn PantryAccess>,
    pub recipes: Arc<dyn RecipeBook>,
    pub auth: Arc<JwtAuthenticator>,
}

impl HttpState {
    /// Construct state from the ports bundle and the bearer verifier.
    pub fn new(ports: HttpStatePorts, auth: Arc<JwtAuthenticator>) -> Self {
        let HttpStatePorts {
            ledger,
            ai,
            pantries,
            recipes,
        } = ports;
        Self {
            ledger,
            ai,
            pantries,
            recipes,
            auth,
        }
    }
}
