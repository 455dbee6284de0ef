//! Request-scoped call context for metered operations.

use tokio_util::sync::{CancellationToken, DropGuard};

use crate::domain::AuthenticatedUser;
use crate::domain::ports::CallContext;

/// Build the context for a metered call.
///
/// Keep the returned guard alive for the whole handler. Actix drops the
/// handler future when the client disconnects; the guard then cancels the
/// token so pending provider retries stop.
pub(crate) fn call_context(user: &AuthenticatedUser) -> (CallContext, DropGuard) {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    (CallContext::new(user.id(), token), guard)
}
