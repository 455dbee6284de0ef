//! Credit pre-check for metered routes.
//!
//! The guard resolves the bearer identity and asks the ledger whether the
//! caller can afford one call. It reserves nothing: the pipeline debits only
//! after the artifact is produced, so two concurrent calls may both pass
//! here and one may still fail the final debit.

use std::rc::Rc;
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{HttpRequest, web};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::debug;

use crate::domain::Error;

use super::auth::authenticate;
use super::state::HttpState;

/// Middleware rejecting callers whose balance cannot cover a metered call.
#[derive(Clone, Copy, Debug, Default)]
pub struct CreditGuard;

impl<S, B> Transform<S, ServiceRequest> for CreditGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = CreditGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CreditGuardMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// Service produced by [`CreditGuard`].
pub struct CreditGuardMiddleware<S> {
    service: Rc<S>,
}

async fn admit(req: &HttpRequest) -> Result<(), Error> {
    let user = authenticate(req)?;
    let state = req
        .app_data::<web::Data<HttpState>>()
        .ok_or_else(|| Error::internal("HTTP state is not configured"))?;
    state.ledger.ensure_credits(&user.id()).await?;
    Ok(())
}

impl<S, B> Service<ServiceRequest> for CreditGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let admitted = admit(req.request()).await;
            match admitted {
                Ok(()) => service
                    .call(req)
                    .await
                    .map(ServiceResponse::map_into_left_body),
                Err(error) => {
                    debug!(code = ?error.code(), path = req.path(), "metered call refused");
                    Ok(req.error_response(error).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test};
    use rstest::rstest;

    use crate::domain::UserId;
    use crate::inbound::http::test_utils::{TestPorts, bearer, wallet};

    async fn call(ports: TestPorts, header: Option<(&'static str, String)>) -> ServiceResponse {
        let app = test::init_service(
            App::new().app_data(web::Data::new(ports.into_state())).service(
                web::scope("/metered")
                    .wrap(CreditGuard)
                    .route("/run", web::post().to(|| async { HttpResponse::Ok().body("ran") })),
            ),
        )
        .await;
        let mut request = test::TestRequest::post().uri("/metered/run");
        if let Some(header) = header {
            request = request.insert_header(header);
        }
        test::call_service(&app, request.to_request()).await
    }

    #[rstest]
    #[actix_web::test]
    async fn callers_with_credit_are_admitted() {
        let user = UserId::random();
        let mut ports = TestPorts::default();
        ports
            .ledger
            .expect_ensure_credits()
            .times(1)
            .returning(move |id| Ok(wallet(*id, 4)));

        let res = call(ports, Some(bearer(&user, &[]))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, "ran");
    }

    #[rstest]
    #[actix_web::test]
    async fn empty_wallets_short_circuit_with_402() {
        let user = UserId::random();
        let mut ports = TestPorts::default();
        ports
            .ledger
            .expect_ensure_credits()
            .times(1)
            .returning(|_| Err(Error::insufficient_credits("insufficient credits")));

        let res = call(ports, Some(bearer(&user, &[]))).await;
        assert_eq!(res.status(), StatusCode::PAYMENT_REQUIRED);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["code"], "INSUFFICIENT_CREDITS");
    }

    #[rstest]
    #[actix_web::test]
    async fn anonymous_callers_never_reach_the_ledger() {
        let mut ports = TestPorts::default();
        ports.ledger.expect_ensure_credits().times(0);

        let res = call(ports, None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
