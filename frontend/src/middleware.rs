use actix_session::SessionExt;
use actix_web::{
    dev::Payload, error::InternalError, http::header, Error, FromRequest, HttpRequest,
    HttpResponse,
};
use futures::future::{ready, Ready};
use shared::User;

use crate::session::{self, ERROR_KEY, USER_KEY};

/// The user stored in the session by a successful login.
///
/// Extraction fails with a temporary redirect to the home page and leaves
/// "Log in first!" as the pending error message.
pub struct SessionUser(pub User);

impl FromRequest for SessionUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let session = req.get_session();

        let result = match session::get::<User>(&session, USER_KEY) {
            Some(user) => Ok(SessionUser(user)),
            None => {
                log::debug!("No session user for {}", req.path());
                session::put(&session, ERROR_KEY, "Log in first!");
                let response = HttpResponse::TemporaryRedirect()
                    .insert_header((header::LOCATION, "/"))
                    .finish();
                Err(InternalError::from_response("login required", response).into())
            }
        };

        ready(result)
    }
}

/// Client address, honouring `Forwarded`/`X-Forwarded-For` before the peer address
pub fn client_ip(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string()
}
