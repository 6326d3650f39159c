use crate::error::Error;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub(crate) struct APIError(anyhow::Error);

impl IntoResponse for APIError {
    fn into_response(self) -> Response {
        let any_err = self.0;
        let status = match any_err.downcast_ref::<Error>() {
            Some(
                Error::MissingParameters
                | Error::InvalidHostname(_)
                | Error::InvalidAddress(_)
                | Error::DisallowedAddress(_),
            ) => StatusCode::BAD_REQUEST,
            Some(Error::Unauthorized) => StatusCode::FORBIDDEN,
            Some(Error::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            None if any_err.is::<QueryRejection>() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, format!("{any_err}")).into_response()
    }
}

impl<E> From<E> for APIError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
