use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

use crate::{config::Config, error::ApiError, present};

pub const MSME_ID: &str = "x-msme-id";
pub const MSME_NAME: &str = "x-msme-name";
pub const MSME_EMAIL: &str = "x-msme-email";

/// The acting business as forwarded by the identity provider's gateway.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub msme_id: Option<String>,
    pub msme_name: Option<String>,
    pub msme_email: Option<String>,
    trust_client: bool,
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap, trust_client: bool) -> Caller {
        let header = |name: &str| {
            present(
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned),
            )
        };

        Caller {
            msme_id: header(MSME_ID),
            msme_name: header(MSME_NAME),
            msme_email: header(MSME_EMAIL),
            trust_client,
        }
    }

    /// Resolves the actor for an operation from the forwarded identity and the
    /// id the client claims in its payload.
    pub fn actor(&self, claimed: Option<String>) -> Result<Option<String>, ApiError> {
        let claimed = present(claimed);
        match (&self.msme_id, claimed) {
            (Some(signed_in), Some(claimed)) if *signed_in != claimed => Err(ApiError::forbidden(
                "Acting identity does not match the signed-in account",
            )),
            (Some(signed_in), _) => Ok(Some(signed_in.clone())),
            (None, claimed) if self.trust_client => Ok(claimed),
            (None, _) => Ok(None),
        }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
    Arc<Config>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Arc::<Config>::from_ref(state);
        Ok(Caller::from_headers(&parts.headers, config.trust_client_identity))
    }
}
