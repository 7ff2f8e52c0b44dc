use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderName, HeaderValue, request::Parts},
    response::{IntoResponseParts, ResponseParts},
};
use uuid::Uuid;

pub const CART_SESSION_HEADER: &str = "x-cart-session";

/// The cart session named by the `x-cart-session` header. A missing or
/// malformed header starts a new session. Returned from a handler, it sets
/// the header on the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSession {
    pub id: Uuid,
}

impl CartSession {
    fn from_headers(parts: &Parts) -> Self {
        let existing = parts
            .headers
            .get(CART_SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok());

        match existing {
            Some(id) => Self { id },
            None => {
                let id = Uuid::new_v4();
                tracing::debug!(session_id = %id, "new cart session");
                Self { id }
            }
        }
    }
}

impl<S> FromRequestParts<S> for CartSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(parts))
    }
}

impl IntoResponseParts for CartSession {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if let Ok(value) = HeaderValue::from_str(&self.id.to_string()) {
            res.headers_mut()
                .insert(HeaderName::from_static(CART_SESSION_HEADER), value);
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/cart");
        if let Some(value) = header {
            builder = builder.header(CART_SESSION_HEADER, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn existing_session_is_kept() {
        let id = Uuid::new_v4();
        assert_eq!(CartSession::from_headers(&parts(Some(&id.to_string()))).id, id);
    }

    #[test]
    fn missing_or_malformed_header_starts_a_new_session() {
        let a = CartSession::from_headers(&parts(None));
        let b = CartSession::from_headers(&parts(Some("not-a-uuid")));
        assert_ne!(a.id, b.id);
        assert!(!b.id.is_nil());
    }
}
