use crate::application_port::*;
use crate::domain_model::UserId;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtConfig {
    fn secret(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => &self.access_secret,
            TokenKind::Refresh => &self.refresh_secret,
        }
    }

    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
    // unique per token, so two tokens minted in the same second still differ
    pub jti: String,
    pub typ: TokenKind,
}

/// Sign a token of `kind` for `uid`, valid from `issued_at` for the
/// configured TTL. Returns the token and its expiry.
pub fn encode_token(
    kind: TokenKind,
    uid: UserId,
    issued_at: DateTime<Utc>,
    cfg: &JwtConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let exp_dt = issued_at + cfg.ttl(kind);
    let claims = Claims {
        sub: uid.0.to_string(),
        exp: exp_dt.timestamp(),
        iat: issued_at.timestamp(),
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
        jti: uuid::Uuid::new_v4().to_string(),
        typ: kind,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(cfg.secret(kind)),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))?;
    Ok((token, exp_dt))
}

/// Check signature, issuer, audience, kind and expiry. A token is expired
/// once the current time reaches `exp`.
pub fn decode_token(kind: TokenKind, token: &str, cfg: &JwtConfig) -> Result<Claims, AuthError> {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = true;
    v.leeway = 0;
    v.set_audience(&[cfg.audience.clone()]);
    v.set_issuer(&[cfg.issuer.clone()]);
    let data = decode::<Claims>(token, &DecodingKey::from_secret(cfg.secret(kind)), &v)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid,
        })?;

    let claims = data.claims;
    if claims.typ != kind {
        return Err(AuthError::TokenInvalid);
    }
    if claims.exp <= Utc::now().timestamp() {
        return Err(AuthError::TokenExpired);
    }
    Ok(claims)
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    fn verify(&self, kind: TokenKind, token: &str) -> Result<TokenVerifyResult, AuthError> {
        let claims = decode_token(kind, token, &self.cfg)?;
        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AuthError::TokenInvalid)?;
        Ok(TokenVerifyResult { user_id })
    }
}

impl TokenCodec for JwtHs256Codec {
    fn issue_access_token(
        &self,
        user: UserId,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = encode_token(TokenKind::Access, user, Utc::now(), &self.cfg)?;
        Ok((AccessToken(token), exp_dt))
    }

    fn issue_refresh_token(
        &self,
        user: UserId,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = encode_token(TokenKind::Refresh, user, Utc::now(), &self.cfg)?;
        Ok((RefreshToken(token), exp_dt))
    }

    fn verify_access_token(&self, token: &AccessToken) -> Result<TokenVerifyResult, AuthError> {
        self.verify(TokenKind::Access, &token.0)
    }

    fn verify_refresh_token(
        &self,
        token: &RefreshToken,
    ) -> Result<TokenVerifyResult, AuthError> {
        self.verify(TokenKind::Refresh, &token.0)
    }
}
