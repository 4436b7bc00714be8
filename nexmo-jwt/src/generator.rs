use crate::claims::{ClaimValue, APPLICATION_ID, ISSUED_AT, JWT_ID, NUMERIC_DATE_CLAIMS};
use crate::jwt::Jwt;
use crate::key_converter::{KeyConverter, KeyFormatError};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rsa::pkcs1::EncodeRsaPrivateKey;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, trace};
use uuid::Uuid;

const TOKEN_TYPE: &str = "JWT";

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("invalid private key: `{0}`")]
    KeyFormat(#[from] KeyFormatError),
    #[error("unable to sign token: `{0}`")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("unable to encode the private key for signing: `{0}`")]
    SigningKey(#[from] rsa::pkcs1::Error),
    #[error("unable to serialize claims: `{0}`")]
    Serialization(#[from] serde_json::Error),
}

/// Source of the default `iat` claim.
#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of the default `jti` claim.
#[cfg_attr(test, mockall::automock)]
pub trait IdGenerator {
    fn generate(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Produces Nexmo compliant JWS strings from [`Jwt`]s.
///
/// The claims set on the token always win: `iat` and `jti` are only filled in when missing, and
/// `iat`, `exp` and `nbf` timestamps are sent as seconds since the epoch.
#[derive(Debug)]
pub struct JwtGenerator<C = SystemClock, I = UuidGenerator> {
    key_converter: KeyConverter,
    clock: C,
    id_generator: I,
}

impl Default for JwtGenerator {
    fn default() -> Self {
        Self::new(KeyConverter, SystemClock, UuidGenerator)
    }
}

impl<C, I> JwtGenerator<C, I>
where
    C: Clock,
    I: IdGenerator,
{
    pub fn new(key_converter: KeyConverter, clock: C, id_generator: I) -> Self {
        Self {
            key_converter,
            clock,
            id_generator,
        }
    }

    pub fn generate(&self, jwt: &Jwt) -> Result<String, GeneratorError> {
        let private_key = self.key_converter.private_key(jwt.private_key_contents())?;

        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some(TOKEN_TYPE.to_string());

        let mut claims = jwt.claims().clone();

        // Add required claims if they don't already exist
        if !claims.contains_key(ISSUED_AT) {
            let iat = self.clock.now().timestamp();
            trace!(iat, "adding default issued at claim");
            claims.insert(ISSUED_AT.to_string(), ClaimValue::Integer(iat));
        }
        if !claims.contains_key(JWT_ID) {
            let jti = self.id_generator.generate();
            trace!(%jti, "adding default jwt id claim");
            claims.insert(JWT_ID.to_string(), ClaimValue::String(jti));
        }

        for key in NUMERIC_DATE_CLAIMS {
            if let Some(value) = claims.get_mut(key) {
                to_numeric_date(value);
            }
        }

        let mut body = Map::new();
        body.insert(
            APPLICATION_ID.to_string(),
            Value::String(jwt.application_id().to_string()),
        );
        for (key, value) in &claims {
            body.insert(key.clone(), serde_json::to_value(value)?);
        }

        let der = private_key.to_pkcs1_der()?;
        let encoding_key = EncodingKey::from_rsa_der(der.as_bytes());
        let token = jsonwebtoken::encode(&header, &body, &encoding_key)?;

        debug!(
            application_id = jwt.application_id(),
            claims = ?body.keys().collect::<Vec<_>>(),
            "jwt generated"
        );
        Ok(token)
    }
}

/// Rewrites a timezone aware timestamp into seconds since the epoch, dropping sub-second precision.
fn to_numeric_date(value: &mut ClaimValue) {
    match value {
        ClaimValue::Timestamp(date) => {
            let seconds = date.timestamp();
            *value = ClaimValue::Integer(seconds);
        }
        ClaimValue::String(_)
        | ClaimValue::Integer(_)
        | ClaimValue::Float(_)
        | ClaimValue::Bool(_)
        | ClaimValue::Sequence(_)
        | ClaimValue::Map(_) => {}
    }
}
