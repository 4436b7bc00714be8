pub mod builder;

use crate::claims::{ClaimError, ClaimValue, Claims, ReservedClaim};
use crate::generator::{Clock, GeneratorError, IdGenerator, JwtGenerator};
use builder::JwtBuilder;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};

/// A JWT for interacting with the Nexmo API. Construct it with [`Jwt::builder`].
///
/// The application id and private key are always present; claims are free form with typed
/// accessors for the reserved ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Jwt {
    application_id: String,
    private_key_contents: String,
    claims: Claims,
}

impl Jwt {
    pub fn builder() -> JwtBuilder {
        JwtBuilder::default()
    }

    pub(crate) fn new(application_id: String, private_key_contents: String, claims: Claims) -> Self {
        Self {
            application_id,
            private_key_contents,
            claims,
        }
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn private_key_contents(&self) -> &str {
        &self.private_key_contents
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn claim(&self, key: &str) -> Option<&ClaimValue> {
        self.claims.get(key)
    }

    /// Issued at (`iat`).
    pub fn issued_at(&self) -> Result<DateTime<FixedOffset>, ClaimError> {
        self.date(ReservedClaim::IssuedAt)
    }

    /// JWT ID (`jti`).
    pub fn id(&self) -> Result<&str, ClaimError> {
        self.string(ReservedClaim::Id)
    }

    /// Not before (`nbf`).
    pub fn not_before(&self) -> Result<DateTime<FixedOffset>, ClaimError> {
        self.date(ReservedClaim::NotBefore)
    }

    /// Expiration (`exp`).
    pub fn expires_at(&self) -> Result<DateTime<FixedOffset>, ClaimError> {
        self.date(ReservedClaim::ExpiresAt)
    }

    /// Subject (`sub`).
    pub fn subject(&self) -> Result<&str, ClaimError> {
        self.string(ReservedClaim::Subject)
    }

    /// Date accessor looked up by its property name (`issued_at`, `not_before`, `expires_at`).
    pub fn date_claim(&self, property: &str) -> Result<DateTime<FixedOffset>, ClaimError> {
        match ReservedClaim::try_from(property)? {
            claim @ (ReservedClaim::IssuedAt | ReservedClaim::NotBefore | ReservedClaim::ExpiresAt) => {
                self.date(claim)
            }
            ReservedClaim::Id | ReservedClaim::Subject => Err(ClaimError::NotSet(property.to_string())),
        }
    }

    /// String accessor looked up by its property name (`id`, `subject`).
    pub fn string_claim(&self, property: &str) -> Result<&str, ClaimError> {
        match ReservedClaim::try_from(property)? {
            claim @ (ReservedClaim::Id | ReservedClaim::Subject) => self.string(claim),
            ReservedClaim::IssuedAt | ReservedClaim::NotBefore | ReservedClaim::ExpiresAt => {
                Err(ClaimError::NotSet(property.to_string()))
            }
        }
    }

    /// Generates a signed token with the default generator.
    pub fn generate(&self) -> Result<String, GeneratorError> {
        JwtGenerator::default().generate(self)
    }

    pub fn generate_with<C, I>(&self, generator: &JwtGenerator<C, I>) -> Result<String, GeneratorError>
    where
        C: Clock,
        I: IdGenerator,
    {
        generator.generate(self)
    }

    fn lookup(&self, key: &str) -> Result<&ClaimValue, ClaimError> {
        self.claims
            .get(key)
            .ok_or_else(|| ClaimError::NotSet(key.to_string()))
    }

    fn date(&self, claim: ReservedClaim) -> Result<DateTime<FixedOffset>, ClaimError> {
        let key = claim.key();
        let invalid_type = |found| ClaimError::InvalidType {
            claim: key.to_string(),
            expected: "timestamp",
            found,
        };
        match self.lookup(key)? {
            ClaimValue::Timestamp(date) => Ok(*date),
            // already in seconds since the epoch
            ClaimValue::Integer(seconds) => Utc
                .timestamp_opt(*seconds, 0)
                .single()
                .map(|date| date.fixed_offset())
                .ok_or_else(|| invalid_type("out of range integer")),
            other => Err(invalid_type(other.kind())),
        }
    }

    fn string(&self, claim: ReservedClaim) -> Result<&str, ClaimError> {
        let key = claim.key();
        let value = self.lookup(key)?;
        value.as_str().ok_or_else(|| ClaimError::InvalidType {
            claim: key.to_string(),
            expected: "string",
            found: value.kind(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{EXPIRES_AT, ISSUED_AT, JWT_ID, NOT_BEFORE, SUBJECT};
    use assert_matches::assert_matches;
    use chrono::Local;
    use rstest::rstest;

    const PRIVATE_KEY: &str = include_str!("../tests/resources/private.key");

    fn jwt_with_claim(key: &str, value: impl Into<ClaimValue>) -> Jwt {
        Jwt::builder()
            .application_id("application-id")
            .private_key_contents(PRIVATE_KEY)
            .add_claim(key, value)
            .build()
            .unwrap()
    }

    fn jwt_without_claims() -> Jwt {
        Jwt::builder()
            .application_id("application-id")
            .private_key_contents(PRIVATE_KEY)
            .build()
            .unwrap()
    }

    #[rstest]
    #[case::issued_at(ISSUED_AT, "issued_at")]
    #[case::expires_at(EXPIRES_AT, "expires_at")]
    #[case::not_before(NOT_BEFORE, "not_before")]
    fn test_date_claim_is_read_from_the_claim_map(#[case] key: &str, #[case] property: &str) {
        let now = Local::now();
        let jwt = jwt_with_claim(key, now);

        assert_eq!(jwt.date_claim(property).unwrap(), now.fixed_offset());
    }

    #[test]
    fn test_named_date_accessors() {
        let now = Utc::now();
        let jwt = Jwt::builder()
            .application_id("application-id")
            .private_key_contents(PRIVATE_KEY)
            .issued_at(now)
            .not_before(now)
            .expires_at(now)
            .build()
            .unwrap();

        assert_eq!(jwt.issued_at().unwrap(), now);
        assert_eq!(jwt.not_before().unwrap(), now);
        assert_eq!(jwt.expires_at().unwrap(), now);
    }

    #[test]
    fn test_integer_date_claim_is_read_as_epoch_seconds() {
        let jwt = jwt_with_claim(EXPIRES_AT, 636508800);

        let expected = Utc.with_ymd_and_hms(1990, 3, 4, 0, 0, 0).unwrap();
        assert_eq!(jwt.expires_at().unwrap(), expected);
    }

    #[rstest]
    #[case::subject(SUBJECT, "subject")]
    #[case::id(JWT_ID, "id")]
    fn test_string_claim_is_read_from_the_claim_map(#[case] key: &str, #[case] property: &str) {
        let jwt = jwt_with_claim(key, "value");

        assert_eq!(jwt.string_claim(property).unwrap(), "value");
    }

    #[test]
    fn test_named_string_accessors() {
        let jwt = Jwt::builder()
            .application_id("application-id")
            .private_key_contents(PRIVATE_KEY)
            .subject("subject")
            .id("id")
            .build()
            .unwrap();

        assert_eq!(jwt.subject().unwrap(), "subject");
        assert_eq!(jwt.id().unwrap(), "id");
    }

    #[test]
    fn test_missing_claims_are_not_set() {
        let jwt = jwt_without_claims();

        assert_eq!(jwt.expires_at().unwrap_err(), ClaimError::NotSet("exp".to_string()));
        assert_eq!(jwt.issued_at().unwrap_err(), ClaimError::NotSet("iat".to_string()));
        assert_eq!(jwt.not_before().unwrap_err(), ClaimError::NotSet("nbf".to_string()));
        assert_eq!(jwt.id().unwrap_err(), ClaimError::NotSet("jti".to_string()));
        assert_eq!(jwt.subject().unwrap_err(), ClaimError::NotSet("sub".to_string()));
        assert_eq!(
            jwt.expires_at().unwrap_err().to_string(),
            "Claim exp is not set."
        );
    }

    #[rstest]
    #[case::unknown_date("fooBar")]
    #[case::string_property_as_date("subject")]
    fn test_untranslatable_date_property_is_not_set(#[case] property: &str) {
        let jwt = jwt_with_claim("fooBar", Utc::now());

        assert_matches!(jwt.date_claim(property), Err(ClaimError::NotSet(name)) if name == property);
    }

    #[rstest]
    #[case::unknown_string("fooBar")]
    #[case::date_property_as_string("issued_at")]
    fn test_untranslatable_string_property_is_not_set(#[case] property: &str) {
        let jwt = jwt_with_claim("fooBar", "bar");

        assert_matches!(jwt.string_claim(property), Err(ClaimError::NotSet(name)) if name == property);
    }

    #[test]
    fn test_claim_with_unexpected_type() {
        let jwt = jwt_with_claim(SUBJECT, 42);

        assert_eq!(
            jwt.subject().unwrap_err(),
            ClaimError::InvalidType {
                claim: "sub".to_string(),
                expected: "string",
                found: "integer",
            }
        );
        let jwt = jwt_with_claim(ISSUED_AT, "yesterday");
        assert_matches!(
            jwt.issued_at(),
            Err(ClaimError::InvalidType { found: "string", .. })
        );
    }
}
