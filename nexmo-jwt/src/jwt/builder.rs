use super::Jwt;
use crate::claims::{ClaimValue, Claims, EXPIRES_AT, ISSUED_AT, JWT_ID, NOT_BEFORE, SUBJECT};
use crate::file_reader::{FileReader, FileReaderError, LocalFile};
use crate::scope::{acl_claim, Scope, ACL};
use chrono::{DateTime, TimeZone};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Both an Application ID and Private Key are required.")]
    MissingApplicationIdAndPrivateKey,
    #[error("Application ID is required.")]
    MissingApplicationId,
    #[error("Private Key is required.")]
    MissingPrivateKey,
    #[error("unable to read the private key: `{0}`")]
    PrivateKeyPath(#[from] FileReaderError),
}

/// Accumulates the values of a [`Jwt`].
///
/// `build` takes a snapshot and leaves the accumulated state in place, so the same builder can
/// keep being modified and built again. Clone it to branch from a common base.
#[derive(Debug, Default, Clone)]
pub struct JwtBuilder {
    application_id: String,
    private_key_contents: String,
    claims: Claims,
}

impl JwtBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn application_id(&mut self, application_id: impl Into<String>) -> &mut Self {
        self.application_id = application_id.into();
        self
    }

    pub fn private_key_contents(&mut self, private_key_contents: impl Into<String>) -> &mut Self {
        self.private_key_contents = private_key_contents.into();
        self
    }

    /// Reads the private key contents from a file.
    pub fn private_key_path(
        &mut self,
        private_key_path: impl AsRef<Path>,
    ) -> Result<&mut Self, ConfigurationError> {
        self.private_key_path_with(&LocalFile, private_key_path)
    }

    pub fn private_key_path_with<R: FileReader>(
        &mut self,
        reader: &R,
        private_key_path: impl AsRef<Path>,
    ) -> Result<&mut Self, ConfigurationError> {
        let private_key_path = private_key_path.as_ref();
        debug!(path = %private_key_path.display(), "reading private key");
        let contents = reader.read(private_key_path)?;
        Ok(self.private_key_contents(contents))
    }

    /// Puts every entry of `claims` into the existing claims, replacing the ones already set.
    pub fn claims<I, K, V>(&mut self, claims: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ClaimValue>,
    {
        self.claims
            .extend(claims.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn add_claim(&mut self, key: impl Into<String>, value: impl Into<ClaimValue>) -> &mut Self {
        self.claims.insert(key.into(), value.into());
        self
    }

    pub fn issued_at<Tz: TimeZone>(&mut self, iat: DateTime<Tz>) -> &mut Self {
        self.add_claim(ISSUED_AT, iat)
    }

    pub fn id(&mut self, jti: impl Into<String>) -> &mut Self {
        self.add_claim(JWT_ID, jti.into())
    }

    pub fn not_before<Tz: TimeZone>(&mut self, nbf: DateTime<Tz>) -> &mut Self {
        self.add_claim(NOT_BEFORE, nbf)
    }

    pub fn expires_at<Tz: TimeZone>(&mut self, exp: DateTime<Tz>) -> &mut Self {
        self.add_claim(EXPIRES_AT, exp)
    }

    pub fn subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.add_claim(SUBJECT, subject.into())
    }

    /// Sets the `acl` claim granting access to the given scopes.
    pub fn scopes(&mut self, scopes: &[Scope]) -> &mut Self {
        self.add_claim(ACL, acl_claim(scopes))
    }

    pub fn build(&self) -> Result<Jwt, ConfigurationError> {
        self.validate()?;
        debug!(
            application_id = %self.application_id,
            claims = self.claims.len(),
            "jwt built"
        );
        Ok(Jwt::new(
            self.application_id.clone(),
            self.private_key_contents.clone(),
            self.claims.clone(),
        ))
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        match (
            self.application_id.is_empty(),
            self.private_key_contents.is_empty(),
        ) {
            (true, true) => Err(ConfigurationError::MissingApplicationIdAndPrivateKey),
            (true, false) => Err(ConfigurationError::MissingApplicationId),
            (false, true) => Err(ConfigurationError::MissingPrivateKey),
            (false, false) => Ok(()),
        }
    }
}
