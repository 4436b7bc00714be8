//! Signed JWT generation for the Nexmo API.
//!
//! A [`Jwt`] is assembled through [`Jwt::builder`] and turned into a compact RS256 JWS by a
//! [`JwtGenerator`]:
//!
//! ```no_run
//! use nexmo_jwt::Jwt;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let token = Jwt::builder()
//!     .application_id("aaaaaaaa-bbbb-cccc-dddd-0123456789ab")
//!     .private_key_path("private.key")?
//!     .subject("alice")
//!     .build()?
//!     .generate()?;
//! # Ok(())
//! # }
//! ```
pub mod claims;
pub mod cli;
pub mod file_reader;
pub mod generator;
pub mod jwt;
pub mod key_converter;
pub mod logging;
pub mod scope;

pub use claims::{ClaimValue, Claims};
pub use generator::JwtGenerator;
pub use jwt::{builder::JwtBuilder, Jwt};
pub use key_converter::KeyConverter;
pub use scope::{Method, Scope};
