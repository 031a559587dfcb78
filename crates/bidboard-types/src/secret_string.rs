//! Bearer credential wrapper.
//!
//! The marketplace core never looks inside a credential. It is handed to the
//! HTTP layer as an `Authorization` header and to the session store for
//! persistence; everywhere else it renders as a fixed placeholder. The buffer
//! is zeroed when the last copy is dropped.

use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(credential: String) -> Self {
		Self(Zeroizing::new(credential))
	}

	/// Raw credential. Callers must not log the result.
	pub fn expose_secret(&self) -> &str {
		self.0.as_str()
	}

	/// `Authorization` header value, zeroed on drop like the credential.
	pub fn bearer(&self) -> Zeroizing<String> {
		let mut header = Zeroizing::new(String::with_capacity(7 + self.0.len()));
		header.push_str("Bearer ");
		header.push_str(&self.0);
		header
	}

	/// Blank credentials are treated as missing.
	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SecretString").field(&REDACTED).finish()
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for SecretString {
	fn from(credential: String) -> Self {
		Self::new(credential)
	}
}

impl From<&str> for SecretString {
	fn from(credential: &str) -> Self {
		Self::new(credential.to_owned())
	}
}
