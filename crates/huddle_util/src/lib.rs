#![forbid(unsafe_code)]

pub mod endpoint {
	use std::fmt;

	use url::Url;

	/// Supported archive endpoint schemes.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub enum Scheme {
		Http,
		Https,
	}

	impl Scheme {
		pub const fn as_str(self) -> &'static str {
			match self {
				Scheme::Http => "http",
				Scheme::Https => "https",
			}
		}
	}

	/// Validated `http(s)://host[:port][/path]` endpoint.
	#[derive(Debug, Clone, PartialEq, Eq, Hash)]
	pub struct HttpEndpoint {
		url: Url,
		scheme: Scheme,
	}

	impl HttpEndpoint {
		/// Parse an endpoint string in the form `http(s)://host[:port][/path]`.
		///
		/// Userinfo, fragments and port 0 are rejected.
		pub fn parse(s: &str) -> Result<Self, String> {
			let s = s.trim();
			if s.is_empty() {
				return Err("endpoint must be non-empty (expected http(s)://host[:port]/path)".to_string());
			}

			let url = Url::parse(s).map_err(|e| format!("invalid endpoint ({e}): {s}"))?;

			let scheme = match url.scheme() {
				"http" => Scheme::Http,
				"https" => Scheme::Https,
				_ => return Err(format!("invalid endpoint (expected http:// or https://): {s}")),
			};

			if !url.username().is_empty() || url.password().is_some() {
				return Err(format!("invalid endpoint (userinfo is not allowed): {s}"));
			}
			if url.fragment().is_some() {
				return Err(format!("invalid endpoint (fragments are not allowed): {s}"));
			}
			if url.host_str().is_none_or(str::is_empty) {
				return Err(format!("invalid endpoint host: {s}"));
			}
			if url.port() == Some(0) {
				return Err(format!("invalid endpoint port (expected 1..=65535): {s}"));
			}

			Ok(Self { url, scheme })
		}

		pub fn scheme(&self) -> Scheme {
			self.scheme
		}

		/// Host as written in the URL (IPv6 stays bracketed).
		pub fn host(&self) -> &str {
			self.url.host_str().unwrap_or_default()
		}

		/// Explicit non-default port, if any.
		pub fn port(&self) -> Option<u16> {
			self.url.port()
		}

		pub fn path(&self) -> &str {
			self.url.path()
		}

		pub fn url(&self) -> &Url {
			&self.url
		}

		pub fn into_url(self) -> Url {
			self.url
		}
	}

	impl fmt::Display for HttpEndpoint {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			fmt::Display::fmt(&self.url, f)
		}
	}

	#[cfg(test)]
	mod tests {
		use super::*;

		#[test]
		fn parses_https_with_path() {
			let e = HttpEndpoint::parse("https://replay.example.com/api/messages").unwrap();
			assert_eq!(e.scheme(), Scheme::Https);
			assert_eq!(e.host(), "replay.example.com");
			assert_eq!(e.port(), None);
			assert_eq!(e.path(), "/api/messages");
			assert_eq!(e.url().as_str(), "https://replay.example.com/api/messages");
		}

		#[test]
		fn scheme_is_case_insensitive() {
			let e = HttpEndpoint::parse("HTTPS://Replay.Example.com/api/messages").unwrap();
			assert_eq!(e.scheme(), Scheme::Https);
			assert_eq!(e.host(), "replay.example.com");
			assert_eq!(e.to_string(), "https://replay.example.com/api/messages");
		}

		#[test]
		fn parses_ipv4_with_port_and_no_path() {
			let e = HttpEndpoint::parse("http://127.0.0.1:8080").unwrap();
			assert_eq!(e.port(), Some(8080));
			assert_eq!(e.path(), "/");
			assert_eq!(e.url().as_str(), "http://127.0.0.1:8080/");
		}

		#[test]
		fn parses_bracketed_ipv6() {
			let e = HttpEndpoint::parse("http://[::1]:9000/x?y=1").unwrap();
			assert_eq!(e.host(), "[::1]");
			assert_eq!(e.port(), Some(9000));
			assert_eq!(e.path(), "/x");
			assert_eq!(e.url().query(), Some("y=1"));
		}

		#[test]
		fn query_without_path_gets_root() {
			let e = HttpEndpoint::parse("http://h?q=1").unwrap();
			assert_eq!(e.url().as_str(), "http://h/?q=1");
		}

		#[test]
		fn rejects_invalid_host_characters() {
			assert!(HttpEndpoint::parse("http://exa mple.com/api").is_err());
			assert!(HttpEndpoint::parse("http://::1:8080/").is_err());
		}

		#[test]
		fn rejects_bad_inputs() {
			assert!(HttpEndpoint::parse("").is_err());
			assert!(HttpEndpoint::parse("ftp://host/").is_err());
			assert!(HttpEndpoint::parse("http://").is_err());
			assert!(HttpEndpoint::parse("http://host:0/").is_err());
			assert!(HttpEndpoint::parse("http://host:99999/").is_err());
			assert!(HttpEndpoint::parse("http://host/#frag").is_err());
			assert!(HttpEndpoint::parse("http://user@host/").is_err());
			assert!(HttpEndpoint::parse("http://user:pw@host/").is_err());
		}
	}
}

pub mod env {
	/// Read an environment variable, trimmed, treating blank values as unset.
	pub fn env_nonempty(key: &str) -> Option<String> {
		std::env::var(key).ok().and_then(|v| nonempty(&v))
	}

	/// Trim `v`, returning `None` when nothing is left.
	pub fn nonempty(v: &str) -> Option<String> {
		let v = v.trim();
		(!v.is_empty()).then(|| v.to_string())
	}

	/// Parse the usual truthy/falsy spellings.
	pub fn parse_env_bool(v: &str) -> Option<bool> {
		match v.trim().to_ascii_lowercase().as_str() {
			"1" | "true" | "yes" | "on" => Some(true),
			"0" | "false" | "no" | "off" => Some(false),
			_ => None,
		}
	}

}
