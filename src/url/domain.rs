use crate::UrlError;
use url::{Position, Url};

/// The single site a crawl is confined to
///
/// Accepts either a bare host (`example.com`, which implies `https`) or a full
/// origin (`http://127.0.0.1:8080`). The text it was built from is kept so a
/// checkpoint reproduces it exactly.
#[derive(Debug, Clone)]
pub struct BaseDomain {
    raw: String,
    origin: Url,
}

impl BaseDomain {
    /// Parses a base domain from configuration or checkpoint text
    ///
    /// # Examples
    ///
    /// ```
    /// use post_harvest::url::BaseDomain;
    ///
    /// let domain = BaseDomain::parse("example.com").unwrap();
    /// assert_eq!(domain.absolute("/posts/abc/"), "https://example.com/posts/abc/");
    /// ```
    pub fn parse(raw: &str) -> Result<Self, UrlError> {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(UrlError::MissingDomain);
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let origin = Url::parse(&with_scheme).map_err(|e| UrlError::Parse(e.to_string()))?;

        if origin.scheme() != "http" && origin.scheme() != "https" {
            return Err(UrlError::InvalidScheme(origin.scheme().to_string()));
        }

        if origin.host_str().is_none() {
            return Err(UrlError::MissingDomain);
        }

        Ok(Self {
            raw: trimmed.to_string(),
            origin,
        })
    }

    /// The domain exactly as configured
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true if `url` lives on this domain
    ///
    /// Hosts compare without a leading `www.` and the explicit port must agree.
    pub fn contains(&self, url: &Url) -> bool {
        match (url.host_str(), self.origin.host_str()) {
            (Some(host), Some(base)) => {
                strip_www(host) == strip_www(base) && url.port() == self.origin.port()
            }
            _ => false,
        }
    }

    /// Resolves link text to an absolute http(s) URL
    ///
    /// Base-relative (`/path`) and protocol-relative (`//host/path`) forms are
    /// resolved against this domain's origin. Anything that is not http(s) after
    /// resolution yields `None`.
    pub fn resolve(&self, input: &str) -> Option<Url> {
        let url = if input.starts_with("//") {
            Url::parse(&format!("{}:{}", self.origin.scheme(), input)).ok()?
        } else if input.starts_with('/') {
            self.origin.join(input).ok()?
        } else {
            Url::parse(input).ok()?
        };

        match url.scheme() {
            "http" | "https" => Some(url),
            _ => None,
        }
    }

    /// Expands a normalized (domain-relative) URL back to absolute form
    pub fn absolute(&self, normalized: &str) -> String {
        format!("{}{}", &self.origin[..Position::BeforePath], normalized)
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
