// API client module: a blocking HTTP session against Splunkbase. It logs in
// once, resolves app names to ids and metadata (memoized per session), and
// streams release artifacts to disk while verifying their checksum.

use std::collections::HashMap;
use std::fs::File;
use std::io;

use indicatif::ProgressBar;
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};
use tracing::{debug, info, warn};

use crate::download::{stream_to, Checksum, ChecksumKind, Destination};
use crate::error::{ClientError, DownloadFailure, Result};
use crate::models::{AppMetadata, Release};

pub const DEFAULT_BASE_URL: &str = "https://splunkbase.splunk.com/";
pub const DEFAULT_APPS_URL: &str = "https://apps.splunk.com/";

const LOGIN_PATH: &str = "/api/account:login";
const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";
const AUTH_HEADER: &str = "X-Auth-Token";

/// Where the session sends its requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Splunkbase API host; relative paths are joined onto this.
    pub base_url: String,
    /// Host serving the `/apps/id/<name>` redirects.
    pub apps_url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            apps_url: DEFAULT_APPS_URL.into(),
        }
    }
}

impl SessionConfig {
    /// Read `SPLUNKBASE_URL` and `SPLUNKBASE_APPS_URL`, falling back to the
    /// public Splunkbase hosts.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("SPLUNKBASE_URL").unwrap_or(defaults.base_url),
            apps_url: std::env::var("SPLUNKBASE_APPS_URL").unwrap_or(defaults.apps_url),
        }
    }
}

/// Splunkbase account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Result of a successful [`Session::download`].
#[derive(Debug, Clone, PartialEq)]
pub struct Downloaded {
    pub destination: Destination,
    pub release: Release,
    /// Algorithm the payload was verified with, `None` if the release
    /// published no checksum.
    pub verified_with: Option<ChecksumKind>,
    pub bytes: u64,
}

/// An authenticated Splunkbase session.
///
/// Holds two clients: redirects are followed for regular requests but must
/// not be for app-id resolution, where the redirect itself is the answer.
pub struct Session {
    client: Client,
    no_redirect: Client,
    base_url: Url,
    apps_url: Url,
    token: String,
    app_info: HashMap<String, Option<AppMetadata>>,
}

impl Session {
    /// Log in with `credentials` and return a session carrying the token.
    pub fn login(config: &SessionConfig, credentials: &Credentials) -> Result<Self> {
        let base_url = parse_url(&config.base_url)?;
        let apps_url = parse_url(&config.apps_url)?;
        let client = Client::builder().build()?;
        let no_redirect = Client::builder().redirect(Policy::none()).build()?;

        let login_url = join(&base_url, LOGIN_PATH)?;
        debug!(url = %login_url, username = %credentials.username, "logging in");
        let res = client
            .post(login_url)
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .map_err(|e| ClientError::Authentication {
                reason: e.to_string(),
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(ClientError::Authentication {
                reason: format!("login returned {status}"),
            });
        }
        let body = res.text().map_err(|e| ClientError::Authentication {
            reason: e.to_string(),
        })?;
        let token = parse_login_token(&body)?;
        info!(username = %credentials.username, "logged in to Splunkbase");

        Ok(Self {
            client,
            no_redirect,
            base_url,
            apps_url,
            token,
            app_info: HashMap::new(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Resolve `path` against the base URL unless it is already absolute.
    pub fn url(&self, path: &str) -> Result<Url> {
        if path.starts_with("https://") {
            parse_url(path)
        } else {
            join(&self.base_url, path)
        }
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&self.token).map_err(|e| ClientError::Authentication {
            reason: format!("token is not a valid header value: {e}"),
        })?;
        headers.insert(AUTH_HEADER, value);
        Ok(headers)
    }

    fn get(&self, client: &Client, url: Url) -> Result<RequestBuilder> {
        debug!(%url, "GET");
        Ok(client.get(url).headers(self.auth_headers()?))
    }

    /// Numeric id for an app name, or `None` if Splunkbase does not know it.
    pub fn resolve_app_id(&self, app_name: &str) -> Result<Option<u64>> {
        let url = app_id_url(&self.apps_url, app_name)?;
        let res = self.get(&self.no_redirect, url)?.send()?;

        if !res.status().is_redirection() {
            debug!(app = app_name, status = %res.status(), "app id lookup did not redirect");
            return Ok(None);
        }
        let id = res
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(app_id_from_location);
        if id.is_none() {
            warn!(app = app_name, "app id redirect carried no usable Location");
        }
        Ok(id)
    }

    /// Metadata document for an app id, including all releases.
    pub fn fetch_metadata(&self, app_id: u64) -> Result<Option<AppMetadata>> {
        let url = self.url(&format!("/api/v1/app/{app_id}/"))?;
        let res = self.get(&self.client, url)?.query(&[("include", "all")]).send()?;

        if res.status() != StatusCode::OK {
            debug!(app_id, status = %res.status(), "metadata lookup failed");
            return Ok(None);
        }
        let text = res.text()?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Metadata for an app name. Results, including "not found", are cached
    /// for the lifetime of this session.
    pub fn get_app_info(&mut self, app_name: &str) -> Result<Option<&AppMetadata>> {
        if !self.app_info.contains_key(app_name) {
            let metadata = match self.resolve_app_id(app_name)? {
                Some(id) => self.fetch_metadata(id)?,
                None => None,
            };
            self.app_info.insert(app_name.to_string(), metadata);
        }
        Ok(self.app_info.get(app_name).and_then(Option::as_ref))
    }

    fn require_app_info(&mut self, app_name: &str) -> Result<&AppMetadata> {
        self.get_app_info(app_name)?
            .ok_or_else(|| ClientError::AppNotFound {
                name: app_name.to_string(),
            })
    }

    /// Latest release of an app, optionally restricted to releases
    /// compatible with a Splunk version.
    pub fn get_latest_version(
        &mut self,
        app_name: &str,
        splunk_version: Option<&str>,
    ) -> Result<Release> {
        self.require_app_info(app_name)?
            .latest_release(splunk_version)
            .cloned()
            .ok_or_else(|| ClientError::NoReleaseFound {
                name: app_name.to_string(),
            })
    }

    /// Release with the given title, or the designated latest release.
    pub fn select_release(&mut self, app_name: &str, version: Option<&str>) -> Result<Release> {
        let metadata = self.require_app_info(app_name)?;
        match metadata.release_by_title(version) {
            Some(release) => Ok(release.clone()),
            None => Err(match version {
                Some(version) => ClientError::VersionNotFound {
                    name: app_name.to_string(),
                    version: version.to_string(),
                },
                None => ClientError::NoReleaseFound {
                    name: app_name.to_string(),
                },
            }),
        }
    }

    /// Splunkbase page URL of an app.
    pub fn app_page_url(&mut self, app_name: &str) -> Result<Option<String>> {
        Ok(self.require_app_info(app_name)?.path.clone())
    }

    /// Download a release of `app_name` to `destination` (or the default
    /// `<app>-<version>.tgz`), verifying its checksum on the way.
    ///
    /// On a checksum mismatch the written file is left in place.
    pub fn download(
        &mut self,
        app_name: &str,
        version: Option<&str>,
        destination: Option<Destination>,
        progress: &ProgressBar,
    ) -> Result<Downloaded> {
        let release = self.select_release(app_name, version)?;
        let checksum = Checksum::for_release(&release);
        if checksum.is_none() {
            warn!(
                app = app_name,
                version = %release.title,
                "release has no checksum, skipping verification"
            );
        }

        let url = self.url(&release.path)?;
        let mut res = self.get(&self.client, url)?.send()?;
        let status = res.status();
        if status != StatusCode::OK {
            let body = res.text().unwrap_or_default();
            return Err(DownloadFailure::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        if let Some(len) = res.content_length() {
            progress.set_length(len);
        }

        let destination =
            destination.unwrap_or_else(|| Destination::default_for(app_name, &release.title));
        let mut verifier = checksum.as_ref().map(Checksum::verifier);

        let bytes = match &destination {
            Destination::Stdout => {
                let mut out = io::stdout().lock();
                stream_to(&mut res, &mut out, verifier.as_mut(), progress)?
            }
            Destination::File(path) => {
                let mut file = File::create(path)?;
                stream_to(&mut res, &mut file, verifier.as_mut(), progress)?
            }
        };
        progress.finish_and_clear();

        if let (Some(checksum), Some(verifier)) = (&checksum, verifier) {
            let actual = verifier.finalize();
            if !checksum.matches(&actual) {
                warn!(app = app_name, %destination, "checksum mismatch, leaving file in place");
                return Err(DownloadFailure::ChecksumMismatch {
                    kind: checksum.kind,
                    expected: checksum.expected.clone(),
                    actual,
                }
                .into());
            }
        }

        info!(app = app_name, version = %release.title, %destination, bytes, "download complete");
        Ok(Downloaded {
            destination,
            verified_with: checksum.map(|c| c.kind),
            release,
            bytes,
        })
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| ClientError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path).map_err(|e| ClientError::InvalidUrl {
        url: path.to_string(),
        reason: e.to_string(),
    })
}

/// `<apps_url>/apps/id/<name>`, with the name encoded as a single segment.
fn app_id_url(apps_url: &Url, app_name: &str) -> Result<Url> {
    let mut url = join(apps_url, "/apps/id/")?;
    url.path_segments_mut()
        .map_err(|()| ClientError::InvalidUrl {
            url: apps_url.to_string(),
            reason: "cannot be a base URL".into(),
        })?
        .pop_if_empty()
        .push(app_name);
    Ok(url)
}

/// Last non-empty path segment of a redirect target, as a number.
fn app_id_from_location(location: &str) -> Option<u64> {
    location
        .split(['?', '#'])
        .next()?
        .trim_end_matches('/')
        .rsplit('/')
        .next()?
        .parse()
        .ok()
}

/// Extract the token from the login response: the text of the Atom `id`
/// element directly under the document root.
fn parse_login_token(body: &str) -> Result<String> {
    let fail = |reason: String| ClientError::Authentication { reason };
    let mut reader = NsReader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut in_id = false;
    let mut token = String::new();

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| fail(format!("unparsable login response: {e}")))?;
        match event {
            Event::Start(start) => {
                depth += 1;
                in_id = depth == 2
                    && start.local_name().as_ref() == b"id"
                    && matches!(ns, ResolveResult::Bound(n) if n.as_ref() == ATOM_NS);
            }
            Event::Text(text) if in_id => {
                let text = text
                    .unescape()
                    .map_err(|e| fail(format!("unparsable login response: {e}")))?;
                token.push_str(&text);
            }
            Event::CData(cdata) if in_id => {
                let text = std::str::from_utf8(&cdata)
                    .map_err(|e| fail(format!("unparsable login response: {e}")))?;
                token.push_str(text);
            }
            Event::End(_) => {
                if in_id {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(fail("login response carried no token".into()));
    }
    Ok(token.to_string())
}
