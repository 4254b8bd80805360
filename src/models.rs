// Metadata documents returned by the Splunkbase app API, plus the release
// selection rules applied to them. Fields this client does not use are kept
// in `extra` so a document can be dumped back out unchanged.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Metadata for one app, as returned by `/api/v1/app/<id>/?include=all`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AppMetadata {
    pub appid: String,
    /// Splunkbase page for the app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The release Splunkbase designates as latest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<Release>,
    /// All published releases, in the order the server returned them.
    #[serde(default, deserialize_with = "null_as_default")]
    pub releases: Vec<Release>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One published version of an app.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Release {
    pub title: String,
    pub path: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub published_time: Option<String>,
    #[serde(default)]
    pub manifest: Option<Manifest>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub splunk_compatibility: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub info: ManifestInfo,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ManifestInfo {
    #[serde(default)]
    pub title: Option<String>,
    /// Authors are either plain strings or `{ "name": ..., "email": ... }`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Splunkbase sends `null` for empty lists and objects as often as it omits
/// them; both read as the empty value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl AppMetadata {
    /// Latest release, optionally restricted to a Splunk platform version.
    ///
    /// Without a filter this is the designated `release`. With a filter the
    /// first release in document order whose compatibility list covers it
    /// wins; no version ordering is applied.
    pub fn latest_release(&self, splunk_version: Option<&str>) -> Option<&Release> {
        match splunk_version {
            None => self.release.as_ref(),
            Some(wanted) => self
                .releases
                .iter()
                .find(|release| release.is_compatible_with(wanted)),
        }
    }

    /// Release with exactly this title, or the designated release when no
    /// version is given.
    pub fn release_by_title(&self, version: Option<&str>) -> Option<&Release> {
        match version {
            None => self.release.as_ref(),
            Some(version) => self.releases.iter().find(|release| release.title == version),
        }
    }
}

impl Release {
    /// True if any compatibility tag equals `splunk_version` or is a
    /// dot-prefix of it (`8.1` covers `8.1.3`, not `8.10`).
    pub fn is_compatible_with(&self, splunk_version: &str) -> bool {
        self.splunk_compatibility.iter().any(|tag| {
            splunk_version == tag
                || splunk_version
                    .strip_prefix(tag.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    /// First listed author, by name when the entry is an object.
    pub fn author(&self) -> Option<String> {
        let first = self.manifest.as_ref()?.info.author.first()?;
        match first {
            Value::String(name) => Some(name.clone()),
            Value::Object(fields) => match fields.get("name") {
                Some(Value::String(name)) => Some(name.clone()),
                _ => Some(first.to_string()),
            },
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn manifest_title(&self) -> Option<&str> {
        self.manifest.as_ref()?.info.title.as_deref()
    }

    /// Parse `published_time`. Timestamps without an offset are taken as UTC.
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.published_time.as_deref()?.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed);
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc().fixed_offset())
    }
}
