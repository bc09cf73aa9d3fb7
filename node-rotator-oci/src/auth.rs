use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use rsa::pkcs1::DecodeRsaPrivateKey as _;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey as _;
use rsa::signature::{SignatureEncoding as _, Signer as _};
use rsa::RsaPrivateKey;
use sha2::{Digest as _, Sha256};

use super::*;

pub const DEFAULT_PROFILE: &str = "DEFAULT";

/// API key credentials from one profile of an OCI CLI config file.
///
/// Named profiles inherit unset keys from `[DEFAULT]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OciProfile {
    user: String,
    fingerprint: String,
    tenancy: String,
    key_file: PathBuf,
    region: Option<String>,
}

impl OciProfile {
    /// `~/.oci/config`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".oci").join("config"))
    }

    pub fn from_file(path: impl AsRef<Path>, profile: &str) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            ProviderError::configuration(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::parse(&text, profile)
    }

    pub fn parse(text: &str, profile: &str) -> Result<Self, ProviderError> {
        let sections = sections(text);
        let mut values = sections.get(DEFAULT_PROFILE).cloned().unwrap_or_default();
        match sections.get(profile) {
            Some(overrides) => values.extend(overrides.clone()),
            None if profile == DEFAULT_PROFILE && !values.is_empty() => {}
            None => {
                return Err(ProviderError::configuration(format!(
                    "profile '{profile}' not found in OCI config"
                )));
            }
        }

        let required = |key: &str| {
            values
                .get(key)
                .filter(|value| !value.is_empty())
                .cloned()
                .ok_or_else(|| {
                    ProviderError::configuration(format!("OCI config '{key}' is missing"))
                })
        };
        if values.get("pass_phrase").is_some_and(|phrase| !phrase.is_empty()) {
            return Err(ProviderError::configuration(
                "encrypted API signing keys are not supported",
            ));
        }

        Ok(Self {
            user: required("user")?,
            fingerprint: required("fingerprint")?,
            tenancy: required("tenancy")?,
            key_file: expand_home(&required("key_file")?),
            region: values.get("region").filter(|region| !region.is_empty()).cloned(),
        })
    }

    /// `tenancy/user/fingerprint`, the `keyId` of every signature.
    pub fn key_id(&self) -> String {
        format!("{}/{}/{}", self.tenancy, self.user, self.fingerprint)
    }

    pub fn key_file(&self) -> &Path {
        &self.key_file
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

fn sections(text: &str) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut sections = BTreeMap::<String, BTreeMap<String, String>>::new();
    let mut current = None::<String>;
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            current = Some(name.trim().to_string());
            continue;
        }
        if let (Some(section), Some((key, value))) = (&current, line.split_once('=')) {
            sections
                .entry(section.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    sections
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Signs container engine requests with an API key (OCI HTTP signature, `rsa-sha256`).
///
/// Every request signs `date`, `(request-target)` and `host`. Requests with a
/// body also sign `x-content-sha256`, `content-type` and `content-length`.
#[derive(Clone)]
pub struct RequestSigner {
    key_id: String,
    key: SigningKey<Sha256>,
}

impl RequestSigner {
    /// `pem` holds an unencrypted RSA key, PKCS#8 or PKCS#1.
    pub fn new(key_id: impl ToString, pem: &str) -> Result<Self, ProviderError> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|err| {
                ProviderError::configuration(format!("unsupported API signing key: {err}"))
            })?;
        Ok(Self {
            key_id: key_id.to_string(),
            key: SigningKey::new(key),
        })
    }

    pub fn from_profile(profile: &OciProfile) -> Result<Self, ProviderError> {
        let path = profile.key_file();
        let pem = fs::read_to_string(path).map_err(|err| {
            ProviderError::configuration(format!("cannot read key {}: {err}", path.display()))
        })?;
        Self::new(profile.key_id(), &pem)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn sign(&self, request: &mut reqwest::Request) -> Result<(), ProviderError> {
        self.sign_at(request, SystemTime::now())
    }

    fn sign_at(&self, request: &mut reqwest::Request, now: SystemTime) -> Result<(), ProviderError> {
        let url = request.url();
        let host = url.host_str().ok_or_else(|| {
            ProviderError::configuration(format!("request url {url} has no host"))
        })?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let target = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };
        let method = request.method().as_str().to_lowercase();

        let mut headers = vec![
            ("date", httpdate::fmt_http_date(now)),
            ("(request-target)", format!("{method} {target}")),
            ("host", host),
        ];
        if [Method::POST, Method::PUT, Method::PATCH].contains(request.method()) {
            let body = request
                .body()
                .and_then(reqwest::Body::as_bytes)
                .unwrap_or_default();
            let content_type = request
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("application/json")
                .to_string();
            headers.push(("x-content-sha256", STANDARD.encode(Sha256::digest(body))));
            headers.push(("content-type", content_type));
            headers.push(("content-length", body.len().to_string()));
        }

        let signing_string = headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("\n");
        let signature = STANDARD.encode(self.key.sign(signing_string.as_bytes()).to_bytes());
        let names = headers
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(" ");
        let authorization = format!(
            r#"Signature version="1",keyId="{}",algorithm="rsa-sha256",headers="{names}",signature="{signature}""#,
            self.key_id
        );

        for (name, value) in headers.into_iter().filter(|(name, _)| *name != "(request-target)") {
            request.headers_mut().insert(name, header_value(&value)?);
        }
        request
            .headers_mut()
            .insert(AUTHORIZATION, header_value(&authorization)?);
        Ok(())
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key_id", &self.key_id)
            .field("key", &"<rsa private key>")
            .finish()
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ProviderError> {
    HeaderValue::from_str(value).map_err(ProviderError::transport)
}
