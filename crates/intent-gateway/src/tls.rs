//! Gateway URL/TLS policy: which schemes are allowed, and how custom CA
//! bundles are loaded and cached.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use tonic::transport::{Certificate, ClientTlsConfig};

#[derive(Debug, thiserror::Error)]
pub enum TlsPolicyError {
    #[error("refusing insecure scheme for non-loopback host: {0}")]
    InsecureSchemeRejected(String),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("failed to load custom CA bundle at {path}: {source}")]
    CaLoadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A parsed, policy-validated Gateway endpoint.
pub struct GatewayEndpoint {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

fn insecure_opt_out() -> bool {
    std::env::var("INTENT_INSECURE_GW").as_deref() == Ok("1")
        || std::env::var("INTENT_SKIP_TLS_VERIFY").as_deref() == Ok("true")
}

/// Validates `url`'s scheme against the Gateway URL/TLS policy and splits
/// it into host/port/security.
pub fn parse_and_validate(url: &str) -> Result<GatewayEndpoint, TlsPolicyError> {
    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| TlsPolicyError::UnsupportedScheme(url.to_string()))?;

    let secure = match scheme {
        "https" | "grpcs" => true,
        "http" | "grpc" => false,
        other => return Err(TlsPolicyError::UnsupportedScheme(other.to_string())),
    };

    let (host, port_str) = rest.split_once(':').unwrap_or((rest, ""));
    let host = host.trim_end_matches('/');
    let default_port = if secure { 443 } else { 80 };
    let port = if port_str.is_empty() {
        default_port
    } else {
        port_str
            .trim_end_matches('/')
            .parse()
            .unwrap_or(default_port)
    };

    if !secure && !(is_loopback(host) || insecure_opt_out()) {
        return Err(TlsPolicyError::InsecureSchemeRejected(url.to_string()));
    }

    Ok(GatewayEndpoint {
        host: host.to_string(),
        port,
        secure,
    })
}

type CaCacheKey = (Option<String>, bool);
static CA_CACHE: Lazy<Mutex<HashMap<CaCacheKey, Vec<u8>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Builds the `ClientTlsConfig` for a secure channel, honoring
/// `INTENT_GATEWAY_CA` / `INTENT_GATEWAY_APPEND_CA` / `INTENT_GATEWAY_STRICT_CA`.
/// Combined CA bytes are cached per (custom path, append flag) — the cache
/// is keyed on (system trust store, custom path) as specified, but since
/// there is only ever one system trust store, its identity collapses to
/// the append flag that decides whether it is included at all.
pub fn build_tls_config(domain: &str) -> Result<ClientTlsConfig, TlsPolicyError> {
    let mut config = ClientTlsConfig::new().domain_name(domain);

    let custom_ca_path = std::env::var("INTENT_GATEWAY_CA").ok();
    let append = std::env::var("INTENT_GATEWAY_APPEND_CA").as_deref() == Ok("1");
    let strict = std::env::var("INTENT_GATEWAY_STRICT_CA").as_deref() == Ok("1");

    let Some(path) = custom_ca_path else {
        return Ok(config);
    };

    let cache_key = (Some(path.clone()), append);
    let cached = CA_CACHE.lock().unwrap_or_else(|p| p.into_inner()).get(&cache_key).cloned();

    let bytes = match cached {
        Some(bytes) => bytes,
        None => match load_ca_bytes(&path, append) {
            Ok(bytes) => {
                CA_CACHE
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .insert(cache_key, bytes.clone());
                bytes
            }
            Err(e) if strict => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, path = %path, "failed to load custom CA bundle, falling back to system roots");
                return Ok(config);
            }
        },
    };

    config = config.ca_certificate(Certificate::from_pem(bytes));
    Ok(config)
}

fn load_ca_bytes(custom_path: &str, append: bool) -> Result<Vec<u8>, TlsPolicyError> {
    let custom = std::fs::read(custom_path).map_err(|e| TlsPolicyError::CaLoadFailed {
        path: custom_path.to_string(),
        source: e,
    })?;

    let mut cursor = std::io::Cursor::new(&custom);
    let parsed = rustls_pemfile::certs(&mut cursor).count();
    if parsed == 0 {
        return Err(TlsPolicyError::CaLoadFailed {
            path: custom_path.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "no certificates found in PEM bundle"),
        });
    }

    if !append {
        return Ok(custom);
    }

    // Once an explicit CA certificate is set on the channel, tonic/rustls
    // no longer add the platform trust store on their own, so appending
    // means literally concatenating it with the custom bundle ourselves:
    // system_ca ‖ "\n" ‖ custom_ca.
    let mut combined = load_system_ca_pem()?;
    combined.push(b'\n');
    combined.extend_from_slice(&custom);
    Ok(combined)
}

/// Loads the platform trust store and re-encodes it as a PEM bundle.
/// `rustls-native-certs` hands back raw DER, not PEM, so each certificate
/// is base64-encoded and wrapped by hand.
fn load_system_ca_pem() -> Result<Vec<u8>, TlsPolicyError> {
    let result = rustls_native_certs::load_native_certs();
    for error in &result.errors {
        tracing::warn!(error = %error, "skipping a system CA certificate that failed to load");
    }

    let mut pem = Vec::new();
    for cert in &result.certs {
        pem.extend_from_slice(b"-----BEGIN CERTIFICATE-----\n");
        let encoded = BASE64.encode(cert.as_ref());
        for line in encoded.as_bytes().chunks(64) {
            pem.extend_from_slice(line);
            pem.push(b'\n');
        }
        pem.extend_from_slice(b"-----END CERTIFICATE-----\n");
    }
    Ok(pem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_is_always_accepted() {
        let endpoint = parse_and_validate("https://gateway.example.com:443").unwrap();
        assert!(endpoint.secure);
        assert_eq!(endpoint.port, 443);
    }

    #[test]
    fn insecure_loopback_is_accepted() {
        let endpoint = parse_and_validate("http://localhost:8080").unwrap();
        assert!(!endpoint.secure);
        assert_eq!(endpoint.port, 8080);
    }

    #[test]
    fn insecure_non_loopback_is_rejected_without_opt_out() {
        std::env::remove_var("INTENT_INSECURE_GW");
        std::env::remove_var("INTENT_SKIP_TLS_VERIFY");
        assert!(parse_and_validate("http://gateway.example.com").is_err());
    }

    #[test]
    fn default_ports_follow_scheme() {
        let secure = parse_and_validate("grpcs://gw.example.com").unwrap();
        assert_eq!(secure.port, 443);
        let insecure = parse_and_validate("grpc://localhost").unwrap();
        assert_eq!(insecure.port, 80);
    }

    const DUMMY_CERT_PEM: &str =
        "-----BEGIN CERTIFICATE-----\nMIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8A\n-----END CERTIFICATE-----\n";

    #[test]
    fn load_ca_bytes_without_append_returns_only_the_custom_bundle() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, DUMMY_CERT_PEM.as_bytes()).unwrap();

        let bytes = load_ca_bytes(file.path().to_str().unwrap(), false).unwrap();
        assert_eq!(bytes, DUMMY_CERT_PEM.as_bytes());
    }

    #[test]
    fn load_ca_bytes_with_append_keeps_the_custom_bundle_and_prefixes_system_roots() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, DUMMY_CERT_PEM.as_bytes()).unwrap();

        let bytes = load_ca_bytes(file.path().to_str().unwrap(), true).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(
            text.ends_with(DUMMY_CERT_PEM),
            "append mode must keep the custom bundle intact, found: {text}"
        );
    }

    #[test]
    fn load_ca_bytes_rejects_a_bundle_with_no_certificates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"not a certificate").unwrap();
        assert!(load_ca_bytes(file.path().to_str().unwrap(), false).is_err());
    }
}
