//! Base address resolution and path joining.

use url::Url;

/// Default API base address.
pub const DEFAULT_BASE_URL: &str = "https://us-central1-diffioai.cloudfunctions.net";

/// Version segment appended to the base address unless already present.
pub const API_PREFIX: &str = "v1";

/// Environment variable overriding the base address.
pub const BASE_URL_ENV: &str = "DIFFIO_API_BASE_URL";

/// Join a base address and path segments, normalizing slashes.
///
/// Trailing slashes on the base and leading slashes on segments are
/// trimmed; empty segments are skipped.
pub fn join(base: &str, paths: &[&str]) -> String {
    let mut joined = base.trim_end_matches('/').to_string();
    for path in paths {
        let part = path.trim_start_matches('/');
        if part.is_empty() {
            continue;
        }
        joined.push('/');
        joined.push_str(part);
    }
    joined
}

/// Resolve the effective base address and version prefix.
///
/// Precedence: explicit configuration, then `DIFFIO_API_BASE_URL`, then
/// the built-in default. The returned prefix is empty when the address
/// already ends in the version segment.
pub(crate) fn resolve_base_url(configured: Option<&str>) -> (String, &'static str) {
    let from_env = std::env::var(BASE_URL_ENV).ok();
    let resolved = configured
        .map(str::to_string)
        .or(from_env)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let trimmed = resolved.trim_end_matches('/').to_string();
    let prefix = if trimmed.ends_with(&format!("/{}", API_PREFIX)) {
        ""
    } else {
        API_PREFIX
    };
    (trimmed, prefix)
}

/// Whether a signed storage address points at a local storage emulator.
///
/// Emulator targets do not understand real signed credentials; requests to
/// them carry the emulator's fixed `Bearer owner` authorization instead.
pub(crate) fn is_storage_emulator_url(address: &str) -> bool {
    let Ok(parsed) = Url::parse(address) else {
        return false;
    };
    let Some(host) = parsed.host_str().map(str::to_lowercase) else {
        return false;
    };
    let port = parsed
        .port()
        .unwrap_or(if parsed.scheme() == "https" { 443 } else { 80 });

    if matches!(host.as_str(), "127.0.0.1" | "localhost" | "0.0.0.0" | "::1")
        && (parsed.port().is_none() || port == 9199)
    {
        return true;
    }

    let env_host = std::env::var("STORAGE_EMULATOR_HOST")
        .or_else(|_| std::env::var("FIREBASE_STORAGE_EMULATOR_HOST"))
        .ok();
    let Some(env_host) = env_host else {
        return false;
    };
    let normalized = if env_host.starts_with("http://") || env_host.starts_with("https://") {
        env_host
    } else {
        format!("http://{}", env_host)
    };
    let Ok(emulator) = Url::parse(&normalized) else {
        return false;
    };
    let emulator_host = emulator.host_str().map(str::to_lowercase);
    let emulator_port = emulator
        .port()
        .unwrap_or(if emulator.scheme() == "https" { 443 } else { 80 });

    emulator_host.as_deref() == Some(host.as_str()) && emulator_port == port
}
