//! Camera definitions
//!
//! A camera is immutable once loaded and owns exactly one relay group.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// One configured camera
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CameraSource {
    /// Logical name, used in logs
    #[serde(alias = "Name")]
    pub name: String,
    /// Upstream MJPEG URL
    #[serde(alias = "Url")]
    pub url: String,
    /// Port viewers connect to
    #[serde(alias = "Port")]
    pub port: u16,
    /// Request paths that select this camera
    #[serde(alias = "CameraPathAliases", alias = "camera_path_aliases")]
    pub aliases: Vec<String>,
}

impl CameraSource {
    /// Create a camera definition
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        port: u16,
        aliases: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            port,
            aliases: aliases.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a request path selects this camera
    pub fn matches_path(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.aliases.iter().any(|alias| normalize_path(alias) == path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            camera: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(invalid("url must be http:// or https://"));
        }
        if self.port == 0 {
            return Err(invalid("port must be non-zero"));
        }
        if self.aliases.is_empty() {
            return Err(invalid("at least one alias is required"));
        }
        Ok(())
    }
}

/// Normalize a request path for alias comparison
///
/// Drops any query string or fragment, then strips leading and trailing `/`.
pub fn normalize_path(path: &str) -> &str {
    let end = path.find(|c: char| c == '?' || c == '#').unwrap_or(path.len());
    path[..end].trim_matches('/')
}

/// Parse and validate a JSON camera list
pub fn parse_cameras(json: &str) -> Result<Vec<CameraSource>, ConfigError> {
    let mut cameras: Vec<CameraSource> = serde_json::from_str(json)?;
    if cameras.is_empty() {
        return Err(ConfigError::Empty);
    }

    let mut ports = HashSet::new();
    for camera in &mut cameras {
        camera.validate()?;
        if !ports.insert(camera.port) {
            return Err(ConfigError::Invalid {
                camera: camera.name.clone(),
                reason: format!("port {} is used by another camera", camera.port),
            });
        }
        camera.aliases = camera
            .aliases
            .iter()
            .map(|alias| normalize_path(alias).to_string())
            .collect();
    }

    Ok(cameras)
}

/// Load a JSON camera list from disk
pub fn load_cameras(path: impl AsRef<Path>) -> Result<Vec<CameraSource>, ConfigError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_cameras(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/cam1"), "cam1");
        assert_eq!(normalize_path("/cam1/"), "cam1");
        assert_eq!(normalize_path("//front//"), "front");
        assert_eq!(normalize_path("/cam1?fps=5"), "cam1");
        assert_eq!(normalize_path("/"), "");
        assert_eq!(normalize_path("/a/b/"), "a/b");
    }

    #[test]
    fn test_matches_path() {
        let camera = CameraSource::new("door", "http://10.0.0.5/stream", 8081, ["cam1", "front"]);

        assert!(camera.matches_path("/cam1"));
        assert!(camera.matches_path("/front/"));
        assert!(!camera.matches_path("/Cam1"));
        assert!(!camera.matches_path("/cam1/extra"));
        assert!(!camera.matches_path("/"));
    }

    #[test]
    fn test_parse_cameras() {
        let json = r#"[
            {"name": "door", "url": "http://10.0.0.5:81/stream", "port": 8081, "aliases": ["/cam1/", "front"]},
            {"Name": "yard", "Url": "http://10.0.0.6/stream", "Port": 8082, "CameraPathAliases": ["yard"]}
        ]"#;

        let cameras = parse_cameras(json).unwrap();
        assert_eq!(cameras.len(), 2);
        assert_eq!(cameras[0].aliases, vec!["cam1", "front"]);
        assert_eq!(cameras[1].name, "yard");
        assert_eq!(cameras[1].aliases, vec!["yard"]);
    }

    #[test]
    fn test_parse_rejects_duplicate_ports() {
        let json = r#"[
            {"name": "a", "url": "http://a/", "port": 9000, "aliases": ["a"]},
            {"name": "b", "url": "http://b/", "port": 9000, "aliases": ["b"]}
        ]"#;

        assert!(matches!(
            parse_cameras(json),
            Err(ConfigError::Invalid { camera, .. }) if camera == "b"
        ));
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(matches!(parse_cameras("[]"), Err(ConfigError::Empty)));
        assert!(matches!(parse_cameras("{"), Err(ConfigError::Parse(_))));

        let no_alias = r#"[{"name": "a", "url": "http://a/", "port": 1, "aliases": []}]"#;
        assert!(matches!(parse_cameras(no_alias), Err(ConfigError::Invalid { .. })));

        let bad_url = r#"[{"name": "a", "url": "rtsp://a/", "port": 1, "aliases": ["a"]}]"#;
        assert!(matches!(parse_cameras(bad_url), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_cameras("/nonexistent/cameras.json");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
