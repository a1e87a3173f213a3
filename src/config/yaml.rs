use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///   public_base_url: "https://bridge.example.com"
///   tls:
///     enabled: true
///     cert_path: "/etc/bridge/cert.pem"
///     key_path: "/etc/bridge/key.pem"
///
/// twilio:
///   account_sid: "AC..."
///   auth_token: "..."
///   caller_id: "+15550001111"
///
/// openai:
///   api_key: "sk-..."
///   realtime_model: "gpt-4o-realtime-preview-2024-12-17"
///
/// bridge:
///   supported_voices: ["alloy", "ember", "verse"]
///   default_prompt: "You are a helpful assistant."
///   flush_threshold: 8
///   audio_mode: "transcode"
///
/// security:
///   cors_allowed_origins: "*"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub twilio: Option<TwilioYaml>,
    pub openai: Option<OpenAIYaml>,
    pub bridge: Option<BridgeYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Externally reachable https base URL of this service
    pub public_base_url: Option<String>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Twilio account settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TwilioYaml {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    /// Number calls are placed from
    pub caller_id: Option<String>,
    pub api_base_url: Option<String>,
}

/// OpenAI settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OpenAIYaml {
    pub api_key: Option<String>,
    pub realtime_model: Option<String>,
    pub realtime_url: Option<String>,
}

/// Call bridging behaviour from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BridgeYaml {
    pub supported_voices: Option<Vec<String>>,
    pub default_prompt: Option<String>,
    pub flush_threshold: Option<usize>,
    /// `transcode` or `passthrough`
    pub audio_mode: Option<String>,
}

/// Security settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  public_base_url: "https://bridge.example.com"

twilio:
  account_sid: "AC123"
  auth_token: "twilio-token"
  caller_id: "+15550001111"

openai:
  api_key: "sk-yaml"
  realtime_model: "gpt-4o-mini-realtime-preview"

bridge:
  supported_voices: ["verse", "alloy"]
  default_prompt: "Take a message"
  flush_threshold: 4
  audio_mode: "passthrough"

security:
  cors_allowed_origins: "*"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host, Some("127.0.0.1".to_string()));
        assert_eq!(server.port, Some(8080));
        assert_eq!(
            server.public_base_url,
            Some("https://bridge.example.com".to_string())
        );
        assert_eq!(
            config.twilio.as_ref().unwrap().caller_id,
            Some("+15550001111".to_string())
        );
        assert_eq!(
            config.openai.as_ref().unwrap().realtime_model,
            Some("gpt-4o-mini-realtime-preview".to_string())
        );
        let bridge = config.bridge.as_ref().unwrap();
        assert_eq!(
            bridge.supported_voices,
            Some(vec!["verse".to_string(), "alloy".to_string()])
        );
        assert_eq!(bridge.flush_threshold, Some(4));
        assert_eq!(bridge.audio_mode, Some("passthrough".to_string()));
        assert_eq!(
            config.security.as_ref().unwrap().cors_allowed_origins,
            Some("*".to_string())
        );
    }

    #[test]
    fn test_yaml_config_partial() {
        let yaml = r#"
bridge:
  flush_threshold: 2
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.server.is_none());
        assert!(config.twilio.is_none());
        let bridge = config.bridge.unwrap();
        assert_eq!(bridge.flush_threshold, Some(2));
        assert!(bridge.supported_voices.is_none());
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.openai.is_none());
        assert!(config.bridge.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "localhost"
  port: 3000
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();

        assert_eq!(
            config.server.as_ref().unwrap().host,
            Some("localhost".to_string())
        );
        assert_eq!(config.server.as_ref().unwrap().port, Some(3000));
    }

    #[test]
    fn test_from_file_not_found() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let result = YamlConfig::from_file(&path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "server: [unclosed").unwrap();

        let result = YamlConfig::from_file(&config_path);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML config")
        );
    }
}
