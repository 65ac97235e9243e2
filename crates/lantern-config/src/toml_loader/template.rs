//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Lantern Configuration
# Only override what you want to change -- missing fields use defaults.

[gateway]
# url = "wss://api.lanyard.rest/socket"
# connect_timeout_ms = 15000   # 1000-120000
# hello_timeout_ms = 10000     # 1000-60000

[reconnect]
# base_delay_ms = 1000         # 100-60000
# max_delay_ms = 30000         # base_delay_ms-600000

[snapshot]
# enabled = true
# rest_url = "https://api.lanyard.rest/v1"
# timeout_ms = 5000            # 100-60000

[logging]
# level = "INFO"               # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
