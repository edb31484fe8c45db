pub const STATE_DIR: &str = ".foldercreate";
pub const SETTINGS_FILE_NAME: &str = "config.yaml";
