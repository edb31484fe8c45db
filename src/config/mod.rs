pub mod error;
pub mod load;
pub mod paths;
pub mod save;
pub mod settings;

pub use error::ConfigError;
pub use load::{
    load_manager_settings, overlay_manager_params, ManagerParamSource, DB_PARAM_ATTEMPTS,
};
pub use paths::{SETTINGS_FILE_NAME, STATE_DIR};
pub use save::save_settings;
pub use settings::{BrokerSettings, Settings, COMPUTER_NAME_TOKEN};
