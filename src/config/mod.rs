mod env_vars;
mod extraction_config;

pub use extraction_config::{
    load_or_create_config,
    ExtractionConfig,
    RunKeyLocation,
    StartupFolder,
};

pub use env_vars::{
    expand_env_tokens,
    parse_windows_env_vars,
    resolve_windir_token,
};
