use crate::session::{Session, SessionStatus};
use ostinato_ports::engine::EngineSpec;
use ostinato_ports::storage::{SessionSettings, StorageError};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Serialize)]
struct AppVersion {
    name: String,
    version: String,
}

#[derive(Serialize)]
struct PlatformInfo {
    os: String,
    arch: String,
}

pub fn export_diagnostics(
    dir: &Path,
    settings: &SessionSettings,
    engine: &EngineSpec,
    status: &SessionStatus,
) -> Result<(), StorageError> {
    fs::create_dir_all(dir).map_err(|e| StorageError::Io(e.to_string()))?;

    let app_version = AppVersion {
        name: "ostinato".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let platform = PlatformInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    };

    write_json(&dir.join("app_version.json"), &app_version)?;
    write_json(&dir.join("platform.json"), &platform)?;
    write_json(&dir.join("settings.json"), settings)?;
    write_json(&dir.join("engine.json"), engine)?;
    write_json(&dir.join("session_status.json"), status)?;
    log::info!("diagnostics exported to {}", dir.display());
    Ok(())
}

pub fn export_session_diagnostics(dir: &Path, session: &Session) -> Result<(), StorageError> {
    export_diagnostics(
        dir,
        session.settings(),
        &session.engine().spec(),
        &session.status(),
    )
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let data = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
    fs::write(path, data).map_err(|e| StorageError::Io(e.to_string()))
}
