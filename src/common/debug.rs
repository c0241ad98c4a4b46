use std::process::Command;
use tracing::{info, warn};

/// Log session information relevant to window control and input injection
pub fn log_session_info() {
    info!("=== Session Information ===");

    if let Ok(kernel) = get_command_output("uname", &["-sr"]) {
        info!("Kernel: {}", kernel);
    }

    if let Ok(os_release) = std::fs::read_to_string("/etc/os-release") {
        for line in os_release.lines() {
            if line.starts_with("PRETTY_NAME=") {
                let name = line.trim_start_matches("PRETTY_NAME=").trim_matches('"');
                info!("OS: {}", name);
                break;
            }
        }
    }

    let session = std::env::var("XDG_SESSION_TYPE").unwrap_or_default();
    if !session.is_empty() {
        info!("Session Type: {}", session);
    }
    if let Ok(desktop) = std::env::var("XDG_CURRENT_DESKTOP") {
        info!("Desktop Environment: {}", desktop);
    }

    match std::env::var("DISPLAY") {
        Ok(x_display) => info!("X Display: {}", x_display),
        Err(_) => warn!("DISPLAY is not set; window control requires an X server"),
    }

    // Synthetic input only reaches X clients under Wayland
    if session.eq_ignore_ascii_case("wayland") {
        warn!("Wayland session detected: only XWayland browser windows can be controlled");
    }

    info!("===========================");
}

fn get_command_output(cmd: &str, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new(cmd).args(args).output()?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
