use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 14] = [
        "RUST_LOG",
        "LAPAK_HOST",
        "LAPAK_PORT",
        "LAPAK_DATABASE_URL",
        "LAPAK_DB_MAX_CONNECTIONS",
        "LAPAK_JWT_AUDIENCE",
        "LAPAK_GATEWAY_TIMEOUT_SECS",
        "LAPAK_SWEEP_INTERVAL_SECS",
        "LAPAK_TRIPAY_API_URL",
        "LAPAK_TRIPAY_MERCHANT_CODE",
        "LAPAK_TRIPAY_PAYMENT_METHOD",
        "LAPAK_TRIPAY_EXPIRY_MINUTES",
        "LAPAK_TRIPAY_RETURN_URL",
        "LAPAK_TRIPAY_DEFAULT_PHONE",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
