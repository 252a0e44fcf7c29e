//! Log in through the local `ssh` client and run a few commands.
//!
//! # Prerequisites
//!
//! - An `ssh` client on `PATH`
//! - A host accepting password logins, with `bash` installed
//!
//! # Usage
//!
//! ```bash
//! cargo run --example run_commands -- --host 172.16.8.38 --user foo --password s3cr3t
//! cargo run --example run_commands -- --host myserver --user foo --password s3cr3t -- "df -h" "uptime"
//! ```

use std::env;
use std::time::Duration;

use sshpilot::{Expectation, SessionBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug to see the login transcript)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let password = match &args.password {
        Some(password) => password.clone(),
        None => {
            eprintln!("Error: --password is required");
            std::process::exit(1);
        }
    };

    println!("Connecting to {}@{}...", args.user, args.host);

    let mut builder = SessionBuilder::new(&args.host)
        .username(&args.user)
        .password(password)
        .command_timeout(Duration::from_secs(args.timeout))
        .setup_command(sshpilot::session::LIST_ONE_PER_LINE);
    if let Some(port) = args.port {
        builder = builder.port(port);
    }

    let mut session = builder.connect().await?;
    println!("Connected (prompt sentinel {})", session.sentinel());

    let commands = if args.commands.is_empty() {
        vec!["whoami".to_string(), "pwd".to_string(), "ls".to_string()]
    } else {
        args.commands.clone()
    };

    for command in &commands {
        println!("\n$ {}", command);
        println!("{}", "-".repeat(50));
        match session.run(command).await {
            Ok(lines) => {
                for line in lines {
                    println!("{}", line);
                }
            }
            Err(e) if e.is_timeout() => {
                eprintln!("Timed out: {}", e);
                session.resync(Duration::from_secs(5)).await?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    // Synchronize on an intermediate marker before the prompt returns. The
    // quotes keep the marker out of the echoed command line.
    let marker = Expectation::exact("BEGIN");
    let lines = session
        .execute("echo BEG''IN; uname -s", Some(&marker), Duration::from_secs(5))
        .await?;
    println!("\nAfter marker: {:?}", lines);

    println!("\nClosing session...");
    session.close().await?;
    println!("Done!");

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: Option<u16>,
    user: String,
    password: Option<String>,
    timeout: u64,
    commands: Vec<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = None;
        let mut user = env::var("USER").unwrap_or_else(|_| "root".to_string());
        let mut password = None;
        let mut timeout = 2u64;
        let mut commands = Vec::new();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    i += 1;
                    if i < args.len() {
                        host = args[i].clone();
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().ok();
                    }
                }
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = args[i].clone();
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = Some(args[i].clone());
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(2);
                    }
                }
                "--" => {
                    commands.extend(args[i + 1..].iter().cloned());
                    break;
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                }
            }
            i += 1;
        }

        Self {
            host,
            port,
            user,
            password,
            timeout,
            commands,
        }
    }

    fn print_help() {
        println!(
            r#"sshpilot run_commands example

USAGE:
    cargo run --example run_commands -- [OPTIONS] [-- COMMAND...]

OPTIONS:
    -h, --host <HOST>        Target host [default: localhost]
    -p, --port <PORT>        SSH port [default: client default]
    -u, --user <USER>        Username [default: $USER]
    -P, --password <PASS>    Password for the login prompt
    -t, --timeout <SECS>     Per-command timeout [default: 2]
    --help                   Print this help message
"#
        );
    }
}
