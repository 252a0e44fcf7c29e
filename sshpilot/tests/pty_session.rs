//! End-to-end sessions over a real pseudoterminal.
//!
//! A small shell script stands in for the ssh client: it asks for a
//! password, then hands the terminal to an interactive `/bin/sh`, which is
//! what a remote login looks like from the client's side of the PTY.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sshpilot::error::SessionError;
use sshpilot::{Error, Expectation, Session, SessionBuilder, SessionState};
use tempfile::TempDir;

const FAKE_SSH: &str = r#"#!/bin/sh
tries=0
while [ "$tries" -lt 3 ]; do
    printf "%s's password: " "$1"
    stty -echo 2>/dev/null
    IFS= read -r pw
    stty echo 2>/dev/null
    printf '\n'
    if [ "$pw" = "s3cr3t" ]; then
        printf 'Last login: Mon Oct 19 05:56:01 2026 from 10.0.0.2\n'
        PS1='$ ' exec /bin/sh -i
    fi
    printf 'Permission denied, please try again.\n'
    tries=$((tries + 1))
done
printf '%s: Permission denied (publickey,password).\n' "$1"
exit 255
"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn has_bash() -> bool {
    ["/bin/bash", "/usr/bin/bash"]
        .iter()
        .any(|p| Path::new(p).exists())
}

fn fake_ssh(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("fake-ssh");
    fs::write(&path, FAKE_SSH).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn builder(client: &Path, password: &str) -> SessionBuilder {
    SessionBuilder::new("fakehost")
        .username("foo")
        .password(password)
        .program(client.to_string_lossy())
        .login_timeout(Duration::from_secs(10))
        .negotiation_timeout(Duration::from_secs(10))
        .command_timeout(Duration::from_secs(5))
        .close_timeout(Duration::from_secs(2))
}

async fn connect(client: &Path) -> Session {
    builder(client, "s3cr3t").connect().await.unwrap()
}

#[tokio::test]
async fn test_login_run_close() {
    init_logging();
    if !has_bash() {
        eprintln!("bash not installed, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let mut session = connect(&fake_ssh(&dir)).await;

    assert_eq!(session.state(), SessionState::Ready);
    assert!(!session.sentinel().as_str().is_empty());
    assert_eq!(session.run("echo HELLO").await.unwrap(), vec!["HELLO"]);
    assert!(session.run("true").await.unwrap().is_empty());
    assert_eq!(
        session.run("printf 'a\\nb\\nc\\n'").await.unwrap(),
        vec!["a", "b", "c"]
    );
    // Output that looks like a prompt does not end the command early.
    assert_eq!(
        session.run("echo 'root@box:~# '; echo done").await.unwrap(),
        vec!["root@box:~# ", "done"]
    );

    session.close().await.unwrap();
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_wrong_password_fails_login() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let err = builder(&fake_ssh(&dir), "wrong")
        .connect()
        .await
        .err()
        .expect("login should fail");
    assert!(err.is_authentication_failure(), "got {err}");
}

#[tokio::test]
async fn test_missing_client_fails_to_spawn() {
    let err = builder(Path::new("/nonexistent/ssh"), "s3cr3t")
        .connect()
        .await
        .err()
        .expect("spawn should fail");
    assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn test_timeout_then_resync() {
    init_logging();
    if !has_bash() {
        eprintln!("bash not installed, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let mut session = connect(&fake_ssh(&dir)).await;

    let err = session
        .execute("sleep 30", None, Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Session(SessionError::CommandTimeout { .. })
    ));
    assert_eq!(session.state(), SessionState::Desynchronized);

    session.resync(Duration::from_secs(5)).await.unwrap();
    assert_eq!(session.run("echo back").await.unwrap(), vec!["back"]);
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_intermediate_pattern() {
    init_logging();
    if !has_bash() {
        eprintln!("bash not installed, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let mut session = connect(&fake_ssh(&dir)).await;

    let marker = Expectation::exact("BEGIN");
    let lines = session
        .execute(
            "echo first; echo BEG''IN; echo after",
            Some(&marker),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
    assert_eq!(lines, vec!["after"]);

    let never = Expectation::exact("NEVER-PRINTED");
    let err = session
        .execute("echo something", Some(&never), Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Session(SessionError::ExpectTimeout { .. })
    ));
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_parallel_sessions() {
    init_logging();
    if !has_bash() {
        eprintln!("bash not installed, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let client = fake_ssh(&dir);

    let (mut a, mut b) = tokio::join!(connect(&client), connect(&client));
    assert_ne!(a.sentinel(), b.sentinel());

    let (ra, rb) = tokio::join!(a.run("echo one"), b.run("echo two"));
    assert_eq!(ra.unwrap(), vec!["one"]);
    assert_eq!(rb.unwrap(), vec!["two"]);

    a.close().await.unwrap();
    b.close().await.unwrap();
}
