//! Integration tests for `ingress-ssh connect`.
//!
//! A one-shot local HTTP server stands in for the IP-echo service, and on
//! unix small shell scripts stand in for `aws` and `ssh`. Both scripts append
//! to the same log so the order of side effects can be asserted.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ingress_ssh() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ingress-ssh"));
    cmd.env("NO_COLOR", "1")
        .env_remove("AWS_PROFILE")
        .env_remove("AWS_REGION")
        .env_remove("RUST_LOG");
    cmd
}

/// Serve one HTTP 200 response with `body` on an ephemeral port.
fn echo_server(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}/plain")
}

/// An unused local port: bind, note the port, release it.
fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}/plain")
}

fn write_config(dir: &Path, body: &str) -> String {
    let path = dir.join("config.yaml");
    std::fs::write(&path, body).expect("write config");
    path.to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// Failures before any cloud call
// ---------------------------------------------------------------------------

#[test]
fn test_connect_malformed_echo_response_exits_10() {
    let dir = TempDir::new().expect("temp dir");
    let config = write_config(dir.path(), "{}");
    ingress_ssh()
        .args(["connect", "i-0abc", "--echo-url"])
        .arg(echo_server("<html>busy</html>"))
        .env("INGRESS_SSH_CONFIG", &config)
        .env("PATH", dir.path())
        .assert()
        .code(10)
        .stderr(predicate::str::contains("<html>busy</html>"));
}

#[test]
fn test_connect_unreachable_echo_exits_10() {
    let dir = TempDir::new().expect("temp dir");
    let config = write_config(dir.path(), "{}");
    ingress_ssh()
        .args(["connect", "i-0abc", "--echo-url"])
        .arg(closed_port_url())
        .env("INGRESS_SSH_CONFIG", &config)
        .env("PATH", dir.path())
        .assert()
        .code(10);
}

#[test]
fn test_connect_rejects_non_http_echo_url() {
    let dir = TempDir::new().expect("temp dir");
    let config = write_config(dir.path(), "{}");
    ingress_ssh()
        .args(["connect", "i-0abc", "--echo-url", "ftp://example.com"])
        .env("INGRESS_SSH_CONFIG", &config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("identity.echo_url"));
}

// ---------------------------------------------------------------------------
// Full flow with stand-in `aws` and `ssh`
// ---------------------------------------------------------------------------

#[cfg(unix)]
mod with_fake_tools {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use super::{echo_server, ingress_ssh, write_config};
    use predicates::prelude::*;
    use tempfile::TempDir;

    const FAKE_AWS: &str = r#"#!/bin/sh
echo "aws $2 $*" >> "$TOOL_LOG"
if [ "$2" = "$FAIL_OPERATION" ]; then
  echo "An error occurred (UnauthorizedOperation) when calling the $2 operation: denied" >&2
  exit 254
fi
case "$2" in
  describe-instances)
    printf '%s' '{"Reservations":[{"Instances":[{"PublicIpAddress":"203.0.113.9","KeyName":"mykey","SecurityGroups":[{"GroupId":"sg-1"}]}]}]}'
    ;;
  *)
    printf '%s' '{"Return": true}'
    ;;
esac
"#;

    const FAKE_SSH: &str = r#"#!/bin/sh
echo "ssh $*" >> "$TOOL_LOG"
exit "${SSH_EXIT:-0}"
"#;

    struct Sandbox {
        dir: TempDir,
        config: String,
        log: PathBuf,
        key: PathBuf,
    }

    fn install_script(path: &Path, body: &str) {
        std::fs::write(path, body).expect("write script");
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    }

    fn sandbox() -> Sandbox {
        let dir = TempDir::new().expect("temp dir");
        let bin = dir.path().join("bin");
        std::fs::create_dir(&bin).expect("mkdir bin");
        install_script(&bin.join("aws"), FAKE_AWS);
        install_script(&bin.join("fake-ssh"), FAKE_SSH);

        let key = dir.path().join("mykey.pem");
        std::fs::write(&key, "not a real key").expect("write key");

        let config = write_config(
            dir.path(),
            &format!("ssh:\n  program: {}\n", bin.join("fake-ssh").display()),
        );
        let log = dir.path().join("tools.log");
        Sandbox {
            dir,
            config,
            log,
            key,
        }
    }

    impl Sandbox {
        fn command(&self) -> assert_cmd::Command {
            let mut cmd = ingress_ssh();
            cmd.args(["connect", "i-0abc", "-i"])
                .arg(&self.key)
                .arg("--echo-url")
                .arg(echo_server("198.51.100.5"))
                .env("INGRESS_SSH_CONFIG", &self.config)
                .env("TOOL_LOG", &self.log)
                .env("PATH", self.dir.path().join("bin"));
            cmd
        }

        /// Operation names in call order (`describe-instances`, `ssh`, ...).
        fn calls(&self) -> Vec<String> {
            std::fs::read_to_string(&self.log)
                .unwrap_or_default()
                .lines()
                .map(|line| {
                    let mut words = line.split_whitespace();
                    match words.next() {
                        Some("aws") => words.next().unwrap_or_default().to_string(),
                        _ => "ssh".to_string(),
                    }
                })
                .collect()
        }

        fn log_text(&self) -> String {
            std::fs::read_to_string(&self.log).unwrap_or_default()
        }
    }

    #[test]
    fn test_connect_success_grants_runs_and_revokes() {
        let sandbox = sandbox();
        sandbox.command().assert().success();

        assert_eq!(
            sandbox.calls(),
            vec![
                "describe-instances",
                "authorize-security-group-ingress",
                "ssh",
                "revoke-security-group-ingress",
            ]
        );
        let log = sandbox.log_text();
        assert!(log.contains("198.51.100.5/32"), "log: {log}");
        assert!(log.contains("--group-id sg-1"), "log: {log}");
        assert!(log.contains("ec2-user@203.0.113.9"), "log: {log}");
        assert!(log.contains("--region us-west-1"), "log: {log}");
    }

    #[test]
    fn test_connect_user_flag_reaches_ssh() {
        let sandbox = sandbox();
        sandbox.command().args(["-u", "ubuntu"]).assert().success();
        assert!(sandbox.log_text().contains("ubuntu@203.0.113.9"));
    }

    #[test]
    fn test_connect_ssh_failure_exits_12_and_still_revokes() {
        let sandbox = sandbox();
        sandbox
            .command()
            .env("SSH_EXIT", "3")
            .assert()
            .code(12)
            .stderr(predicate::str::contains("exited with code 3"));
        assert_eq!(
            sandbox.calls().last().map(String::as_str),
            Some("revoke-security-group-ingress")
        );
    }

    #[test]
    fn test_connect_authorize_failure_exits_11_without_session() {
        let sandbox = sandbox();
        sandbox
            .command()
            .env("FAIL_OPERATION", "authorize-security-group-ingress")
            .assert()
            .code(11)
            .stderr(predicate::str::contains("UnauthorizedOperation"));
        assert_eq!(
            sandbox.calls(),
            vec!["describe-instances", "authorize-security-group-ingress"]
        );
    }

    #[test]
    fn test_connect_revoke_failure_exits_13_with_manual_command() {
        let sandbox = sandbox();
        sandbox
            .command()
            .env("FAIL_OPERATION", "revoke-security-group-ingress")
            .assert()
            .code(13)
            .stderr(predicate::str::contains(
                "aws ec2 revoke-security-group-ingress --group-id sg-1",
            ))
            .stderr(predicate::str::contains("may still be open"));
    }

    #[test]
    fn test_connect_missing_identity_file_exits_10_without_rule_calls() {
        let sandbox = sandbox();
        let mut cmd = ingress_ssh();
        cmd.args(["connect", "i-0abc", "-i", "/nonexistent/key.pem", "--echo-url"])
            .arg(echo_server("198.51.100.5"))
            .env("INGRESS_SSH_CONFIG", &sandbox.config)
            .env("TOOL_LOG", &sandbox.log)
            .env("PATH", sandbox.dir.path().join("bin"));
        cmd.assert()
            .code(10)
            .stderr(predicate::str::contains("/nonexistent/key.pem"));
        assert_eq!(sandbox.calls(), vec!["describe-instances"]);
    }
}
