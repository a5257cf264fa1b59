//! Integration tests for the devnet boot flows
//!
//! The external start scripts are replaced by small shell scripts run through
//! `sh`, and the test itself holds the listeners the flows wait for. Verifies
//! that:
//! 1. Each flow passes the expected arguments to its command
//! 2. The process group is torn down after the body, even when it fails
//! 3. Failures while booting still tear the launched process down

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use devnet_harness::{
    ChainmainSetup, ConfigError, Contract, Cronos, CronosSetup, Error, GethSetup, GravityBridge,
    HermesSetup, LaunchError,
};
use serde_json::json;

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    path
}

fn sh(script: &Path) -> Vec<String> {
    vec!["sh".to_string(), script.display().to_string()]
}

/// Find a base port whose `offsets` can all be bound, and hold them
fn reserve(offsets: &[u16]) -> (u16, Vec<TcpListener>) {
    for _ in 0..50 {
        let first = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = first.local_addr().unwrap().port();
        let Some(base) = port.checked_sub(offsets[0]) else {
            continue;
        };

        let mut held = vec![first];
        let rest: Option<Vec<_>> = offsets[1..]
            .iter()
            .map(|offset| {
                let port = base.checked_add(*offset)?;
                TcpListener::bind(("127.0.0.1", port)).ok()
            })
            .collect();

        if let Some(rest) = rest {
            held.extend(rest);
            return (base, held);
        }
    }
    panic!("could not reserve ports");
}

fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Running and not a zombie
fn is_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => {
            let state = stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.trim_start().chars().next());
            !matches!(state, Some('Z') | Some('X'))
        }
        Err(_) => false,
    }
}

/// Wait for `path` to exist and hold at least `lines` lines
fn read_lines(path: &Path, lines: usize) -> Vec<String> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(content) = std::fs::read_to_string(path) {
            let found: Vec<String> = content.lines().map(str::to_string).collect();
            if found.len() >= lines {
                return found;
            }
        }
        assert!(Instant::now() < deadline, "{} never filled", path.display());
        std::thread::sleep(Duration::from_millis(20));
    }
}

fn write_chain_dir(dir: &Path, base_port: u16) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join("config.json"),
        json!({"validators": [{"base_port": base_port}]}).to_string(),
    )
    .unwrap();
    std::fs::write(
        dir.join("genesis.json"),
        json!({"app_state": {"cronos": {"params": {"enable_auto_deployment": true}}}}).to_string(),
    )
    .unwrap();
}

#[test]
fn test_chainmain_body_error_still_tears_down() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let (base, _listeners) = reserve(&[0]);
    write_chain_dir(&data.join("chainmain-1"), base);

    let fake = script(
        dir.path(),
        "start-chainmain",
        "echo \"$@\" > \"$1/args\"\nexec sleep 30",
    );

    let devnet = ChainmainSetup::new(&data, base)
        .command(sh(&fake))
        .port_timeout(Duration::from_secs(5))
        .start()
        .unwrap();
    let pid = devnet.pid();
    assert!(is_alive(pid));

    let args = read_lines(&data.join("args"), 1);
    assert_eq!(args[0], format!("{} --base_port {}", data.display(), base));

    let result: Result<(), String> = devnet.run(|chainmain| {
        assert_eq!(chainmain.base_port(0).unwrap(), base);
        Err("assertion in test body failed".to_string())
    });

    assert_eq!(result.unwrap_err(), "assertion in test body failed");
    assert!(!is_alive(pid));
}

#[test]
fn test_port_timeout_tears_down() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();

    let fake = script(
        dir.path(),
        "start-chainmain",
        "echo $$ > \"$1/pid\"\nexec sleep 30",
    );

    let start = Instant::now();
    let err = ChainmainSetup::new(&data, unused_port())
        .command(sh(&fake))
        .port_timeout(Duration::from_secs(1))
        .start()
        .err()
        .unwrap();
    assert!(matches!(err, Error::Timeout(_)));
    assert!(start.elapsed() < Duration::from_secs(5));

    let pid: u32 = read_lines(&data.join("pid"), 1)[0].parse().unwrap();
    assert!(!is_alive(pid));
}

#[test]
fn test_cronos_init_then_start() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let calls = dir.path().join("calls");
    let devnet_yaml = dir.path().join("devnet.yaml");
    let (base, _listeners) = reserve(&[1, 2]);
    write_chain_dir(&data.join("cronos_777-1"), base);

    let fake = script(
        dir.path(),
        "pystarport",
        &format!(
            "echo \"$@\" >> {}\ncase \" $* \" in *\" start \"*) exec sleep 30 ;; esac",
            calls.display()
        ),
    );

    let cronos = CronosSetup::new(&data, base, &devnet_yaml)
        .command(sh(&fake))
        .chain_binary("cronosd-custom")
        .post_init(|path, port, config| {
            std::fs::write(
                path.join("post_init"),
                format!("{} {}", port, config.display()),
            )
            .map_err(|e| Error::Hook(e.to_string()))
        })
        .port_timeout(Duration::from_secs(5))
        .start()
        .unwrap();
    let pid = cronos.pid();

    let lines = read_lines(&calls, 2);
    assert_eq!(
        lines[0],
        format!(
            "--cmd cronosd-custom init --config {} --data {} --base_port {} --no_remove",
            devnet_yaml.display(),
            data.display(),
            base
        )
    );
    assert_eq!(lines[1], format!("start --data {} --quiet", data.display()));

    let hook = std::fs::read_to_string(data.join("post_init")).unwrap();
    assert_eq!(hook, format!("{} {}", base, devnet_yaml.display()));

    assert_eq!(cronos.base_dir(), data.join("cronos_777-1"));
    assert_eq!(
        cronos.w3_http_endpoint(0).unwrap(),
        format!("http://localhost:{}", base + 1)
    );
    assert!(cronos.enable_auto_deployment());

    drop(cronos);
    assert!(!is_alive(pid));
}

#[test]
fn test_cronos_init_failure_skips_start() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let calls = dir.path().join("calls");

    let fake = script(
        dir.path(),
        "pystarport",
        &format!(
            "case \" $* \" in *\" init \"*) exit 1 ;; esac\necho \"$@\" >> {}\nexec sleep 30",
            calls.display()
        ),
    );

    let err = CronosSetup::new(&data, unused_port(), dir.path().join("devnet.yaml"))
        .command(sh(&fake))
        .start()
        .err()
        .unwrap();

    assert!(matches!(err, Error::Launch(LaunchError::Failed { .. })));
    assert!(!calls.exists());
}

#[test]
fn test_cronos_post_init_failure_skips_start() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let calls = dir.path().join("calls");

    let fake = script(
        dir.path(),
        "pystarport",
        &format!(
            "echo \"$@\" >> {}\ncase \" $* \" in *\" start \"*) exec sleep 30 ;; esac",
            calls.display()
        ),
    );

    let err = CronosSetup::new(&data, unused_port(), dir.path().join("devnet.yaml"))
        .command(sh(&fake))
        .post_init(|_, _, _| Err(Error::Hook("patch genesis failed".to_string())))
        .start()
        .err()
        .unwrap();

    assert!(matches!(err, Error::Hook(_)));
    let lines = read_lines(&calls, 1);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("init "));
}

#[test]
fn test_geth_logs_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    let (base, _listeners) = reserve(&[0]);

    let fake = script(dir.path(), "start-geth", "echo \"geth $@\"\nexec sleep 30");

    let setup = GethSetup::new(&data, base)
        .command(sh(&fake))
        .port_timeout(Duration::from_secs(5));
    let log_path = setup.log_path();
    let geth = setup.start().unwrap();

    assert_eq!(geth.w3().endpoint(), format!("http://127.0.0.1:{}", base));
    assert_eq!(geth.process().log_file(), Some(log_path.as_path()));

    let log = read_lines(&log_path, 1);
    assert_eq!(
        log[0],
        format!("geth {} --http.port {} --port {}", data.display(), base, base + 1)
    );

    let status = geth.teardown().unwrap();
    assert!(!status.success());
}

#[test]
fn test_hermes_waits_startup_delay() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[[chains]]\nid = \"cronos_777-1\"\n\n[[chains]]\nid = \"chainmain-1\"\n",
    )
    .unwrap();
    let fake = script(dir.path(), "start-hermes", "exec sleep 30");

    let start = Instant::now();
    let hermes = HermesSetup::new(dir.path())
        .command(sh(&fake))
        .startup_delay(Duration::from_millis(200))
        .start()
        .unwrap();
    assert!(start.elapsed() >= Duration::from_millis(200));

    let pid = hermes.pid();
    assert_eq!(hermes.chain_ids(), ["cronos_777-1", "chainmain-1"]);

    drop(hermes);
    assert!(!is_alive(pid));
}

#[test]
fn test_hermes_bad_config_tears_down() {
    let dir = tempfile::tempdir().unwrap();
    let fake = script(
        dir.path(),
        "start-hermes",
        "echo $$ > \"$1/pid\"\nexec sleep 30",
    );

    let err = HermesSetup::new(dir.path())
        .command(sh(&fake))
        .startup_delay(Duration::from_millis(500))
        .start()
        .err()
        .unwrap();
    assert!(matches!(err, Error::Config(_)));

    let pid: u32 = read_lines(&dir.path().join("pid"), 1)[0].parse().unwrap();
    assert!(!is_alive(pid));
}

#[test]
fn test_missing_start_command() {
    let dir = tempfile::tempdir().unwrap();
    let err = ChainmainSetup::new(dir.path(), unused_port())
        .command(["devnet-harness-no-such-binary"])
        .start()
        .err()
        .unwrap();
    assert!(matches!(err, Error::Launch(LaunchError::NotFound { .. })));
}

#[test]
fn test_gravity_bridge_borrows_independent_scopes() {
    let dir = tempfile::tempdir().unwrap();
    let chain_dir = dir.path().join("cronos_777-1");
    let (base, _listeners) = reserve(&[0]);
    write_chain_dir(&chain_dir, base);
    let cronos = Cronos::open(&chain_dir).unwrap();

    let data = dir.path().join("geth");
    std::fs::create_dir_all(&data).unwrap();
    let fake = script(dir.path(), "start-geth", "exec sleep 30");
    let geth = GethSetup::new(&data, base)
        .command(sh(&fake))
        .start()
        .unwrap();
    let geth_pid = geth.pid();

    {
        let contract = Contract::new(
            "0x0000000000000000000000000000000000000abc",
            json!([{"type": "function", "name": "state_lastValsetNonce"}]),
        );
        let bridge = GravityBridge::new(&cronos, &geth, contract);
        assert_eq!(bridge.geth.w3().endpoint(), format!("http://127.0.0.1:{}", base));
        assert_eq!(bridge.cronos.base_port(0).unwrap(), base);
        assert_eq!(bridge.contract.abi[0]["name"], "state_lastValsetNonce");
    }

    drop(geth);
    assert!(!is_alive(geth_pid));
    // The cronos handle is unaffected by the geth teardown
    assert_eq!(cronos.base_port(0).unwrap(), base);
}

#[test]
fn test_dead_start_script_fails_before_port_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    let fake = script(dir.path(), "start-chainmain", "exit 1");

    let start = Instant::now();
    let err = ChainmainSetup::new(&data, unused_port())
        .command(sh(&fake))
        .port_timeout(Duration::from_secs(20))
        .start()
        .err()
        .unwrap();

    match err {
        Error::Launch(LaunchError::ExitedEarly { status, .. }) => {
            assert_eq!(status.code(), Some(1))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_cronos_start_dying_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");

    let fake = script(
        dir.path(),
        "pystarport",
        "case \" $* \" in *\" start \"*) echo 'supervisord failed' >&2; exit 2 ;; esac",
    );

    let start = Instant::now();
    let err = CronosSetup::new(&data, unused_port(), dir.path().join("devnet.yaml"))
        .command(sh(&fake))
        .port_timeout(Duration::from_secs(20))
        .start()
        .err()
        .unwrap();

    assert!(matches!(
        err,
        Error::Launch(LaunchError::ExitedEarly { .. })
    ));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_geth_base_port_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let err = GethSetup::new(dir.path(), u16::MAX)
        .command(["devnet-harness-no-such-binary"])
        .start()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::Config(ConfigError::PortOutOfRange {
            base_port: 65535,
            offset: 1
        })
    ));
}

#[test]
fn test_empty_command_override() {
    let dir = tempfile::tempdir().unwrap();
    let err = HermesSetup::new(dir.path())
        .command(Vec::<String>::new())
        .start()
        .err()
        .unwrap();
    assert!(matches!(err, Error::Launch(LaunchError::EmptyCommand)));
}
