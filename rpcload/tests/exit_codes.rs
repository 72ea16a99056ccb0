use std::process::Command;

use anyhow::Context as _;
use rpcload_testserver::TestServer;

fn status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[test]
fn invalid_duration_exits_30() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_rpcload");

    let out = Command::new(exe)
        .arg("run")
        .arg("health-check")
        .arg("--duration")
        .arg("10x")
        .output()
        .context("run rpcload binary")?;

    anyhow::ensure!(
        status_code(out.status) == 30,
        "expected exit code 30, got {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );

    Ok(())
}

#[test]
fn unknown_scenario_exits_30() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_rpcload");

    let out = Command::new(exe)
        .arg("run")
        .arg("does-not-exist")
        .output()
        .context("run rpcload binary")?;

    anyhow::ensure!(
        status_code(out.status) == 30,
        "expected exit code 30, got {}",
        status_code(out.status)
    );
    anyhow::ensure!(
        String::from_utf8_lossy(&out.stderr).contains("unknown scenario"),
        "stderr should name the bad scenario:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );

    Ok(())
}

#[test]
fn unreachable_gateway_exits_10() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_rpcload");

    // Bind and drop a listener to get a port nothing serves.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.local_addr()?.port()
    };

    let out = Command::new(exe)
        .arg("run")
        .arg("health-check")
        .arg("--base-url")
        .arg(format!("http://127.0.0.1:{port}"))
        .arg("--iterations")
        .arg("1")
        .arg("--pause")
        .arg("1ms")
        .arg("--output")
        .arg("json")
        .output()
        .context("run rpcload binary")?;

    anyhow::ensure!(
        status_code(out.status) == 10,
        "expected exit code 10, got {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );

    Ok(())
}

#[tokio::test]
async fn healthy_gateway_exits_0() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let base_url = server.base_url().to_string();

    let exe = env!("CARGO_BIN_EXE_rpcload");

    let out = tokio::task::spawn_blocking(move || {
        Command::new(exe)
            .arg("run")
            .arg("health-check")
            .arg("--base-url")
            .arg(&base_url)
            .arg("--iterations")
            .arg("1")
            .arg("--pause")
            .arg("1ms")
            .arg("--output")
            .arg("json")
            .output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run rpcload binary")?;

    let health_seen = server.stats().health_total();
    server.shutdown().await;

    anyhow::ensure!(
        status_code(out.status) == 0,
        "expected exit code 0, got {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    anyhow::ensure!(health_seen == 1, "server saw {health_seen} health requests");

    Ok(())
}

#[test]
fn list_prints_builtin_scenarios() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_rpcload");

    let out = Command::new(exe)
        .arg("list")
        .output()
        .context("run rpcload binary")?;

    anyhow::ensure!(status_code(out.status) == 0);
    let stdout = String::from_utf8_lossy(&out.stdout);
    anyhow::ensure!(stdout.contains("blocknumber-flood"));
    anyhow::ensure!(stdout.contains("vus: 100"));
    anyhow::ensure!(stdout.contains("duration: 30m"));
    anyhow::ensure!(stdout.contains("health-check"));
    anyhow::ensure!(stdout.contains("pause: 1s"));

    Ok(())
}
