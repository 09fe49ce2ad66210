//! Integration tests for gorun

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn gorun(dir: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("gorun");
        cmd.env("GORUN_WORKING_DIR", dir.path())
            .env_remove("GORUN_CONFIG")
            .env_remove("GORUN_REBUILD")
            .env_remove("GORUN_DEBUG");
        cmd
    }

    fn gorund(dir: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("gorund");
        cmd.env("GORUN_WORKING_DIR", dir.path())
            .env_remove("GORUN_CONFIG")
            .env_remove("GORUN_DEBUG");
        cmd
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        gorun(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Run Go packages from a compile cache"));
    }

    #[test]
    fn daemon_help_displays() {
        let dir = TempDir::new().unwrap();
        gorund(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("The gorun compile server"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        gorund(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("gorund"));
    }

    #[test]
    fn stop_without_daemon() {
        let dir = TempDir::new().unwrap();
        gorund(&dir)
            .arg("stop")
            .assert()
            .failure()
            .stderr(predicate::str::contains("no pid found"))
            .stderr(predicate::str::contains("gorund start"));
    }

    #[test]
    fn status_without_daemon() {
        let dir = TempDir::new().unwrap();
        gorund(&dir)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("not running"));
    }

    #[test]
    fn run_without_daemon_is_unreachable() {
        let dir = TempDir::new().unwrap();
        // stdin is not a terminal, so the start prompt defaults to no
        gorun(&dir)
            .arg("hello")
            .assert()
            .failure()
            .stderr(predicate::str::contains("not reachable"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[client\n").unwrap();

        gorun(&dir)
            .arg("hello")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }
}

mod daemon_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::os::unix::fs::PermissionsExt;
    use std::os::unix::net::UnixStream;
    use std::path::Path;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[client]
auto_start = "never"

[daemon]
stop_poll_interval_ms = 20
stop_attempts = 25
"#;

    fn cmd(dir: &TempDir, mut base: Command) -> Command {
        base.env("GORUN_WORKING_DIR", dir.path())
            .env("PWD", dir.path())
            .current_dir(dir.path())
            .env_remove("GORUN_CONFIG")
            .env_remove("GORUN_REBUILD")
            .env_remove("GORUN_DEBUG");
        base
    }

    fn wait_for_socket(socket: &Path) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if UnixStream::connect(socket).is_ok() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn start_serve_stop() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), CONFIG).unwrap();
        let socket = dir.path().join("gorun.sock");

        cmd(&dir, cargo_bin_cmd!("gorund"))
            .arg("start")
            .assert()
            .success();
        assert!(wait_for_socket(&socket), "gorund never listened");

        cmd(&dir, cargo_bin_cmd!("gorund"))
            .arg("start")
            .assert()
            .failure()
            .stderr(predicate::str::contains("already running"));

        cmd(&dir, cargo_bin_cmd!("gorund"))
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("running pid"));

        // Nothing was compiled yet, so there is nothing to rebuild
        cmd(&dir, cargo_bin_cmd!("gorun"))
            .args(["--rebuild", "./hello"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no initial compile"));

        // No Go module here: the compile fails and the diagnostics come back
        cmd(&dir, cargo_bin_cmd!("gorun"))
            .arg("./hello")
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to compile"));

        cmd(&dir, cargo_bin_cmd!("gorund"))
            .arg("stop")
            .assert()
            .success();
        assert!(!dir.path().join("gorun.pid").exists());

        let log = std::fs::read_to_string(dir.path().join("gorun.log")).unwrap();
        assert!(log.contains("gorund starting"));
    }

    /// Stands in for `go build [flags] -o OUT PKG`: writes a program that
    /// echoes its arguments and one environment variable, then exits 7
    const FAKE_GO: &str = r#"#!/bin/sh
out="$3"
printf '#!/bin/sh\necho "args:$*"\necho "env:$GORUN_EXEC_CHECK"\nexit 7\n' > "$out"
chmod 755 "$out"
"#;

    #[test]
    fn run_execs_compiled_program() {
        let dir = TempDir::new().unwrap();
        let fake_go = dir.path().join("fake-go");
        std::fs::write(&fake_go, FAKE_GO).unwrap();
        std::fs::set_permissions(&fake_go, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            format!("{}\n[build]\ngo_binary = \"{}\"\n", CONFIG, fake_go.display()),
        )
        .unwrap();

        cmd(&dir, cargo_bin_cmd!("gorund"))
            .arg("start")
            .assert()
            .success();
        assert!(wait_for_socket(&dir.path().join("gorun.sock")), "gorund never listened");

        for _ in 0..2 {
            cmd(&dir, cargo_bin_cmd!("gorun"))
                .args(["./pkg", "-x", "--y", "z"])
                .env("GORUN_EXEC_CHECK", "inherited")
                .assert()
                .code(7)
                .stdout("args:-x --y z\nenv:inherited\n");
        }

        cmd(&dir, cargo_bin_cmd!("gorund"))
            .arg("stop")
            .assert()
            .success();
    }
}

mod hello_scenario {
    use async_trait::async_trait;
    use gorun::build::{BuildCache, BuildContext, Compiler};
    use gorun::rpc::{Client, Server};
    use gorun::{GorunError, GorunResult};
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// "Compiles" `<directory>/<package>.txt` into a shell script that
    /// prints the file's contents
    struct ScriptCompiler;

    #[async_trait]
    impl Compiler for ScriptCompiler {
        async fn compile(&self, context: &BuildContext, output: &Path) -> GorunResult<()> {
            let source = context.directory.join(format!("{}.txt", context.package));
            let message = std::fs::read_to_string(&source).map_err(|e| GorunError::CompileFailed {
                output: format!("{}: {}", source.display(), e),
            })?;

            let script = format!("#!/bin/sh\necho '{}'\n", message.trim());
            std::fs::write(output, script).unwrap();
            std::fs::set_permissions(output, std::fs::Permissions::from_mode(0o755)).unwrap();
            Ok(())
        }
    }

    fn execute(path: &Path) -> (String, i32) {
        assert_ne!(std::fs::metadata(path).unwrap().permissions().mode() & 0o111, 0);
        let output = std::process::Command::new("sh").arg(path).output().unwrap();
        (
            String::from_utf8(output.stdout).unwrap(),
            output.status.code().unwrap(),
        )
    }

    #[tokio::test]
    async fn cached_until_rebuilt() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir(&src).unwrap();
        std::fs::write(src.join("hello.txt"), "Hello").unwrap();

        let cache = BuildCache::new(dir.path().join("cache"), Arc::new(ScriptCompiler));
        let context = BuildContext::new("hello", &src);

        let first = cache.resolve(&context).await.unwrap();
        assert_eq!(execute(&first), ("Hello\n".to_string(), 0));

        std::fs::write(src.join("hello.txt"), "Goodbye").unwrap();
        let second = cache.resolve(&context).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(execute(&second).0, "Hello\n");

        let rebuilt = cache.rebuild(&context).await.unwrap();
        assert_ne!(rebuilt, first);
        assert_eq!(cache.resolve(&context).await.unwrap(), rebuilt);
        assert_eq!(execute(&rebuilt).0, "Goodbye\n");

        // The path handed out before the rebuild still works
        assert_eq!(execute(&first).0, "Hello\n");
    }

    #[tokio::test]
    async fn cached_until_rebuilt_over_socket() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir(&src).unwrap();
        std::fs::write(src.join("hello.txt"), "Hello").unwrap();

        let cache = Arc::new(BuildCache::new(dir.path().join("cache"), Arc::new(ScriptCompiler)));
        let socket = dir.path().join("gorun.sock");
        let handle = Server::new(&socket, cache).start().await.unwrap();
        let client = Client::new(&socket);
        let env = vec![format!("PWD={}", src.display()), "HOME=/nowhere".to_string()];

        let err = client.rebuild_executable("hello", env.clone()).await.unwrap_err();
        assert!(err.to_string().contains("no initial compile"));

        let path = client.get_executable("hello", env.clone()).await.unwrap();
        assert_eq!(execute(&path), ("Hello\n".to_string(), 0));

        std::fs::write(src.join("hello.txt"), "Goodbye").unwrap();
        assert_eq!(client.get_executable("hello", env.clone()).await.unwrap(), path);

        client.rebuild_executable("hello", env.clone()).await.unwrap();
        let path = client.get_executable("hello", env.clone()).await.unwrap();
        assert_eq!(execute(&path).0, "Goodbye\n");

        let err = client.get_executable("missing", env).await.unwrap_err();
        assert!(matches!(err, GorunError::CompileFailed { .. }));

        handle.stop().await.unwrap();
    }
}
