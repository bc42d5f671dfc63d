//! Policy Checks Example
//!
//! Walks through each kind of check the engine performs, in interactive and
//! non-interactive mode, and prints the decisions an agent runtime would act
//! on.
//!
//! Run with: cargo run -p traylinx-policy --example policy_checks

use serde_json::json;
use traylinx_policy::{PolicyConfig, PolicyEngine, PolicyResult};

fn show(label: &str, result: &PolicyResult) {
    println!("  {label:<40} {:<8} {}", result.decision.as_str(), result.reason);
    for suggestion in &result.suggestions {
        println!("  {:<40}          - {suggestion}", "");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Policy Checks Example ===\n");

    let workdir = tempfile::tempdir()?;
    std::fs::create_dir(workdir.path().join("src"))?;

    let config = PolicyConfig::from_toml_str(
        r#"
[[custom_deny_patterns]]
pattern = 'git\s+push\s+(-f|--force)'
reason = "Force push"
"#,
    )?;
    config.validate()?;
    let interactive = PolicyEngine::new(workdir.path(), config.clone(), true);
    let batch = PolicyEngine::new(workdir.path(), config, false);

    println!("Sandbox root: {}\n", interactive.workdir().display());

    // === Shell commands ===
    println!("--- Shell commands (interactive) ---");
    for command in [
        "ls -la src",
        "rm -rf /",
        "git push --force origin main",
        "echo $(whoami)",
        "make && rm -r build",
        "cat ../../etc/hosts",
    ] {
        show(command, &interactive.check_shell_command(command));
    }

    // === File operations ===
    println!("\n--- File operations ---");
    show("read src/lib.rs", &interactive.check_file_operation("read", "src/lib.rs"));
    show("delete src/lib.rs (interactive)", &interactive.check_file_operation("delete", "src/lib.rs"));
    show("delete src/lib.rs (batch)", &batch.check_file_operation("delete", "src/lib.rs"));
    show("write ~/.ssh/authorized_keys", &batch.check_file_operation("write", "~/.ssh/authorized_keys"));

    // === Images ===
    println!("\n--- Image pulls ---");
    for image in ["python:3.11", "ghcr.io/traylinx/agent:v1", "evil.io/malware:latest"] {
        show(&format!("{image} (interactive)"), &interactive.check_docker_pull(image));
        show(&format!("{image} (batch)"), &batch.check_docker_pull(image));
    }

    // === Compose ===
    println!("\n--- Compose audit ---");
    let compose = json!({
        "services": {
            "agent": { "image": "ghcr.io/traylinx/agent:v1" },
            "debug": { "image": "alpine", "privileged": true, "network_mode": "host" }
        }
    });
    show("interactive", &interactive.check_docker_compose(&compose));
    show("batch", &batch.check_docker_compose(&compose));

    // === Launch flags ===
    println!("\n--- Container launch flags ---");
    println!("  docker run {} <image>", batch.container_flags().join(" "));

    Ok(())
}
