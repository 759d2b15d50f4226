use domerelay_core::{start_relay, IdentityScope, RelayConfig};
use tracing::{info, warn};

use crate::cmd::ServeArgs;
use crate::exit::{relay_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_listening, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = resolve_config(args)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))?;

    runtime.block_on(async move {
        let token_auth = config.upstream_token.is_some();
        let scope = scope_name(config.peer_identity);
        if !token_auth && config.game_address.is_none() {
            warn!("no upstream token or game address configured; no connection can become the upstream");
        }

        let (relay, addr) = start_relay(config)
            .await
            .map_err(|err| relay_error("start failed", err))?;
        print_listening(addr, token_auth, scope, format);

        let shutdown = relay.shutdown_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received; shutting down");
                shutdown.cancel();
            }
        });
        relay.wait().await;
        Ok::<_, CliError>(SUCCESS)
    })
}

/// File values first, then flags and environment on top.
fn resolve_config(args: ServeArgs) -> CliResult<RelayConfig> {
    let mut config = match &args.config {
        Some(path) => {
            RelayConfig::from_json_file(path).map_err(|err| relay_error("config", err))?
        }
        None => RelayConfig::default(),
    };

    if let Some(port) = args.port {
        config.server_port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(addr) = args.game_address {
        config.game_address = Some(addr);
    }
    if let Some(token) = args.upstream_token.filter(|t| !t.is_empty()) {
        config.upstream_token = Some(token);
    }
    if let Some(scope) = args.peer_identity {
        config.peer_identity = scope;
    }
    Ok(config)
}

fn scope_name(scope: IdentityScope) -> &'static str {
    match scope {
        IdentityScope::Ip => "ip",
        IdentityScope::Socket => "socket",
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;

    fn bare() -> ServeArgs {
        ServeArgs {
            config: None,
            port: None,
            bind: None,
            game_address: None,
            upstream_token: None,
            peer_identity: None,
        }
    }

    #[test]
    fn defaults_without_file_or_flags() {
        let config = resolve_config(bare()).unwrap();
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn flags_override_file() {
        let path = std::env::temp_dir().join(format!(
            "domerelay-serve-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"{ "serverPort": 9000, "gameAddress": "10.0.0.9", "serverAddress": "ignored" }"#,
        )
        .unwrap();

        let args = ServeArgs {
            config: Some(path.clone()),
            port: Some(0),
            bind: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            upstream_token: Some("t".to_string()),
            peer_identity: Some(IdentityScope::Socket),
            ..bare()
        };
        let config = resolve_config(args).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.server_port, 0);
        assert_eq!(config.bind_address, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.game_address, Some("10.0.0.9".parse().unwrap()));
        assert_eq!(config.upstream_token.as_deref(), Some("t"));
        assert_eq!(config.peer_identity, IdentityScope::Socket);
    }

    #[test]
    fn missing_config_file_is_usage_error() {
        let args = ServeArgs {
            config: Some("/definitely/missing/config.json".into()),
            ..bare()
        };
        let err = resolve_config(args).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }
}
