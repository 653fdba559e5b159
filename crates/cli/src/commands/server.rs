// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use athena_config::{ConfigurationSection, RootConfig};
use athena_context::LogContext;
use athena_handlers::AppState;
use athena_listener::server::Server;
use clap::Parser;
use figment::Figment;
use tracing::{info, info_span, warn};

use crate::lifecycle::Shutdown;

#[derive(Parser, Debug, Default)]
pub(super) struct Options {
    /// Port to listen on, overriding `server.port`
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind on, overriding `server.host`
    #[arg(long)]
    host: Option<String>,
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        let span = info_span!("cli.run.init").entered();
        let shutdown = Shutdown::new();
        let mut config = RootConfig::extract(figment).map_err(anyhow::Error::from_boxed)?;

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }

        info!(version = crate::VERSION, "Starting up");

        let resolver = config.resolve.resolver()?;
        for rule in resolver.rules() {
            info!("Alias {rule}");
        }
        if resolver.rules().is_empty() {
            warn!("No alias rules configured, every specifier will be left untouched");
        }

        info!(plugins = ?config.plugins.names(), "Build plugins");

        let root = config
            .server
            .root_dir()
            .context("could not determine the static files directory")?;
        if !root.is_dir() {
            warn!(%root, "The static files directory does not exist");
        }

        if config.server.allowed_hosts.is_any() {
            info!("Accepting requests for any host");
        }

        let state = AppState {
            resolver: Arc::new(resolver),
            allowed_hosts: Arc::new(config.server.allowed_hosts),
            root,
            plugins: Arc::new(config.plugins),
            version: crate::VERSION,
        };

        let listener = crate::server::build_listener(&config.server.host, config.server.port)?;
        let router = crate::server::build_router(state);
        let server = Server::try_new(listener, router).context("could not setup the listener")?;

        match server.local_addr() {
            Ok(addr) => info!("Listening on http://{addr}"),
            Err(e) => warn!(
                error = &e as &dyn std::error::Error,
                "Could not get local address for listener, something might be wrong!"
            ),
        }

        span.exit();

        shutdown
            .tasks()
            .spawn(LogContext::new("run-servers").run(|| {
                athena_listener::server::run_servers(
                    [server],
                    shutdown.graceful_token(),
                    shutdown.abort_token(),
                )
            }));

        let exit_code = shutdown
            .run()
            .await
            .context("could not install the signal handlers")?;

        Ok(exit_code)
    }
}
