// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Accept loop and connection lifecycle

use std::{
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
};

use athena_context::LogContext;
use futures_util::{StreamExt, stream::SelectAll};
use hyper::{Request, Response};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Connection,
    service::TowerToHyperService,
};
use pin_project_lite::pin_project;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tower::Service;
use tower_http::add_extension::AddExtension;

use crate::ConnectionInfo;

type ServedConnection<S> = Connection<
    'static,
    TokioIo<TcpStream>,
    TowerToHyperService<AddExtension<S, ConnectionInfo>>,
    TokioExecutor,
>;

/// A TCP listener and the service which handles its requests
pub struct Server<S> {
    listener: TcpListener,
    service: S,
}

impl<S> Server<S> {
    /// Wrap a standard library listener
    ///
    /// # Errors
    ///
    /// Returns an error if the listener could not be switched to non-blocking
    /// mode or registered with the runtime
    pub fn try_new(listener: std::net::TcpListener, service: S) -> Result<Self, std::io::Error> {
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener: TcpListener::from_std(listener)?,
            service,
        })
    }

    /// Serve `service` on a listener already registered with the runtime
    #[must_use]
    pub const fn new(listener: TcpListener, service: S) -> Self {
        Self { listener, service }
    }

    /// The address this server is listening on
    ///
    /// # Errors
    ///
    /// Returns an error if the address of the underlying socket could not be
    /// queried
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Run a single server
    pub async fn run<B>(
        self,
        soft_shutdown_token: CancellationToken,
        hard_shutdown_token: CancellationToken,
    ) where
        S: Service<Request<hyper::body::Incoming>, Response = Response<B>> + Clone + Send + 'static,
        S::Future: Send + 'static,
        S::Error: std::error::Error + Send + Sync + 'static,
        B: http_body::Body + Send + 'static,
        B::Data: Send,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        run_servers(
            std::iter::once(self),
            soft_shutdown_token,
            hard_shutdown_token,
        )
        .await;
    }
}

/// Build the HTTP connection for an accepted socket. HTTP/1.1 and HTTP/2
/// (prior knowledge) are both accepted.
#[tracing::instrument(
    name = "accept",
    skip_all,
    fields(
        network.protocol.name = "http",
        network.peer.address = %peer_addr.ip(),
        network.peer.port = peer_addr.port(),
    ),
)]
fn accept<S, B>(
    peer_addr: SocketAddr,
    stream: TcpStream,
    service: S,
) -> Result<ServedConnection<S>, std::io::Error>
where
    S: Service<Request<hyper::body::Incoming>, Response = Response<B>> + Send + Clone + 'static,
    S::Error: std::error::Error + Send + Sync + 'static,
    S::Future: Send + 'static,
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let local_addr = stream.local_addr()?;

    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(error = &e as &dyn std::error::Error, "Could not set TCP_NODELAY");
    }

    let info = ConnectionInfo {
        peer_addr,
        local_addr,
    };

    let mut builder = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new());
    builder.http1().keep_alive(true);

    let service = TowerToHyperService::new(AddExtension::new(service, info));

    let conn = builder
        .serve_connection(TokioIo::new(stream), service)
        .into_owned();

    Ok(conn)
}

pin_project! {
    /// A connection which starts a graceful shutdown once its cancellation
    /// token is cancelled.
    ///
    /// The cancellation future is polled before the connection, so that the
    /// connection gets woken up and polled again to drive the shutdown.
    struct AbortableConnection<C> {
        #[pin]
        connection: C,
        #[pin]
        cancellation_future: WaitForCancellationFutureOwned,
        did_start_shutdown: bool,
    }
}

impl<C> AbortableConnection<C> {
    fn new(connection: C, cancellation_token: CancellationToken) -> Self {
        Self {
            connection,
            cancellation_future: cancellation_token.cancelled_owned(),
            did_start_shutdown: false,
        }
    }
}

impl<T, S, B> Future
    for AbortableConnection<Connection<'static, T, TowerToHyperService<S>, TokioExecutor>>
where
    Connection<'static, T, TowerToHyperService<S>, TokioExecutor>: Future,
    S: Service<Request<hyper::body::Incoming>, Response = Response<B>> + Send + Clone + 'static,
    S::Future: Send + 'static,
    S::Error: std::error::Error + Send + Sync,
    T: hyper::rt::Read + hyper::rt::Write + Unpin,
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    type Output = <Connection<'static, T, TowerToHyperService<S>, TokioExecutor> as Future>::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        if let Poll::Ready(()) = this.cancellation_future.poll(cx)
            && !*this.did_start_shutdown
        {
            *this.did_start_shutdown = true;
            this.connection.as_mut().graceful_shutdown();
        }

        this.connection.poll(cx)
    }
}

/// Serve the given listeners until the soft shutdown token is cancelled.
///
/// Once it is, listeners stop accepting connections and the active ones get
/// a graceful shutdown. Cancelling the hard shutdown token then drops them.
pub async fn run_servers<S, B>(
    listeners: impl IntoIterator<Item = Server<S>>,
    soft_shutdown_token: CancellationToken,
    hard_shutdown_token: CancellationToken,
) where
    S: Service<Request<hyper::body::Incoming>, Response = Response<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::error::Error + Send + Sync + 'static,
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    // If this task crashes for any reason, the server will shut down
    let _guard = soft_shutdown_token.clone().drop_guard();

    let mut accept_stream: SelectAll<_> = listeners
        .into_iter()
        .map(|server| {
            futures_util::stream::poll_fn(move |cx| {
                let res = std::task::ready!(server.listener.poll_accept(cx))
                    .map(|(stream, addr)| (server.service.clone(), addr, stream));
                Poll::Ready(Some(res))
            })
        })
        .collect();

    // Connections being served
    let mut connection_tasks = tokio::task::JoinSet::new();

    loop {
        tokio::select! {
            biased;

            () = soft_shutdown_token.cancelled() => {
                tracing::debug!("Shutting down listeners");
                break;
            },

            res = connection_tasks.join_next(), if !connection_tasks.is_empty() => {
                match res {
                    Some(Ok(())) => { /* Errors are logged in the spawned task */ },
                    Some(Err(e)) => tracing::error!(error = &e as &dyn std::error::Error, "Join error"),
                    None => tracing::error!("Join set was polled even though it was empty"),
                }
            },

            res = accept_stream.next() => {
                let Some(res) = res else { continue };

                let (service, peer_addr, stream) = match res {
                    Ok(res) => res,
                    Err(e) => {
                        tracing::warn!(error = &e as &dyn std::error::Error, "Failed to accept connection from the underlying socket");
                        continue;
                    }
                };

                let connection = match LogContext::new("http-accept").run_sync(|| accept(peer_addr, stream, service)) {
                    Ok(connection) => connection,
                    Err(e) => {
                        tracing::warn!(error = &e as &dyn std::error::Error, "Failed to accept connection");
                        continue;
                    }
                };

                let token = soft_shutdown_token.child_token();
                connection_tasks.spawn(LogContext::new("http-serve").run(async move || {
                    tracing::debug!("Accepted connection");
                    if let Err(e) = AbortableConnection::new(connection, token).await {
                        tracing::warn!(error = &*e as &dyn std::error::Error, "Failed to serve connection");
                    }
                }));
            },
        };
    }

    if !connection_tasks.is_empty() {
        tracing::info!(
            "There are {active} active connections, performing a graceful shutdown. Send the shutdown signal again to force.",
            active = connection_tasks.len(),
        );

        while !connection_tasks.is_empty() {
            tokio::select! {
                biased;

                res = connection_tasks.join_next() => {
                    match res {
                        Some(Ok(())) => {},
                        Some(Err(e)) => tracing::error!(error = &e as &dyn std::error::Error, "Join error"),
                        None => tracing::error!("Join set was polled even though it was empty"),
                    }
                },

                () = hard_shutdown_token.cancelled() => {
                    tracing::warn!(
                        "Forcing shutdown ({active} active connections)",
                        active = connection_tasks.len(),
                    );
                    break;
                },
            }
        }
    }

    connection_tasks.shutdown().await;
}
