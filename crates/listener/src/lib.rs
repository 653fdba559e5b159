// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![deny(rustdoc::missing_crate_level_docs)]
#![allow(clippy::module_name_repetitions)]

//! An utility crate to serve [`hyper`] connections accepted on TCP
//! listeners, with a two-stage graceful shutdown.

use std::net::SocketAddr;

pub mod server;

/// Informations about an accepted connection, inserted as a request
/// extension
#[derive(Debug, Clone, Copy)]
pub struct ConnectionInfo {
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
}

impl ConnectionInfo {
    /// Returns the remote peer address
    #[must_use]
    pub const fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Returns the local address the connection was accepted on
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
