// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenGate;

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<TokenGate>,
}

impl AppState {
    pub fn new(gate: TokenGate) -> Self {
        Self {
            gate: Arc::new(gate),
        }
    }
}
