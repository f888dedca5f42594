// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.

mod access;
mod keys;
mod run;
mod users;
mod validate;
mod version;

pub use access::access;
pub use keys::{encrypt, gen_key};
pub use run::run;
pub use users::users;
pub use validate::validate;
pub use version::version;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Run(args) => run::run(&cli, args).await,
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Version => version::version(&cli),
        Commands::Access(args) => access::access(&cli, args),
        Commands::Users(args) => users::users(&cli, args),
        Commands::GenKey(args) => keys::gen_key(&cli, args),
        Commands::Encrypt(args) => keys::encrypt(&cli, args),
    }
}
