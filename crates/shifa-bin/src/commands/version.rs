// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::cli::Cli;
use crate::error::BinResult;

/// Prints component versions and build information.
pub fn version(_cli: &Cli) -> BinResult<()> {
    println!("Shifa Care access service");
    println!();
    println!("Version Information:");
    println!("  shifa-bin:    {}", env!("CARGO_PKG_VERSION"));
    println!("  shifa-core:   {}", shifa_core::VERSION);
    println!("  shifa-api:    {}", shifa_api::VERSION);
    println!("  shifa-config: {}", shifa_config::VERSION);
    println!();
    println!("Build Information:");
    println!("  Rust Edition: 2024");
    println!("  Target:       {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
    println!();
    println!("Access Model:");
    println!("  Roles:        {}", shifa_core::Role::all().len());
    println!("  Permissions:  {}", shifa_core::Permission::all().len());
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}
