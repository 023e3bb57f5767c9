/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use clap::Parser;
use stoat::{Engine, EngineCommand};

fn main() {
    let mut engine = Engine::new();

    // Anything on the command line is treated as a startup command,
    // so `stoat bench` works the same as piping `bench` to stdin.
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if !args.is_empty() {
        match EngineCommand::try_parse_from(&args) {
            Ok(cmd) => engine.send_command(cmd),
            Err(e) => {
                eprintln!("{e}");
                return;
            }
        }
    }

    if let Err(e) = engine.run() {
        eprintln!("{} encountered an error: {e}", env!("CARGO_PKG_NAME"));
        std::process::exit(1);
    }
}
