// Copyright (c) The testview Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use color_eyre::Result;
use testview_cli::{OutputWriter, TestviewApp};

fn main() -> Result<()> {
    color_eyre::install()?;

    let app = TestviewApp::parse();
    app.exec(&mut OutputWriter::default())
}
