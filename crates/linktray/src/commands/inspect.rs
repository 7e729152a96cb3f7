//! `linktray inspect`: parse a share link and show its fields.

use indexmap::IndexMap;
use tracing::debug;

use linktray_core::{LinkParser, ShareLinkParser};

use crate::cli::{GlobalOpts, InspectArgs};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &InspectArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = ShareLinkParser.parse(&args.link)?;
    debug!(protocol = ?config.protocol(), fields = config.len(), "link parsed");

    let fields: Vec<(&str, &str)> = if args.all {
        config.iter().collect()
    } else {
        config.non_empty().collect()
    };
    let shown: IndexMap<&str, &str> = fields.iter().copied().collect();

    let rendered = output::render_fields(
        &global.output,
        &shown,
        &fields,
        output::should_color(&global.color),
    )?;
    output::print_output(&rendered);
    Ok(())
}
