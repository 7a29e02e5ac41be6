use crate::client::core::OpenChannelRequest;
use crate::client::transport::HttpClientFactory;
use crate::config::IngestConfig;
use crate::confirm::CommitConfirmer;
use crate::handler::{IngestHandler, IngestMode};
use crate::row::{Event, RowAssembler};
use crate::session::IngestSession;
use anyhow::{Context, Result};
use std::env;
use std::io::Read;
use std::process;

/// Invocation shim: load configuration from the environment, read one JSON
/// event from stdin, ingest it, and print the status string. Mode defaults to
/// single-row; `--as-rows` switches to one row per event key.
pub fn run() -> Result<()> {
    let config = IngestConfig::from_env().context("loading ingest configuration")?;
    let mode = read_mode(env::args());

    let factory = HttpClientFactory::new(config.client_profile())
        .map_err(|err| anyhow::anyhow!("building transport: {err}"))?;
    let open_request = OpenChannelRequest::from_config(&config);
    let identity = format!("rowpipe-{}", process::id());
    let mut session = IngestSession::new(factory, identity, open_request);

    let assembler = RowAssembler::from_process_env().context("capturing environment snapshot")?;
    let mut handler = IngestHandler::new(assembler, CommitConfirmer::system(), config.debug);

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("reading event payload from stdin")?;
    let event: Event = serde_json::from_str(&input)
        .context("event payload must be a JSON object of string values")?;

    let outcome = match mode {
        IngestMode::Single => handler.ingest_single(&mut session, &event),
        IngestMode::Multi => handler.ingest_multi(&mut session, &event),
    };
    println!("{}", outcome.status());
    Ok(())
}

fn read_mode<I>(args: I) -> IngestMode
where
    I: IntoIterator<Item = String>,
{
    let mut args_iter = args.into_iter();
    args_iter.next(); // skip binary name
    for arg in args_iter {
        if arg == "--as-rows" {
            return IngestMode::Multi;
        }
    }
    IngestMode::Single
}
