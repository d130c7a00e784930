use nextion_session::Session;
use tracing::info;

use crate::cmd::ListenArgs;
use crate::exit::{session_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_record, OutputFormat, Record};

pub async fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let session = Session::open(&args.link.link, args.link.session_config())
        .await
        .map_err(|err| session_error("bind failed", err))?;

    let mut events = match args.event {
        Some(code) => session.subscribe_to(code),
        None => session.subscribe(),
    };
    info!(link = %args.link.link, filter = ?args.event, "listening for events");

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    let mut printed = 0usize;
    loop {
        tokio::select! {
            signal = &mut interrupt => {
                signal.map_err(|err| {
                    CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
                })?;
                info!("interrupted");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    return Err(CliError::new(FAILURE, "link closed while listening"));
                };
                print_record(&Record::event(&event), format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
        }
    }

    session
        .close()
        .await
        .map_err(|err| session_error("close failed", err))?;
    Ok(SUCCESS)
}
