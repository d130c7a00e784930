use nextion_session::Session;
use tracing::debug;

use crate::cmd::SendArgs;
use crate::exit::{session_error, transport_error, CliResult, SUCCESS};

/// Writes without binding, so the device's current return mode is left alone.
pub async fn run(args: SendArgs) -> CliResult<i32> {
    let link = args
        .link
        .link
        .connect()
        .await
        .map_err(|err| transport_error("connect failed", err))?;
    let session = Session::new(link, args.link.session_config());

    for command in &args.commands {
        session
            .send(command)
            .await
            .map_err(|err| session_error("send failed", err))?;
        debug!(%command, "sent");
    }

    session
        .close()
        .await
        .map_err(|err| session_error("close failed", err))?;
    Ok(SUCCESS)
}
