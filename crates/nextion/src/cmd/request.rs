use nextion_session::{Session, SessionError};

use crate::cmd::RequestArgs;
use crate::exit::{session_error, CliResult, FAILURE, SUCCESS, TIMEOUT};
use crate::output::{print_record, OutputFormat, Record};

pub async fn run(args: RequestArgs, format: OutputFormat) -> CliResult<i32> {
    let session = Session::open(&args.link.link, args.link.session_config())
        .await
        .map_err(|err| session_error("bind failed", err))?;

    let mut code = SUCCESS;
    for command in &args.commands {
        let (record, status) = match value_query(command) {
            Some(name) => match session.get_value(name).await {
                Ok(value) => (Record::value(value), SUCCESS),
                Err(err) => (Record::failure(&err), status_of(&err)),
            },
            None => match session.request(command).await {
                Ok(response) if response.is_success() => (Record::response(&response), SUCCESS),
                Ok(response) => (Record::response(&response), FAILURE),
                Err(err) => (Record::failure(&err), status_of(&err)),
            },
        };
        print_record(&record.for_command(command), format);
        if code == SUCCESS {
            code = status;
        }
    }

    session
        .close()
        .await
        .map_err(|err| session_error("close failed", err))?;
    Ok(code)
}

/// `get <name>` is answered with a data event rather than a Response.
fn value_query(command: &str) -> Option<&str> {
    command
        .trim_start()
        .strip_prefix("get ")
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

fn status_of(err: &SessionError) -> i32 {
    match err {
        SessionError::Timeout { .. } => TIMEOUT,
        _ => FAILURE,
    }
}
