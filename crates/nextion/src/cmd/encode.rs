use std::io::Write;

use nextion_frame::FrameWriter;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let stdout = std::io::stdout();
    encode_to(&args.commands, stdout.lock())?;
    Ok(SUCCESS)
}

fn encode_to<W: Write>(commands: &[String], out: W) -> CliResult<W> {
    let mut writer = FrameWriter::new(out);
    for command in commands {
        writer
            .send(command.as_bytes())
            .map_err(|err| frame_error("write failed", err))?;
    }
    Ok(writer.into_inner())
}
