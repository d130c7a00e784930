use std::fs::File;
use std::io::Read;

use nextion_frame::{FrameConfig, FrameError, FrameReader};
use nextion_message::decode_frame;
use tracing::warn;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_record, OutputFormat, Record};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input: Box<dyn Read> = match &args.input {
        Some(path) if path.as_os_str() != "-" => Box::new(File::open(path).map_err(|err| {
            io_error(&format!("failed opening {}", path.display()), err)
        })?),
        _ => Box::new(std::io::stdin().lock()),
    };

    let mut config = FrameConfig::default();
    if let Some(max_frame_size) = args.max_frame_size {
        config.max_frame_size = max_frame_size;
    }

    decode_stream(FrameReader::with_config(input, config), format)
}

/// Print every frame in the stream. Bad frames are reported and skipped.
fn decode_stream<R: Read>(reader: FrameReader<R>, format: OutputFormat) -> CliResult<i32> {
    let mut code = SUCCESS;
    for frame in reader {
        let frame = match frame {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed { buffered }) => {
                warn!(buffered, "capture ends inside a frame");
                let record =
                    Record::failure(format!("{buffered} trailing bytes without a delimiter"));
                print_record(&record, format);
                code = DATA_INVALID;
                continue;
            }
            Err(err) => return Err(frame_error("read failed", err)),
        };

        match decode_frame(&frame) {
            Ok(message) => print_record(&Record::message(&message), format),
            Err(err) => {
                print_record(&Record::decode_failure(&err, &frame), format);
                code = DATA_INVALID;
            }
        }
    }
    Ok(code)
}
