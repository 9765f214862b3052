use std::fs::File;
use std::io::BufReader;

use sentwire_frame::FrameReader;
use tracing::{debug, info};

use crate::cmd::ReplayArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::OutputFormat;
use crate::pipeline::Pipeline;
use crate::sink::CsvSink;

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let file = File::open(&args.path)
        .map_err(|err| io_error(&format!("open {}", args.path.display()), err))?;
    let csv = args
        .output
        .out_csv
        .as_deref()
        .map(|path| CsvSink::create(path, args.output.csv_sep))
        .transpose()?;
    let mut pipeline =
        Pipeline::new(args.output.decode_options(), args.output.console(format)).with_csv(csv);

    let mut reader = FrameReader::new(BufReader::new(file));
    while args
        .output
        .count
        .is_none_or(|limit| pipeline.seen() < limit)
    {
        let Some(frame) = reader
            .read_frame()
            .map_err(|err| frame_error("capture read failed", err))?
        else {
            break;
        };
        pipeline.handle(&frame)?;
    }

    let framer = reader.framer();
    debug!(
        resyncs = framer.resync_count(),
        skipped = framer.skipped_bytes(),
        "capture framing statistics"
    );
    info!(frames = pipeline.seen(), path = %args.path.display(), "replay finished");
    Ok(SUCCESS)
}
