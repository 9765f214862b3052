use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sentwire_frame::{ChannelSelect, EnvelopeFramer, FrameWriter};
use sentwire_transport::{
    parse_endpoint, ByteSource, SerialConfig, SerialTransport, TcpConfig, TcpTransport,
    TransportError,
};
use tracing::{debug, info, warn};

use crate::cmd::LiveArgs;
use crate::exit::{frame_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::OutputFormat;
use crate::pipeline::Pipeline;
use crate::sink::{CsvSink, RawCapture};

const READ_BUFFER_SIZE: usize = 4096;

/// A link to the interface box: bytes in, command frames out.
trait Link: ByteSource + Write {}

impl<T: ByteSource + Write> Link for T {}

pub fn run(args: LiveArgs, format: OutputFormat) -> CliResult<i32> {
    let deadline = args
        .duration
        .map(|secs| session_deadline(secs, Instant::now()))
        .transpose()?;
    let selection = if args.all_channels {
        ChannelSelect::All
    } else {
        ChannelSelect::One(args.channel)
    };

    let raw = args
        .raw_out
        .as_deref()
        .map(|path| RawCapture::open(path, args.raw_format))
        .transpose()?;
    let csv = args
        .output
        .out_csv
        .as_deref()
        .map(|path| CsvSink::create(path, args.output.csv_sep))
        .transpose()?;
    let mut pipeline = Pipeline::new(args.output.decode_options(), args.output.console(format))
        .with_raw_capture(raw)
        .with_csv(csv);

    let mut link = open_link(&args)?;

    if !args.no_start {
        FrameWriter::new(&mut *link)
            .send_start(selection)
            .map_err(|err| frame_error("SENT_START failed", err))?;
        info!(channel = selection.as_byte(), "SENT reception started");
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let result = receive(
        &mut *link,
        &mut pipeline,
        &running,
        deadline,
        args.output.count,
    );

    if args.stop_on_exit {
        // The link may already be gone; a failed STOP must not mask the result.
        match FrameWriter::new(&mut *link).send_stop(selection) {
            Ok(()) => info!(channel = selection.as_byte(), "SENT reception stopped"),
            Err(err) => warn!(error = %err, "SENT_STOP failed"),
        }
    }

    let identity = pipeline.correlation();
    info!(
        frames = pipeline.seen(),
        serial = identity.serial_number.as_deref().unwrap_or("-"),
        "live session finished"
    );
    result.map(|()| SUCCESS)
}

/// Instant at which a `--duration SECONDS` session ends.
fn session_deadline(secs: f64, now: Instant) -> CliResult<Instant> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .and_then(|duration| now.checked_add(duration))
        .ok_or_else(|| {
            CliError::new(
                USAGE,
                format!("--duration must be a non-negative number of seconds, got {secs}"),
            )
        })
}

fn open_link(args: &LiveArgs) -> CliResult<Box<dyn Link>> {
    if let Some(port) = &args.serial {
        let config = SerialConfig {
            baud: args.baud,
            ..SerialConfig::default()
        };
        let transport = SerialTransport::open(port, &config)
            .map_err(|err| transport_error("serial open failed", err))?;
        return Ok(Box::new(transport));
    }

    let endpoint = args
        .tcp
        .as_deref()
        .ok_or_else(|| CliError::new(USAGE, "specify either --serial PORT or --tcp HOST[:PORT]"))?;
    let (host, port) =
        parse_endpoint(endpoint).map_err(|err| transport_error("bad --tcp endpoint", err))?;
    let transport = TcpTransport::connect(&host, port, &TcpConfig::default())
        .map_err(|err| transport_error("tcp connect failed", err))?;
    Ok(Box::new(transport))
}

fn receive(
    link: &mut dyn Link,
    pipeline: &mut Pipeline,
    running: &AtomicBool,
    deadline: Option<Instant>,
    count: Option<u64>,
) -> CliResult<()> {
    let mut framer = EnvelopeFramer::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];

    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|at| Instant::now() >= at) {
            debug!("duration elapsed");
            break;
        }
        if count.is_some_and(|limit| pipeline.seen() >= limit) {
            break;
        }

        let read = match link.read_chunk(&mut buf) {
            Ok(0) => continue,
            Ok(n) => n,
            Err(TransportError::Closed) => {
                info!(transport = link.transport_name(), "link closed by peer");
                break;
            }
            Err(err) => return Err(transport_error("read failed", err)),
        };

        for frame in framer.feed(&buf[..read]) {
            pipeline.handle(&frame)?;
            if count.is_some_and(|limit| pipeline.seen() >= limit) {
                break;
            }
        }
    }

    if framer.resync_count() > 0 || framer.skipped_bytes() > 0 {
        debug!(
            resyncs = framer.resync_count(),
            skipped = framer.skipped_bytes(),
            "framer recovered from stream corruption"
        );
    }
    Ok(())
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
