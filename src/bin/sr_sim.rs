use clap::{Parser, ValueEnum};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use sr_arq::{
    emulator::EmulatorBuilder,
    layer::{Builder, CorruptFrameAck},
    protocol::{RTT, SEQSPACE, WINDOWSIZE},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CorruptAck {
    /// Acknowledge whatever `seq` the corrupted frame carries
    Echo,
    /// Acknowledge the last in-order delivery instead
    LastDelivered,
}

impl From<CorruptAck> for CorruptFrameAck {
    fn from(value: CorruptAck) -> Self {
        match value {
            CorruptAck::Echo => CorruptFrameAck::EchoSeq,
            CorruptAck::LastDelivered => CorruptFrameAck::LastDelivered,
        }
    }
}

#[derive(Parser)]
#[command(name = "sr_sim", about = "Selective-Repeat ARQ over an emulated lossy channel")]
struct Cli {
    /// Number of messages to generate
    #[arg(short = 'n', long, default_value_t = 20)]
    messages: usize,
    /// Packet loss probability
    #[arg(short, long, default_value_t = 0.0)]
    loss: f64,
    /// Packet corruption probability
    #[arg(short, long, default_value_t = 0.0)]
    corrupt: f64,
    /// Mean time between two messages
    #[arg(long, default_value_t = 50.0)]
    lambda: f64,
    #[arg(short, long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value_t = SEQSPACE)]
    seq_space: u32,
    #[arg(short, long, default_value_t = WINDOWSIZE)]
    window: u32,
    #[arg(long, default_value_t = RTT)]
    rtt: f64,
    #[arg(long, value_enum, default_value_t = CorruptAck::Echo)]
    corrupt_ack: CorruptAck,
    /// Give up past this simulated time
    #[arg(long, default_value_t = 1_000_000.0)]
    max_time: f64,
    /// Log filter, overridden by `RUST_LOG`
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let emulator = match (EmulatorBuilder {
        msgs: cli.messages,
        loss_prob: cli.loss,
        corrupt_prob: cli.corrupt,
        lambda: cli.lambda,
        seed: cli.seed,
        max_time: cli.max_time,
        layer: Builder {
            seq_space: cli.seq_space,
            wnd_size: cli.window,
            rtt: cli.rtt,
            corrupt_frame_ack: cli.corrupt_ack.into(),
        },
    })
    .build()
    {
        Ok(emulator) => emulator,
        Err(e) => {
            eprintln!("invalid configuration: {e:?}");
            std::process::exit(1);
        }
    };

    let report = emulator.run();

    println!("time: {}", report.end_time);
    println!(
        "messages: submitted {}, rejected {}, delivered {}",
        report.submitted, report.rejected, report.delivered
    );
    println!("network: {:?}", report.network);
    println!("sender: {:?}", report.sender);
    println!("receiver: {:?}", report.receiver);

    if report.timed_out {
        warn!("gave up before every message was acknowledged");
    }
    if !report.in_order {
        warn!("delivered messages differ from submitted ones");
        std::process::exit(2);
    }
}
