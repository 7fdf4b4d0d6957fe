// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Command-line front-end: train, predict, inspect and stats modes over the
//! detector library. All failures exit with status 1 and a one-line message
//! on stderr; diagnostics go through `tracing`.

use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use salad::classify::score_anomaly;
use salad::classify::score_two_class;
use salad::container::ContainerFormat;
use salad::container::read_model_from_path;
use salad::container::write_model_to_path;
use salad::error::Error;
use salad::error::ErrorKind;
use salad::hash::HashSetId;
use salad::input::InputFormat;
use salad::input::SampleSource;
use salad::inspect::Inspector;
use salad::model::Model;

#[derive(Parser)]
#[command(
    name = "salad",
    version,
    about = "A content anomaly detector based on n-grams"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a detection model on known-good samples
    Train(TrainArgs),
    /// Score samples against one or two trained models
    Predict(PredictArgs),
    /// Report per-sample n-gram novelty statistics
    Inspect(InspectArgs),
    /// Print properties of a trained model
    Stats(StatsArgs),
}

#[derive(Args)]
struct IoArgs {
    /// The input filename
    #[arg(short, long)]
    input: PathBuf,

    /// Format of the input: lines, files, archive, network or network-dump
    #[arg(short = 'f', long = "input-format", default_value = "lines")]
    input_format: InputFormat,

    /// Number of samples that are read and processed in one go
    #[arg(long = "batch-size", default_value_t = 128)]
    batch_size: usize,
}

#[derive(Args)]
struct FeatureArgs {
    /// Length of n-grams, in bits, bytes or tokens depending on the mode
    #[arg(short = 'n', long = "ngram-len", default_value_t = 3)]
    ngram_len: usize,

    /// Delimiters for word/token n-grams, percent-encoded where unprintable
    #[arg(short = 'd', long = "ngram-delim", default_value = "")]
    delimiter: String,

    /// Use bit n-grams rather than byte or token n-grams
    #[arg(long)]
    binary: bool,

    /// Width of the filter index in bits; the filter holds 2^num bits
    #[arg(short = 's', long = "filter-size", default_value_t = 24)]
    filter_size: u32,

    /// Hash set to be used: 'simple' or 'murmur'
    #[arg(long = "hash-set", default_value = "simple", value_parser = parse_hash_set)]
    hash_set: HashSetId,
}

#[derive(Args)]
struct TrainArgs {
    #[command(flatten)]
    io: IoArgs,

    /// The output filename of the model
    #[arg(short, long)]
    output: PathBuf,

    /// Continue training the model stored in the output file, if it exists
    #[arg(short = 'u', long = "update-model")]
    update_model: bool,

    #[command(flatten)]
    features: FeatureArgs,

    /// Echo used parameters and settings
    #[arg(short = 'e', long = "echo-params")]
    echo_params: bool,

    /// Suppress all output but warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Args)]
struct PredictArgs {
    #[command(flatten)]
    io: IoArgs,

    /// The trained model of normal content
    #[arg(short = 'b', long = "bloom")]
    bloom: PathBuf,

    /// A second model of bad content; enables two-class scoring
    #[arg(long = "bad-bloom")]
    bad_bloom: Option<PathBuf>,

    /// The output filename of the scores; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// The string to print for scores that are not a number
    #[arg(short = 'r', long = "nan-str", default_value = "nan")]
    nan_str: String,

    /// Suppress all output but warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Args)]
struct InspectArgs {
    #[command(flatten)]
    io: IoArgs,

    /// A trained model to use as the frozen reference
    #[arg(short = 'b', long = "bloom")]
    bloom: Option<PathBuf>,

    /// The output filename of the report; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    features: FeatureArgs,

    /// Suppress all output but warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Args)]
struct StatsArgs {
    /// The trained model to describe
    #[arg(short = 'b', long = "bloom")]
    bloom: PathBuf,
}

fn parse_hash_set(value: &str) -> Result<HashSetId, String> {
    HashSetId::from_name(value)
        .ok_or_else(|| format!("unknown hash set '{value}' (expected 'simple' or 'murmur')"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let quiet = match &cli.command {
        Command::Train(args) => args.quiet,
        Command::Predict(args) => args.quiet,
        Command::Inspect(args) => args.quiet,
        Command::Stats(_) => false,
    };
    init_logging(quiet);

    let result = match cli.command {
        Command::Train(args) => run_train(args),
        Command::Predict(args) => run_predict(args),
        Command::Inspect(args) => run_inspect(args),
        Command::Stats(args) => run_stats(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("salad: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_model(features: &FeatureArgs) -> Result<Model, Error> {
    if features.filter_size == 0 || features.filter_size > 63 {
        return Err(Error::new(
            ErrorKind::InvalidArgument,
            "the filter size must be between 1 and 63 bits of index",
        ));
    }
    Model::new(
        1u64 << features.filter_size,
        features.hash_set,
        features.ngram_len,
        features.binary,
        &features.delimiter,
    )
}

fn echo_params(features: &FeatureArgs) {
    info!(
        ngram_len = features.ngram_len,
        binary = features.binary,
        delimiter = %features.delimiter,
        filter_size = features.filter_size,
        hash_set = features.hash_set.name(),
        "effective parameters"
    );
}

fn open_sink(path: Option<&PathBuf>) -> Result<Box<dyn Write>, Error> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|err| {
                Error::new(ErrorKind::Io, format!("cannot create {}", path.display()))
                    .set_source(err)
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(std::io::stdout()))),
    }
}

fn run_train(args: TrainArgs) -> Result<(), Error> {
    if args.echo_params {
        echo_params(&args.features);
    }

    let mut model = if args.update_model && args.output.exists() {
        let stored = read_model_from_path(&args.output)?;
        let requested = build_model(&args.features)?;
        if Model::specs_differ(&stored, &requested) {
            warn!("the stored model's parameters differ from the requested ones; keeping the stored ones");
        }
        stored
    } else {
        build_model(&args.features)?
    };

    let mut source = SampleSource::open(args.io.input_format, &args.io.input)?;
    let mut num_samples: u64 = 0;
    loop {
        let batch = source.next_batch(args.io.batch_size)?;
        if batch.is_empty() {
            break;
        }
        for sample in &batch {
            model.train(sample);
        }
        num_samples += batch.len() as u64;
    }

    write_model_to_path(&args.output, &model, ContainerFormat::Text)?;
    info!(
        "trained on {num_samples} samples, saturation {:.3}%",
        model.filter().saturation() * 100.0
    );
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<(), Error> {
    let good = read_model_from_path(&args.bloom)?;
    let bad = args
        .bad_bloom
        .as_ref()
        .map(read_model_from_path)
        .transpose()?;
    if let Some(bad) = &bad {
        if Model::specs_differ(&good, bad) {
            return Err(Error::new(
                ErrorKind::SpecMismatch,
                "the normal and the bad content filter were not generated with the same parameters",
            ));
        }
    }

    let mut source = SampleSource::open(args.io.input_format, &args.io.input)?;
    let mut sink = open_sink(args.output.as_ref())?;

    let mut in_computation = 0.0f64;
    loop {
        let batch = source.next_batch(args.io.batch_size)?;
        if batch.is_empty() {
            break;
        }

        let started = Instant::now();
        let mut scores = Vec::with_capacity(batch.len());
        for sample in &batch {
            let score = match &bad {
                Some(bad) => score_two_class(&good, bad, sample)?,
                None => score_anomaly(&good, sample),
            };
            scores.push(score);
        }
        in_computation += started.elapsed().as_secs_f64();

        for score in scores {
            if score.is_nan() {
                writeln!(sink, "{}", args.nan_str)?;
            } else {
                writeln!(sink, "{:.6}", 1.0 - score)?;
            }
        }
    }
    sink.flush()?;

    info!("net calculation time: {in_computation:.4} seconds");
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<(), Error> {
    let mut inspector = match &args.bloom {
        Some(path) => Inspector::frozen(read_model_from_path(path)?),
        None => Inspector::updating(build_model(&args.features)?),
    };

    let mut source = SampleSource::open(args.io.input_format, &args.io.input)?;
    let mut sink = open_sink(args.output.as_ref())?;

    loop {
        let batch = source.next_batch(args.io.batch_size)?;
        if batch.is_empty() {
            break;
        }
        for sample in &batch {
            let stats = inspector.inspect(sample);
            writeln!(
                sink,
                "{:>10}\t{:>10}\t{:>10}\t{:>10}",
                stats.new,
                stats.uniq,
                stats.total,
                sample.len()
            )?;
        }
    }
    sink.flush()?;

    info!(
        "reference saturation: {:.3}%",
        inspector.reference().saturation() * 100.0
    );
    Ok(())
}

fn run_stats(args: StatsArgs) -> Result<(), Error> {
    let model = read_model_from_path(&args.bloom)?;
    println!(
        "Saturation: {:.3}%",
        model.filter().saturation() * 100.0
    );
    Ok(())
}
