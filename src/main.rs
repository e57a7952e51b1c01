use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "ta-marking")]
#[command(version)]
#[command(about = "TAs marking a stack of exams against one shared rubric")]
struct Args {
    /// Number of TAs working concurrently (at least 2)
    #[arg(value_parser = clap::value_parser!(u16).range(2..))]
    workers: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Err(e) = ta_marking::run(usize::from(args.workers)).await {
        eprintln!("ta-marking fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
