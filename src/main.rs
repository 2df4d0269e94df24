use clap::Parser;
use social_dl::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Ctrl-C abandons the session; dropping it kills any running yt-dlp child
    let interrupted = tokio::select! {
        result = cli.run() => {
            result?;
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };

    if interrupted {
        println!("\n\nInterrupted by user");
        // stdin may still be blocked in a read the runtime cannot cancel
        std::process::exit(130);
    }

    Ok(())
}
